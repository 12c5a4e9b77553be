//! Session guard state machine.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use super::auth::AuthApi;
use crate::error::{AuthFailure, SessionError};
use crate::ui::{Navigator, OverlayContent, UiController};

/// Interrupted work, resumed once the session is valid again.
type Continuation = Box<dyn FnOnce() + Send + 'static>;

/// Phase of the session guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// A session check is in flight.
    Checking,
    /// The last check or renewal succeeded.
    Authenticated,
    /// The last check failed.
    Expired,
    /// The renewal form is shown and input is blocked.
    ReauthPrompted,
    /// Credentials were sent and the answer is pending.
    ReauthSubmitted,
    /// Renewal was cancelled or no session exists; terminal.
    Aborted,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Checking => "checking",
            Self::Authenticated => "authenticated",
            Self::Expired => "expired",
            Self::ReauthPrompted => "reauth_prompted",
            Self::ReauthSubmitted => "reauth_submitted",
            Self::Aborted => "aborted",
        };
        write!(f, "{s}")
    }
}

/// What [`SessionGuard::verify`] did with its continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The session was valid and the continuation ran.
    Proceeded,
    /// The renewal form is open; the continuation runs after renewal.
    Prompted,
    /// The guard is aborted; the continuation was dropped.
    Aborted,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Guards authenticated actions and recovers from session expiry.
pub struct SessionGuard {
    api: Arc<dyn AuthApi>,
    ui: Arc<UiController>,
    navigator: Arc<dyn Navigator>,
    landing_path: String,
    phase: watch::Sender<SessionPhase>,
    pending: Mutex<Option<Continuation>>,
    last_verified: Mutex<Option<DateTime<Utc>>>,
}

impl SessionGuard {
    #[must_use]
    pub fn new(
        api: Arc<dyn AuthApi>,
        ui: Arc<UiController>,
        navigator: Arc<dyn Navigator>,
        landing_path: impl Into<String>,
    ) -> Self {
        let (phase, _) = watch::channel(SessionPhase::Checking);
        Self {
            api,
            ui,
            navigator,
            landing_path: landing_path.into(),
            phase,
            pending: Mutex::new(None),
            last_verified: Mutex::new(None),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    /// Receiver notified on every phase change.
    pub fn subscribe(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }

    /// Whether a continuation is waiting for renewal.
    pub fn has_pending(&self) -> bool {
        lock(&self.pending).is_some()
    }

    /// When the session was last confirmed valid.
    pub fn last_verified(&self) -> Option<DateTime<Utc>> {
        *lock(&self.last_verified)
    }

    fn set_phase(&self, next: SessionPhase) {
        let previous = self.phase.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "Session phase changed");
        }
    }

    fn mark_authenticated(&self) {
        *lock(&self.last_verified) = Some(Utc::now());
        self.set_phase(SessionPhase::Authenticated);
    }

    fn renewal_overlay(&self) -> OverlayContent {
        OverlayContent::session_renewal(self.ui.displayed_user().unwrap_or_default())
    }

    /// Store a continuation, running after any already pending one.
    fn park(&self, continuation: Continuation) {
        let mut pending = lock(&self.pending);
        *pending = Some(match pending.take() {
            Some(earlier) => Box::new(move || {
                earlier();
                continuation();
            }),
            None => continuation,
        });
    }

    fn abort_to_landing(&self) {
        let dropped = lock(&self.pending).take().is_some();
        self.set_phase(SessionPhase::Aborted);
        info!(
            landing = %self.landing_path,
            dropped_continuation = dropped,
            "Leaving for landing view"
        );
        self.navigator.navigate(&self.landing_path);
    }

    /// Initial session check. Without a session there is nothing to renew,
    /// so failure sends the client to the landing view.
    pub async fn require_session(&self) -> Result<(), SessionError> {
        self.set_phase(SessionPhase::Checking);
        match self.api.login_check().await {
            Ok(()) => {
                self.mark_authenticated();
                info!("Session verified");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "No authenticated session");
                self.abort_to_landing();
                Err(SessionError::AuthRequired)
            }
        }
    }

    /// Check the session, then run `on_success`.
    ///
    /// If the check fails, `on_success` is kept as the pending continuation
    /// and the renewal form is shown. While a form is already open the
    /// continuation is queued behind the pending one without a new check.
    pub async fn verify<F>(&self, on_success: F) -> VerifyOutcome
    where
        F: FnOnce() + Send + 'static,
    {
        match self.phase() {
            SessionPhase::Aborted => {
                debug!("Session aborted, dropping continuation");
                return VerifyOutcome::Aborted;
            }
            SessionPhase::ReauthPrompted | SessionPhase::ReauthSubmitted => {
                self.park(Box::new(on_success));
                return VerifyOutcome::Prompted;
            }
            _ => {}
        }

        self.set_phase(SessionPhase::Checking);
        match self.api.login_check().await {
            Ok(()) => {
                let queued = lock(&self.pending).take();
                self.mark_authenticated();
                self.ui.show_overlay(None);
                if let Some(queued) = queued {
                    queued();
                }
                on_success();
                VerifyOutcome::Proceeded
            }
            Err(e) => {
                warn!(error = %e, "Session check failed, prompting for renewal");
                self.set_phase(SessionPhase::Expired);
                self.park(Box::new(on_success));
                self.set_phase(SessionPhase::ReauthPrompted);
                self.ui.show_overlay(Some(self.renewal_overlay()));
                VerifyOutcome::Prompted
            }
        }
    }

    /// Wait until the session is valid, renewing it if necessary.
    ///
    /// Returns [`SessionError::Aborted`] if the renewal is cancelled.
    pub async fn verified(&self) -> Result<(), SessionError> {
        self.verified_with_outcome().await.map(|_| ())
    }

    async fn verified_with_outcome(&self) -> Result<VerifyOutcome, SessionError> {
        let (tx, rx) = oneshot::channel();
        let outcome = self
            .verify(move || {
                let _ = tx.send(());
            })
            .await;
        rx.await.map_err(|_| SessionError::Aborted)?;
        Ok(outcome)
    }

    /// Run an authenticated operation, renewing the session and retrying
    /// when the server reports it expired.
    ///
    /// If the session turns out to be valid the refusal is returned as is.
    pub async fn run_authenticated<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: AuthFailure + From<SessionError>,
    {
        loop {
            match operation().await {
                Err(e) if e.is_auth_failure() => {
                    warn!("Request refused, verifying session");
                    if self.verified_with_outcome().await? == VerifyOutcome::Proceeded {
                        return Err(e);
                    }
                    debug!("Session renewed, retrying request");
                }
                other => return other,
            }
        }
    }

    /// Submit the renewal password for the displayed username.
    pub async fn submit_credentials(&self, password: &str) -> Result<(), SessionError> {
        if self.phase() != SessionPhase::ReauthPrompted {
            return Err(SessionError::NoPendingPrompt);
        }

        // The session cookie may already be gone, so the username comes from
        // what the interface displays.
        let username = self.ui.displayed_user().unwrap_or_default();
        self.set_phase(SessionPhase::ReauthSubmitted);
        info!(username = %username, "Submitting session renewal");

        let result = self.api.login(&username, password).await;
        if self.phase() == SessionPhase::Aborted {
            return Err(SessionError::Aborted);
        }

        match result {
            Ok(()) => {
                let continuation = lock(&self.pending).take();
                self.mark_authenticated();
                self.ui.show_overlay(None);
                info!(resumed = continuation.is_some(), "Session renewed");
                if let Some(continuation) = continuation {
                    continuation();
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Session renewal rejected");
                self.set_phase(SessionPhase::ReauthPrompted);
                self.ui
                    .show_overlay(Some(self.renewal_overlay().with_invalid_password()));
                Err(SessionError::InvalidCredentials)
            }
        }
    }

    /// Cancel renewal: drop the pending continuation and leave for the
    /// landing view.
    pub fn cancel(&self) {
        info!("Session renewal cancelled");
        self.abort_to_landing();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AuthError, RemoteError};
    use crate::ui::testing::{RecordingNavigator, RecordingSurface};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeAuth {
        session_valid: AtomicBool,
        password: String,
        logins: Mutex<Vec<(String, String)>>,
    }

    impl FakeAuth {
        fn new(session_valid: bool) -> Self {
            Self {
                session_valid: AtomicBool::new(session_valid),
                password: "hunter2".to_string(),
                logins: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AuthApi for FakeAuth {
        async fn login_check(&self) -> Result<(), AuthError> {
            if self.session_valid.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(AuthError::Rejected { status: 401 })
            }
        }

        async fn login(&self, username: &str, password: &str) -> Result<(), AuthError> {
            self.logins
                .lock()
                .unwrap()
                .push((username.to_string(), password.to_string()));
            if password == self.password {
                self.session_valid.store(true, Ordering::SeqCst);
                Ok(())
            } else {
                Err(AuthError::Rejected { status: 403 })
            }
        }
    }

    struct Harness {
        guard: Arc<SessionGuard>,
        auth: Arc<FakeAuth>,
        ui: Arc<UiController>,
        navigator: Arc<RecordingNavigator>,
    }

    fn harness(session_valid: bool) -> Harness {
        let auth = Arc::new(FakeAuth::new(session_valid));
        let ui = Arc::new(UiController::new(Arc::new(RecordingSurface::default())));
        ui.set_displayed_user("alice");
        let navigator = Arc::new(RecordingNavigator::default());
        let guard = Arc::new(SessionGuard::new(
            auth.clone(),
            ui.clone(),
            navigator.clone(),
            "/",
        ));
        Harness {
            guard,
            auth,
            ui,
            navigator,
        }
    }

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn test_verify_valid_session_runs_continuation() {
        let h = harness(true);
        let (count, cb) = counter();

        assert_eq!(h.guard.verify(cb).await, VerifyOutcome::Proceeded);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(h.guard.phase(), SessionPhase::Authenticated);
        assert!(h.guard.last_verified().is_some());
        assert!(!h.ui.is_blocked());
    }

    #[tokio::test]
    async fn test_expired_session_renewal_resumes_once() {
        let h = harness(false);
        let (count, cb) = counter();

        assert_eq!(h.guard.verify(cb).await, VerifyOutcome::Prompted);
        assert_eq!(h.guard.phase(), SessionPhase::ReauthPrompted);
        assert!(h.guard.has_pending());
        assert!(h.ui.is_blocked());
        assert_eq!(h.ui.overlay(), Some(OverlayContent::session_renewal("alice")));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        let err = h.guard.submit_credentials("wrong").await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidCredentials));
        assert_eq!(h.guard.phase(), SessionPhase::ReauthPrompted);
        assert!(h.guard.has_pending());
        assert_eq!(
            h.ui.overlay(),
            Some(OverlayContent::session_renewal("alice").with_invalid_password())
        );
        assert_eq!(count.load(Ordering::SeqCst), 0);

        h.guard.submit_credentials("hunter2").await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(h.guard.phase(), SessionPhase::Authenticated);
        assert!(!h.guard.has_pending());
        assert!(h.ui.overlay().is_none());
        assert!(!h.ui.is_blocked());

        let err = h.guard.submit_credentials("hunter2").await.unwrap_err();
        assert!(matches!(err, SessionError::NoPendingPrompt));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_renewal_uses_displayed_username() {
        let h = harness(false);
        h.ui.set_displayed_user("bob");
        h.guard.verify(|| {}).await;
        h.guard.submit_credentials("hunter2").await.unwrap();

        let logins = h.auth.logins.lock().unwrap();
        assert_eq!(
            logins.as_slice(),
            [("bob".to_string(), "hunter2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_cancel_drops_continuation_and_navigates() {
        let h = harness(false);
        let (count, cb) = counter();
        h.guard.verify(cb).await;

        h.guard.cancel();

        assert_eq!(h.guard.phase(), SessionPhase::Aborted);
        assert!(!h.guard.has_pending());
        assert_eq!(h.navigator.visits.lock().unwrap().as_slice(), ["/"]);

        let (later, cb) = counter();
        assert_eq!(h.guard.verify(cb).await, VerifyOutcome::Aborted);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_expiry_queues_behind_open_prompt() {
        let h = harness(false);
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = order.clone();
        h.guard.verify(move || first.lock().unwrap().push("first")).await;
        let second = order.clone();
        assert_eq!(
            h.guard
                .verify(move || second.lock().unwrap().push("second"))
                .await,
            VerifyOutcome::Prompted
        );

        h.guard.submit_credentials("hunter2").await.unwrap();
        assert_eq!(order.lock().unwrap().as_slice(), ["first", "second"]);
    }

    #[tokio::test]
    async fn test_require_session_failure_redirects() {
        let h = harness(false);
        let err = h.guard.require_session().await.unwrap_err();

        assert!(matches!(err, SessionError::AuthRequired));
        assert_eq!(h.guard.phase(), SessionPhase::Aborted);
        assert_eq!(h.navigator.visits.lock().unwrap().as_slice(), ["/"]);
        assert!(h.ui.overlay().is_none());
    }

    #[tokio::test]
    async fn test_verified_waits_for_renewal() {
        let h = harness(false);
        let mut phases = h.guard.subscribe();

        let guard = h.guard.clone();
        let waiter = tokio::spawn(async move { guard.verified().await });

        phases
            .wait_for(|p| *p == SessionPhase::ReauthPrompted)
            .await
            .unwrap();
        h.guard.submit_credentials("hunter2").await.unwrap();

        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_verified_reports_abort() {
        let h = harness(false);
        let mut phases = h.guard.subscribe();

        let guard = h.guard.clone();
        let waiter = tokio::spawn(async move { guard.verified().await });

        phases
            .wait_for(|p| *p == SessionPhase::ReauthPrompted)
            .await
            .unwrap();
        h.guard.cancel();

        assert!(matches!(
            waiter.await.unwrap(),
            Err(SessionError::Aborted)
        ));
    }

    #[tokio::test]
    async fn test_run_authenticated_retries_after_renewal() {
        let h = harness(false);
        let mut phases = h.guard.subscribe();
        let attempts = Arc::new(AtomicUsize::new(0));

        let guard = h.guard.clone();
        let counted = attempts.clone();
        let task = tokio::spawn(async move {
            guard
                .run_authenticated(|| {
                    let counted = counted.clone();
                    async move {
                        if counted.fetch_add(1, Ordering::SeqCst) == 0 {
                            Err(RemoteError::Api {
                                status: 401,
                                message: "session expired".to_string(),
                            })
                        } else {
                            Ok(7)
                        }
                    }
                })
                .await
        });

        phases
            .wait_for(|p| *p == SessionPhase::ReauthPrompted)
            .await
            .unwrap();
        h.guard.submit_credentials("hunter2").await.unwrap();

        assert_eq!(task.await.unwrap().unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_authenticated_returns_refusal_with_valid_session() {
        let h = harness(true);
        let attempts = AtomicUsize::new(0);

        let result: Result<(), RemoteError> = h
            .guard
            .run_authenticated(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(RemoteError::Api {
                        status: 403,
                        message: "forbidden".to_string(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(RemoteError::Api { status: 403, .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    struct StalledLogin {
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl AuthApi for StalledLogin {
        async fn login_check(&self) -> Result<(), AuthError> {
            Err(AuthError::Rejected { status: 401 })
        }

        async fn login(&self, _: &str, _: &str) -> Result<(), AuthError> {
            self.release.notified().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_cancel_during_submit_aborts() {
        let auth = Arc::new(StalledLogin {
            release: tokio::sync::Notify::new(),
        });
        let ui = Arc::new(UiController::new(Arc::new(RecordingSurface::default())));
        ui.set_displayed_user("alice");
        let guard = Arc::new(SessionGuard::new(
            auth.clone(),
            ui,
            Arc::new(RecordingNavigator::default()),
            "/",
        ));
        let (count, cb) = counter();
        assert_eq!(guard.verify(cb).await, VerifyOutcome::Prompted);

        let mut phases = guard.subscribe();
        let submitting = guard.clone();
        let submit = tokio::spawn(async move { submitting.submit_credentials("hunter2").await });
        phases
            .wait_for(|p| *p == SessionPhase::ReauthSubmitted)
            .await
            .unwrap();

        guard.cancel();
        auth.release.notify_one();

        assert!(matches!(submit.await.unwrap(), Err(SessionError::Aborted)));
        assert_eq!(guard.phase(), SessionPhase::Aborted);
        assert!(!guard.has_pending());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
