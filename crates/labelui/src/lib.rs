//! Client-side bootstrap and session guard for the labeling interface.
//!
//! This crate provides:
//! - An ordered initialization pipeline that keeps the interface blocked
//!   until an explicit reveal
//! - A session guard that turns an expired session into a credential prompt
//!   and resumes the interrupted action after renewal
//! - The label-class registry with single active-class selection and digit
//!   key shortcuts
//!
//! Rendering, tutorial content and the remote endpoints are collaborators
//! expressed as traits; `terminal` and `remote` hold the implementations
//! used by the `labelui` binary.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod remote;
pub mod session;
pub mod terminal;
pub mod ui;
pub mod workspace;

// Re-export main types
pub use config::{ClientConfig, ProjectConfiguration};
pub use error::{
    AuthError, AuthFailure, PipelineError, RegistryError, RemoteError, SessionError,
    UnknownClassError,
};
pub use pipeline::{bootstrap, BootstrapContext, InitializationPipeline, PipelineStep};
pub use registry::{ClassCatalogue, ClassSpec, LabelClass, LabelClassRegistry, Legend, LegendEntry};
pub use session::{AuthApi, HttpAuthApi, SessionGuard, SessionPhase, VerifyOutcome};
pub use ui::{InterfaceAction, Navigator, OverlayContent, RevealHandle, Surface, UiController};
pub use workspace::{Command, KeyOutcome, LabelingWorkspace};
