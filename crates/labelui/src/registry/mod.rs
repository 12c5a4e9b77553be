//! Label-class registry.
//!
//! Builds the class catalogue once, keeps exactly one class active after
//! construction and maps the digit keys `1`..`9` to classes.

mod class;
mod shortcuts;
mod store;

pub use class::{default_color, ClassCatalogue, ClassSpec, LabelClass, DEFAULT_PALETTE};
pub use shortcuts::{ShortcutTable, SHORTCUT_SLOTS};
pub use store::LabelClassRegistry;

/// One rendered legend row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendEntry {
    /// Class the row belongs to.
    pub class_id: String,
    /// Text shown in the row, including the shortcut prefix.
    pub label: String,
    /// Background color.
    pub color: String,
}

/// Render target for the class legend.
///
/// Active state is set explicitly rather than toggled, so re-activating the
/// active class leaves the row active.
pub trait Legend: Send + Sync {
    /// Remove all rows.
    fn clear(&self);

    /// Append a row below the existing ones.
    fn append(&self, entry: &LegendEntry);

    /// Show a row as active or inactive.
    fn set_active(&self, class_id: &str, active: bool);
}
