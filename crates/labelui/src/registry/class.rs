//! Label class entity and catalogue entries.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::shortcuts::SHORTCUT_SLOTS;

/// Colors used for classes that do not define one, picked by shortcut index.
pub const DEFAULT_PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Class catalogue as delivered by the server, in server order.
pub type ClassCatalogue = IndexMap<String, ClassSpec>;

/// One catalogue entry; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ClassSpec {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Deterministic fallback color for a shortcut index.
#[must_use]
pub fn default_color(index: u32) -> String {
    DEFAULT_PALETTE[index as usize % DEFAULT_PALETTE.len()].to_string()
}

/// A selectable label class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelClass {
    id: String,
    name: String,
    shortcut_index: u32,
    color: String,
}

impl LabelClass {
    /// Build a class from its catalogue entry and resolved shortcut index.
    #[must_use]
    pub fn new(id: &str, spec: &ClassSpec, shortcut_index: u32) -> Self {
        Self {
            id: id.to_string(),
            name: spec
                .name
                .clone()
                .unwrap_or_else(|| format!("[Label Class {id}]")),
            shortcut_index,
            color: spec
                .color
                .clone()
                .unwrap_or_else(|| default_color(shortcut_index)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shortcut_index(&self) -> u32 {
        self.shortcut_index
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    /// Digit key that activates this class, if it has one.
    pub fn shortcut_key(&self) -> Option<char> {
        if (self.shortcut_index as usize) < SHORTCUT_SLOTS {
            char::from_digit(self.shortcut_index + 1, 10)
        } else {
            None
        }
    }

    /// Legend text, prefixed with `(N) ` when a digit shortcut exists.
    pub fn legend_label(&self) -> String {
        match self.shortcut_key() {
            Some(key) => format!("({key}) {}", self.name),
            None => self.name.clone(),
        }
    }
}
