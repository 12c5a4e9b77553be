//! The label-class registry.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info};

use super::class::{ClassCatalogue, LabelClass};
use super::shortcuts::ShortcutTable;
use super::{Legend, LegendEntry};
use crate::error::{RegistryError, UnknownClassError};

/// Owns the label classes and the single active-class pointer.
pub struct LabelClassRegistry {
    classes: IndexMap<String, LabelClass>,
    shortcuts: ShortcutTable,
    legend: Arc<dyn Legend>,
    active: Option<String>,
}

impl LabelClassRegistry {
    /// Build the registry from a catalogue and render it into `legend`.
    ///
    /// Entries without an index get the lowest index not claimed by any
    /// other entry, in catalogue order. The first class becomes active.
    pub fn build(
        catalogue: &ClassCatalogue,
        legend: Arc<dyn Legend>,
    ) -> Result<Self, RegistryError> {
        let claimed: HashSet<u32> = catalogue.values().filter_map(|spec| spec.index).collect();
        let mut next_index = 0u32;
        let mut classes = IndexMap::with_capacity(catalogue.len());
        let mut shortcuts = ShortcutTable::default();

        for (id, spec) in catalogue {
            let index = match spec.index {
                Some(index) => index,
                None => {
                    while claimed.contains(&next_index) {
                        next_index += 1;
                    }
                    let assigned = next_index;
                    next_index += 1;
                    assigned
                }
            };
            shortcuts.bind(index, id)?;
            classes.insert(id.clone(), LabelClass::new(id, spec, index));
        }

        let mut registry = Self {
            classes,
            shortcuts,
            legend,
            active: None,
        };
        registry.render_legend();

        if let Some(first) = registry.classes.keys().next().cloned() {
            registry.activate(&first);
        }

        info!(
            classes = registry.classes.len(),
            shortcuts = registry.shortcuts.len(),
            active = ?registry.active,
            "Label class registry built"
        );
        Ok(registry)
    }

    fn render_legend(&self) {
        self.legend.clear();
        for class in self.classes.values() {
            self.legend.append(&LegendEntry {
                class_id: class.id().to_string(),
                label: class.legend_label(),
                color: class.color().to_string(),
            });
        }
    }

    fn activate(&mut self, id: &str) {
        if let Some(previous) = self.active.take() {
            self.legend.set_active(&previous, false);
        }
        self.legend.set_active(id, true);
        self.active = Some(id.to_string());
    }

    /// Make `id` the active class.
    ///
    /// Fails without touching the current selection when `id` is unknown.
    pub fn set_active(&mut self, id: &str) -> Result<(), UnknownClassError> {
        if !self.classes.contains_key(id) {
            return Err(UnknownClassError { id: id.to_string() });
        }
        debug!(class_id = %id, "Activating label class");
        self.activate(id);
        Ok(())
    }

    /// Activate the class bound to a digit key.
    ///
    /// Returns the activated id, or `None` when no class uses that key.
    pub fn handle_key(&mut self, key: &str) -> Option<String> {
        let id = self.shortcuts.lookup_key(key)?.to_string();
        self.set_active(&id).ok()?;
        Some(id)
    }

    pub fn active(&self) -> Option<&LabelClass> {
        self.active.as_deref().and_then(|id| self.classes.get(id))
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active().map(LabelClass::name)
    }

    pub fn active_color(&self) -> Option<&str> {
        self.active().map(LabelClass::color)
    }

    /// Color of a class, or `fallback` when the id is unknown.
    pub fn color<'a>(&'a self, id: &str, fallback: &'a str) -> &'a str {
        self.classes.get(id).map_or(fallback, LabelClass::color)
    }

    /// Name of a class, or `None` when the id is unknown.
    pub fn name(&self, id: &str) -> Option<&str> {
        self.classes.get(id).map(LabelClass::name)
    }

    pub fn get(&self, id: &str) -> Option<&LabelClass> {
        self.classes.get(id)
    }

    /// Classes in catalogue order.
    pub fn iter(&self) -> impl Iterator<Item = &LabelClass> {
        self.classes.values()
    }

    pub fn shortcuts(&self) -> &ShortcutTable {
        &self.shortcuts
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
