//! Digit-key shortcut table.

use crate::error::RegistryError;

/// Number of digit shortcuts (`1`..`9`).
pub const SHORTCUT_SLOTS: usize = 9;

/// Maps shortcut indices 0..=8 to class ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortcutTable {
    slots: [Option<String>; SHORTCUT_SLOTS],
}

impl ShortcutTable {
    /// Bind a class to a shortcut index. Indices outside 0..=8 have no key
    /// and are ignored.
    pub fn bind(&mut self, index: u32, class_id: &str) -> Result<(), RegistryError> {
        let Some(slot) = self.slots.get_mut(index as usize) else {
            return Ok(());
        };
        if let Some(existing) = slot {
            return Err(RegistryError::DuplicateShortcut {
                index,
                first: existing.clone(),
                second: class_id.to_string(),
            });
        }
        *slot = Some(class_id.to_string());
        Ok(())
    }

    /// Class bound to a shortcut index.
    pub fn get(&self, index: u32) -> Option<&str> {
        self.slots.get(index as usize)?.as_deref()
    }

    /// Class bound to a key, where `"1"` is index 0 and `"9"` index 8.
    pub fn lookup_key(&self, key: &str) -> Option<&str> {
        let mut chars = key.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            return None;
        };
        let digit = c.to_digit(10)?;
        if digit == 0 {
            return None;
        }
        self.get(digit - 1)
    }

    /// Number of bound shortcuts.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
