//! Machine-specific configuration filtering.
//!
//! Captured configuration travels between machines; values that record where
//! a window sat or where an executable lives on one particular machine must
//! not. Adapters declare those keys as a [`MachineKeySet`] and run their
//! captures through the format engines here: strip the keys on export, and
//! overlay the local machine's values on import.

pub mod ini;
pub mod json;

pub use ini::IniDocument;

/// Configuration keys that never travel between machines.
///
/// Lookups are ASCII case-insensitive, matching how the native applications
/// treat their own key names.
#[derive(Debug, Clone, Copy)]
pub struct MachineKeySet {
    keys: &'static [&'static str],
}

impl MachineKeySet {
    #[must_use]
    pub const fn new(keys: &'static [&'static str]) -> Self {
        Self { keys }
    }

    /// Whether `key` is machine-specific.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k.eq_ignore_ascii_case(key))
    }
}
