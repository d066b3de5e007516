//! Ordered INI document model.
//!
//! The hotkey utility rewrites its INI file wholesale on save, preserving
//! section and key order but discarding comments and blank lines. The
//! document model here does the same: insertion-ordered sections and
//! entries, case-insensitive lookups, comments dropped at parse time.

use super::MachineKeySet;

/// An INI file as an ordered list of named sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: Vec<IniSection>,
}

/// One `[name]` section with its entries in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniSection {
    name: String,
    entries: Vec<(String, String)>,
}

impl IniSection {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a value, ignoring ASCII case of the key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Replace an existing entry in place, or append a new one.
    pub fn set(&mut self, key: &str, value: &str) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
        {
            entry.1 = value.to_string();
        } else {
            self.entries.push((key.to_string(), value.to_string()));
        }
    }

    /// Entries in file order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl IniDocument {
    /// Parse INI text. Never fails: comment lines (`;`, `#`) and blanks are
    /// skipped, keys appearing before the first section header are ignored,
    /// and anything else unrecognized is dropped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut doc = Self::default();
        let mut current: Option<usize> = None;

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
                let name = line[1..line.len() - 1].trim();
                current = Some(doc.index_or_insert(name));
            } else if let Some((key, value)) = line.split_once('=') {
                if let Some(idx) = current {
                    doc.sections[idx].set(key.trim(), value.trim());
                }
            }
        }

        doc
    }

    /// Render back to INI text: one `[section]` header per section, `key=value`
    /// lines, a blank line between sections.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            out.push_str(&format!("[{}]\n", section.name));
            for (key, value) in &section.entries {
                out.push_str(&format!("{key}={value}\n"));
            }
            out.push('\n');
        }
        out
    }

    /// Look up a section, ignoring ASCII case of the name.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn sections(&self) -> impl Iterator<Item = &IniSection> {
        self.sections.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    fn index_or_insert(&mut self, name: &str) -> usize {
        if let Some(idx) = self
            .sections
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
        {
            idx
        } else {
            self.sections.push(IniSection::new(name));
            self.sections.len() - 1
        }
    }

    fn section_mut_or_insert(&mut self, name: &str) -> &mut IniSection {
        let idx = self.index_or_insert(name);
        &mut self.sections[idx]
    }
}

/// Strip machine-specific keys from every section.
pub fn filter_for_export(doc: &mut IniDocument, keys: &MachineKeySet) {
    for section in &mut doc.sections {
        section.entries.retain(|(k, _)| !keys.contains(k));
    }
}

/// Overlay this machine's values for machine-specific keys onto an incoming
/// document. Every other key keeps its incoming value; a machine-specific
/// key with no local value keeps its incoming value too.
#[must_use]
pub fn merge_for_import(
    incoming: IniDocument,
    local: &IniDocument,
    keys: &MachineKeySet,
) -> IniDocument {
    let mut merged = incoming;
    for section in local.sections() {
        for (key, value) in section.entries() {
            if keys.contains(key) {
                merged.section_mut_or_insert(section.name()).set(key, value);
            }
        }
    }
    merged
}
