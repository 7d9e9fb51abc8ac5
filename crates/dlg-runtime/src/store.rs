use std::collections::BTreeMap;

use dlg_core::DlgValue;

/// Variable storage consumed by expressions and assignments.
///
/// Tags (`<name>` in scripts) are read-only values owned by the host, such
/// as the player's name or a localized term.
pub trait VariableStore {
    fn get(&self, name: &str) -> Option<DlgValue>;
    fn set(&mut self, name: &str, value: DlgValue);

    fn tag(&self, _name: &str) -> Option<String> {
        None
    }

    /// Every stored variable, used for snapshots.
    fn entries(&self) -> BTreeMap<String, DlgValue> {
        BTreeMap::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryVariableStore {
    variables: BTreeMap<String, DlgValue>,
    tags: BTreeMap<String, String>,
}

impl MemoryVariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variables(variables: BTreeMap<String, DlgValue>) -> Self {
        Self {
            variables,
            tags: BTreeMap::new(),
        }
    }

    pub fn set_tag(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(name.into(), value.into());
    }
}

impl VariableStore for MemoryVariableStore {
    fn get(&self, name: &str) -> Option<DlgValue> {
        self.variables.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: DlgValue) {
        log::trace!("set ${} = {} ({})", name, value, value.type_name());
        self.variables.insert(name.to_string(), value);
    }

    fn tag(&self, name: &str) -> Option<String> {
        self.tags.get(name).cloned()
    }

    fn entries(&self) -> BTreeMap<String, DlgValue> {
        self.variables.clone()
    }
}
