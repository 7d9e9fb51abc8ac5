use std::collections::BTreeMap;

use dlg_compiler::CompileOptions;
use dlg_core::{DlgValue, RuntimeEvent};
use serde::{Deserialize, Serialize};

pub const TESTCASE_SCHEMA_V1: &str = "dlg-tool-case.v1";

/// A scripted play-through of one scenario directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub schema_version: String,
    /// Falls back to the `main` scene.
    #[serde(default)]
    pub entry_scene: Option<String>,
    #[serde(default)]
    pub compile: CompileOptions,
    #[serde(default)]
    pub actions: Vec<TestAction>,
    #[serde(default)]
    pub expected_events: Vec<RuntimeEvent>,
    /// Checked against the variable store once the run ends.
    #[serde(default)]
    pub expected_variables: BTreeMap<String, DlgValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TestAction {
    Choose { index: usize },
    Input { text: String },
}

impl TestAction {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Choose { .. } => "choose",
            Self::Input { .. } => "input",
        }
    }
}
