use std::collections::BTreeMap;

use dlg_compiler::CompileOptions;
use dlg_core::{ChoiceItem, ControllerSnapshot, RuntimeEvent};
use dlg_runtime::{EventLog, FlowController};
use serde::{Deserialize, Serialize};

pub(crate) const PLAYER_STATE_SCHEMA: &str = "player-state.v1";

#[derive(Debug, Clone)]
pub(crate) struct LoadedScenario {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) sources: BTreeMap<String, String>,
    pub(crate) compile: CompileOptions,
}

/// A controller plus the log its recording services write into.
pub(crate) struct Session {
    pub(crate) controller: FlowController,
    pub(crate) log: EventLog,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlayerState {
    pub(crate) schema_version: String,
    pub(crate) scenario_id: String,
    #[serde(default)]
    pub(crate) strict: bool,
    pub(crate) init_scene_name: String,
    pub(crate) snapshot: ControllerSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoundaryEvent {
    Choices,
    Input,
    End,
}

#[derive(Debug, Clone)]
pub(crate) struct BoundaryResult {
    pub(crate) event: BoundaryEvent,
    /// Dialogue and command events recorded on the way to the boundary.
    pub(crate) events: Vec<RuntimeEvent>,
    pub(crate) choices: Vec<ChoiceItem>,
    pub(crate) prompt_text: Option<String>,
    pub(crate) input_default_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlayCommandAction {
    NotHandled,
    Continue,
    RefreshBoundary,
    Quit,
}

pub(crate) struct PlayCommandContext<'a> {
    pub(crate) state_file: &'a str,
    pub(crate) scenario: &'a LoadedScenario,
    pub(crate) entry_scene: Option<&'a str>,
}
