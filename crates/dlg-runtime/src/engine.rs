use std::collections::BTreeSet;
use std::sync::Arc;

use dlg_core::{CompiledProject, NodeId};

use crate::services::Services;

mod boundary;
mod executor;
mod lifecycle;
mod snapshot;
mod step;

use executor::ActiveNode;

pub use executor::NodeState;
pub use lifecycle::{FlowControllerOptions, StartOutcome};
pub use snapshot::SNAPSHOT_SCHEMA;
pub use step::ControllerStatus;

/// Synchronous node transitions allowed in one [`FlowController::poll`].
pub const MAX_STEPS_PER_POLL: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
struct SceneEntry {
    scene: String,
    node_id: Option<NodeId>,
}

/// Runs compiled scenes one node at a time.
///
/// Exactly one node is active at any moment. Hosts drive the controller by
/// calling [`poll`](FlowController::poll) and answer suspension points with
/// [`choose`](FlowController::choose) and
/// [`submit_input`](FlowController::submit_input).
pub struct FlowController {
    project: Arc<CompiledProject>,
    services: Services,
    init_scene_name: String,
    current_tree: Option<String>,
    current_scene_name: Option<String>,
    current_node: Option<ActiveNode>,
    is_running: bool,
    is_skipping: bool,
    is_jumping: bool,
    /// Scene to enter once the tree's init scene finishes.
    after_init: Option<SceneEntry>,
    /// `start_scene` request made while another node was executing.
    queued_start: Option<SceneEntry>,
    initialized_trees: BTreeSet<String>,
}
