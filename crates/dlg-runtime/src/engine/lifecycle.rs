use std::collections::BTreeSet;
use std::sync::Arc;

use dlg_core::{CompiledProject, DlgError, NodeId, NodeKind, Scene, Tree, DEFAULT_INIT_SCENE_NAME};

use super::{FlowController, NodeState, SceneEntry};
use crate::services::Services;

pub struct FlowControllerOptions {
    pub project: Arc<CompiledProject>,
    pub services: Services,
    /// Defaults to [`DEFAULT_INIT_SCENE_NAME`].
    pub init_scene_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// Another node is executing; the scene starts when it clears.
    Queued,
    /// No tree defines the scene. The controller is left idle.
    Unresolved,
}

impl FlowController {
    pub fn new(options: FlowControllerOptions) -> Result<Self, DlgError> {
        let init_scene_name = options
            .init_scene_name
            .unwrap_or_else(|| DEFAULT_INIT_SCENE_NAME.to_string());
        if init_scene_name.trim().is_empty() {
            return Err(DlgError::new(
                "ENGINE_INIT_SCENE_NAME",
                "Init scene name must not be empty.",
            ));
        }

        log::info!(
            "flow controller ready: {} trees, {} scenes",
            options.project.trees.len(),
            options.project.scene_lookup.len()
        );
        Ok(Self {
            project: options.project,
            services: options.services,
            init_scene_name,
            current_tree: None,
            current_scene_name: None,
            current_node: None,
            is_running: false,
            is_skipping: false,
            is_jumping: false,
            after_init: None,
            queued_start: None,
            initialized_trees: BTreeSet::new(),
        })
    }

    /// Starts `scene` at its first node, or at `node_id` when given.
    ///
    /// While a node other than a jump is executing the request is queued and
    /// honored once the current scene runs out.
    pub fn start_scene(&mut self, scene: &str, node_id: Option<NodeId>) -> StartOutcome {
        if let Some(active) = &self.current_node {
            if active.kind != NodeKind::Jump && active.state != NodeState::Done {
                log::debug!("node {} still executing; queueing scene {}", active.id, scene);
                self.queued_start = Some(SceneEntry {
                    scene: scene.to_string(),
                    node_id,
                });
                return StartOutcome::Queued;
            }
        }
        self.is_running = true;
        self.enter_scene(scene, node_id)
    }

    pub(super) fn enter_scene(&mut self, scene: &str, node_id: Option<NodeId>) -> StartOutcome {
        let project = Arc::clone(&self.project);
        let Some(tree) = project.tree_for_scene(scene) else {
            log::warn!("scene \"{}\" is not defined in any script; stopping", scene);
            self.current_node = None;
            self.current_scene_name = None;
            return StartOutcome::Unresolved;
        };

        self.load_tree(tree);
        let target = node_id.or_else(|| tree.scene(scene).and_then(|found| found.min_id));

        if self.initialized_trees.insert(tree.name.clone()) {
            if let Some(init) = self.init_scene(tree) {
                log::debug!("running init scene of {}", tree.name);
                self.after_init = Some(SceneEntry {
                    scene: scene.to_string(),
                    node_id: target,
                });
                self.current_scene_name = Some(init.name.clone());
                self.advance(init.min_id);
                return StartOutcome::Started;
            }
        }

        log::debug!("entering scene {} of {}", scene, tree.name);
        self.current_scene_name = Some(scene.to_string());
        self.advance(target);
        StartOutcome::Started
    }

    fn load_tree(&mut self, tree: &Tree) {
        if self.current_tree.as_deref() != Some(tree.name.as_str()) {
            log::debug!("loading tree {}", tree.name);
            self.current_tree = Some(tree.name.clone());
        }
    }

    fn init_scene<'t>(&self, tree: &'t Tree) -> Option<&'t Scene> {
        tree.scenes.iter().find(|scene| {
            scene.name.eq_ignore_ascii_case(&self.init_scene_name) && !scene.is_empty()
        })
    }

    /// Leaves the running state. Pending work is fast-finished and the
    /// current node and any queued start are dropped.
    pub fn stop(&mut self) {
        self.is_running = false;
        if let Some(mut active) = self.current_node.take() {
            active.speed_up(&mut self.services);
        }
        self.after_init = None;
        self.queued_start = None;
        log::debug!("flow controller stopped");
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn is_skipping(&self) -> bool {
        self.is_skipping
    }

    pub fn is_jumping(&self) -> bool {
        self.is_jumping
    }

    pub fn current_tree(&self) -> Option<&str> {
        self.current_tree.as_deref()
    }

    pub fn current_scene(&self) -> Option<&str> {
        self.current_scene_name.as_deref()
    }

    pub fn current_node_id(&self) -> Option<NodeId> {
        self.current_node.as_ref().map(|active| active.id)
    }

    pub fn current_node_state(&self) -> Option<NodeState> {
        self.current_node.as_ref().map(|active| active.state)
    }

    pub fn project(&self) -> &CompiledProject {
        &self.project
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn services_mut(&mut self) -> &mut Services {
        &mut self.services
    }
}
