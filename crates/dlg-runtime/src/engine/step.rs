use std::sync::Arc;

use dlg_core::{ChoiceItem, DlgError, NodeId, NodeKind};

use super::executor::{ActiveNode, ExecContext, Progress, Transition};
use super::{FlowController, NodeState, MAX_STEPS_PER_POLL};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerStatus {
    Idle,
    Executing {
        node_id: NodeId,
        kind: NodeKind,
    },
    AwaitingChoice {
        node_id: NodeId,
        prompt: Option<String>,
        items: Vec<ChoiceItem>,
    },
    AwaitingInput {
        node_id: NodeId,
        prompt: String,
        default_text: String,
    },
}

impl FlowController {
    /// Runs nodes until one has to wait or the scene ends.
    pub fn poll(&mut self) -> Result<ControllerStatus, DlgError> {
        if !self.is_running {
            return Ok(self.status());
        }

        let project = Arc::clone(&self.project);
        for _ in 0..MAX_STEPS_PER_POLL {
            let Some(tree_name) = self.current_tree.as_deref() else {
                return Ok(self.status());
            };
            let tree = project.tree(tree_name).ok_or_else(|| {
                DlgError::new(
                    "ENGINE_TREE_NOT_FOUND",
                    format!("Tree \"{}\" is not part of the project.", tree_name),
                )
            })?;
            let Some(active) = self.current_node.as_mut() else {
                return Ok(ControllerStatus::Idle);
            };
            let Some(node) = tree.node(active.id) else {
                let missing = active.id;
                self.advance(Some(missing));
                continue;
            };

            if self.is_skipping && active.state == NodeState::AwaitingExternal {
                active.speed_up(&mut self.services);
            }
            let progress = active.step(ExecContext {
                tree,
                node,
                services: &mut self.services,
                skipping: self.is_skipping,
            });
            match progress {
                Progress::Wait => return Ok(self.status()),
                Progress::Finished(transition) => self.apply_transition(transition),
            }
        }

        Err(DlgError::new(
            "ENGINE_GUARD_EXCEEDED",
            format!(
                "Flow controller exceeded {} steps in one poll; the script is probably looping.",
                MAX_STEPS_PER_POLL
            ),
        ))
    }

    fn apply_transition(&mut self, transition: Transition) {
        match transition {
            Transition::Next(next_id) => self.advance(next_id),
            Transition::Jump(scene) => {
                log::debug!("jump to scene {}", scene);
                self.is_jumping = true;
                self.start_scene(&scene, None);
                self.is_jumping = false;
            }
        }
    }

    /// Makes `next_id` the current node. An end-of-scene marker or an id the
    /// tree does not know ends the scene.
    pub fn advance(&mut self, next_id: Option<NodeId>) {
        let next = next_id.and_then(|id| {
            self.current_tree
                .as_deref()
                .and_then(|tree_name| self.project.tree(tree_name))
                .and_then(|tree| tree.node(id))
                .map(|node| (node.id, node.kind))
        });

        match next {
            Some((id, kind)) => {
                log::trace!("advance to {} node {}", kind.name(), id);
                self.current_node = Some(ActiveNode::new(id, kind));
            }
            None => {
                if let Some(id) = next_id {
                    log::warn!("node {} not found; ending scene", id);
                }
                self.current_node = None;
                self.finish_scene();
            }
        }
    }

    fn finish_scene(&mut self) {
        if let Some(entry) = self.after_init.take() {
            log::debug!("init scene finished; entering {}", entry.scene);
            self.current_scene_name = Some(entry.scene);
            self.advance(entry.node_id);
            return;
        }

        log::debug!("scene {:?} finished", self.current_scene_name);
        if let Some(entry) = self.queued_start.take() {
            self.enter_scene(&entry.scene, entry.node_id);
        }
    }

    /// Asks the current step to finish immediately. Dialogue shows its full
    /// text, commands fast-forward; choices and input keep waiting.
    pub fn speed_up(&mut self) {
        if let Some(active) = self.current_node.as_mut() {
            active.speed_up(&mut self.services);
        }
    }

    /// While skipping, every poll speeds up the current step.
    pub fn set_skipping(&mut self, skipping: bool) {
        self.is_skipping = skipping;
    }

    pub fn status(&self) -> ControllerStatus {
        let Some(active) = &self.current_node else {
            return ControllerStatus::Idle;
        };
        if active.state == NodeState::AwaitingExternal {
            if let Some(choice) = active.choice() {
                return ControllerStatus::AwaitingChoice {
                    node_id: active.id,
                    prompt: choice.prompt().map(str::to_string),
                    items: choice.items(),
                };
            }
            if let Some(input) = active.input() {
                return ControllerStatus::AwaitingInput {
                    node_id: active.id,
                    prompt: input.prompt().to_string(),
                    default_text: input.default_text().to_string(),
                };
            }
        }
        ControllerStatus::Executing {
            node_id: active.id,
            kind: active.kind,
        }
    }
}
