use dlg_core::{ControllerSnapshot, DlgError};

use super::FlowController;

pub const SNAPSHOT_SCHEMA: &str = "controller-snapshot.v1";

impl FlowController {
    /// Captures the current position and variables. Only possible while a
    /// node is active outside of an init scene.
    pub fn snapshot(&self) -> Result<ControllerSnapshot, DlgError> {
        if self.after_init.is_some() {
            return Err(DlgError::new(
                "ENGINE_SNAPSHOT_INIT",
                "Cannot snapshot while an init scene is running.",
            ));
        }
        let (Some(tree), Some(scene), Some(active)) = (
            self.current_tree.as_ref(),
            self.current_scene_name.as_ref(),
            self.current_node.as_ref(),
        ) else {
            return Err(DlgError::new(
                "ENGINE_SNAPSHOT_IDLE",
                "No node is executing; nothing to snapshot.",
            ));
        };

        Ok(ControllerSnapshot {
            schema_version: SNAPSHOT_SCHEMA.to_string(),
            tree: tree.clone(),
            scene: scene.clone(),
            node_id: active.id,
            variables: self.services.variables.entries(),
            initialized_trees: self.initialized_trees.iter().cloned().collect(),
        })
    }

    /// Restores variables and restarts the saved node. Init scenes of the
    /// recorded trees are not run again.
    pub fn resume(&mut self, snapshot: &ControllerSnapshot) -> Result<(), DlgError> {
        if snapshot.schema_version != SNAPSHOT_SCHEMA {
            return Err(DlgError::new(
                "ENGINE_SNAPSHOT_SCHEMA",
                format!(
                    "Snapshot schema \"{}\" is not supported.",
                    snapshot.schema_version
                ),
            ));
        }
        let Some(tree) = self.project.tree(&snapshot.tree) else {
            return Err(DlgError::new(
                "ENGINE_SNAPSHOT_TREE",
                format!("Snapshot tree \"{}\" is not part of the project.", snapshot.tree),
            ));
        };
        if tree.node(snapshot.node_id).is_none() {
            return Err(DlgError::new(
                "ENGINE_SNAPSHOT_NODE",
                format!(
                    "Snapshot node {} does not exist in \"{}\".",
                    snapshot.node_id, snapshot.tree
                ),
            ));
        }

        for (name, value) in &snapshot.variables {
            self.services.variables.set(name, value.clone());
        }
        self.initialized_trees = snapshot.initialized_trees.iter().cloned().collect();
        self.initialized_trees.insert(snapshot.tree.clone());
        self.current_tree = Some(snapshot.tree.clone());
        self.current_scene_name = Some(snapshot.scene.clone());
        self.after_init = None;
        self.queued_start = None;
        self.is_running = true;
        log::debug!(
            "resuming {} at node {} of {}",
            snapshot.scene,
            snapshot.node_id,
            snapshot.tree
        );
        self.advance(Some(snapshot.node_id));
        Ok(())
    }
}
