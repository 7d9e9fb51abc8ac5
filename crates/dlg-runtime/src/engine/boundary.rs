use dlg_core::{Choice, DlgError, DlgValue, NodeId};

use super::executor::ActiveNode;
use super::{FlowController, NodeState};

impl FlowController {
    fn waiting_node(&self) -> Option<&ActiveNode> {
        self.current_node
            .as_ref()
            .filter(|active| active.state == NodeState::AwaitingExternal)
    }

    /// Options of the choice the controller is waiting on.
    pub fn pending_choices(&self) -> Option<&[Choice]> {
        self.waiting_node()
            .and_then(ActiveNode::choice)
            .map(|choice| choice.choices())
    }

    pub fn choose(&mut self, index: usize) -> Result<(), DlgError> {
        let Some(choices) = self.pending_choices() else {
            return Err(DlgError::new(
                "ENGINE_NO_PENDING_CHOICE",
                "No pending choice is available.",
            ));
        };
        let Some(selected) = choices.get(index) else {
            return Err(DlgError::new(
                "ENGINE_CHOICE_INDEX",
                format!("Choice index \"{}\" is out of range.", index),
            ));
        };

        log::debug!("chose option {} \"{}\"", index, selected.text);
        let target = selected.target_id;
        self.advance(target);
        Ok(())
    }

    /// Stores `text` as a string in the input's variable. Blank text keeps
    /// the offered default.
    pub fn submit_input(&mut self, text: &str) -> Result<(), DlgError> {
        let Some(active) = self.waiting_node() else {
            return Err(no_pending_input());
        };
        let Some(input) = active.input() else {
            return Err(no_pending_input());
        };

        let value = if text.trim().is_empty() {
            input.default_text().to_string()
        } else {
            text.to_string()
        };
        let variable = input.variable().to_string();
        let next_id = self.next_of(active.id);

        self.services
            .variables
            .set(&variable, DlgValue::String(value));
        self.advance(next_id);
        Ok(())
    }

    fn next_of(&self, id: NodeId) -> Option<NodeId> {
        self.current_tree
            .as_deref()
            .and_then(|tree_name| self.project.tree(tree_name))
            .and_then(|tree| tree.node(id))
            .and_then(|node| node.next_id)
    }
}

fn no_pending_input() -> DlgError {
    DlgError::new("ENGINE_NO_PENDING_INPUT", "No pending input is available.")
}
