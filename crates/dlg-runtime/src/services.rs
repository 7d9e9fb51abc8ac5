use std::cell::RefCell;
use std::rc::Rc;

use dlg_core::{ChoiceItem, DlgError, RuntimeEvent};

use crate::store::{MemoryVariableStore, VariableStore};

/// Host-side display surface.
///
/// Choices and input are resolved later through
/// [`FlowController::choose`](crate::FlowController::choose) and
/// [`FlowController::submit_input`](crate::FlowController::submit_input).
pub trait Presenter {
    fn show_dialogue(&mut self, speaker: Option<&str>, segments: &[String]);

    /// Polled while a dialogue node waits for its text to finish displaying.
    fn is_dialogue_complete(&self) -> bool {
        true
    }

    /// Show the rest of the current text at once.
    fn finish_dialogue(&mut self) {}

    fn show_choices(&mut self, prompt: Option<&str>, items: &[ChoiceItem]);
    fn show_input(&mut self, prompt: &str, default_text: &str);
}

/// A running command. `skip` asks it to jump to its end state.
pub trait CommandHandle {
    fn is_completed(&self) -> bool;

    /// Blocking commands hold their node even without `wait`.
    fn is_blocking(&self) -> bool {
        false
    }

    fn skip(&mut self);
}

pub trait CommandRegistry {
    fn execute(&mut self, name: &str, args: &[String]) -> Result<Box<dyn CommandHandle>, DlgError>;
}

/// Handle for commands that finish as soon as they are dispatched.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompletedCommand;

impl CommandHandle for CompletedCommand {
    fn is_completed(&self) -> bool {
        true
    }

    fn skip(&mut self) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullCommandRegistry;

impl CommandRegistry for NullCommandRegistry {
    fn execute(
        &mut self,
        name: &str,
        _args: &[String],
    ) -> Result<Box<dyn CommandHandle>, DlgError> {
        log::debug!("command {} ignored", name);
        Ok(Box::new(CompletedCommand))
    }
}

/// Shared, ordered record of what the runtime presented.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<RuntimeEvent>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: RuntimeEvent) {
        self.0.borrow_mut().push(event);
    }

    /// Removes and returns everything recorded so far.
    pub fn drain(&self) -> Vec<RuntimeEvent> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn events(&self) -> Vec<RuntimeEvent> {
        self.0.borrow().clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    log: EventLog,
}

impl RecordingPresenter {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

impl Presenter for RecordingPresenter {
    fn show_dialogue(&mut self, speaker: Option<&str>, segments: &[String]) {
        self.log.push(RuntimeEvent::Dialogue {
            speaker: speaker.map(str::to_string),
            text: segments.join("\n"),
        });
    }

    fn show_choices(&mut self, prompt: Option<&str>, items: &[ChoiceItem]) {
        self.log.push(RuntimeEvent::Choices {
            prompt_text: prompt.map(str::to_string),
            items: items.to_vec(),
        });
    }

    fn show_input(&mut self, prompt: &str, default_text: &str) {
        self.log.push(RuntimeEvent::Input {
            prompt_text: prompt.to_string(),
            default_text: default_text.to_string(),
        });
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingCommandRegistry {
    log: EventLog,
}

impl RecordingCommandRegistry {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

impl CommandRegistry for RecordingCommandRegistry {
    fn execute(&mut self, name: &str, args: &[String]) -> Result<Box<dyn CommandHandle>, DlgError> {
        self.log.push(RuntimeEvent::Command {
            name: name.to_string(),
            args: args.to_vec(),
        });
        Ok(Box::new(CompletedCommand))
    }
}

/// Everything the controller talks to outside the compiled project.
pub struct Services {
    pub presenter: Box<dyn Presenter>,
    pub commands: Box<dyn CommandRegistry>,
    pub variables: Box<dyn VariableStore>,
}

impl Services {
    /// Recording presenter and commands over a fresh memory store.
    pub fn recording(log: &EventLog) -> Self {
        Self::recording_with_store(log, MemoryVariableStore::new())
    }

    pub fn recording_with_store(log: &EventLog, store: MemoryVariableStore) -> Self {
        Self {
            presenter: Box::new(RecordingPresenter::new(log.clone())),
            commands: Box::new(RecordingCommandRegistry::new(log.clone())),
            variables: Box::new(store),
        }
    }
}
