mod engine;
pub mod eval;
pub mod services;
pub mod store;

pub use engine::{
    ControllerStatus, FlowController, FlowControllerOptions, NodeState, StartOutcome,
    MAX_STEPS_PER_POLL, SNAPSHOT_SCHEMA,
};
pub use eval::{calculate, evaluate, evaluate_assignment, is_truthy, render_text};
pub use services::{
    CommandHandle, CommandRegistry, CompletedCommand, EventLog, NullCommandRegistry, Presenter,
    RecordingCommandRegistry, RecordingPresenter, Services,
};
pub use store::{MemoryVariableStore, VariableStore};
