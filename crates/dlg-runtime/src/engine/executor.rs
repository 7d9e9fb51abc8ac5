mod choice;
mod command;
mod dialogue;
mod input;

use dlg_core::{IndexedNode, NodeId, NodeKind, Tree};

use crate::eval::{evaluate, evaluate_assignment, is_truthy};
use crate::services::Services;

pub(crate) use choice::ChoiceExecutor;
pub(crate) use command::CommandExecutor;
pub(crate) use dialogue::DialogueExecutor;
pub(crate) use input::InputExecutor;

/// Lifecycle of the node the controller is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Pending,
    AwaitingExternal,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Transition {
    Next(Option<NodeId>),
    Jump(String),
}

pub(crate) enum Progress {
    Wait,
    Finished(Transition),
}

pub(crate) struct ExecContext<'a> {
    pub(crate) tree: &'a Tree,
    pub(crate) node: &'a IndexedNode,
    pub(crate) services: &'a mut Services,
    pub(crate) skipping: bool,
}

enum Executor {
    Dialogue(DialogueExecutor),
    Command(CommandExecutor),
    Choice(ChoiceExecutor),
    Input(InputExecutor),
    Condition,
    Assignment,
    Jump,
    Branch,
}

fn executor_for(kind: NodeKind) -> Executor {
    match kind {
        NodeKind::Dialogue => Executor::Dialogue(DialogueExecutor::default()),
        NodeKind::Command => Executor::Command(CommandExecutor::default()),
        NodeKind::Choice => Executor::Choice(ChoiceExecutor::default()),
        NodeKind::Input => Executor::Input(InputExecutor::default()),
        NodeKind::Condition => Executor::Condition,
        NodeKind::Assignment => Executor::Assignment,
        NodeKind::Jump => Executor::Jump,
        NodeKind::ChoiceBranch | NodeKind::ConditionBranch => Executor::Branch,
    }
}

pub(crate) struct ActiveNode {
    pub(crate) id: NodeId,
    pub(crate) kind: NodeKind,
    pub(crate) state: NodeState,
    executor: Executor,
}

impl ActiveNode {
    pub(crate) fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            state: NodeState::Pending,
            executor: executor_for(kind),
        }
    }

    pub(crate) fn step(&mut self, ctx: ExecContext<'_>) -> Progress {
        let progress = match self.state {
            NodeState::Pending => self.start(ctx),
            NodeState::AwaitingExternal => self.resume(ctx),
            NodeState::Done => return Progress::Wait,
        };
        self.state = match progress {
            Progress::Wait => NodeState::AwaitingExternal,
            Progress::Finished(_) => NodeState::Done,
        };
        progress
    }

    fn start(&mut self, ctx: ExecContext<'_>) -> Progress {
        log::trace!("start {} node {}", self.kind.name(), self.id);
        match &mut self.executor {
            Executor::Dialogue(executor) => executor.start(ctx),
            Executor::Command(executor) => executor.start(ctx),
            Executor::Choice(executor) => executor.start(ctx),
            Executor::Input(executor) => executor.start(ctx),
            Executor::Condition => Progress::Finished(Transition::Next(select_branch(&ctx))),
            Executor::Assignment => {
                let (variable, operator, expr) =
                    (ctx.node.field(0), ctx.node.field(1), ctx.node.field(2));
                let value = evaluate_assignment(&*ctx.services.variables, variable, operator, expr);
                ctx.services.variables.set(variable, value);
                Progress::Finished(Transition::Next(ctx.node.next_id))
            }
            Executor::Jump => Progress::Finished(Transition::Jump(ctx.node.field(0).to_string())),
            Executor::Branch => Progress::Finished(Transition::Next(branch_entry(ctx.node))),
        }
    }

    /// Choices and input are resolved by the controller, not by polling.
    fn resume(&mut self, ctx: ExecContext<'_>) -> Progress {
        match &mut self.executor {
            Executor::Dialogue(executor) => executor.poll(ctx),
            Executor::Command(executor) => executor.poll(ctx),
            _ => Progress::Wait,
        }
    }

    pub(crate) fn speed_up(&mut self, services: &mut Services) {
        match &mut self.executor {
            Executor::Dialogue(executor) => executor.speed_up(services),
            Executor::Command(executor) => executor.skip_all(),
            _ => {}
        }
    }

    pub(crate) fn choice(&self) -> Option<&ChoiceExecutor> {
        match &self.executor {
            Executor::Choice(executor) => Some(executor),
            _ => None,
        }
    }

    pub(crate) fn input(&self) -> Option<&InputExecutor> {
        match &self.executor {
            Executor::Input(executor) => Some(executor),
            _ => None,
        }
    }
}

/// First child of a branch, or the branch's exit when its body is empty.
pub(crate) fn branch_entry(branch: &IndexedNode) -> Option<NodeId> {
    branch.children.first().copied().or(branch.next_id)
}

fn select_branch(ctx: &ExecContext<'_>) -> Option<NodeId> {
    for branch_id in &ctx.node.children {
        let Some(branch) = ctx.tree.node(*branch_id) else {
            continue;
        };
        let taken = branch.field(0) == "else"
            || is_truthy(&evaluate(branch.field(1), &*ctx.services.variables));
        if taken {
            log::debug!("condition {} takes branch {}", ctx.node.id, branch.id);
            return branch_entry(branch);
        }
    }
    ctx.node.next_id
}
