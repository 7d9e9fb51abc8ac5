use crate::eval::render_text;

use super::{ExecContext, Progress};

#[derive(Debug, Default)]
pub(crate) struct InputExecutor {
    prompt: String,
    variable: String,
    default_text: String,
}

impl InputExecutor {
    /// The variable's current value is offered as the default answer.
    pub(crate) fn start(&mut self, ctx: ExecContext<'_>) -> Progress {
        self.prompt = render_text(ctx.node.field(0), &*ctx.services.variables);
        self.variable = ctx.node.field(1).to_string();
        self.default_text = ctx
            .services
            .variables
            .get(&self.variable)
            .map(|value| value.to_string())
            .unwrap_or_default();
        ctx.services
            .presenter
            .show_input(&self.prompt, &self.default_text);
        Progress::Wait
    }

    pub(crate) fn prompt(&self) -> &str {
        &self.prompt
    }

    pub(crate) fn variable(&self) -> &str {
        &self.variable
    }

    pub(crate) fn default_text(&self) -> &str {
        &self.default_text
    }
}
