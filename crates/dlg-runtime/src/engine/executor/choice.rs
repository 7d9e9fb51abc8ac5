use dlg_core::{Choice, ChoiceItem, SourceRange};

use crate::eval::render_text;

use super::{branch_entry, ExecContext, Progress, Transition};

#[derive(Debug, Default)]
pub(crate) struct ChoiceExecutor {
    prompt: Option<String>,
    choices: Vec<Choice>,
}

impl ChoiceExecutor {
    /// Option texts are rendered now, so they reflect current variables.
    pub(crate) fn start(&mut self, ctx: ExecContext<'_>) -> Progress {
        let variables = &*ctx.services.variables;
        self.prompt =
            Some(render_text(ctx.node.field(0), variables)).filter(|prompt| !prompt.is_empty());
        self.choices = ctx
            .node
            .children
            .iter()
            .filter_map(|id| ctx.tree.node(*id))
            .enumerate()
            .map(|(index, branch)| Choice {
                index,
                text: render_text(branch.field(0), variables),
                branch_id: branch.id,
                target_id: branch_entry(branch),
                source: SourceRange {
                    file: ctx.tree.name.clone(),
                    start_line: branch.span.start_line,
                    end_line: branch.span.end_line,
                },
            })
            .collect();

        if self.choices.is_empty() {
            log::warn!("choice node {} has no options; continuing", ctx.node.id);
            return Progress::Finished(Transition::Next(ctx.node.next_id));
        }

        let items = self.items();
        ctx.services
            .presenter
            .show_choices(self.prompt.as_deref(), &items);
        Progress::Wait
    }

    pub(crate) fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub(crate) fn choices(&self) -> &[Choice] {
        &self.choices
    }

    pub(crate) fn items(&self) -> Vec<ChoiceItem> {
        self.choices.iter().map(ChoiceItem::from).collect()
    }
}
