use crate::eval::render_text;
use crate::services::Services;

use super::{ExecContext, Progress, Transition};

/// Escape that breaks dialogue text into separately presented segments.
const SEGMENT_BREAK: &str = "\\n";

#[derive(Debug, Default)]
pub(crate) struct DialogueExecutor {
    hurried: bool,
}

impl DialogueExecutor {
    pub(crate) fn start(&mut self, ctx: ExecContext<'_>) -> Progress {
        let speaker = Some(ctx.node.field(0)).filter(|speaker| !speaker.is_empty());
        let text = render_text(ctx.node.field(1), &*ctx.services.variables);
        let segments = text
            .split(SEGMENT_BREAK)
            .map(str::to_string)
            .collect::<Vec<_>>();
        ctx.services.presenter.show_dialogue(speaker, &segments);
        if ctx.skipping {
            self.speed_up(ctx.services);
        }
        self.poll(ctx)
    }

    pub(crate) fn poll(&mut self, ctx: ExecContext<'_>) -> Progress {
        if self.hurried || ctx.services.presenter.is_dialogue_complete() {
            Progress::Finished(Transition::Next(ctx.node.next_id))
        } else {
            Progress::Wait
        }
    }

    pub(crate) fn speed_up(&mut self, services: &mut Services) {
        if !self.hurried {
            services.presenter.finish_dialogue();
            self.hurried = true;
        }
    }
}
