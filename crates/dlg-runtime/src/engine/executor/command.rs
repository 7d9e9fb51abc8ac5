use std::sync::OnceLock;

use dlg_core::strip_quotes;
use regex::Regex;

use crate::eval::render_text;
use crate::services::CommandHandle;

use super::{ExecContext, Progress, Transition};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CommandCall {
    pub(crate) name: String,
    pub(crate) args: Vec<String>,
    pub(crate) awaited: bool,
}

fn call_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"(?i)(wait\s+)?([A-Za-z_][A-Za-z0-9_.]*)\s*\(((?:"[^"]*"|[^")])*)\)"#)
            .expect("command call regex must compile")
    })
}

/// Splits `wait fade(1) ; shake("big, slow")` into its calls. Argument text
/// is kept raw; substitution happens at dispatch.
pub(crate) fn parse_command_calls(text: &str) -> Vec<CommandCall> {
    call_regex()
        .captures_iter(text)
        .map(|captures| CommandCall {
            name: captures[2].to_string(),
            args: split_arguments(&captures[3]),
            awaited: captures.get(1).is_some(),
        })
        .collect()
}

fn split_arguments(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for ch in text.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                current.push(ch);
            }
            ',' if !quoted => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    args.push(current.trim().to_string());
    args
}

struct RunningCommand {
    name: String,
    awaited: bool,
    handle: Box<dyn CommandHandle>,
}

impl RunningCommand {
    fn holds_node(&self) -> bool {
        self.awaited || self.handle.is_blocking()
    }
}

/// Dispatches every call of the line together and waits for the awaited and
/// blocking ones.
#[derive(Default)]
pub(crate) struct CommandExecutor {
    running: Vec<RunningCommand>,
}

impl CommandExecutor {
    pub(crate) fn start(&mut self, ctx: ExecContext<'_>) -> Progress {
        for call in parse_command_calls(ctx.node.field(0)) {
            let args = call
                .args
                .iter()
                .map(|arg| strip_quotes(&render_text(arg, &*ctx.services.variables)).to_string())
                .collect::<Vec<_>>();
            log::debug!("command {}({})", call.name, args.join(", "));
            match ctx.services.commands.execute(&call.name, &args) {
                Ok(handle) => self.running.push(RunningCommand {
                    name: call.name,
                    awaited: call.awaited,
                    handle,
                }),
                Err(error) => log::warn!("command {} failed: {}", call.name, error),
            }
        }
        if ctx.skipping {
            self.skip_all();
        }
        self.poll(ctx)
    }

    pub(crate) fn poll(&mut self, ctx: ExecContext<'_>) -> Progress {
        let waiting = self
            .running
            .iter()
            .any(|command| command.holds_node() && !command.handle.is_completed());
        if waiting {
            Progress::Wait
        } else {
            Progress::Finished(Transition::Next(ctx.node.next_id))
        }
    }

    /// Fast-finishes every command that is still running.
    pub(crate) fn skip_all(&mut self) {
        for command in &mut self.running {
            if !command.handle.is_completed() {
                log::debug!("skipping command {}", command.name);
                command.handle.skip();
            }
        }
    }
}
