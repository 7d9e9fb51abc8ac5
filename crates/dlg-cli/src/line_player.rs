use std::io::{self, BufRead, Write};
use std::path::Path;

use dlg_core::{DlgError, RuntimeEvent};

use crate::{
    create_session, load_session_from_state_for_scenario, map_play_io, run_to_boundary,
    save_session_state, BoundaryEvent, BoundaryResult, PlayCommandAction,
    PlayCommandContext, Session,
};

const HELP_LINE: &str = "commands: :help :save :load :restart :quit";

pub(crate) fn run_play_line_mode(
    context: &PlayCommandContext<'_>,
    session: &mut Session,
) -> Result<i32, DlgError> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut writer = io::stdout();
    run_play_line_mode_with_io(context, session, &mut reader, &mut writer)
}

pub(crate) fn run_play_line_mode_with_io(
    context: &PlayCommandContext<'_>,
    session: &mut Session,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<i32, DlgError> {
    writeln!(writer, "{}", context.scenario.title).map_err(map_play_io)?;
    writeln!(writer, "{}", HELP_LINE).map_err(map_play_io)?;

    let mut boundary = run_to_boundary(session)?;
    'boundaries: loop {
        write_boundary(&boundary, writer)?;
        if boundary.event == BoundaryEvent::End {
            return Ok(0);
        }

        loop {
            let Some(raw) = prompt_input_from("> ", reader, writer)? else {
                return Ok(0);
            };
            let mut emit = |line: String| {
                let _ = writeln!(writer, "{}", line);
            };
            match handle_play_command(raw.trim(), context, session, &mut emit)? {
                PlayCommandAction::Continue => continue,
                PlayCommandAction::RefreshBoundary => {
                    boundary = run_to_boundary(session)?;
                    continue 'boundaries;
                }
                PlayCommandAction::Quit => return Ok(0),
                PlayCommandAction::NotHandled => {}
            }

            let result = match boundary.event {
                BoundaryEvent::Choices => match raw.trim().parse::<usize>() {
                    Ok(index) => session.controller.choose(index),
                    Err(_) => Err(DlgError::new(
                        "CLI_CHOICE_PARSE",
                        format!("Invalid choice index: {}", raw),
                    )),
                },
                BoundaryEvent::Input => session.controller.submit_input(&raw),
                BoundaryEvent::End => Ok(()),
            };
            match result {
                Ok(()) => break,
                Err(error) => {
                    writeln!(writer, "{}", error.message).map_err(map_play_io)?;
                }
            }
        }
        boundary = run_to_boundary(session)?;
    }
}

fn write_boundary(boundary: &BoundaryResult, writer: &mut dyn Write) -> Result<(), DlgError> {
    for event in &boundary.events {
        let written = match event {
            RuntimeEvent::Dialogue {
                speaker: Some(speaker),
                text,
            } => writeln!(writer, "{}: {}", speaker, text),
            RuntimeEvent::Dialogue {
                speaker: None,
                text,
            } => writeln!(writer, "{}", text),
            RuntimeEvent::Command { name, args } => {
                writeln!(writer, "[{}({})]", name, args.join(", "))
            }
            _ => Ok(()),
        };
        written.map_err(map_play_io)?;
    }

    match boundary.event {
        BoundaryEvent::Choices => {
            if let Some(prompt) = &boundary.prompt_text {
                writeln!(writer, "{}", prompt).map_err(map_play_io)?;
            }
            for item in &boundary.choices {
                writeln!(writer, "  [{}] {}", item.index, item.text).map_err(map_play_io)?;
            }
        }
        BoundaryEvent::Input => {
            writeln!(
                writer,
                "{}",
                boundary.prompt_text.as_deref().unwrap_or_default()
            )
            .map_err(map_play_io)?;
            writeln!(
                writer,
                "(default: {})",
                boundary.input_default_text.as_deref().unwrap_or_default()
            )
            .map_err(map_play_io)?;
        }
        BoundaryEvent::End => writeln!(writer, "[END]").map_err(map_play_io)?,
    }
    Ok(())
}

pub(crate) fn handle_play_command(
    raw: &str,
    context: &PlayCommandContext<'_>,
    session: &mut Session,
    emit: &mut dyn FnMut(String),
) -> Result<PlayCommandAction, DlgError> {
    match raw {
        ":help" => {
            emit(HELP_LINE.to_string());
            Ok(PlayCommandAction::Continue)
        }
        ":save" => {
            save_session_state(Path::new(context.state_file), session, context.scenario)?;
            emit(format!("saved: {}", context.state_file));
            Ok(PlayCommandAction::Continue)
        }
        ":load" => {
            let (resumed, _) = load_session_from_state_for_scenario(
                Path::new(context.state_file),
                context.scenario,
            )?;
            *session = resumed;
            emit(format!("loaded: {}", context.state_file));
            Ok(PlayCommandAction::RefreshBoundary)
        }
        ":restart" => {
            *session = create_session(context.scenario, context.entry_scene)?;
            emit("restarted".to_string());
            Ok(PlayCommandAction::RefreshBoundary)
        }
        ":quit" => {
            emit("bye".to_string());
            Ok(PlayCommandAction::Quit)
        }
        _ => Ok(PlayCommandAction::NotHandled),
    }
}

/// `None` once the reader is exhausted.
pub(crate) fn prompt_input_from(
    prefix: &str,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<Option<String>, DlgError> {
    write!(writer, "{}", prefix).map_err(map_play_io)?;
    writer.flush().map_err(map_play_io)?;
    let mut input = String::new();
    if reader.read_line(&mut input).map_err(map_play_io)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(&['\r', '\n'][..]).to_string()))
}
