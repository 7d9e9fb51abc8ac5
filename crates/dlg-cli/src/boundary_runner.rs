use dlg_core::{DlgError, RuntimeEvent};
use dlg_runtime::ControllerStatus;

use crate::{json_line, BoundaryEvent, BoundaryResult, Session};

const MAX_SPEED_UPS: usize = 10_000;

/// Polls until the controller waits on the player or goes idle. Steps that
/// only wait on presentation are sped up.
pub(crate) fn run_to_boundary(session: &mut Session) -> Result<BoundaryResult, DlgError> {
    for _ in 0..MAX_SPEED_UPS {
        match session.controller.poll()? {
            ControllerStatus::Executing { .. } => session.controller.speed_up(),
            ControllerStatus::Idle => {
                return Ok(BoundaryResult {
                    event: BoundaryEvent::End,
                    events: take_flow_events(session),
                    choices: Vec::new(),
                    prompt_text: None,
                    input_default_text: None,
                })
            }
            ControllerStatus::AwaitingChoice { prompt, items, .. } => {
                return Ok(BoundaryResult {
                    event: BoundaryEvent::Choices,
                    events: take_flow_events(session),
                    choices: items,
                    prompt_text: prompt,
                    input_default_text: None,
                })
            }
            ControllerStatus::AwaitingInput {
                prompt,
                default_text,
                ..
            } => {
                return Ok(BoundaryResult {
                    event: BoundaryEvent::Input,
                    events: take_flow_events(session),
                    choices: Vec::new(),
                    prompt_text: Some(prompt),
                    input_default_text: Some(default_text),
                })
            }
        }
    }

    Err(DlgError::new(
        "CLI_BOUNDARY_GUARD",
        format!(
            "No boundary reached after {} speed-ups; a step never finishes.",
            MAX_SPEED_UPS
        ),
    ))
}

/// Boundary events are reported through the boundary itself.
fn take_flow_events(session: &Session) -> Vec<RuntimeEvent> {
    session
        .log
        .drain()
        .into_iter()
        .filter(|event| {
            matches!(
                event,
                RuntimeEvent::Dialogue { .. } | RuntimeEvent::Command { .. }
            )
        })
        .collect()
}

pub(crate) fn emit_boundary(boundary: BoundaryResult, state_out: Option<String>) {
    println!("RESULT:OK");
    match boundary.event {
        BoundaryEvent::Choices => println!("EVENT:CHOICES"),
        BoundaryEvent::Input => println!("EVENT:INPUT"),
        BoundaryEvent::End => println!("EVENT:END"),
    }

    for event in &boundary.events {
        match event {
            RuntimeEvent::Dialogue { .. } => println!("DIALOGUE_JSON:{}", json_line(event)),
            RuntimeEvent::Command { .. } => println!("COMMAND_JSON:{}", json_line(event)),
            _ => {}
        }
    }

    if let Some(prompt) = &boundary.prompt_text {
        println!("PROMPT_JSON:{}", json_line(prompt));
    }
    for item in &boundary.choices {
        println!("CHOICE:{}|{}", item.index, json_line(&item.text));
    }
    if let Some(default_text) = &boundary.input_default_text {
        println!("INPUT_DEFAULT_JSON:{}", json_line(default_text));
    }

    println!(
        "STATE_OUT:{}",
        state_out.unwrap_or_else(|| "NONE".to_string())
    );
}

#[cfg(test)]
mod boundary_runner_tests {
    use super::*;
    use crate::cli_test_support::*;
    use crate::{create_session, load_source_by_scripts_dir};
    use dlg_compiler::CompileOptions;

    #[test]
    fn run_to_boundary_stops_at_choices_with_dialogue_before_it() {
        let scenario = load_source_by_scripts_dir(
            &demo_scripts_dir("03-choice"),
            CompileOptions::default(),
        )
        .expect("scenario should load");
        let mut session = create_session(&scenario, None).expect("session should start");

        let boundary = run_to_boundary(&mut session).expect("boundary should be reached");
        assert_eq!(boundary.event, BoundaryEvent::Choices);
        assert_eq!(boundary.choices.len(), 2);
        assert!(boundary
            .events
            .iter()
            .all(|event| matches!(event, RuntimeEvent::Dialogue { .. })));
        assert!(!boundary.events.is_empty());
    }

    #[test]
    fn run_to_boundary_reports_end_and_commands() {
        let root = temp_path("boundary-end");
        write_file(
            &root.join("main.dlg"),
            "label main\nplay_sound(\"door\")\nnarrator \"Done\"\nend",
        );
        let scenario =
            load_source_by_scripts_dir(root.to_string_lossy().as_ref(), CompileOptions::default())
                .expect("scenario should load");
        let mut session = create_session(&scenario, None).expect("session should start");

        let boundary = run_to_boundary(&mut session).expect("boundary should be reached");
        assert_eq!(boundary.event, BoundaryEvent::End);
        assert_eq!(
            boundary.events,
            vec![
                RuntimeEvent::Command {
                    name: "play_sound".to_string(),
                    args: vec!["door".to_string()],
                },
                RuntimeEvent::Dialogue {
                    speaker: Some("narrator".to_string()),
                    text: "Done".to_string(),
                },
            ]
        );
        emit_boundary(boundary, None);
    }
}
