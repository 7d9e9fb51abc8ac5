use std::collections::BTreeMap;
use std::path::Path;

use dlg_api::{create_controller, CreateControllerOptions};
use dlg_core::{DlgValue, RuntimeEvent};
use dlg_runtime::{ControllerStatus, EventLog, Services};

use crate::source::{read_scripts_from_dir, read_test_case};
use crate::{DlgToolError, TestAction, TestCase};

const MAX_POLLS: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub observed_events: Vec<RuntimeEvent>,
    pub consumed_actions: usize,
    pub polls: usize,
    pub variables: BTreeMap<String, DlgValue>,
}

/// Plays `case` against the scripts in `example_dir`, feeding its actions
/// at each choice or input and recording everything presented.
pub fn run_case(example_dir: &Path, case: &TestCase) -> Result<RunReport, DlgToolError> {
    let sources = read_scripts_from_dir(example_dir)?;
    let log = EventLog::new();
    let mut controller = create_controller(CreateControllerOptions {
        sources,
        entry_scene: case.entry_scene.clone(),
        compile: case.compile.clone(),
        services: Services::recording(&log),
    })?;

    let mut observed_events = Vec::new();
    let mut action_index = 0usize;

    for poll in 1..=MAX_POLLS {
        let status = controller.poll()?;
        observed_events.extend(log.drain());
        let event_index = observed_events.len().saturating_sub(1);

        match status {
            ControllerStatus::Executing { .. } => controller.speed_up(),
            ControllerStatus::AwaitingChoice { .. } => {
                match next_action(case, action_index, event_index, "choose")? {
                    TestAction::Choose { index } => controller.choose(*index)?,
                    other => return Err(kind_mismatch(event_index, "choose", other)),
                }
                action_index += 1;
            }
            ControllerStatus::AwaitingInput { .. } => {
                match next_action(case, action_index, event_index, "input")? {
                    TestAction::Input { text } => controller.submit_input(text)?,
                    other => return Err(kind_mismatch(event_index, "input", other)),
                }
                action_index += 1;
            }
            ControllerStatus::Idle => {
                observed_events.push(RuntimeEvent::End);
                if action_index != case.actions.len() {
                    return Err(DlgToolError::UnusedActions {
                        used: action_index,
                        total: case.actions.len(),
                    });
                }
                log::debug!(
                    "case finished after {} polls with {} events",
                    poll,
                    observed_events.len()
                );
                return Ok(RunReport {
                    observed_events,
                    consumed_actions: action_index,
                    polls: poll,
                    variables: controller.services().variables.entries(),
                });
            }
        }
    }

    Err(DlgToolError::GuardExceeded {
        max_polls: MAX_POLLS,
    })
}

fn next_action<'a>(
    case: &'a TestCase,
    action_index: usize,
    event_index: usize,
    expected: &str,
) -> Result<&'a TestAction, DlgToolError> {
    case.actions
        .get(action_index)
        .ok_or_else(|| DlgToolError::MissingAction {
            event_index,
            expected_action_kind: expected.to_string(),
        })
}

fn kind_mismatch(event_index: usize, expected: &str, actual: &TestAction) -> DlgToolError {
    DlgToolError::ActionKindMismatch {
        event_index,
        expected_action_kind: expected.to_string(),
        actual_action_kind: actual.kind_name().to_string(),
    }
}

pub fn assert_case(example_dir: &Path, case_path: &Path) -> Result<(), DlgToolError> {
    let case = read_test_case(case_path)?;
    let report = run_case(example_dir, &case)?;

    if report.observed_events.len() != case.expected_events.len() {
        let observed = serde_json::to_string_pretty(&report.observed_events)
            .map_err(DlgToolError::Serialize)?;
        return Err(DlgToolError::EventCountMismatch {
            expected: case.expected_events.len(),
            actual: report.observed_events.len(),
            observed,
        });
    }

    for (index, (expected, actual)) in case
        .expected_events
        .iter()
        .zip(report.observed_events.iter())
        .enumerate()
    {
        if expected != actual {
            let expected = serde_json::to_string(expected).map_err(DlgToolError::Serialize)?;
            let actual = serde_json::to_string(actual).map_err(DlgToolError::Serialize)?;
            return Err(DlgToolError::EventMismatch {
                index,
                expected,
                actual,
            });
        }
    }

    for (name, expected) in &case.expected_variables {
        let actual = report.variables.get(name);
        if actual != Some(expected) {
            return Err(DlgToolError::VariableMismatch {
                name: name.clone(),
                expected: serde_json::to_string(expected).map_err(DlgToolError::Serialize)?,
                actual: serde_json::to_string(&actual).map_err(DlgToolError::Serialize)?,
            });
        }
    }

    Ok(())
}
