use std::path::Path;

use dlg_api::{
    create_controller, resume_controller, CreateControllerOptions, ResumeControllerOptions,
};
use dlg_compiler::CompileOptions;
use dlg_core::DlgError;
use dlg_runtime::{EventLog, Services};

use crate::{
    emit_boundary, load_player_state, load_source_by_ref, run_to_boundary, save_player_state,
    BoundaryEvent, BoundaryResult, LoadedScenario, PlayerState, Session, PLAYER_STATE_SCHEMA,
};

pub(crate) fn create_session(
    scenario: &LoadedScenario,
    entry_scene: Option<&str>,
) -> Result<Session, DlgError> {
    let log = EventLog::new();
    let controller = create_controller(CreateControllerOptions {
        sources: scenario.sources.clone(),
        entry_scene: entry_scene.map(str::to_string),
        compile: scenario.compile.clone(),
        services: Services::recording(&log),
    })?;
    Ok(Session { controller, log })
}

/// Resumes the saved node and runs back to the boundary it was saved at.
/// Anything re-presented on the way is discarded.
pub(crate) fn resume_session_for_state(
    scenario: &LoadedScenario,
    state: &PlayerState,
) -> Result<(Session, BoundaryResult), DlgError> {
    let log = EventLog::new();
    let controller = resume_controller(ResumeControllerOptions {
        sources: scenario.sources.clone(),
        snapshot: state.snapshot.clone(),
        compile: scenario.compile.clone(),
        services: Services::recording(&log),
    })?;
    let mut session = Session { controller, log };
    let boundary = run_to_boundary(&mut session)?;
    Ok((session, boundary))
}

pub(crate) fn save_session_state(
    path: &Path,
    session: &Session,
    scenario: &LoadedScenario,
) -> Result<(), DlgError> {
    let state = PlayerState {
        schema_version: PLAYER_STATE_SCHEMA.to_string(),
        scenario_id: scenario.id.clone(),
        strict: scenario.compile.strict,
        init_scene_name: scenario.compile.init_scene_name.clone(),
        snapshot: session.controller.snapshot()?,
    };
    save_player_state(path, &state)
}

fn compile_options_of(state: &PlayerState) -> CompileOptions {
    CompileOptions {
        strict: state.strict,
        init_scene_name: state.init_scene_name.clone(),
    }
}

pub(crate) fn load_session_from_state_for_ref(
    path: &Path,
) -> Result<(LoadedScenario, Session, BoundaryResult), DlgError> {
    let state = load_player_state(path)?;
    let scenario = load_source_by_ref(&state.scenario_id, compile_options_of(&state))?;
    let (session, boundary) = resume_session_for_state(&scenario, &state)?;
    Ok((scenario, session, boundary))
}

pub(crate) fn load_session_from_state_for_scenario(
    path: &Path,
    scenario: &LoadedScenario,
) -> Result<(Session, BoundaryResult), DlgError> {
    let state = load_player_state(path)?;
    if state.scenario_id != scenario.id {
        return Err(DlgError::new(
            "CLI_STATE_SCENARIO_MISMATCH",
            format!(
                "State scenario mismatch. expected={} actual={}",
                scenario.id, state.scenario_id
            ),
        ));
    }
    resume_session_for_state(scenario, &state)
}

/// Only choice and input boundaries are resumable; the end writes no state.
pub(crate) fn emit_boundary_with_saved_state(
    session: &Session,
    boundary: BoundaryResult,
    state_out: &str,
    scenario: &LoadedScenario,
) -> Result<i32, DlgError> {
    if matches!(
        boundary.event,
        BoundaryEvent::Choices | BoundaryEvent::Input
    ) {
        save_session_state(Path::new(state_out), session, scenario)?;
        emit_boundary(boundary, Some(state_out.to_string()));
        return Ok(0);
    }

    emit_boundary(boundary, None);
    Ok(0)
}
