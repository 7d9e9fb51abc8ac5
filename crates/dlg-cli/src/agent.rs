use std::path::Path;

use dlg_core::DlgError;

use crate::{
    create_session, emit_boundary_with_saved_state, load_session_from_state_for_ref,
    load_source_by_args, run_to_boundary, AgentArgs, AgentCommand, ChooseArgs, InputArgs,
    Session, StartArgs,
};

pub(crate) fn run_agent(args: AgentArgs) -> Result<i32, DlgError> {
    match args.command {
        AgentCommand::Start(args) => run_start(args),
        AgentCommand::Choose(args) => run_choose(args),
        AgentCommand::Input(args) => run_input(args),
    }
}

pub(crate) fn run_start(args: StartArgs) -> Result<i32, DlgError> {
    let scenario = load_source_by_args(&args.source)?;
    let mut session = create_session(&scenario, args.entry_scene.as_deref())?;
    let boundary = run_to_boundary(&mut session)?;
    emit_boundary_with_saved_state(&session, boundary, &args.state_out, &scenario)
}

pub(crate) fn run_choose(args: ChooseArgs) -> Result<i32, DlgError> {
    run_state_transition(&args.state_in, &args.state_out, |session| {
        session.controller.choose(args.choice)
    })
}

pub(crate) fn run_input(args: InputArgs) -> Result<i32, DlgError> {
    run_state_transition(&args.state_in, &args.state_out, |session| {
        session.controller.submit_input(&args.text)
    })
}

fn run_state_transition(
    state_in: &str,
    state_out: &str,
    transition: impl FnOnce(&mut Session) -> Result<(), DlgError>,
) -> Result<i32, DlgError> {
    let (scenario, mut session, _) = load_session_from_state_for_ref(Path::new(state_in))?;
    transition(&mut session)?;
    let boundary = run_to_boundary(&mut session)?;
    emit_boundary_with_saved_state(&session, boundary, state_out, &scenario)
}
