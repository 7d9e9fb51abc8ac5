use std::ffi::OsString;

use clap::Parser;
use dlg_core::DlgError;

mod agent;
mod boundary_runner;
mod cli_args;
mod compile_ops;
mod error_map;
mod line_player;
mod models;
mod session_ops;
mod source_loader;
mod state_store;

pub(crate) use boundary_runner::{emit_boundary, run_to_boundary};
pub(crate) use cli_args::{
    AgentArgs, AgentCommand, CheckArgs, ChooseArgs, Cli, CompileArgs, InputArgs, Mode, PlayArgs,
    SourceArgs, StartArgs,
};
pub(crate) use error_map::{
    emit_error, json_line, map_cli_output_encode, map_cli_output_write, map_cli_source_path,
    map_cli_source_read, map_cli_source_scan, map_cli_state_invalid, map_cli_state_read,
    map_cli_state_write, map_play_io,
};
pub(crate) use line_player::run_play_line_mode;
pub(crate) use models::{
    BoundaryEvent, BoundaryResult, LoadedScenario, PlayCommandAction, PlayCommandContext,
    PlayerState, Session, PLAYER_STATE_SCHEMA,
};
pub(crate) use session_ops::{
    create_session, emit_boundary_with_saved_state, load_session_from_state_for_ref,
    load_session_from_state_for_scenario, save_session_state,
};
pub(crate) use source_loader::{load_source_by_args, load_source_by_ref};
#[cfg(test)]
pub(crate) use source_loader::load_source_by_scripts_dir;
pub(crate) use state_store::{load_player_state, save_player_state};

const DEFAULT_LOG_FILTER: &str = "warn";
const DEFAULT_STATE_FILE: &str = ".dlg/save.json";

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    init_logging(cli.log_level.as_deref());
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

/// `RUST_LOG` wins over the default filter; `--log-level` wins over both.
fn init_logging(level: Option<&str>) {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(DEFAULT_LOG_FILTER),
    );
    if let Some(level) = level {
        builder.parse_filters(level);
    }
    builder.target(env_logger::Target::Stderr);
    if builder.try_init().is_err() {
        log::debug!("logger already installed");
    }
}

fn run(cli: Cli) -> Result<i32, DlgError> {
    match cli.command {
        Mode::Compile(args) => compile_ops::run_compile(args),
        Mode::Check(args) => compile_ops::run_check(args),
        Mode::Play(args) => run_play(args),
        Mode::Agent(args) => agent::run_agent(args),
    }
}

fn run_play(args: PlayArgs) -> Result<i32, DlgError> {
    let state_file = args
        .state_file
        .unwrap_or_else(|| DEFAULT_STATE_FILE.to_string());
    let scenario = load_source_by_args(&args.source)?;
    let mut session = create_session(&scenario, args.entry_scene.as_deref())?;
    let context = PlayCommandContext {
        state_file: &state_file,
        scenario: &scenario,
        entry_scene: args.entry_scene.as_deref(),
    };
    run_play_line_mode(&context, &mut session)
}

#[cfg(test)]
mod cli_test_support;
