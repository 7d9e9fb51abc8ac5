use std::collections::BTreeMap;
use std::sync::Arc;

use dlg_compiler::CompileOptions;
use dlg_core::{CompiledProject, ControllerSnapshot, Diagnostic, DlgError};
use dlg_runtime::{FlowController, FlowControllerOptions, Services};

pub const DEFAULT_ENTRY_SCENE: &str = "main";

#[derive(Debug, Clone)]
pub struct CompileProjectResult {
    pub project: CompiledProject,
    pub entry_scene: String,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct CreateControllerOptions {
    pub sources: BTreeMap<String, String>,
    pub entry_scene: Option<String>,
    pub compile: CompileOptions,
    pub services: Services,
}

pub struct ResumeControllerOptions {
    pub sources: BTreeMap<String, String>,
    pub snapshot: ControllerSnapshot,
    pub compile: CompileOptions,
    pub services: Services,
}

pub fn compile_project_from_source_map(
    sources: &BTreeMap<String, String>,
    entry_scene: Option<String>,
    options: &CompileOptions,
) -> Result<CompileProjectResult, DlgError> {
    let compiled = dlg_compiler::compile_project_from_source_map(sources, options)?;
    let entry_scene = resolve_entry_scene(&compiled.project, entry_scene)?;

    Ok(CompileProjectResult {
        project: compiled.project,
        entry_scene,
        diagnostics: compiled.diagnostics,
    })
}

/// Compiles `sources` and starts the entry scene. The returned controller
/// is running; call `poll` to execute it.
pub fn create_controller(options: CreateControllerOptions) -> Result<FlowController, DlgError> {
    let compiled =
        compile_project_from_source_map(&options.sources, options.entry_scene, &options.compile)?;

    let mut controller = FlowController::new(FlowControllerOptions {
        project: Arc::new(compiled.project),
        services: options.services,
        init_scene_name: Some(options.compile.init_scene_name),
    })?;

    log::debug!("starting entry scene {}", compiled.entry_scene);
    controller.start_scene(&compiled.entry_scene, None);
    Ok(controller)
}

pub fn resume_controller(options: ResumeControllerOptions) -> Result<FlowController, DlgError> {
    let compiled =
        dlg_compiler::compile_project_from_source_map(&options.sources, &options.compile)?;

    let mut controller = FlowController::new(FlowControllerOptions {
        project: Arc::new(compiled.project),
        services: options.services,
        init_scene_name: Some(options.compile.init_scene_name),
    })?;

    controller.resume(&options.snapshot)?;
    Ok(controller)
}

fn resolve_entry_scene(
    project: &CompiledProject,
    explicit: Option<String>,
) -> Result<String, DlgError> {
    if let Some(entry) = explicit {
        if !project.scene_lookup.contains_key(&entry) {
            return Err(DlgError::new(
                "API_ENTRY_SCENE_NOT_FOUND",
                format!("Entry scene \"{}\" is not defined.", entry),
            ));
        }
        return Ok(entry);
    }

    if project.scene_lookup.contains_key(DEFAULT_ENTRY_SCENE) {
        return Ok(DEFAULT_ENTRY_SCENE.to_string());
    }

    Err(DlgError::new(
        "API_ENTRY_MAIN_NOT_FOUND",
        format!(
            "Expected a scene named \"{}\" as default entry.",
            DEFAULT_ENTRY_SCENE
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlg_core::RuntimeEvent;
    use dlg_runtime::{ControllerStatus, EventLog};

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn scripts() -> BTreeMap<String, String> {
        map(&[
            (
                "main.dlg",
                "label main\n\"Hello\"\nchoice {\n - on\n   jump side\n}\nend",
            ),
            ("side.dlg", "label side\nnarrator \"Side\"\nend"),
        ])
    }

    #[test]
    fn compile_uses_default_main_entry() {
        let project = compile_project_from_source_map(&scripts(), None, &CompileOptions::default())
            .expect("compile should pass");
        assert_eq!(project.entry_scene, "main");
        assert!(project.project.trees.contains_key("side"));
        assert!(project.diagnostics.is_empty());
    }

    #[test]
    fn compile_accepts_explicit_entry() {
        let project = compile_project_from_source_map(
            &scripts(),
            Some("side".to_string()),
            &CompileOptions::default(),
        )
        .expect("compile should pass");
        assert_eq!(project.entry_scene, "side");
    }

    #[test]
    fn compile_rejects_unknown_or_missing_entry() {
        let error = compile_project_from_source_map(
            &scripts(),
            Some("nope".to_string()),
            &CompileOptions::default(),
        )
        .expect_err("unknown entry should fail");
        assert_eq!(error.code, "API_ENTRY_SCENE_NOT_FOUND");

        let error = compile_project_from_source_map(
            &map(&[("side.dlg", "label side\nend")]),
            None,
            &CompileOptions::default(),
        )
        .expect_err("missing main should fail");
        assert_eq!(error.code, "API_ENTRY_MAIN_NOT_FOUND");
    }

    #[test]
    fn created_controller_runs_and_resumes() {
        let log = EventLog::new();
        let mut controller = create_controller(CreateControllerOptions {
            sources: scripts(),
            entry_scene: None,
            compile: CompileOptions::default(),
            services: Services::recording(&log),
        })
        .expect("controller should be created");
        assert!(matches!(
            controller.poll().expect("poll should pass"),
            ControllerStatus::AwaitingChoice { .. }
        ));
        let snapshot = controller.snapshot().expect("snapshot should pass");

        let resumed_log = EventLog::new();
        let mut resumed = resume_controller(ResumeControllerOptions {
            sources: scripts(),
            snapshot,
            compile: CompileOptions::default(),
            services: Services::recording(&resumed_log),
        })
        .expect("controller should resume");
        resumed.poll().expect("poll should pass");
        resumed.choose(0).expect("choose should pass");
        assert_eq!(resumed.poll().expect("poll should pass"), ControllerStatus::Idle);
        assert_eq!(
            resumed_log.events().last(),
            Some(&RuntimeEvent::Dialogue {
                speaker: Some("narrator".to_string()),
                text: "Side".to_string(),
            })
        );
    }

    #[test]
    fn strict_compile_surfaces_diagnostics() {
        let error = compile_project_from_source_map(
            &map(&[("main.dlg", "label main\n???\nend")]),
            None,
            &CompileOptions {
                strict: true,
                ..CompileOptions::default()
            },
        )
        .expect_err("strict compile should fail");
        assert_eq!(error.code, "COMPILE_STRICT_DIAGNOSTICS");
    }
}
