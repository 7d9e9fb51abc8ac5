use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use dlg_compiler::{CompileOptions, SCRIPT_EXTENSION};
use dlg_core::DlgError;
use walkdir::WalkDir;

use crate::{
    map_cli_source_path, map_cli_source_read, map_cli_source_scan, LoadedScenario, SourceArgs,
};

const SCENARIO_REF_PREFIX: &str = "scripts-dir:";

pub(crate) fn compile_options_from_args(args: &SourceArgs) -> CompileOptions {
    let mut options = CompileOptions {
        strict: args.strict,
        ..CompileOptions::default()
    };
    if let Some(init_scene) = &args.init_scene {
        options.init_scene_name = init_scene.clone();
    }
    options
}

pub(crate) fn load_source_by_args(args: &SourceArgs) -> Result<LoadedScenario, DlgError> {
    load_source_by_scripts_dir(&args.scripts_dir, compile_options_from_args(args))
}

pub(crate) fn load_source_by_scripts_dir(
    scripts_dir: &str,
    compile: CompileOptions,
) -> Result<LoadedScenario, DlgError> {
    let scripts_root = resolve_scripts_dir(scripts_dir)?;
    let sources = read_scripts_from_dir(&scripts_root)?;
    let title = format!(
        "Scripts {}",
        scripts_root
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("unknown")
    );
    log::debug!("loaded {} script(s) from {}", sources.len(), scripts_root.display());

    Ok(LoadedScenario {
        id: make_scripts_dir_scenario_id(&scripts_root),
        title,
        sources,
        compile,
    })
}

pub(crate) fn load_source_by_ref(
    scenario_ref: &str,
    compile: CompileOptions,
) -> Result<LoadedScenario, DlgError> {
    let Some(raw) = scenario_ref.strip_prefix(SCENARIO_REF_PREFIX) else {
        return Err(DlgError::new(
            "CLI_SOURCE_REF_INVALID",
            format!("Unsupported scenario ref: {}", scenario_ref),
        ));
    };
    load_source_by_scripts_dir(raw, compile)
}

pub(crate) fn resolve_scripts_dir(scripts_dir: &str) -> Result<PathBuf, DlgError> {
    let path = PathBuf::from(scripts_dir);
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(map_cli_source_path)?
            .join(path)
    };

    if !absolute.exists() {
        return Err(DlgError::new(
            "CLI_SOURCE_NOT_FOUND",
            format!("scripts-dir does not exist: {}", absolute.display()),
        ));
    }
    if !absolute.is_dir() {
        return Err(DlgError::new(
            "CLI_SOURCE_NOT_DIR",
            format!("scripts-dir is not a directory: {}", absolute.display()),
        ));
    }

    Ok(absolute)
}

/// Reads every `.dlg` file below `scripts_dir`, keyed by its relative path.
pub(crate) fn read_scripts_from_dir(
    scripts_dir: &Path,
) -> Result<BTreeMap<String, String>, DlgError> {
    let mut scripts = BTreeMap::new();

    for entry in WalkDir::new(scripts_dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(SCRIPT_EXTENSION) {
            continue;
        }

        let relative = path
            .strip_prefix(scripts_dir)
            .map_err(map_cli_source_scan)?
            .to_string_lossy()
            .replace('\\', "/");
        let content = fs::read_to_string(path).map_err(map_cli_source_read)?;
        scripts.insert(relative, content);
    }

    if scripts.is_empty() {
        return Err(DlgError::new(
            "CLI_SOURCE_EMPTY",
            format!(
                "No .{} files under {}",
                SCRIPT_EXTENSION,
                scripts_dir.display()
            ),
        ));
    }

    Ok(scripts)
}

pub(crate) fn make_scripts_dir_scenario_id(scripts_dir: &Path) -> String {
    format!("{}{}", SCENARIO_REF_PREFIX, scripts_dir.display())
}

#[cfg(test)]
mod source_loader_tests {
    use super::*;
    use crate::cli_test_support::*;

    #[test]
    fn load_source_by_ref_validates_ref_prefix() {
        let error = load_source_by_ref("unknown:main", CompileOptions::default())
            .expect_err("invalid ref should fail");
        assert_eq!(error.code, "CLI_SOURCE_REF_INVALID");
    }

    #[test]
    fn resolve_scripts_dir_validates_existence_and_directory() {
        let missing = temp_path("missing-dir");
        let error = resolve_scripts_dir(missing.to_string_lossy().as_ref())
            .expect_err("missing path should fail");
        assert_eq!(error.code, "CLI_SOURCE_NOT_FOUND");

        let file_path = temp_path("plain-file");
        write_file(&file_path, "x");
        let error = resolve_scripts_dir(file_path.to_string_lossy().as_ref())
            .expect_err("file path should fail");
        assert_eq!(error.code, "CLI_SOURCE_NOT_DIR");
    }

    #[test]
    fn read_scripts_from_dir_keeps_only_script_files() {
        let root = temp_path("scripts-dir");
        write_file(&root.join("main.dlg"), "label main\n\"Hi\"\nend");
        write_file(&root.join("chapters/one.dlg"), "label one\nend");
        write_file(&root.join("notes.txt"), "ignored");
        write_file(&root.join("testcase.json"), "{}");

        let scripts = read_scripts_from_dir(&root).expect("scan should pass");
        assert_eq!(
            scripts.keys().cloned().collect::<Vec<_>>(),
            vec!["chapters/one.dlg".to_string(), "main.dlg".to_string()]
        );
    }

    #[test]
    fn read_scripts_from_dir_errors_when_no_source_files() {
        let root = temp_path("empty-scripts-dir");
        write_file(&root.join("readme.txt"), "not source");

        let error = read_scripts_from_dir(&root).expect_err("empty source set should fail");
        assert_eq!(error.code, "CLI_SOURCE_EMPTY");
    }

    #[test]
    fn load_source_by_scripts_dir_builds_scenario_ref() {
        let root = temp_path("scenario");
        write_file(&root.join("main.dlg"), "label main\n\"Hello\"\nend");

        let scenario = load_source_by_scripts_dir(
            root.to_string_lossy().as_ref(),
            CompileOptions::default(),
        )
        .expect("scenario should load");
        assert!(scenario.id.starts_with("scripts-dir:"));
        assert!(scenario.title.starts_with("Scripts "));

        let again = load_source_by_ref(&scenario.id, CompileOptions::default())
            .expect("ref should load");
        assert_eq!(again.sources, scenario.sources);
    }

    #[test]
    fn compile_options_follow_flags() {
        let options = compile_options_from_args(&SourceArgs {
            scripts_dir: ".".to_string(),
            init_scene: Some("setup".to_string()),
            strict: true,
        });
        assert!(options.strict);
        assert_eq!(options.init_scene_name, "setup");

        let defaults = compile_options_from_args(&SourceArgs {
            scripts_dir: ".".to_string(),
            init_scene: None,
            strict: false,
        });
        assert_eq!(defaults, CompileOptions::default());
    }
}
