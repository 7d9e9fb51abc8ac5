mod builder;
mod linker;

use std::collections::BTreeMap;

use dlg_core::{CompiledProject, Diagnostic, DlgError, SourceSpan, Tree};
pub use dlg_core::DEFAULT_INIT_SCENE_NAME;
use dlg_parser::normalize_lines;
use serde::{Deserialize, Serialize};

use builder::{TreeBuilder, CODE_DUPLICATE_SCENE};

pub const SCRIPT_EXTENSION: &str = "dlg";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Fail on the first batch of diagnostics instead of degrading.
    pub strict: bool,
    pub init_scene_name: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            strict: false,
            init_scene_name: DEFAULT_INIT_SCENE_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompiledTree {
    pub tree: Tree,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct CompileProjectResult {
    pub project: CompiledProject,
    pub diagnostics: Vec<Diagnostic>,
}

/// Builds and links one file with default options, never failing.
/// Malformed lines are skipped with a warning.
pub fn build<S: AsRef<str>>(file_name: &str, raw_lines: &[S]) -> Tree {
    let lines = normalize_lines(raw_lines);
    let (tree, diagnostics) =
        TreeBuilder::new(file_name, &lines, DEFAULT_INIT_SCENE_NAME).build();
    log_diagnostics(&diagnostics);
    tree
}

pub fn compile_tree<S: AsRef<str>>(
    file_name: &str,
    raw_lines: &[S],
    options: &CompileOptions,
) -> Result<CompiledTree, DlgError> {
    let lines = normalize_lines(raw_lines);
    let (tree, diagnostics) =
        TreeBuilder::new(file_name, &lines, &options.init_scene_name).build();
    check_diagnostics(&diagnostics, options)?;
    Ok(CompiledTree { tree, diagnostics })
}

pub fn compile_source(
    file_name: &str,
    source: &str,
    options: &CompileOptions,
) -> Result<CompiledTree, DlgError> {
    let raw_lines = source.lines().collect::<Vec<_>>();
    compile_tree(file_name, &raw_lines, options)
}

/// Compiles every file of a project. Keys are source paths; each tree is
/// named after its normalized path without the script extension.
///
/// Scene names are global: the first tree (in key order) to define a name
/// owns it in the lookup table. Init scenes stay private to their tree.
pub fn compile_project_from_source_map(
    sources: &BTreeMap<String, String>,
    options: &CompileOptions,
) -> Result<CompileProjectResult, DlgError> {
    let mut project = CompiledProject::default();
    let mut diagnostics = Vec::new();

    for (path, source) in sources {
        let tree_name = tree_name_for_path(path);
        if tree_name.is_empty() {
            return Err(DlgError::new(
                "COMPILE_INVALID_PATH",
                format!("Source path \"{}\" does not name a script.", path),
            ));
        }
        if project.trees.contains_key(&tree_name) {
            return Err(DlgError::new(
                "COMPILE_DUPLICATE_TREE",
                format!("Sources \"{}\" map to an existing tree \"{}\".", path, tree_name),
            ));
        }

        let compiled = compile_source(&tree_name, source, options)?;
        diagnostics.extend(compiled.diagnostics);
        project.trees.insert(tree_name, compiled.tree);
    }

    let mut lookup_diagnostics = Vec::new();
    for (tree_name, tree) in &project.trees {
        for scene in &tree.scenes {
            if scene.name.eq_ignore_ascii_case(&options.init_scene_name) {
                continue;
            }
            match project.scene_lookup.get(&scene.name) {
                Some(owner) if owner != tree_name => {
                    lookup_diagnostics.push(Diagnostic {
                        code: CODE_DUPLICATE_SCENE.to_string(),
                        message: format!(
                            "Scene \"{}\" is already defined in \"{}\".",
                            scene.name, owner
                        ),
                        file: tree_name.clone(),
                        line: scene.span.start_line,
                    });
                }
                Some(_) => {}
                None => {
                    project
                        .scene_lookup
                        .insert(scene.name.clone(), tree_name.clone());
                }
            }
        }
    }
    check_diagnostics(&lookup_diagnostics, options)?;
    diagnostics.extend(lookup_diagnostics);

    log::info!(
        "compiled {} trees with {} scenes ({} diagnostics)",
        project.trees.len(),
        project.scene_lookup.len(),
        diagnostics.len()
    );
    Ok(CompileProjectResult {
        project,
        diagnostics,
    })
}

/// `chapters/./intro.dlg` and `chapters\intro` both name the tree
/// `chapters/intro`.
pub fn tree_name_for_path(path: &str) -> String {
    let normalized = normalize_virtual_path(path);
    let suffix = format!(".{}", SCRIPT_EXTENSION);
    match normalized.strip_suffix(&suffix) {
        Some(stem) => stem.to_string(),
        None => normalized,
    }
}

fn normalize_virtual_path(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    let path = path.replace('\\', "/");
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            part => stack.push(part),
        }
    }
    stack.join("/")
}

fn check_diagnostics(diagnostics: &[Diagnostic], options: &CompileOptions) -> Result<(), DlgError> {
    let Some(first) = diagnostics.first() else {
        return Ok(());
    };
    if !options.strict {
        log_diagnostics(diagnostics);
        return Ok(());
    }

    let listing = diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    Err(DlgError::with_span(
        "COMPILE_STRICT_DIAGNOSTICS",
        format!("{} diagnostic(s) in strict mode:\n{}", diagnostics.len(), listing),
        SourceSpan::line(first.line),
    ))
}

fn log_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        log::warn!("{}", diagnostic);
    }
}
