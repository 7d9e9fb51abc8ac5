use std::fs;
use std::path::Path;

use dlg_compiler::{compile_project_from_source_map, CompileOptions};
use dlg_core::DlgError;

use crate::{
    json_line, load_source_by_args, map_cli_output_encode, map_cli_output_write, CheckArgs,
    CompileArgs,
};

pub(crate) fn run_compile(args: CompileArgs) -> Result<i32, DlgError> {
    let scenario = load_source_by_args(&args.source)?;
    let compiled = compile_project_from_source_map(&scenario.sources, &scenario.compile)?;
    let payload =
        serde_json::to_string_pretty(&compiled.project).map_err(map_cli_output_encode)?;

    println!("RESULT:OK");
    for (name, tree) in &compiled.project.trees {
        println!("TREE:{}|{}", name, tree.scenes.len());
    }
    for diagnostic in &compiled.diagnostics {
        println!("DIAGNOSTIC_JSON:{}", json_line(&diagnostic.to_string()));
    }

    match args.out {
        Some(out) => {
            let path = Path::new(&out);
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(map_cli_output_write)?;
            }
            fs::write(path, payload).map_err(map_cli_output_write)?;
            println!("OUT:{}", out);
        }
        None => println!("{}", payload),
    }
    Ok(0)
}

/// Lists diagnostics. Exits with 1 when there is at least one.
pub(crate) fn run_check(args: CheckArgs) -> Result<i32, DlgError> {
    let scenario = load_source_by_args(&args.source)?;
    let options = CompileOptions {
        strict: false,
        ..scenario.compile.clone()
    };
    let compiled = compile_project_from_source_map(&scenario.sources, &options)?;

    if compiled.diagnostics.is_empty() {
        println!("RESULT:OK");
        println!("DIAGNOSTICS:0");
        return Ok(0);
    }

    println!("RESULT:DIAGNOSTICS");
    println!("DIAGNOSTICS:{}", compiled.diagnostics.len());
    for diagnostic in &compiled.diagnostics {
        println!("DIAGNOSTIC_JSON:{}", json_line(&diagnostic.to_string()));
    }
    Ok(1)
}
