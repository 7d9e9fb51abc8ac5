use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use dlg_compiler::SCRIPT_EXTENSION;
use walkdir::WalkDir;

use crate::{DlgToolError, TestCase, TESTCASE_SCHEMA_V1};

/// Collects the `.dlg` files of a scenario directory keyed by relative path.
pub fn read_scripts_from_dir(example_dir: &Path) -> Result<BTreeMap<String, String>, DlgToolError> {
    let mut scripts = BTreeMap::new();

    for entry in WalkDir::new(example_dir)
        .follow_links(false)
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
        let Ok(relative) = path.strip_prefix(example_dir) else {
            continue;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");

        let content = fs::read_to_string(path).map_err(|source| DlgToolError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        scripts.insert(relative, content);
    }

    if scripts.is_empty() {
        return Err(DlgToolError::SourceEmpty {
            path: example_dir.to_path_buf(),
        });
    }

    Ok(scripts)
}

pub fn read_test_case(case_path: &Path) -> Result<TestCase, DlgToolError> {
    let raw = fs::read_to_string(case_path).map_err(|source| DlgToolError::ReadFile {
        path: case_path.to_path_buf(),
        source,
    })?;
    let parsed: TestCase = serde_json::from_str(&raw).map_err(|source| DlgToolError::ParseCase {
        path: case_path.to_path_buf(),
        source,
    })?;

    if parsed.schema_version != TESTCASE_SCHEMA_V1 {
        return Err(DlgToolError::InvalidSchemaVersion {
            expected: TESTCASE_SCHEMA_V1.to_string(),
            found: parsed.schema_version,
        });
    }

    Ok(parsed)
}

#[cfg(test)]
mod source_tests {
    use super::*;

    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should move forward")
            .as_nanos();
        std::env::temp_dir().join(format!("dlg-tool-{}-{}", name, nanos))
    }

    fn write_file(path: &Path, content: &str) {
        let parent = path.parent().expect("path should have parent");
        fs::create_dir_all(parent).expect("parent dir should be created");
        fs::write(path, content).expect("file should be written");
    }

    #[test]
    fn read_scripts_from_dir_collects_nested_script_files() {
        let root = temp_dir("scripts");
        write_file(&root.join("main.dlg"), "label main\nend");
        write_file(&root.join("chapters/two.dlg"), "label two\nend");
        write_file(&root.join("testcase.json"), "{}");

        let files = read_scripts_from_dir(&root).expect("scan should pass");
        assert_eq!(files.len(), 2);
        assert!(files.contains_key("main.dlg"));
        assert!(files.contains_key("chapters/two.dlg"));
    }

    #[test]
    fn read_scripts_from_dir_fails_when_no_script_files() {
        let root = temp_dir("empty-scripts");
        write_file(&root.join("ignore.txt"), "skip");

        let error = read_scripts_from_dir(&root).expect_err("empty source should fail");
        assert!(matches!(error, DlgToolError::SourceEmpty { .. }));
    }

    #[test]
    fn read_test_case_parses_valid_json() {
        let root = temp_dir("case-ok");
        let case_path = root.join("testcase.json");
        write_file(
            &case_path,
            r#"{
  "schemaVersion":"dlg-tool-case.v1",
  "entryScene":"main",
  "expectedEvents":[{"kind":"end"}]
}"#,
        );

        let parsed = read_test_case(&case_path).expect("case should parse");
        assert_eq!(parsed.entry_scene.as_deref(), Some("main"));
        assert_eq!(parsed.expected_events.len(), 1);
    }

    #[test]
    fn read_test_case_reports_read_parse_and_schema_errors() {
        let root = temp_dir("case-errors");
        fs::create_dir_all(&root).expect("root should be created");

        let error = read_test_case(&root.join("missing.json")).expect_err("missing should fail");
        assert!(matches!(error, DlgToolError::ReadFile { .. }));

        let bad_json = root.join("bad.json");
        write_file(&bad_json, "{");
        let error = read_test_case(&bad_json).expect_err("parse should fail");
        assert!(matches!(error, DlgToolError::ParseCase { .. }));

        let bad_schema = root.join("bad-schema.json");
        write_file(&bad_schema, r#"{"schemaVersion":"v0"}"#);
        let error = read_test_case(&bad_schema).expect_err("schema should fail");
        assert!(matches!(error, DlgToolError::InvalidSchemaVersion { .. }));
    }
}
