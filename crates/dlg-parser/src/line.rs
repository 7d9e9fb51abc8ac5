use std::sync::OnceLock;

use dlg_core::NodeKind;
use regex::Regex;

/// Node patterns in match order. The first match wins, so the dialogue
/// fallback must stay last.
pub const LINE_PATTERNS: [(NodeKind, &str); 8] = [
    (NodeKind::Jump, r"(?i)^jump\s+([A-Za-z0-9_.\-]+)$"),
    (
        NodeKind::Input,
        r#"(?i)^input(?:\s+\$([A-Za-z_][A-Za-z0-9_]*))?\s+"(.*)"$"#,
    ),
    (NodeKind::Choice, r#"(?i)^choice(?:\s+"(.*)")?$"#),
    (NodeKind::ChoiceBranch, r"^-\s*(.+)$"),
    (
        NodeKind::ConditionBranch,
        r"(?i)^(?:(else\s+if|if)\s*\((.*)\)|(else))$",
    ),
    (
        NodeKind::Assignment,
        r"^\$([A-Za-z_][A-Za-z0-9_]*)\s*(\+=|-=|\*=|/=|=)\s*([^=\s].*)$",
    ),
    (
        NodeKind::Command,
        r"(?i)^((?:wait\s+)?[A-Za-z_][A-Za-z0-9_.]*\s*\(.*\)\s*;?)$",
    ),
    (NodeKind::Dialogue, r#"^(?:([^"\s][^"]*?)\s+)?"(.*)"$"#),
];

pub const DEFAULT_INPUT_VARIABLE: &str = "input";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    pub kind: NodeKind,
    pub captures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneMarker {
    Open { name: String, title: Option<String> },
    Close { name: Option<String> },
}

fn compiled_patterns() -> &'static [(NodeKind, Regex)] {
    static PATTERNS: OnceLock<Vec<(NodeKind, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        LINE_PATTERNS
            .iter()
            .map(|(kind, pattern)| {
                (
                    *kind,
                    Regex::new(pattern).expect("line pattern regex must compile"),
                )
            })
            .collect()
    })
}

fn scene_open_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"(?i)^label\s+([A-Za-z0-9_.\-]+)(?:\s+"(.*)")?$"#)
            .expect("label regex must compile")
    })
}

fn scene_close_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)^end(?:\s+([A-Za-z0-9_.\-]+))?$").expect("end regex must compile")
    })
}

pub fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with("//")
}

/// Classifies one trimmed line. Blank lines, comments and block delimiters
/// are structural and yield `None`, as does anything no pattern accepts.
/// Scene markers are not node kinds; check [`classify_scene_marker`] first.
pub fn classify(line: &str) -> Option<ClassifiedLine> {
    let line = line.trim();
    if line.is_empty() || is_comment(line) || line == "{" || line == "}" {
        return None;
    }

    compiled_patterns().iter().find_map(|(kind, regex)| {
        let captures = regex.captures(line)?;
        let groups = captures
            .iter()
            .skip(1)
            .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect::<Vec<_>>();
        Some(ClassifiedLine {
            kind: *kind,
            captures: shape_captures(*kind, groups),
        })
    })
}

fn shape_captures(kind: NodeKind, groups: Vec<String>) -> Vec<String> {
    let group = |index: usize| groups.get(index).cloned().unwrap_or_default();
    match kind {
        NodeKind::Input => {
            let variable = group(0);
            let variable = if variable.is_empty() {
                DEFAULT_INPUT_VARIABLE.to_string()
            } else {
                variable
            };
            vec![group(1), variable]
        }
        NodeKind::ChoiceBranch => {
            vec![dlg_core::strip_quotes(&group(0)).to_string()]
        }
        NodeKind::ConditionBranch => {
            if group(2).is_empty() {
                let keyword = group(0)
                    .split_whitespace()
                    .map(str::to_ascii_lowercase)
                    .collect::<Vec<_>>()
                    .join(" ");
                vec![keyword, group(1).trim().to_string()]
            } else {
                vec!["else".to_string(), String::new()]
            }
        }
        NodeKind::Command => vec![group(0).trim_end_matches(';').trim().to_string()],
        _ => groups,
    }
}

pub fn classify_scene_marker(line: &str) -> Option<SceneMarker> {
    let line = line.trim();
    if let Some(captures) = scene_open_regex().captures(line) {
        return Some(SceneMarker::Open {
            name: captures.get(1).map(|m| m.as_str().to_string()).unwrap_or_default(),
            title: captures.get(2).map(|m| m.as_str().to_string()),
        });
    }
    scene_close_regex()
        .captures(line)
        .map(|captures| SceneMarker::Close {
            name: captures.get(1).map(|m| m.as_str().to_string()),
        })
}

#[cfg(test)]
mod line_tests {
    use super::*;

    fn kind_of(line: &str) -> Option<NodeKind> {
        classify(line).map(|classified| classified.kind)
    }

    fn captures_of(line: &str) -> Vec<String> {
        classify(line)
            .map(|classified| classified.captures)
            .unwrap_or_default()
    }

    #[test]
    fn structural_lines_are_not_nodes() {
        assert_eq!(kind_of(""), None);
        assert_eq!(kind_of("   "), None);
        assert_eq!(kind_of("// jump x"), None);
        assert_eq!(kind_of("{"), None);
        assert_eq!(kind_of("}"), None);
        assert_eq!(kind_of("this is not a statement"), None);
    }

    #[test]
    fn keywords_match_case_insensitively() {
        assert_eq!(kind_of("JUMP chapter_2"), Some(NodeKind::Jump));
        assert_eq!(captures_of("Jump chapter_2"), vec!["chapter_2"]);
        assert_eq!(kind_of("Choice"), Some(NodeKind::Choice));
        assert_eq!(kind_of("IF ($a)"), Some(NodeKind::ConditionBranch));
        assert_eq!(captures_of("Else   If ($a > 1)"), vec!["else if", "$a > 1"]);
        assert_eq!(captures_of("ELSE"), vec!["else", ""]);
    }

    #[test]
    fn input_defaults_target_variable() {
        assert_eq!(captures_of("input \"Your name?\""), vec!["Your name?", "input"]);
        assert_eq!(captures_of("input $name \"Your name?\""), vec!["Your name?", "name"]);
    }

    #[test]
    fn choice_prompt_and_branch_text() {
        assert_eq!(captures_of("choice"), vec![""]);
        assert_eq!(captures_of("choice \"Where to?\""), vec!["Where to?"]);
        assert_eq!(kind_of("- Go left"), Some(NodeKind::ChoiceBranch));
        assert_eq!(captures_of("-  \"Go right\""), vec!["Go right"]);
    }

    #[test]
    fn assignment_operators_are_captured() {
        assert_eq!(captures_of("$gold += 5"), vec!["gold", "+=", "5"]);
        assert_eq!(captures_of("$x=\"5\""), vec!["x", "=", "\"5\""]);
        assert_eq!(captures_of("$x /= 2"), vec!["x", "/=", "2"]);
        assert_eq!(kind_of("$x == 2"), None);
    }

    #[test]
    fn command_lines_keep_full_call_text() {
        assert_eq!(kind_of("play(\"bgm\")"), Some(NodeKind::Command));
        assert_eq!(
            captures_of("wait fade(1.0) shake(2);"),
            vec!["wait fade(1.0) shake(2)"]
        );
        assert_eq!(captures_of("jump(x)"), vec!["jump(x)"]);
    }

    #[test]
    fn dialogue_is_the_fallback() {
        assert_eq!(captures_of("alice \"Hello (there)\""), vec!["alice", "Hello (there)"]);
        assert_eq!(captures_of("\"Narration only\""), vec!["", "Narration only"]);
        assert_eq!(captures_of("Old Man \"Welcome\""), vec!["Old Man", "Welcome"]);
    }

    #[test]
    fn scene_markers_are_recognized() {
        assert_eq!(
            classify_scene_marker("label intro \"The Beginning\""),
            Some(SceneMarker::Open {
                name: "intro".to_string(),
                title: Some("The Beginning".to_string())
            })
        );
        assert_eq!(
            classify_scene_marker("LABEL intro"),
            Some(SceneMarker::Open {
                name: "intro".to_string(),
                title: None
            })
        );
        assert_eq!(
            classify_scene_marker("end intro"),
            Some(SceneMarker::Close {
                name: Some("intro".to_string())
            })
        );
        assert_eq!(
            classify_scene_marker("end"),
            Some(SceneMarker::Close { name: None })
        );
        assert_eq!(classify_scene_marker("ending \"x\""), None);
    }
}
