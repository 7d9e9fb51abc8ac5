/// One structural line of a script after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-based line number in the original file.
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineShape {
    Blank,
    Comment,
    Open,
    Close,
    Content,
}

impl SourceLine {
    pub fn shape(&self) -> LineShape {
        match self.text.as_str() {
            "" => LineShape::Blank,
            "{" => LineShape::Open,
            "}" => LineShape::Close,
            text if text.starts_with("//") => LineShape::Comment,
            _ => LineShape::Content,
        }
    }

    pub fn is_trivia(&self) -> bool {
        matches!(self.shape(), LineShape::Blank | LineShape::Comment)
    }
}

/// Trims every line and splits block delimiters that share a line with
/// other content (`if (x) {`, `} else {`, `choice { ... }`) into their own
/// lines, so the tree builder only ever sees one delimiter per line.
pub fn normalize_lines<S: AsRef<str>>(raw_lines: &[S]) -> Vec<SourceLine> {
    let mut lines = Vec::with_capacity(raw_lines.len());
    for (index, raw) in raw_lines.iter().enumerate() {
        let line = index + 1;
        let text = raw.as_ref().trim();
        if text.is_empty() || text.starts_with("//") {
            lines.push(SourceLine {
                line,
                text: text.to_string(),
            });
            continue;
        }
        for part in split_delimiters(text) {
            lines.push(SourceLine { line, text: part });
        }
    }
    lines
}

fn split_delimiters(text: &str) -> Vec<String> {
    let mut leading = Vec::new();
    let mut rest = text;
    while let Some(delimiter) = rest.chars().next().filter(|ch| matches!(ch, '{' | '}')) {
        leading.push(delimiter.to_string());
        rest = rest[1..].trim_start();
    }

    let mut trailing = Vec::new();
    while let Some(delimiter) = rest.chars().last().filter(|ch| matches!(ch, '{' | '}')) {
        let body = &rest[..rest.len() - 1];
        if body.matches('"').count() % 2 != 0 {
            break;
        }
        trailing.push(delimiter.to_string());
        rest = body.trim_end();
    }

    let mut parts = leading;
    if !rest.is_empty() {
        parts.push(rest.to_string());
    }
    parts.extend(trailing.into_iter().rev());
    parts
}

#[cfg(test)]
mod source_tests {
    use super::*;

    fn texts(lines: &[SourceLine]) -> Vec<&str> {
        lines.iter().map(|line| line.text.as_str()).collect()
    }

    #[test]
    fn normalize_splits_inline_delimiters() {
        let lines = normalize_lines(&["  if ($a) {", "} else if ($b) {", "}else{", "  }  "]);
        assert_eq!(
            texts(&lines),
            vec!["if ($a)", "{", "}", "else if ($b)", "{", "}", "else", "{", "}"]
        );
        assert_eq!(lines[3].line, 2);
        assert_eq!(lines[8].line, 4);
    }

    #[test]
    fn normalize_keeps_quoted_braces_and_comments() {
        let lines = normalize_lines(&["alice \"a { b\"", "// if (x) {", "", "choice { "]);
        assert_eq!(texts(&lines), vec!["alice \"a { b\"", "// if (x) {", "", "choice", "{"]);
    }

    #[test]
    fn one_line_block_is_fully_split() {
        let lines = normalize_lines(&["{ alice \"hi\" }"]);
        assert_eq!(texts(&lines), vec!["{", "alice \"hi\"", "}"]);
    }

    #[test]
    fn shape_classifies_structure() {
        let shapes = normalize_lines(&["", "// note", "{", "}", "x(1)"])
            .iter()
            .map(SourceLine::shape)
            .collect::<Vec<_>>();
        assert_eq!(
            shapes,
            vec![
                LineShape::Blank,
                LineShape::Comment,
                LineShape::Open,
                LineShape::Close,
                LineShape::Content
            ]
        );
    }
}
