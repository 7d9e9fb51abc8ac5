use dlg_core::{Diagnostic, Node, NodeId, NodeKind, Scene, SourceSpan, Tree};
use dlg_parser::{classify, classify_scene_marker, LineShape, SceneMarker, SourceLine};

use crate::linker::link_scene;

pub(crate) const CODE_UNRECOGNIZED_LINE: &str = "COMPILE_UNRECOGNIZED_LINE";
pub(crate) const CODE_UNTERMINATED_BLOCK: &str = "COMPILE_UNTERMINATED_BLOCK";
pub(crate) const CODE_UNTERMINATED_SCENE: &str = "COMPILE_UNTERMINATED_SCENE";
pub(crate) const CODE_MISSING_BLOCK: &str = "COMPILE_MISSING_BLOCK";
pub(crate) const CODE_STRAY_DELIMITER: &str = "COMPILE_STRAY_DELIMITER";
pub(crate) const CODE_ORPHAN_ELSE: &str = "COMPILE_ORPHAN_ELSE";
pub(crate) const CODE_BRANCH_OUTSIDE_CHOICE: &str = "COMPILE_BRANCH_OUTSIDE_CHOICE";
pub(crate) const CODE_OUTSIDE_SCENE: &str = "COMPILE_OUTSIDE_SCENE";
pub(crate) const CODE_INIT_SCENE_NODE: &str = "COMPILE_INIT_SCENE_NODE";
pub(crate) const CODE_SCENE_END_MISMATCH: &str = "COMPILE_SCENE_END_MISMATCH";
pub(crate) const CODE_DUPLICATE_SCENE: &str = "COMPILE_DUPLICATE_SCENE";

/// What closes the body currently being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyEnd {
    /// `end NAME`
    Scene,
    /// the matching `}`
    Brace,
    /// the next `-` option line or the choice's `}`
    ChoiceBranch,
}

/// Recursive-descent builder for one script file.
///
/// Ids come from `next_id`, which is taken the moment a node is created and
/// before its children are parsed, so numbering is pre-order across the
/// whole file.
pub(crate) struct TreeBuilder<'a> {
    file_name: &'a str,
    lines: &'a [SourceLine],
    cursor: usize,
    next_id: NodeId,
    init_scene_name: &'a str,
    last_line: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(
        file_name: &'a str,
        lines: &'a [SourceLine],
        init_scene_name: &'a str,
    ) -> Self {
        Self {
            file_name,
            lines,
            cursor: 0,
            next_id: 0,
            init_scene_name,
            last_line: 0,
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn build(mut self) -> (Tree, Vec<Diagnostic>) {
        let mut scenes: Vec<Scene> = Vec::new();

        while let Some(line) = self.peek() {
            if line.is_trivia() {
                self.bump();
                continue;
            }

            match classify_scene_marker(&line.text) {
                Some(SceneMarker::Open { name, title }) => {
                    let line_number = line.line;
                    self.bump();
                    if scenes.iter().any(|scene| scene.name == name) {
                        self.diagnose(
                            CODE_DUPLICATE_SCENE,
                            format!("Scene \"{}\" is defined more than once.", name),
                            line_number,
                        );
                    }
                    scenes.push(self.build_scene(name, title, line_number));
                }
                _ => {
                    let line_number = line.line;
                    let text = line.text.clone();
                    self.bump();
                    self.diagnose(
                        CODE_OUTSIDE_SCENE,
                        format!("Statement outside of any scene: {}", text),
                        line_number,
                    );
                }
            }
        }

        (Tree::new(self.file_name, scenes), self.diagnostics)
    }

    fn build_scene(&mut self, name: String, title: Option<String>, start_line: usize) -> Scene {
        let first_id = self.next_id;
        let init_only = name.eq_ignore_ascii_case(self.init_scene_name);
        let nodes = self.parse_body(BodyEnd::Scene, init_only, Some(&name));
        let (min_id, max_id) = if self.next_id > first_id {
            (Some(first_id), Some(self.next_id - 1))
        } else {
            (None, None)
        };

        let mut scene = Scene {
            name,
            title,
            min_id,
            max_id,
            span: SourceSpan {
                start_line,
                end_line: self.last_line.max(start_line),
            },
            nodes,
        };
        link_scene(&mut scene);
        log::debug!(
            "built scene \"{}\" in {} with ids {:?}..={:?}",
            scene.name,
            self.file_name,
            scene.min_id,
            scene.max_id
        );
        scene
    }

    fn parse_body(&mut self, end: BodyEnd, init_only: bool, scene_name: Option<&str>) -> Vec<Node> {
        let mut nodes = Vec::new();

        loop {
            let Some(line) = self.peek() else {
                let line_number = self.last_line;
                match end {
                    BodyEnd::Scene => self.diagnose(
                        CODE_UNTERMINATED_SCENE,
                        format!(
                            "Scene \"{}\" is missing its end marker.",
                            scene_name.unwrap_or_default()
                        ),
                        line_number,
                    ),
                    BodyEnd::Brace | BodyEnd::ChoiceBranch => self.diagnose(
                        CODE_UNTERMINATED_BLOCK,
                        "Block is missing its closing '}'.",
                        line_number,
                    ),
                }
                return nodes;
            };
            let line_number = line.line;

            match line.shape() {
                LineShape::Blank | LineShape::Comment => {
                    self.bump();
                    continue;
                }
                LineShape::Close => {
                    match end {
                        BodyEnd::Brace => {
                            self.bump();
                            return nodes;
                        }
                        BodyEnd::ChoiceBranch => return nodes,
                        BodyEnd::Scene => {
                            self.bump();
                            self.diagnose(CODE_STRAY_DELIMITER, "Unmatched '}'.", line_number);
                        }
                    }
                    continue;
                }
                LineShape::Open => {
                    self.bump();
                    self.diagnose(CODE_STRAY_DELIMITER, "Unexpected '{'.", line_number);
                    continue;
                }
                LineShape::Content => {}
            }

            if let Some(marker) = classify_scene_marker(&line.text) {
                if end != BodyEnd::Scene {
                    self.diagnose(
                        CODE_UNTERMINATED_BLOCK,
                        "Block is missing its closing '}'.",
                        line_number,
                    );
                    return nodes;
                }
                match marker {
                    SceneMarker::Close { name } => {
                        self.bump();
                        let expected = scene_name.unwrap_or_default();
                        if let Some(name) = name.filter(|name| name != expected) {
                            self.diagnose(
                                CODE_SCENE_END_MISMATCH,
                                format!("Scene \"{}\" closed with \"end {}\".", expected, name),
                                line_number,
                            );
                        }
                    }
                    SceneMarker::Open { .. } => {
                        self.diagnose(
                            CODE_UNTERMINATED_SCENE,
                            format!(
                                "Scene \"{}\" is missing its end marker.",
                                scene_name.unwrap_or_default()
                            ),
                            line_number,
                        );
                    }
                }
                return nodes;
            }

            let text = line.text.clone();
            let Some(classified) = classify(&text) else {
                self.bump();
                self.diagnose(
                    CODE_UNRECOGNIZED_LINE,
                    format!("Unrecognized line: {}", text),
                    line_number,
                );
                continue;
            };

            match classified.kind {
                NodeKind::ChoiceBranch => {
                    if end == BodyEnd::ChoiceBranch {
                        return nodes;
                    }
                    self.bump();
                    self.diagnose(
                        CODE_BRANCH_OUTSIDE_CHOICE,
                        format!("Option line outside of a choice block: {}", text),
                        line_number,
                    );
                }
                NodeKind::Choice => {
                    self.bump();
                    let node = self.parse_choice(classified.captures, line_number);
                    self.push_unless_init(&mut nodes, node, init_only, line_number);
                }
                NodeKind::ConditionBranch => {
                    self.bump();
                    let orphan = classified.captures.first().map(String::as_str) != Some("if");
                    let node = self.parse_condition(classified.captures, line_number);
                    if orphan {
                        // Parsed only to advance the cursor; its ids are reused.
                        self.next_id = node.id;
                        self.diagnose(
                            CODE_ORPHAN_ELSE,
                            format!("'{}' without a preceding if block.", text),
                            line_number,
                        );
                        continue;
                    }
                    self.push_unless_init(&mut nodes, node, init_only, line_number);
                }
                kind => {
                    self.bump();
                    if init_only && !matches!(kind, NodeKind::Command | NodeKind::Assignment) {
                        self.reject_init_node(kind, line_number);
                        continue;
                    }
                    let id = self.allocate_id();
                    nodes.push(Node::new(
                        id,
                        kind,
                        classified.captures,
                        SourceSpan::line(line_number),
                    ));
                }
            }
        }
    }

    /// Block nodes inside the init scene are parsed to keep the cursor in
    /// step, then discarded together with the ids they consumed.
    fn push_unless_init(
        &mut self,
        nodes: &mut Vec<Node>,
        node: Node,
        init_only: bool,
        line_number: usize,
    ) {
        if init_only {
            self.next_id = node.id;
            self.reject_init_node(node.kind, line_number);
        } else {
            nodes.push(node);
        }
    }

    fn reject_init_node(&mut self, kind: NodeKind, line_number: usize) {
        log::warn!(
            "{}:{}: {} node is not allowed in the init scene; dropped",
            self.file_name,
            line_number,
            kind.name()
        );
        self.diagnose(
            CODE_INIT_SCENE_NODE,
            format!(
                "Only command and assignment lines may appear in the init scene, found {}.",
                kind.name()
            ),
            line_number,
        );
    }

    fn parse_choice(&mut self, captures: Vec<String>, line_number: usize) -> Node {
        let mut choice = Node::new(
            self.allocate_id(),
            NodeKind::Choice,
            captures,
            SourceSpan::line(line_number),
        );

        if self.expect_block_open(line_number) {
            loop {
                let Some(line) = self.peek() else {
                    self.diagnose(
                        CODE_UNTERMINATED_BLOCK,
                        "Choice block is missing its closing '}'.",
                        self.last_line,
                    );
                    break;
                };
                let branch_line = line.line;
                match line.shape() {
                    LineShape::Blank | LineShape::Comment => {
                        self.bump();
                        continue;
                    }
                    LineShape::Close => {
                        self.bump();
                        break;
                    }
                    LineShape::Open => {
                        self.bump();
                        self.diagnose(CODE_STRAY_DELIMITER, "Unexpected '{'.", branch_line);
                        continue;
                    }
                    LineShape::Content => {}
                }
                if classify_scene_marker(&line.text).is_some() {
                    self.diagnose(
                        CODE_UNTERMINATED_BLOCK,
                        "Choice block is missing its closing '}'.",
                        branch_line,
                    );
                    break;
                }

                let text = line.text.clone();
                match classify(&text) {
                    Some(classified) if classified.kind == NodeKind::ChoiceBranch => {
                        self.bump();
                        let mut branch = Node::new(
                            self.allocate_id(),
                            NodeKind::ChoiceBranch,
                            classified.captures,
                            SourceSpan::line(branch_line),
                        );
                        self.skip_trivia();
                        let body_end = match self.peek() {
                            Some(next) if next.shape() == LineShape::Open => {
                                self.bump();
                                BodyEnd::Brace
                            }
                            _ => BodyEnd::ChoiceBranch,
                        };
                        branch.children = self.parse_body(body_end, false, None);
                        branch.span.end_line = self.last_line.max(branch_line);
                        choice.children.push(branch);
                    }
                    _ => {
                        self.bump();
                        self.diagnose(
                            CODE_UNRECOGNIZED_LINE,
                            format!(
                                "Expected an option line ('- text') in choice block: {}",
                                text
                            ),
                            branch_line,
                        );
                    }
                }
            }
        }

        choice.span.end_line = self.last_line.max(line_number);
        choice
    }

    /// Wraps a run of `if` / `else if` / `else` blocks in an implicit
    /// `Condition` container.
    fn parse_condition(&mut self, first: Vec<String>, line_number: usize) -> Node {
        let mut condition = Node::new(
            self.allocate_id(),
            NodeKind::Condition,
            Vec::new(),
            SourceSpan::line(line_number),
        );

        let mut captures = first;
        let mut branch_line = line_number;
        loop {
            let is_else = captures.first().map(String::as_str) == Some("else");
            let mut branch = Node::new(
                self.allocate_id(),
                NodeKind::ConditionBranch,
                captures,
                SourceSpan::line(branch_line),
            );
            if self.expect_block_open(branch_line) {
                branch.children = self.parse_body(BodyEnd::Brace, false, None);
            }
            branch.span.end_line = self.last_line.max(branch_line);
            condition.children.push(branch);

            if is_else {
                break;
            }

            self.skip_trivia();
            let Some(next) = self.peek() else {
                break;
            };
            let next_line = next.line;
            match classify(&next.text) {
                Some(classified)
                    if classified.kind == NodeKind::ConditionBranch
                        && classified.captures.first().map(String::as_str) != Some("if") =>
                {
                    self.bump();
                    captures = classified.captures;
                    branch_line = next_line;
                }
                _ => break,
            }
        }

        condition.span.end_line = self.last_line.max(line_number);
        condition
    }

    fn expect_block_open(&mut self, header_line: usize) -> bool {
        self.skip_trivia();
        match self.peek() {
            Some(line) if line.shape() == LineShape::Open => {
                self.bump();
                true
            }
            _ => {
                self.diagnose(
                    CODE_MISSING_BLOCK,
                    "Expected '{' to open a block.",
                    header_line,
                );
                false
            }
        }
    }

    fn skip_trivia(&mut self) {
        while self.peek().is_some_and(SourceLine::is_trivia) {
            self.bump();
        }
    }

    fn allocate_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn peek(&self) -> Option<&'a SourceLine> {
        self.lines.get(self.cursor)
    }

    fn bump(&mut self) {
        if let Some(line) = self.lines.get(self.cursor) {
            self.last_line = line.line;
        }
        self.cursor += 1;
    }

    fn diagnose(&mut self, code: &str, message: impl Into<String>, line: usize) {
        self.diagnostics.push(Diagnostic {
            code: code.to_string(),
            message: message.into(),
            file: self.file_name.to_string(),
            line,
        });
    }
}
