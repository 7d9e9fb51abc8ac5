use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::value::DlgValue;

pub type NodeId = usize;

/// Scene that runs once, before anything else, the first time its tree loads.
pub const DEFAULT_INIT_SCENE_NAME: &str = "init";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSpan {
    pub start_line: usize,
    pub end_line: usize,
}

impl SourceSpan {
    pub fn line(line: usize) -> Self {
        Self {
            start_line: line,
            end_line: line,
        }
    }

    pub fn synthetic() -> Self {
        Self::line(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Dialogue,
    Command,
    Assignment,
    Jump,
    Input,
    Choice,
    ChoiceBranch,
    Condition,
    ConditionBranch,
}

impl NodeKind {
    pub fn is_branch(self) -> bool {
        matches!(self, Self::ChoiceBranch | Self::ConditionBranch)
    }

    pub fn is_container(self) -> bool {
        matches!(self, Self::Choice | Self::Condition)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Dialogue => "dialogue",
            Self::Command => "command",
            Self::Assignment => "assignment",
            Self::Jump => "jump",
            Self::Input => "input",
            Self::Choice => "choice",
            Self::ChoiceBranch => "choiceBranch",
            Self::Condition => "condition",
            Self::ConditionBranch => "conditionBranch",
        }
    }
}

/// One compiled unit of script behavior.
///
/// `data` holds the fields captured by the line classifier:
///
/// | kind              | data                          |
/// |-------------------|-------------------------------|
/// | `Dialogue`        | `[speaker, text]`             |
/// | `Command`         | `[command_text]`              |
/// | `Assignment`      | `[variable, operator, expr]`  |
/// | `Jump`            | `[scene]`                     |
/// | `Input`           | `[prompt, variable]`          |
/// | `Choice`          | `[prompt]`                    |
/// | `ChoiceBranch`    | `[text]`                      |
/// | `Condition`       | `[]`                          |
/// | `ConditionBranch` | `[keyword, expr]`             |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub data: Vec<String>,
    pub next_id: Option<NodeId>,
    pub max_id: NodeId,
    pub span: SourceSpan,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind, data: Vec<String>, span: SourceSpan) -> Self {
        Self {
            id,
            kind,
            data,
            next_id: None,
            max_id: id,
            span,
            children: Vec::new(),
        }
    }

    pub fn field(&self, index: usize) -> &str {
        self.data.get(index).map(String::as_str).unwrap_or("")
    }

    /// Pre-order walk over this node and its descendants.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Node, Option<&'a Node>)) {
        fn walk_inner<'a>(
            node: &'a Node,
            parent: Option<&'a Node>,
            visit: &mut dyn FnMut(&'a Node, Option<&'a Node>),
        ) {
            visit(node, parent);
            for child in &node.children {
                walk_inner(child, Some(node), visit);
            }
        }
        walk_inner(self, None, visit);
    }
}

/// Flat view of a node, registered once in [`Tree::initialize`].
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub data: Vec<String>,
    pub next_id: Option<NodeId>,
    pub parent_id: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub span: SourceSpan,
}

impl IndexedNode {
    pub fn field(&self, index: usize) -> &str {
        self.data.get(index).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub name: String,
    pub title: Option<String>,
    /// `None` for an empty scene.
    pub min_id: Option<NodeId>,
    pub max_id: Option<NodeId>,
    pub span: SourceSpan,
    pub nodes: Vec<Node>,
}

impl Scene {
    pub fn is_empty(&self) -> bool {
        self.min_id.is_none()
    }
}

/// Compiled form of one script file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tree {
    pub name: String,
    pub scenes: Vec<Scene>,
    #[serde(skip)]
    node_by_id: HashMap<NodeId, IndexedNode>,
}

impl Tree {
    pub fn new(name: impl Into<String>, scenes: Vec<Scene>) -> Self {
        let mut tree = Self {
            name: name.into(),
            scenes,
            node_by_id: HashMap::new(),
        };
        tree.initialize();
        tree
    }

    /// Rebuilds the flat id index. Must run again after any mutation of
    /// `scenes` and after deserialization.
    pub fn initialize(&mut self) {
        let mut index = HashMap::new();
        for scene in &self.scenes {
            for root in &scene.nodes {
                root.walk(&mut |node, parent| {
                    index.insert(
                        node.id,
                        IndexedNode {
                            id: node.id,
                            kind: node.kind,
                            data: node.data.clone(),
                            next_id: node.next_id,
                            parent_id: parent.map(|parent| parent.id),
                            children: node.children.iter().map(|child| child.id).collect(),
                            span: node.span,
                        },
                    );
                });
            }
        }
        self.node_by_id = index;
    }

    pub fn node(&self, id: NodeId) -> Option<&IndexedNode> {
        self.node_by_id.get(&id)
    }

    pub fn node_count(&self) -> usize {
        self.node_by_id.len()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids = self.node_by_id.keys().copied().collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }

    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.scenes.iter().find(|scene| scene.name == name)
    }

    pub fn scene_of_node(&self, id: NodeId) -> Option<&Scene> {
        self.scenes.iter().find(|scene| match (scene.min_id, scene.max_id) {
            (Some(min), Some(max)) => (min..=max).contains(&id),
            _ => false,
        })
    }
}

/// Output of a project compilation: every tree plus the scene→tree lookup
/// used to resolve jumps across files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledProject {
    pub trees: BTreeMap<String, Tree>,
    pub scene_lookup: BTreeMap<String, String>,
}

impl CompiledProject {
    pub fn initialize(&mut self) {
        for tree in self.trees.values_mut() {
            tree.initialize();
        }
    }

    pub fn tree(&self, name: &str) -> Option<&Tree> {
        self.trees.get(name)
    }

    pub fn tree_for_scene(&self, scene: &str) -> Option<&Tree> {
        self.scene_lookup
            .get(scene)
            .and_then(|tree_name| self.trees.get(tree_name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: String,
    pub message: String,
    pub file: String,
    pub line: usize,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}: {}", self.file, self.line, self.code, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRange {
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
}

/// A selectable option, materialized when a `Choice` node executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub index: usize,
    pub text: String,
    pub branch_id: NodeId,
    pub target_id: Option<NodeId>,
    pub source: SourceRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceItem {
    pub index: usize,
    pub text: String,
}

impl From<&Choice> for ChoiceItem {
    fn from(choice: &Choice) -> Self {
        Self {
            index: choice.index,
            text: choice.text.clone(),
        }
    }
}

/// What a presenter or command registry observed, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RuntimeEvent {
    Dialogue {
        speaker: Option<String>,
        text: String,
    },
    Command {
        name: String,
        args: Vec<String>,
    },
    Choices {
        #[serde(rename = "promptText")]
        prompt_text: Option<String>,
        items: Vec<ChoiceItem>,
    },
    Input {
        #[serde(rename = "promptText")]
        prompt_text: String,
        #[serde(rename = "defaultText")]
        default_text: String,
    },
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerSnapshot {
    pub schema_version: String,
    pub tree: String,
    pub scene: String,
    pub node_id: NodeId,
    pub variables: BTreeMap<String, DlgValue>,
    pub initialized_trees: Vec<String>,
}

#[cfg(test)]
mod types_tests {
    use super::*;

    fn leaf(id: NodeId) -> Node {
        Node::new(
            id,
            NodeKind::Dialogue,
            vec![String::new(), format!("line {}", id)],
            SourceSpan::line(id + 1),
        )
    }

    fn sample_tree() -> Tree {
        let mut branch = Node::new(
            1,
            NodeKind::ChoiceBranch,
            vec!["A".to_string()],
            SourceSpan::line(2),
        );
        branch.children.push(leaf(2));
        let mut choice = Node::new(0, NodeKind::Choice, vec![String::new()], SourceSpan::line(1));
        choice.children.push(branch);
        Tree::new(
            "main",
            vec![Scene {
                name: "start".to_string(),
                title: None,
                min_id: Some(0),
                max_id: Some(3),
                span: SourceSpan::line(1),
                nodes: vec![choice, leaf(3)],
            }],
        )
    }

    #[test]
    fn initialize_indexes_every_node_with_parent_ids() {
        let tree = sample_tree();
        assert_eq!(tree.node_ids(), vec![0, 1, 2, 3]);
        assert_eq!(tree.node(2).and_then(|node| node.parent_id), Some(1));
        assert_eq!(tree.node(0).map(|node| node.children.clone()), Some(vec![1]));
        assert!(tree.node(3).and_then(|node| node.parent_id).is_none());
        assert!(tree.node(9).is_none());
    }

    #[test]
    fn index_is_rebuilt_after_deserialization() {
        let tree = sample_tree();
        let json = serde_json::to_string(&tree).expect("tree should serialize");
        let mut restored: Tree = serde_json::from_str(&json).expect("tree should deserialize");
        assert_eq!(restored.node_count(), 0);
        restored.initialize();
        assert_eq!(restored, tree);
    }

    #[test]
    fn scene_lookup_resolves_tree() {
        let mut project = CompiledProject::default();
        project.trees.insert("main".to_string(), sample_tree());
        project
            .scene_lookup
            .insert("start".to_string(), "main".to_string());
        assert_eq!(project.tree_for_scene("start").map(|tree| tree.name.as_str()), Some("main"));
        assert!(project.tree_for_scene("missing").is_none());
        assert_eq!(
            project
                .tree("main")
                .and_then(|tree| tree.scene_of_node(2))
                .map(|scene| scene.name.as_str()),
            Some("start")
        );
    }

    #[test]
    fn runtime_event_serializes_with_kind_tag() {
        let json = serde_json::to_string(&RuntimeEvent::Command {
            name: "play".to_string(),
            args: vec!["bgm".to_string()],
        })
        .expect("event should serialize");
        assert_eq!(json, r#"{"kind":"command","name":"play","args":["bgm"]}"#);
    }
}
