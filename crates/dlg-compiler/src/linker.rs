use dlg_core::{Node, NodeId, Scene};

/// Fills in `max_id` and `next_id` for every node of a freshly built scene.
///
/// Top-level nodes chain to their next sibling. A container (`Choice`,
/// `Condition`) continues at `max_id + 1`, past its whole subtree. A branch
/// and the last statement of a branch body both exit the enclosing construct,
/// so they share the container's successor. Falling off the last top-level
/// node ends the scene (`None`).
pub(crate) fn link_scene(scene: &mut Scene) {
    for node in &mut scene.nodes {
        compute_max_id(node);
    }
    link_sequence(&mut scene.nodes, None);
}

fn compute_max_id(node: &mut Node) -> NodeId {
    let mut max_id = node.id;
    for child in &mut node.children {
        max_id = max_id.max(compute_max_id(child));
    }
    node.max_id = max_id;
    max_id
}

/// Links a run of statements whose fallthrough after the last one is `exit`.
fn link_sequence(nodes: &mut [Node], exit: Option<NodeId>) {
    let successors = nodes
        .iter()
        .skip(1)
        .map(|node| Some(node.id))
        .chain(std::iter::once(exit))
        .collect::<Vec<_>>();

    for (node, successor) in nodes.iter_mut().zip(successors) {
        node.next_id = successor;
        if node.kind.is_container() {
            for branch in &mut node.children {
                branch.next_id = successor;
                link_sequence(&mut branch.children, successor);
            }
        }
    }
}

#[cfg(test)]
mod linker_tests {
    use dlg_core::{NodeKind, SourceSpan};

    use super::*;

    fn node(id: NodeId, kind: NodeKind, children: Vec<Node>) -> Node {
        let mut node = Node::new(id, kind, Vec::new(), SourceSpan::line(id + 1));
        node.children = children;
        node
    }

    fn leaf(id: NodeId) -> Node {
        node(id, NodeKind::Dialogue, Vec::new())
    }

    fn scene(nodes: Vec<Node>) -> Scene {
        Scene {
            name: "s".to_string(),
            title: None,
            min_id: nodes.first().map(|node| node.id),
            max_id: None,
            span: SourceSpan::line(1),
            nodes,
        }
    }

    #[test]
    fn nested_branch_tail_exits_every_enclosing_construct() {
        // 0 choice
        //   1 branch: 2 leaf, 3 condition { 4 branch: 5 leaf }
        //   6 branch: 7 leaf
        // 8 leaf
        let inner = node(
            3,
            NodeKind::Condition,
            vec![node(4, NodeKind::ConditionBranch, vec![leaf(5)])],
        );
        let choice = node(
            0,
            NodeKind::Choice,
            vec![
                node(1, NodeKind::ChoiceBranch, vec![leaf(2), inner]),
                node(6, NodeKind::ChoiceBranch, vec![leaf(7)]),
            ],
        );
        let mut scene = scene(vec![choice, leaf(8)]);
        link_scene(&mut scene);

        let choice = &scene.nodes[0];
        assert_eq!(choice.max_id, 7);
        assert_eq!(choice.next_id, Some(8));
        let first = &choice.children[0];
        assert_eq!(first.next_id, Some(8));
        assert_eq!(first.children[0].next_id, Some(3));
        let condition = &first.children[1];
        assert_eq!(condition.max_id, 5);
        assert_eq!(condition.next_id, Some(8));
        assert_eq!(condition.children[0].next_id, Some(8));
        assert_eq!(condition.children[0].children[0].next_id, Some(8));
        assert_eq!(choice.children[1].children[0].next_id, Some(8));
        assert_eq!(scene.nodes[1].next_id, None);
    }

    #[test]
    fn trailing_container_ends_the_scene() {
        let condition = node(
            1,
            NodeKind::Condition,
            vec![node(2, NodeKind::ConditionBranch, vec![leaf(3)])],
        );
        let mut scene = scene(vec![leaf(0), condition]);
        link_scene(&mut scene);
        assert_eq!(scene.nodes[0].next_id, Some(1));
        assert_eq!(scene.nodes[1].next_id, None);
        assert_eq!(scene.nodes[1].children[0].children[0].next_id, None);
    }
}
