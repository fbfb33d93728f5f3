//! Display order of a category's children.

use super::node::{Completion, Node};
use std::cmp::Ordering;

/// Rank of an entry's completion state: in progress first, done last
pub fn completion_priority(complete: Completion) -> u8 {
    match complete {
        Completion::Incomplete => 1,
        Completion::Unset => 2,
        Completion::Complete => 3,
    }
}

/// Compare two nodes of the same kind
///
/// Entries sort by completion priority and then file name; everything else
/// by file name alone.
pub fn compare(a: &Node, b: &Node) -> Ordering {
    let by_name = || a.path.file_name().cmp(&b.path.file_name());
    if a.is_entry() && b.is_entry() {
        completion_priority(a.complete)
            .cmp(&completion_priority(b.complete))
            .then_with(by_name)
    } else {
        by_name()
    }
}

/// Collect into a freshly sorted vector; the source order is not touched
pub fn sorted<'a>(nodes: impl Iterator<Item = &'a Node>) -> Vec<&'a Node> {
    let mut nodes: Vec<&Node> = nodes.collect();
    nodes.sort_by(|a, b| compare(a, b));
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::node::NodeKind;

    fn node(name: &str, kind: NodeKind, complete: Completion) -> Node {
        let mut node = Node::new(format!("/kb/{name}"), kind, 1, name);
        node.complete = complete;
        node
    }

    #[test]
    fn test_entries_by_priority_then_name() {
        let nodes = vec![
            node("d.md", NodeKind::Entry, Completion::Complete),
            node("c.md", NodeKind::Entry, Completion::Unset),
            node("b.md", NodeKind::Entry, Completion::Incomplete),
            node("a.md", NodeKind::Entry, Completion::Unset),
            node("e.md", NodeKind::Entry, Completion::Incomplete),
        ];

        let order: Vec<_> = sorted(nodes.iter()).iter().map(|n| n.name.as_str()).collect();
        assert_eq!(order, vec!["b.md", "e.md", "a.md", "c.md", "d.md"]);
    }

    #[test]
    fn test_categories_by_name_only() {
        let nodes = vec![
            node("zeta", NodeKind::Category, Completion::Unset),
            node("alpha", NodeKind::Category, Completion::Complete),
            node("mid", NodeKind::Category, Completion::Incomplete),
        ];

        let order: Vec<_> = sorted(nodes.iter()).iter().map(|n| n.name.as_str()).collect();
        assert_eq!(order, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_sorting_keeps_source_order() {
        let nodes = vec![
            node("b.pdf", NodeKind::Referencable, Completion::Unset),
            node("a.pdf", NodeKind::Referencable, Completion::Unset),
        ];
        let _ = sorted(nodes.iter());
        assert_eq!(nodes[0].name, "b.pdf");
    }
}
