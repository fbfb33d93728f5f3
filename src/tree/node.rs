use super::ordering::sorted;
use crate::core::config::ALL_ENVIRONMENTS;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

/// Generated index document written into every category
pub const INDEX_FILE: &str = "index.md";

/// Category checklist sidecar
pub const TODO_FILE: &str = "todo.md";

/// Filenames that are never treated as content
pub const RESERVED_FILES: [&str; 5] = [INDEX_FILE, "about.md", "about.yml", "about.yaml", TODO_FILE];

/// Handle of a node inside the [`Tree`] that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Completion state of a node
///
/// `Unset` marks something that is not an actionable item at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Completion {
    #[default]
    Unset,
    Incomplete,
    Complete,
}

impl Completion {
    /// Map the inside of a checkbox (`x`, `X`, `_`, space or nothing)
    pub fn from_mark(mark: &str) -> Self {
        if mark.eq_ignore_ascii_case("x") {
            Completion::Complete
        } else {
            Completion::Incomplete
        }
    }

    pub fn as_option(self) -> Option<bool> {
        match self {
            Completion::Unset => None,
            Completion::Incomplete => Some(false),
            Completion::Complete => Some(true),
        }
    }
}

/// Filesystem kind of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Category,
    Entry,
    Referencable,
}

impl NodeKind {
    /// Classify a path; `None` for files that are neither notes nor allow-listed
    pub fn detect(path: &Path, referencable_extensions: &[String]) -> Option<Self> {
        if path.is_dir() {
            return Some(NodeKind::Category);
        }

        let ext = path.extension().and_then(|ext| ext.to_str())?;
        if ext == "md" {
            Some(NodeKind::Entry)
        } else if referencable_extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
        {
            Some(NodeKind::Referencable)
        } else {
            None
        }
    }
}

/// A category (directory) or an entry/referencable file
#[derive(Debug, Clone)]
pub struct Node {
    pub path: PathBuf,
    pub kind: NodeKind,
    pub level: usize,
    pub name: String,
    pub id: String,
    pub relative_id: String,
    pub short_description: String,
    pub description: String,
    pub created_at: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
    pub environments: BTreeSet<String>,
    pub complete: Completion,
    pub files_metadata: BTreeMap<String, String>,
    handle: NodeId,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    /// Create a detached node with default metadata
    pub fn new(path: impl Into<PathBuf>, kind: NodeKind, level: usize, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            level,
            name: name.into(),
            id: String::new(),
            relative_id: String::new(),
            short_description: String::new(),
            description: String::new(),
            created_at: None,
            due_to: None,
            environments: BTreeSet::from([ALL_ENVIRONMENTS.to_string()]),
            complete: Completion::Unset,
            files_metadata: BTreeMap::new(),
            handle: NodeId(0),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn handle(&self) -> NodeId {
        self.handle
    }

    pub fn parent_id(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion (traversal) order
    pub fn child_ids(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_category(&self) -> bool {
        self.kind == NodeKind::Category
    }

    pub fn is_entry(&self) -> bool {
        self.kind == NodeKind::Entry
    }

    pub fn is_referencable(&self) -> bool {
        self.kind == NodeKind::Referencable
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn index_path(&self) -> PathBuf {
        self.path.join(INDEX_FILE)
    }

    pub fn todo_path(&self) -> PathBuf {
        self.path.join(TODO_FILE)
    }

    /// Only the `all` filter is a wildcard; any other filter must be in the node's set
    pub fn matches_environment(&self, filter: &str) -> bool {
        filter == ALL_ENVIRONMENTS || self.environments.contains(filter)
    }
}

/// Whether a directory entry name must never become a node
pub fn is_ignored_name(name: &str) -> bool {
    name.starts_with('.') || RESERVED_FILES.contains(&name)
}

/// Node arena produced by one scan
///
/// Children are owned by index; parents are looked up through the same
/// arena, so the tree holds no reference cycles.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Start a tree from its root node
    pub fn new(mut root: Node) -> Self {
        root.handle = NodeId(0);
        root.parent = None;
        root.level = 0;
        if root.relative_id.is_empty() {
            root.relative_id = root.id.clone();
        }
        Self { nodes: vec![root] }
    }

    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Append `node` as the last child of `parent`
    ///
    /// The child's level is derived from the parent, and its relative id too
    /// unless one was already assigned.
    pub fn attach(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let handle = NodeId(self.nodes.len());
        let parent_node = &self.nodes[parent.0];

        node.handle = handle;
        node.parent = Some(parent);
        node.level = parent_node.level + 1;
        if node.relative_id.is_empty() {
            node.relative_id = format!("{}.{}", parent_node.relative_id, node.id);
        }

        self.nodes.push(node);
        self.nodes[parent.0].children.push(handle);
        handle
    }

    pub fn parent(&self, node: &Node) -> Option<&Node> {
        node.parent.and_then(|id| self.get(id))
    }

    /// Children in insertion order
    pub fn children<'a>(&'a self, node: &Node) -> impl Iterator<Item = &'a Node> + 'a {
        let ids = self
            .nodes
            .get(node.handle.0)
            .map(|owned| owned.children.as_slice())
            .unwrap_or_default();
        ids.iter().filter_map(move |id| self.get(*id))
    }

    pub fn subcategories(&self, node: &Node) -> Vec<&Node> {
        sorted(self.children(node).filter(|child| child.is_category()))
    }

    pub fn entries(&self, node: &Node) -> Vec<&Node> {
        sorted(self.children(node).filter(|child| child.is_entry()))
    }

    pub fn referencable(&self, node: &Node) -> Vec<&Node> {
        sorted(self.children(node).filter(|child| child.is_referencable()))
    }

    pub fn nonactionable(&self, node: &Node) -> Vec<&Node> {
        self.entries_with(node, Completion::Unset)
    }

    pub fn incompleted(&self, node: &Node) -> Vec<&Node> {
        self.entries_with(node, Completion::Incomplete)
    }

    pub fn completed(&self, node: &Node) -> Vec<&Node> {
        self.entries_with(node, Completion::Complete)
    }

    fn entries_with(&self, node: &Node, state: Completion) -> Vec<&Node> {
        self.entries(node)
            .into_iter()
            .filter(|entry| entry.complete == state)
            .collect()
    }

    /// Ancestor chain from the root down to `node` itself
    pub fn breadcrumbs<'a>(&'a self, node: &'a Node) -> Vec<&'a Node> {
        let mut chain = vec![node];
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Description of this node's file taken from the parent's about-file
    pub fn file_description(&self, node: &Node) -> &str {
        self.parent(node)
            .and_then(|parent| parent.files_metadata.get(&node.file_name()))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Categories of the subtree under `start` in breadth-first order
    pub fn categories_from<'a>(&'a self, start: &'a Node) -> Vec<&'a Node> {
        let mut ordered = Vec::new();
        let mut queue = VecDeque::from([start]);
        while let Some(category) = queue.pop_front() {
            queue.extend(self.subcategories(category));
            ordered.push(category);
        }
        ordered
    }

    /// Every category of the tree in breadth-first order
    pub fn categories(&self) -> Vec<&Node> {
        self.categories_from(self.root())
    }
}
