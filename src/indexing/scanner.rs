use super::metadata;
use crate::core::config::{Settings, ALL_ENVIRONMENTS, DEFAULT_TITLE};
use crate::core::error::{Error, Result};
use crate::tree::node::{is_ignored_name, Node, NodeId, NodeKind, Tree};
use crate::tree::registry::Registry;
use ignore::WalkBuilder;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Id given to the root category unless its about-file names another
pub const ROOT_ID: &str = "root";

/// Parameters of a scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Display name of the root category
    pub title: String,
    /// Environment tag nodes must carry to be kept (`all` keeps everything)
    pub environment: String,
    /// Extensions of files surfaced as referencable attachments
    pub referencable_extensions: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl ScanOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            title: settings.title.clone(),
            environment: settings.environment.clone(),
            referencable_extensions: settings.referencable_extensions.clone(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }
}

/// Result of one scan: the node tree and the registry that indexes it
#[derive(Debug, Clone)]
pub struct Scan {
    pub tree: Tree,
    pub registry: Registry,
}

impl Scan {
    pub fn root(&self) -> &Node {
        self.tree.root()
    }

    /// Resolve an id or relative id to a node of this scan
    pub fn resolve(&self, key: &str) -> Result<&Node> {
        let handle = self.registry.resolve(key)?;
        self.tree
            .get(handle)
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    pub fn all_ids(&self) -> Vec<&str> {
        self.registry.all_ids()
    }
}

/// Build the node tree under `root` breadth-first
pub fn scan(root: &Path, options: &ScanOptions) -> Result<Scan> {
    if !root.is_dir() {
        return Err(Error::Config(format!(
            "Directory does not exist: {}",
            root.display()
        )));
    }
    let root_path = root.canonicalize()?;

    let title = if options.title.is_empty() {
        DEFAULT_TITLE
    } else {
        options.title.as_str()
    };
    let mut root_node = Node::new(&root_path, NodeKind::Category, 0, title);
    root_node.id = ROOT_ID.to_string();
    let todos = metadata::read(&mut root_node)?;

    let mut tree = Tree::new(root_node);
    let mut registry = Registry::new();
    let root_id = tree.root().handle();
    register(&mut registry, &tree, root_id);
    attach_todos(&mut tree, &mut registry, root_id, todos);

    let mut visited = HashSet::from([root_path]);
    let mut queue = VecDeque::from([root_id]);

    while let Some(category_id) = queue.pop_front() {
        let Some(category) = tree.get(category_id) else {
            continue;
        };
        let (dir, level) = (category.path.clone(), category.level);

        for path in list_children(&dir) {
            let Some(kind) = NodeKind::detect(&path, &options.referencable_extensions) else {
                continue;
            };
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            let mut child = Node::new(&path, kind, level + 1, name.clone());
            child.id = name;
            let todos = metadata::read(&mut child)?;

            if options.environment != ALL_ENVIRONMENTS
                && !child.matches_environment(&options.environment)
            {
                debug!(
                    "Skipping {} outside environment {}",
                    path.display(),
                    options.environment
                );
                continue;
            }

            if kind == NodeKind::Category {
                let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
                if !visited.insert(canonical) {
                    warn!("Skipping already visited directory {}", path.display());
                    continue;
                }
            }

            if let Some(category) = tree.get(category_id) {
                assign_ids(&tree, &registry, category, &mut child);
            }
            let child_id = tree.attach(category_id, child);
            register(&mut registry, &tree, child_id);
            attach_todos(&mut tree, &mut registry, child_id, todos);

            if kind == NodeKind::Category {
                queue.push_back(child_id);
            }
        }
    }

    debug!(
        "Scanned {} nodes under {}",
        tree.len(),
        tree.root().path.display()
    );
    Ok(Scan { tree, registry })
}

fn register(registry: &mut Registry, tree: &Tree, handle: NodeId) {
    if let Some(node) = tree.get(handle) {
        registry.register(&node.id, &node.relative_id, handle);
    }
}

/// Keep a child's id unique among its siblings and its relative id unique in the scan
fn assign_ids(tree: &Tree, registry: &Registry, parent: &Node, child: &mut Node) {
    let taken = |id: &str| tree.children(parent).any(|sibling| sibling.id == id);

    if taken(&child.id) {
        let file_name = child.file_name();
        let fallback = if taken(&file_name) {
            (2..)
                .map(|suffix| format!("{file_name}-{suffix}"))
                .find(|candidate| !taken(candidate))
                .unwrap_or_else(|| file_name.clone())
        } else {
            file_name.clone()
        };
        warn!(
            "Id {} is already used in {}, using {} for {}",
            child.id,
            parent.relative_id,
            fallback,
            child.path.display()
        );
        child.id = fallback;
    }

    let base = format!("{}.{}", parent.relative_id, child.id);
    child.relative_id = registry.free_relative_id(&base);
    if child.relative_id != base {
        warn!(
            "Relative id {} is already used, using {} for {}",
            base,
            child.relative_id,
            child.path.display()
        );
    }
}

/// Attach synthetic todo entries, numbering their relative ids
///
/// Todo keys use `#` (`<category>.todo#<n>`) so they stay apart from the
/// dot-joined path segments of real nodes.
fn attach_todos(tree: &mut Tree, registry: &mut Registry, category: NodeId, todos: Vec<Node>) {
    let Some(prefix) = tree.get(category).map(|c| c.relative_id.clone()) else {
        return;
    };
    for (ordinal, mut item) in todos.into_iter().enumerate() {
        item.relative_id = registry.free_relative_id(&format!("{}.todo#{}", prefix, ordinal + 1));
        let handle = tree.attach(category, item);
        register(registry, tree, handle);
    }
}

/// Directory listing in file-name order, without hidden or reserved names
fn list_children(dir: &Path) -> Vec<PathBuf> {
    let walker = WalkBuilder::new(dir)
        .max_depth(Some(1))
        .hidden(true)
        .git_ignore(true)
        .git_exclude(true)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut children = Vec::new();
    for result in walker {
        match result {
            Ok(entry) => {
                if entry.depth() == 0 {
                    continue;
                }
                let name = entry.file_name().to_string_lossy();
                if is_ignored_name(&name) {
                    continue;
                }
                children.push(entry.into_path());
            }
            Err(err) => {
                warn!("Failed to access entry in {}: {}", dir.display(), err);
            }
        }
    }
    children
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_list_children_sorted_and_filtered() {
        let temp_dir = TempDir::new().unwrap();
        let dir = &temp_dir.path().join("kb");
        fs::create_dir(dir).unwrap();
        fs::write(dir.join("b.md"), "# B").unwrap();
        fs::write(dir.join("a.md"), "# A").unwrap();
        fs::write(dir.join("index.md"), "generated").unwrap();
        fs::write(dir.join("todo.md"), "- [ ] x").unwrap();
        fs::write(dir.join(".hidden.md"), "# H").unwrap();
        fs::create_dir(dir.join("sub")).unwrap();

        let names: Vec<_> = list_children(dir)
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.md", "b.md", "sub"]);
    }

    #[test]
    fn test_scan_missing_root() {
        let result = scan(Path::new("/nonexistent/kb"), &ScanOptions::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_root_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let result = scan(temp_dir.path(), &ScanOptions::default().with_title("Notes")).unwrap();

        assert_eq!(result.root().name, "Notes");
        assert_eq!(result.root().id, ROOT_ID);
        assert_eq!(result.root().level, 0);
        assert_eq!(result.all_ids(), vec![ROOT_ID]);
    }
}
