use super::node::NodeId;
use crate::core::error::{Error, Result};
use indexmap::IndexMap;

/// Lookup from ids and relative ids to nodes of one scan
///
/// Keys map to [`NodeId`] handles rather than nodes, so a registry never
/// keeps a tree alive and is dropped together with the scan that built it.
/// The first registration of a key wins; later collisions are ignored.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    by_relative_id: IndexMap<String, NodeId>,
    by_id: IndexMap<String, NodeId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node under its local and relative id
    pub fn register(&mut self, id: &str, relative_id: &str, node: NodeId) {
        if !id.is_empty() {
            self.by_id.entry(id.to_string()).or_insert(node);
        }
        if !relative_id.is_empty() {
            self.by_relative_id
                .entry(relative_id.to_string())
                .or_insert(node);
        }
    }

    /// Resolve a relative id, falling back to a local id
    pub fn resolve(&self, key: &str) -> Result<NodeId> {
        self.by_relative_id
            .get(key)
            .or_else(|| self.by_id.get(key))
            .copied()
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.by_relative_id.contains_key(key) || self.by_id.contains_key(key)
    }

    pub fn has_relative_id(&self, relative_id: &str) -> bool {
        self.by_relative_id.contains_key(relative_id)
    }

    /// `base` itself or, when taken, the first free `base~2`, `base~3`, ...
    pub fn free_relative_id(&self, base: &str) -> String {
        if !self.has_relative_id(base) {
            return base.to_string();
        }
        (2..)
            .map(|suffix| format!("{base}~{suffix}"))
            .find(|candidate| !self.has_relative_id(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    /// Every registered key, relative ids first, in registration order
    pub fn all_ids(&self) -> Vec<&str> {
        self.by_relative_id
            .keys()
            .chain(
                self.by_id
                    .keys()
                    .filter(|key| !self.by_relative_id.contains_key(key.as_str())),
            )
            .map(String::as_str)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.all_ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_relative_id.is_empty() && self.by_id.is_empty()
    }
}
