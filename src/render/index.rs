use super::engine::{write_atomic, TemplateEngine, TemplateRenderer};
use crate::core::error::{Error, Result};
use crate::indexing::metadata::DATE_FORMAT;
use crate::indexing::scanner::{scan, Scan, ScanOptions};
use crate::tree::node::{Node, Tree, INDEX_FILE};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

/// Template for the root and top-level categories
pub const CATEGORY_TEMPLATE: &str = "category.md";
/// Template for deeper subcategories
pub const SUBCATEGORY_TEMPLATE: &str = "subcategory.md";

/// Pick the index template for a category at `level`
pub fn template_for(level: usize) -> &'static str {
    if level < 2 {
        CATEGORY_TEMPLATE
    } else {
        SUBCATEGORY_TEMPLATE
    }
}

/// A child as seen from its category's index
#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    pub name: String,
    pub id: String,
    pub relative_id: String,
    pub file_name: String,
    pub link: String,
    pub short_description: String,
    pub description: String,
    pub file_description: String,
    /// File description if the parent has one, otherwise the short description
    pub summary: String,
    pub complete: Option<bool>,
    pub created_at: Option<String>,
    pub due_to: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrumbView {
    pub name: String,
    pub link: String,
}

/// Rendering context of one category index
#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    pub name: String,
    pub id: String,
    pub relative_id: String,
    pub level: usize,
    pub short_description: String,
    pub description: String,
    pub created_at: Option<String>,
    pub due_to: Option<String>,
    pub environments: Vec<String>,
    /// Ancestors from the root, excluding the category itself
    pub breadcrumbs: Vec<CrumbView>,
    pub subcategories: Vec<ItemView>,
    pub entries: Vec<ItemView>,
    pub nonactionable: Vec<ItemView>,
    pub incompleted: Vec<ItemView>,
    pub completed: Vec<ItemView>,
    pub referencable: Vec<ItemView>,
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn encode_link(link: &str) -> String {
    link.replace(' ', "%20")
}

fn item_view(tree: &Tree, category: &Node, node: &Node) -> ItemView {
    let relative = node
        .path
        .strip_prefix(&category.path)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| node.file_name());
    let link = if node.is_category() {
        format!("{}/{}", relative, INDEX_FILE)
    } else {
        relative
    };
    let file_description = tree.file_description(node).to_string();
    let summary = if file_description.is_empty() {
        node.short_description.clone()
    } else {
        file_description.clone()
    };

    ItemView {
        name: node.name.clone(),
        id: node.id.clone(),
        relative_id: node.relative_id.clone(),
        file_name: node.file_name(),
        link: encode_link(&link),
        short_description: node.short_description.clone(),
        description: node.description.clone(),
        file_description,
        summary,
        complete: node.complete.as_option(),
        created_at: format_date(node.created_at),
        due_to: format_date(node.due_to),
    }
}

/// Build the template context for `category`
pub fn category_view(tree: &Tree, category: &Node) -> CategoryView {
    let items = |nodes: Vec<&Node>| -> Vec<ItemView> {
        nodes
            .into_iter()
            .map(|node| item_view(tree, category, node))
            .collect()
    };

    let ancestors = tree.breadcrumbs(category);
    let depth = ancestors.len().saturating_sub(1);
    let breadcrumbs = ancestors
        .iter()
        .take(depth)
        .enumerate()
        .map(|(position, ancestor)| CrumbView {
            name: ancestor.name.clone(),
            link: format!("{}{}", "../".repeat(depth - position), INDEX_FILE),
        })
        .collect();

    CategoryView {
        name: category.name.clone(),
        id: category.id.clone(),
        relative_id: category.relative_id.clone(),
        level: category.level,
        short_description: category.short_description.clone(),
        description: category.description.clone(),
        created_at: format_date(category.created_at),
        due_to: format_date(category.due_to),
        environments: category.environments.iter().cloned().collect(),
        breadcrumbs,
        subcategories: items(tree.subcategories(category)),
        entries: items(tree.entries(category)),
        nonactionable: items(tree.nonactionable(category)),
        incompleted: items(tree.incompleted(category)),
        completed: items(tree.completed(category)),
        referencable: items(tree.referencable(category)),
    }
}

/// Counts reported by [`IndexRenderer::render`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub written: usize,
    pub unchanged: usize,
}

/// Writes and removes the `index.md` of every category
pub struct IndexRenderer<R = TemplateEngine> {
    engine: R,
}

impl<R: TemplateRenderer> IndexRenderer<R> {
    pub fn new(engine: R) -> Self {
        Self { engine }
    }

    /// Render every category breadth-first, replacing its index
    pub fn render(&self, tree: &Tree) -> Result<RenderStats> {
        let mut stats = RenderStats::default();

        for category in tree.categories() {
            let context = serde_json::to_value(category_view(tree, category))
                .map_err(|e| Error::Parsing(e.to_string()))?;
            let content = self.engine.render(template_for(category.level), &context)?;

            let index = category.index_path();
            if write_atomic(&index, &content)? {
                debug!("Wrote {}", index.display());
                stats.written += 1;
            } else {
                stats.unchanged += 1;
            }
        }

        info!(
            "Rendered indexes: {} written, {} unchanged",
            stats.written, stats.unchanged
        );
        Ok(stats)
    }

    /// Delete the index of every category; other files are left alone
    pub fn remove(&self, tree: &Tree) -> Result<usize> {
        let mut removed = 0;
        for category in tree.categories() {
            let index = category.index_path();
            if index.is_file() {
                std::fs::remove_file(&index)?;
                debug!("Removed {}", index.display());
                removed += 1;
            }
        }
        info!("Removed {} index files", removed);
        Ok(removed)
    }
}

/// Full rebuild: scan `root` and render every category index
pub fn scan_and_render<R: TemplateRenderer>(
    root: &Path,
    options: &ScanOptions,
    renderer: &IndexRenderer<R>,
) -> Result<(Scan, RenderStats)> {
    let scanned = scan(root, options)?;
    let stats = renderer.render(&scanned.tree)?;
    Ok((scanned, stats))
}

impl Default for IndexRenderer<TemplateEngine> {
    fn default() -> Self {
        Self::new(TemplateEngine::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::node::{Completion, NodeKind};

    fn tree() -> Tree {
        let mut root = Node::new("/kb", NodeKind::Category, 0, "Root");
        root.id = "root".to_string();
        root.files_metadata
            .insert("report.pdf".to_string(), "Annual report".to_string());
        let mut tree = Tree::new(root);
        let root_id = tree.root().handle();

        let mut work = Node::new("/kb/my work", NodeKind::Category, 1, "Work");
        work.id = "work".to_string();
        work.short_description = "Job stuff".to_string();
        let work_id = tree.attach(root_id, work);

        let mut deep = Node::new("/kb/my work/deep", NodeKind::Category, 2, "Deep");
        deep.id = "deep".to_string();
        tree.attach(work_id, deep);

        let mut done = Node::new("/kb/done.md", NodeKind::Entry, 1, "Done thing");
        done.id = "done.md".to_string();
        done.complete = Completion::Complete;
        tree.attach(root_id, done);

        let mut report = Node::new("/kb/report.pdf", NodeKind::Referencable, 1, "report.pdf");
        report.id = "report.pdf".to_string();
        tree.attach(root_id, report);
        tree
    }

    #[test]
    fn test_template_by_level() {
        assert_eq!(template_for(0), CATEGORY_TEMPLATE);
        assert_eq!(template_for(1), CATEGORY_TEMPLATE);
        assert_eq!(template_for(2), SUBCATEGORY_TEMPLATE);
    }

    #[test]
    fn test_view_links_and_summaries() {
        let tree = tree();
        let view = category_view(&tree, tree.root());

        assert!(view.breadcrumbs.is_empty());
        assert_eq!(view.subcategories[0].link, "my%20work/index.md");
        assert_eq!(view.subcategories[0].summary, "Job stuff");
        assert_eq!(view.completed[0].complete, Some(true));
        assert_eq!(view.referencable[0].summary, "Annual report");
        assert!(view.nonactionable.is_empty());
    }

    #[test]
    fn test_breadcrumb_links() {
        let tree = tree();
        let deep = tree.iter().find(|n| n.id == "deep").unwrap();
        let view = category_view(&tree, deep);

        let links: Vec<_> = view.breadcrumbs.iter().map(|c| c.link.as_str()).collect();
        assert_eq!(links, vec!["../../index.md", "../index.md"]);
        assert_eq!(view.breadcrumbs[1].name, "Work");
    }
}
