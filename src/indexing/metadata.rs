//! Metadata extraction from about-files, entry text and todo checklists.
//!
//! Two about-file conventions are supported and picked by which file is
//! present: `about.yml`/`about.yaml` holds a YAML mapping, `about.md` holds
//! plain text with a `#` title and `Created:`/`Due:`/`Id:` lines.

use crate::core::error::{Error, Result};
use crate::tree::node::{Completion, Node, NodeKind};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Date pattern used by every metadata field (`DD.MM.YYYY`)
pub const DATE_FORMAT: &str = "%d.%m.%Y";

static CHECKBOX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-\s]*\[([xX_\s]?)\]").expect("checkbox pattern is valid"));

/// Which about-file convention a category uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AboutFormat {
    Yaml,
    Text,
}

/// Locate the about-file of a category directory
pub fn find_about(dir: &Path) -> Option<(PathBuf, AboutFormat)> {
    [
        ("about.yml", AboutFormat::Yaml),
        ("about.yaml", AboutFormat::Yaml),
        ("about.md", AboutFormat::Text),
    ]
    .into_iter()
    .map(|(name, format)| (dir.join(name), format))
    .find(|(path, _)| path.is_file())
}

/// Split a leading checkbox off a line
///
/// Returns the completion state and the remaining text, or `None` when the
/// line does not start with a checkbox.
pub fn parse_checkbox(line: &str) -> Option<(Completion, &str)> {
    let captures = CHECKBOX.captures(line)?;
    let mark = captures.get(1).map(|m| m.as_str()).unwrap_or("");
    let rest = &line[captures.get(0)?.end()..];
    Some((Completion::from_mark(mark), rest.trim()))
}

pub fn parse_date(value: &str) -> std::result::Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
}

/// Assign a parsed date, logging and keeping the old value on failure
fn set_date(field: &mut Option<NaiveDate>, value: &str, label: &str, source: &Path) {
    match parse_date(value) {
        Ok(date) => *field = Some(date),
        Err(e) => error!(
            "Failed to parse {} date {:?} from {}: {}",
            label,
            value,
            source.display(),
            e
        ),
    }
}

/// Fill `node` from its files and return synthetic todo children, if any
pub fn read(node: &mut Node) -> Result<Vec<Node>> {
    match node.kind {
        NodeKind::Category => {
            if let Some((about, format)) = find_about(&node.path) {
                match format {
                    AboutFormat::Yaml => read_about_yaml(node, &about)?,
                    AboutFormat::Text => read_about_text(node, &about)?,
                }
            }
            let todo = node.todo_path();
            if todo.is_file() {
                read_todo(node, &todo)
            } else {
                Ok(Vec::new())
            }
        }
        NodeKind::Entry => {
            read_entry(node)?;
            Ok(Vec::new())
        }
        NodeKind::Referencable => Ok(Vec::new()),
    }
}

/// Render a YAML scalar as text
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Apply a structured about-file
pub fn read_about_yaml(node: &mut Node, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    let value: Value = match serde_yaml::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            warn!("Skipping malformed about-file {}: {}", path.display(), e);
            return Ok(());
        }
    };
    let Some(map) = value.as_mapping() else {
        debug!("About-file {} is not a mapping", path.display());
        return Ok(());
    };
    let text = |key: &str| map.get(key).and_then(scalar).filter(|s| !s.is_empty());

    if let Some(name) = text("name") {
        node.name = name;
    }
    if let Some(id) = text("id") {
        node.id = id;
    }
    node.short_description = text("short").unwrap_or_default();
    node.description = text("description").unwrap_or_default();

    if let Some(files) = map.get("files").and_then(Value::as_mapping) {
        for (file, description) in files {
            if let (Some(file), Some(description)) = (scalar(file), scalar(description)) {
                node.files_metadata.insert(file, description);
            }
        }
    }

    if let Some(environments) = map.get("environments").and_then(Value::as_sequence) {
        node.environments = environments.iter().filter_map(scalar).collect();
    }

    if let Some(created_at) = text("created_at") {
        set_date(&mut node.created_at, &created_at, "created_at", path);
    }
    if let Some(due_to) = text("due_to") {
        set_date(&mut node.due_to, &due_to, "due_to", path);
    }

    Ok(())
}

/// Apply a plain-text about-file
pub fn read_about_text(node: &mut Node, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    let mut name = None;
    let mut id = None;
    let mut created = None;
    let mut due = None;
    let mut description = Vec::new();

    for line in content.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if name.is_none() && line.starts_with('#') {
            name = Some(line.trim_start_matches('#').trim().to_string());
        } else if let Some(value) = line.strip_prefix("Created:") {
            created.get_or_insert(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Due:") {
            due.get_or_insert(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Id:") {
            id.get_or_insert(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Environments:") {
            node.environments = value
                .split(',')
                .map(|env| env.trim().to_string())
                .filter(|env| !env.is_empty())
                .collect();
        } else {
            description.push(line);
        }
    }

    if let Some(name) = name.filter(|n| !n.is_empty()) {
        node.name = name;
    }
    if let Some(id) = id.filter(|i| !i.is_empty()) {
        node.id = id;
    }
    if let Some(created) = created {
        set_date(&mut node.created_at, &created, "created_at", path);
    }
    if let Some(due) = due {
        set_date(&mut node.due_to, &due, "due_to", path);
    }
    node.short_description = description.first().map(|s| s.to_string()).unwrap_or_default();
    node.description = description.join("\n");

    Ok(())
}

fn is_description_start(c: char) -> bool {
    if matches!(c, '[' | ']' | '(' | ')') {
        return true;
    }
    !(c.is_ascii_punctuation() || c.is_ascii_digit() || c.is_whitespace())
}

/// Metadata found in an entry's text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryText {
    pub name: Option<String>,
    pub complete: Completion,
    pub description: Option<String>,
}

/// Scan entry text for its title line and first prose line
pub fn parse_entry_text(content: &str) -> EntryText {
    let mut heading: Option<&str> = None;
    let mut description: Option<&str> = None;

    for line in content.lines() {
        if heading.is_none() && line.starts_with('#') {
            // Any heading level names the entry, `## Sub` as well as `# Sub`
            heading = Some(line.trim_start_matches('#'));
        } else if description.is_none()
            && line.chars().next().is_some_and(is_description_start)
        {
            description = Some(line.trim());
        }
        if heading.is_some() && description.is_some() {
            break;
        }
    }

    let mut parsed = EntryText {
        description: description.map(str::to_string),
        ..EntryText::default()
    };
    if let Some(heading) = heading {
        let heading = heading.trim();
        match parse_checkbox(heading) {
            Some((complete, rest)) => {
                parsed.complete = complete;
                parsed.name = Some(rest.to_string());
            }
            None => parsed.name = Some(heading.to_string()),
        }
    }
    parsed
}

/// Read an entry file; failing to read it is fatal
pub fn read_entry(node: &mut Node) -> Result<()> {
    let content = std::fs::read_to_string(&node.path).map_err(|source| Error::Entry {
        path: node.path.clone(),
        source,
    })?;

    node.id = node.file_name();
    let parsed = parse_entry_text(&content);
    if let Some(name) = parsed.name.filter(|n| !n.is_empty()) {
        node.name = name;
    }
    node.complete = parsed.complete;
    if let Some(description) = parsed.description {
        node.short_description = description.clone();
        node.description = description;
    }
    Ok(())
}

/// Turn every checklist line of a todo-file into a synthetic entry
pub fn read_todo(category: &Node, todo: &Path) -> Result<Vec<Node>> {
    let content = std::fs::read_to_string(todo)?;
    let items = content
        .lines()
        .filter_map(parse_checkbox)
        .map(|(complete, text)| {
            let mut item = Node::new(todo, NodeKind::Entry, category.level + 1, text);
            item.id = format!("{}.todo", category.id);
            item.complete = complete;
            item
        })
        .collect();
    Ok(items)
}
