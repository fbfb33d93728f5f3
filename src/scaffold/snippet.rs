//! Scaffolding of new categories and entries from snippet prototypes.
//!
//! A snippet is described by `<snippets_dir>/<name>.ini`:
//!
//! ```ini
//! [Snippet]
//! ; file or directory under the snippets dir
//! prototype = project
//! ; comma separated, `name` is always first
//! required = type
//! optional = tag
//! ; omit to take the destination from the args
//! destination_id = projects
//! ```
//!
//! The same `[Snippet]` table is also accepted as `<name>.toml`.

use crate::core::error::{Error, Result};
use crate::indexing::metadata::{self, DATE_FORMAT};
use crate::indexing::scanner::Scan;
use crate::render::engine::{write_atomic, TemplateEngine, TemplateRenderer};
use crate::tree::node::{Node, NodeKind};
use indexmap::IndexMap;
use ini::Ini;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Parameter every snippet requires
pub const NAME_PARAM: &str = "name";

/// Descriptor extensions, in lookup order
const DESCRIPTOR_EXTENSIONS: [&str; 2] = ["ini", "toml"];

const SECTION: &str = "Snippet";

#[derive(Debug, Deserialize)]
struct DescriptorFile {
    #[serde(rename = "Snippet")]
    snippet: Section,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Section {
    prototype: String,
    required: String,
    optional: String,
    destination_id: String,
}

/// Split a comma-separated parameter list into normalized names
pub fn split_words(src: &str) -> Vec<String> {
    src.split(',')
        .map(|word| word.trim().to_lowercase())
        .filter(|word| !word.is_empty())
        .collect()
}

/// A loaded snippet descriptor
#[derive(Debug, Clone)]
pub struct Snippet {
    pub name: String,
    pub prototype: PathBuf,
    pub required: Vec<String>,
    pub optional: Vec<String>,
    pub destination_id: Option<String>,
}

impl Snippet {
    /// Load `<snippets_dir>/<name>.ini`, or `<name>.toml` when there is no INI descriptor
    pub fn load(snippets_dir: &Path, name: &str) -> Result<Self> {
        let Some((path, extension)) = DESCRIPTOR_EXTENSIONS
            .iter()
            .map(|ext| (snippets_dir.join(format!("{name}.{ext}")), *ext))
            .find(|(path, _)| path.is_file())
        else {
            return Err(Error::Snippet(format!(
                "No snippet {} in {}",
                name,
                snippets_dir.display()
            )));
        };

        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::Snippet(format!("Cannot read snippet {}: {}", path.display(), e))
        })?;
        match extension {
            "toml" => Self::parse_toml(snippets_dir, name, &content),
            _ => Self::parse_ini(snippets_dir, name, &content),
        }
    }

    /// Parse an INI descriptor; values are unquoted (`required = name, type`)
    pub fn parse_ini(snippets_dir: &Path, name: &str, content: &str) -> Result<Self> {
        let ini = Ini::load_from_str(content)
            .map_err(|e| Error::Snippet(format!("Invalid snippet {}: {}", name, e)))?;
        let properties = ini.section(Some(SECTION)).ok_or_else(|| {
            Error::Snippet(format!("Snippet {} has no [{}] section", name, SECTION))
        })?;
        let value = |key: &str| properties.get(key).unwrap_or_default().to_string();

        let section = Section {
            prototype: value("prototype"),
            required: value("required"),
            optional: value("optional"),
            destination_id: value("destination_id"),
        };
        Self::from_section(snippets_dir, name, section)
    }

    pub fn parse_toml(snippets_dir: &Path, name: &str, content: &str) -> Result<Self> {
        let file: DescriptorFile = toml::from_str(content)
            .map_err(|e| Error::Snippet(format!("Invalid snippet {}: {}", name, e)))?;
        Self::from_section(snippets_dir, name, file.snippet)
    }

    fn from_section(snippets_dir: &Path, name: &str, section: Section) -> Result<Self> {
        if section.prototype.trim().is_empty() {
            return Err(Error::Snippet(format!("Snippet {} has no prototype", name)));
        }

        let mut required = vec![NAME_PARAM.to_string()];
        required.extend(
            split_words(&section.required)
                .into_iter()
                .filter(|word| word != NAME_PARAM),
        );
        let destination_id =
            Some(section.destination_id.trim().to_string()).filter(|id| !id.is_empty());

        Ok(Self {
            name: name.to_string(),
            prototype: snippets_dir.join(section.prototype.trim()),
            required,
            optional: split_words(&section.optional),
            destination_id,
        })
    }

    /// A directory prototype creates a new subcategory
    pub fn is_category(&self) -> bool {
        self.prototype.is_dir()
    }

    /// Parameter sequence as shown to users, e.g. `name, type [tag]`
    pub fn expected(&self) -> String {
        let mut expected = self.required.join(", ");
        if !self.optional.is_empty() {
            expected.push_str(&format!(" [{}]", self.optional.join(", ")));
        }
        if self.destination_id.is_none() {
            expected.insert_str(0, "destination, ");
        }
        expected
    }

    /// Zip positional values onto the parameter names
    pub fn bind(&self, values: &[String]) -> Result<IndexMap<String, String>> {
        let params: IndexMap<String, String> = self
            .required
            .iter()
            .chain(self.optional.iter())
            .cloned()
            .zip(values.iter().cloned())
            .collect();

        let missing: Vec<String> = self
            .required
            .iter()
            .filter(|param| !params.contains_key(*param))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(self.missing(missing));
        }
        Ok(params)
    }

    fn missing(&self, missing: Vec<String>) -> Error {
        error!("Missing required params: {}", missing.join(", "));
        info!("Params sequence: {}", self.expected());
        Error::MissingParameters {
            missing,
            expected: self.expected(),
        }
    }

    /// Prototype templates, sorted by file name
    fn templates(&self) -> Result<Vec<PathBuf>> {
        if !self.is_category() {
            if !self.prototype.is_file() {
                return Err(Error::Snippet(format!(
                    "Prototype {} does not exist",
                    self.prototype.display()
                )));
            }
            return Ok(vec![self.prototype.clone()]);
        }

        let mut templates: Vec<PathBuf> = std::fs::read_dir(&self.prototype)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "md"))
            .collect();
        templates.sort();
        Ok(templates)
    }
}

/// A rendered name must stay a single entry inside its destination directory
fn check_file_name(what: &str, name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(Error::Snippet(format!("Invalid {} {:?}", what, name)));
    }
    Ok(())
}

/// Creates nodes on disk from snippets
pub struct SnippetInstantiator<R = TemplateEngine> {
    snippets_dir: PathBuf,
    engine: R,
}

impl SnippetInstantiator<TemplateEngine> {
    pub fn new(snippets_dir: impl Into<PathBuf>) -> Self {
        let snippets_dir = snippets_dir.into();
        let engine = TemplateEngine::from_dir(&snippets_dir);
        Self::with_engine(snippets_dir, engine)
    }
}

impl<R: TemplateRenderer> SnippetInstantiator<R> {
    pub fn with_engine(snippets_dir: impl Into<PathBuf>, engine: R) -> Self {
        Self {
            snippets_dir: snippets_dir.into(),
            engine,
        }
    }

    /// Names of every descriptor in the snippets directory
    pub fn available(&self) -> Result<Vec<String>> {
        if !self.snippets_dir.is_dir() {
            return Ok(Vec::new());
        }
        let names: BTreeSet<String> = std::fs::read_dir(&self.snippets_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| DESCRIPTOR_EXTENSIONS.iter().any(|known| ext == *known))
            })
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        Ok(names.into_iter().collect())
    }

    /// Instantiate `snippet_name` with positional `args`
    ///
    /// The destination is the snippet's fixed id or, when it has none, the
    /// first argument. Nothing is written unless every required parameter is
    /// present and every template renders. New nodes are appended to the
    /// scan's tree but not registered; re-scan to look them up by id.
    pub fn create(
        &self,
        scan: &mut Scan,
        snippet_name: &str,
        args: &[String],
    ) -> Result<Vec<PathBuf>> {
        let snippet = Snippet::load(&self.snippets_dir, snippet_name)?;

        let (destination_key, values) = match &snippet.destination_id {
            Some(id) => (id.clone(), args),
            None => match args.split_first() {
                Some((first, rest)) => (first.clone(), rest),
                None => return Err(snippet.missing(vec!["destination".to_string()])),
            },
        };

        let destination = scan.resolve(&destination_key)?;
        if !destination.is_category() {
            return Err(Error::Snippet(format!(
                "Destination {} is not a category",
                destination_key
            )));
        }
        let (destination_id, destination_dir) = (destination.handle(), destination.path.clone());

        let params = snippet.bind(values)?;
        let context = self.context(&params);

        let target_dir = if snippet.is_category() {
            let name = &params[NAME_PARAM];
            check_file_name("category name", name)?;
            destination_dir.join(name)
        } else {
            destination_dir.clone()
        };

        let mut outputs = Vec::new();
        let mut destinations = HashSet::new();
        for template in snippet.templates()? {
            let relative = template.strip_prefix(&self.snippets_dir).map_err(|_| {
                Error::Snippet(format!(
                    "Prototype {} is outside {}",
                    template.display(),
                    self.snippets_dir.display()
                ))
            })?;
            let content = self
                .engine
                .render(&relative.to_string_lossy(), &context)?;
            let file_name = template
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let file_name = self.engine.render_str(&file_name, &context)?;

            let file_name = file_name.trim();
            check_file_name("file name", file_name)?;

            let dest = target_dir.join(file_name);
            if dest.exists() {
                return Err(Error::Snippet(format!("{} already exists", dest.display())));
            }
            if !destinations.insert(dest.clone()) {
                return Err(Error::Snippet(format!(
                    "Several templates of {} render to {}",
                    snippet.name,
                    dest.display()
                )));
            }
            outputs.push((dest, content));
        }

        if snippet.is_category() {
            if target_dir.exists() {
                return Err(Error::Snippet(format!("{} already exists", target_dir.display())));
            }
            std::fs::create_dir(&target_dir)?;
        }
        for (dest, content) in &outputs {
            write_atomic(dest, content)?;
            info!("Created {}", dest.display());
        }

        let parent = if snippet.is_category() {
            let name = params[NAME_PARAM].clone();
            let mut category = Node::new(&target_dir, NodeKind::Category, 0, name.clone());
            category.id = name;
            scan.tree.attach(destination_id, category)
        } else {
            destination_id
        };
        for (dest, _) in &outputs {
            if NodeKind::detect(dest, &[]) == Some(NodeKind::Entry) {
                let file_name = dest
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let mut entry = Node::new(dest, NodeKind::Entry, 0, file_name);
                metadata::read_entry(&mut entry)?;
                scan.tree.attach(parent, entry);
            }
        }

        let mut created: Vec<PathBuf> = outputs.into_iter().map(|(dest, _)| dest).collect();
        if snippet.is_category() {
            created.insert(0, target_dir);
        }
        Ok(created)
    }

    fn context(&self, params: &IndexMap<String, String>) -> Value {
        let mut context = Map::new();
        context.insert(
            "today".to_string(),
            Value::String(chrono::Local::now().date_naive().format(DATE_FORMAT).to_string()),
        );
        for (key, value) in params {
            context.insert(key.clone(), Value::String(value.clone()));
        }
        Value::Object(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_words() {
        assert_eq!(split_words(" Type, ,TAG ,"), vec!["type", "tag"]);
        assert!(split_words("").is_empty());
    }

    #[test]
    fn test_parse_descriptor() {
        let snippet = Snippet::parse_toml(
            Path::new("/snippets"),
            "project",
            "[Snippet]\nprototype = \"project\"\nrequired = \"name, type\"\noptional = \"tag\"\n",
        )
        .unwrap();

        assert_eq!(snippet.prototype, Path::new("/snippets/project"));
        assert_eq!(snippet.required, vec!["name", "type"]);
        assert_eq!(snippet.optional, vec!["tag"]);
        assert_eq!(snippet.destination_id, None);
        assert_eq!(snippet.expected(), "destination, name, type [tag]");
    }

    #[test]
    fn test_parse_ini_descriptor() {
        let snippet = Snippet::parse_ini(
            Path::new("/snippets"),
            "project",
            "; project skeleton\n[Snippet]\nprototype = project\nrequired = Name, type\ndestination_id = projects\n",
        )
        .unwrap();

        assert_eq!(snippet.prototype, Path::new("/snippets/project"));
        assert_eq!(snippet.required, vec!["name", "type"]);
        assert!(snippet.optional.is_empty());
        assert_eq!(snippet.destination_id.as_deref(), Some("projects"));

        let result = Snippet::parse_ini(Path::new("/snippets"), "bad", "[Other]\nprototype = x\n");
        assert!(matches!(result, Err(Error::Snippet(_))));
    }

    #[test]
    fn test_check_file_name() {
        assert!(check_file_name("file name", "Groceries.md").is_ok());
        assert!(check_file_name("file name", "my notes.md").is_ok());
        for bad in ["", "../escaped.md", "a/b.md", "a\\b.md", "..", ".hidden.md"] {
            assert!(check_file_name("file name", bad).is_err(), "{bad:?} accepted");
        }
    }

    #[test]
    fn test_parse_descriptor_without_section() {
        let result = Snippet::parse_toml(Path::new("/snippets"), "bad", "prototype = \"x\"\n");
        assert!(matches!(result, Err(Error::Snippet(_))));
    }

    #[test]
    fn test_bind_reports_missing() {
        let snippet = Snippet::parse_toml(
            Path::new("/snippets"),
            "note",
            "[Snippet]\nprototype = \"note.md\"\nrequired = \"type\"\ndestination_id = \"inbox\"\n",
        )
        .unwrap();

        let params = snippet
            .bind(&["Groceries".to_string(), "list".to_string()])
            .unwrap();
        assert_eq!(params["name"], "Groceries");
        assert_eq!(params["type"], "list");

        match snippet.bind(&["Groceries".to_string()]) {
            Err(Error::MissingParameters { missing, expected }) => {
                assert_eq!(missing, vec!["type"]);
                assert_eq!(expected, "name, type");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
