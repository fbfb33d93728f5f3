//! Template rendering and atomic file output.

use crate::core::error::Result;
use minijinja::Environment;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const BUILTIN_TEMPLATES: [(&str, &str); 2] = [
    ("category.md", include_str!("templates/category.md")),
    ("subcategory.md", include_str!("templates/subcategory.md")),
];

/// Renders a named template with a data context
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, context: &Value) -> Result<String>;

    /// Render an inline template source
    fn render_str(&self, source: &str, context: &Value) -> Result<String>;
}

/// minijinja environment with optional on-disk templates
///
/// A file `<dir>/<name>` takes precedence over a built-in template of the
/// same name.
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    env: Environment<'static>,
    dir: Option<PathBuf>,
}

impl TemplateEngine {
    /// Engine with the built-in index templates and no override directory
    pub fn new() -> Self {
        let mut env = Self::environment();
        for (name, source) in BUILTIN_TEMPLATES {
            // Built-in sources are compiled into the binary.
            if let Err(e) = env.add_template(name, source) {
                tracing::error!("Invalid built-in template {}: {}", name, e);
            }
        }
        Self { env, dir: None }
    }

    /// Engine that resolves templates from `dir` first
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        let mut engine = Self::new();
        engine.dir = Some(dir.into());
        engine
    }

    /// Engine that only knows templates stored under `dir`
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            env: Self::environment(),
            dir: Some(dir.into()),
        }
    }

    fn environment() -> Environment<'static> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        env
    }

    fn override_path(&self, template: &str) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(template))
            .filter(|path| path.is_file())
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer for TemplateEngine {
    fn render(&self, template: &str, context: &Value) -> Result<String> {
        if let Some(path) = self.override_path(template) {
            debug!("Rendering template from {}", path.display());
            let source = std::fs::read_to_string(&path)?;
            return Ok(self.env.render_str(&source, context)?);
        }
        Ok(self.env.get_template(template)?.render(context)?)
    }

    fn render_str(&self, source: &str, context: &Value) -> Result<String> {
        Ok(self.env.render_str(source, context)?)
    }
}

/// Replace `dest` with `content` through a temporary file in the same directory
///
/// Returns `false` without touching the file when it already holds `content`.
pub fn write_atomic(dest: &Path, content: &str) -> Result<bool> {
    if let Ok(existing) = std::fs::read_to_string(dest) {
        if existing == content {
            return Ok(false);
        }
    }

    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(content.as_bytes())?;
    file.persist(dest).map_err(|e| e.error)?;
    Ok(true)
}
