use super::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Title used for the root category when none is configured
pub const DEFAULT_TITLE: &str = "Para";

/// Environment filter that matches every node
pub const ALL_ENVIRONMENTS: &str = "all";

/// Configuration for para
#[derive(Debug, Clone)]
pub struct Config {
    /// Base directory for para data
    pub base_dir: PathBuf,
    /// Directory holding snippet descriptors and prototypes
    pub snippets_dir: PathBuf,
    /// Directory holding index template overrides
    pub templates_dir: PathBuf,
    /// Optional settings file
    pub settings_path: PathBuf,
    /// Pid file written in daemon mode
    pub pid_path: PathBuf,
    /// Log file used in daemon mode
    pub log_path: PathBuf,
    /// Settings loaded from `settings_path`, or defaults
    pub settings: Settings,
}

/// User-tunable settings read from `config.yml`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub title: String,
    pub environment: String,
    pub referencable_extensions: Vec<String>,
    pub debounce_ms: u64,
    pub start_commands: Vec<String>,
    pub stop_commands: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            environment: ALL_ENVIRONMENTS.to_string(),
            referencable_extensions: ["html", "pdf", "csv", "txt"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            debounce_ms: 500,
            start_commands: Vec::new(),
            stop_commands: Vec::new(),
        }
    }
}

impl Config {
    /// Get the default configuration directory
    pub fn default_base_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))
            .map(|home| home.join(".para"))
    }

    /// Create a new configuration, reading `config.yml` if present
    pub fn new(base_dir: Option<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.unwrap_or_else(|| {
            Self::default_base_dir().unwrap_or_else(|_| PathBuf::from(".para"))
        });

        let settings_path = base_dir.join("config.yml");
        let settings = Settings::load(&settings_path)?;

        Ok(Self {
            snippets_dir: base_dir.join("snippets"),
            templates_dir: base_dir.join("templates"),
            pid_path: base_dir.join("para.pid"),
            log_path: base_dir.join("para.log"),
            settings_path,
            settings,
            base_dir,
        })
    }

    /// Create the configuration directories
    pub fn init(&self) -> Result<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(&self.snippets_dir)?;
        std::fs::create_dir_all(&self.templates_dir)?;
        Ok(())
    }

    /// Check if the configuration directory exists
    pub fn is_initialized(&self) -> bool {
        self.base_dir.exists() && self.snippets_dir.exists()
    }
}

impl Settings {
    /// Load settings from a YAML file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_settings_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::new(Some(temp_dir.path().join("para"))).unwrap();

        assert_eq!(config.settings.title, DEFAULT_TITLE);
        assert_eq!(config.settings.environment, ALL_ENVIRONMENTS);
        assert_eq!(config.settings.debounce_ms, 500);
        assert!(config.settings.referencable_extensions.contains(&"pdf".to_string()));
        assert!(!config.is_initialized());
    }

    #[test]
    fn test_partial_settings_file() {
        let temp_dir = TempDir::new().unwrap();
        let base_dir = temp_dir.path().join("para");
        fs::create_dir_all(&base_dir).unwrap();
        fs::write(
            base_dir.join("config.yml"),
            "title: Notes\nstop_commands:\n  - umount /mnt/notes\n",
        )
        .unwrap();

        let config = Config::new(Some(base_dir)).unwrap();
        assert_eq!(config.settings.title, "Notes");
        assert_eq!(config.settings.environment, ALL_ENVIRONMENTS);
        assert_eq!(config.settings.stop_commands, vec!["umount /mnt/notes"]);
    }

    #[test]
    fn test_invalid_settings_file() {
        let temp_dir = TempDir::new().unwrap();
        let base_dir = temp_dir.path().join("para");
        fs::create_dir_all(&base_dir).unwrap();
        fs::write(base_dir.join("config.yml"), "debounce_ms: [not, a, number]").unwrap();

        assert!(matches!(Config::new(Some(base_dir)), Err(Error::Config(_))));
    }

    #[test]
    fn test_init_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::new(Some(temp_dir.path().join("para"))).unwrap();
        config.init().unwrap();

        assert!(config.is_initialized());
        assert!(config.templates_dir.exists());
    }
}
