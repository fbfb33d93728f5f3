use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parsing error: {0}")]
    Parsing(String),

    #[error("Failed to read entry {}: {source}", .path.display())]
    Entry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Unknown id: {0}")]
    NotFound(String),

    #[error("Missing required params: {} (expected: {expected})", .missing.join(", "))]
    MissingParameters {
        missing: Vec<String>,
        expected: String,
    },

    #[error("Snippet error: {0}")]
    Snippet(String),

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("Command error: {0}")]
    Command(String),
}

pub type Result<T> = std::result::Result<T, Error>;
