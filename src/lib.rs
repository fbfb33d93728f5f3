// Core functionality
pub mod core {
    pub mod config;
    pub mod error;
}

// Node model
pub mod tree {
    pub mod node;
    pub mod ordering;
    pub mod random;
    pub mod registry;
}

// Indexing pipeline
pub mod indexing {
    pub mod metadata;
    pub mod scanner;
}

// Index rendering
pub mod render {
    pub mod engine;
    pub mod index;
}

// Snippets
pub mod scaffold {
    pub mod snippet;
}

// Long-running mode
pub mod runtime {
    pub mod runner;
    pub mod service;
}

// User interfaces
pub mod ui {
    pub mod cli;
    pub mod watch;
}

// Re-export commonly used types
pub use core::config::{Config, Settings};
pub use core::error::{Error, Result};
pub use indexing::scanner::{scan, Scan, ScanOptions};
pub use render::engine::{TemplateEngine, TemplateRenderer};
pub use render::index::{scan_and_render, IndexRenderer, RenderStats};
pub use runtime::runner::{run_async, run_sync, CommandHandle};
pub use runtime::service::{Service, ServiceOptions};
pub use scaffold::snippet::{Snippet, SnippetInstantiator};
pub use tree::node::{Completion, Node, NodeId, NodeKind, Tree};
pub use tree::random::{random_entry, random_loop};
pub use tree::registry::Registry;
pub use ui::cli::Cli;
pub use ui::watch::{ChangeWatcher, WatcherHandle};
