use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// para - Keep a folder of notes indexed as a browsable knowledge base
#[derive(Parser, Debug)]
#[command(name = "para")]
#[command(about = "Index a directory tree of markdown notes into category pages", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Custom base directory (default: ~/.para)
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the configuration and snippets directories
    Init,
    /// Create index files
    Index {
        /// Path of the knowledge base root
        path: Option<PathBuf>,
        /// Title of the root category
        #[arg(long)]
        title: Option<String>,
        /// Only include nodes tagged with this environment
        #[arg(short, long)]
        environment: Option<String>,
    },
    /// Remove index files
    Clean {
        /// Path of the knowledge base root
        path: Option<PathBuf>,
    },
    /// Keep indexes up to date while the filesystem changes
    Run {
        /// Path of the knowledge base root
        path: Option<PathBuf>,
        /// Title of the root category
        #[arg(long)]
        title: Option<String>,
        /// Only include nodes tagged with this environment
        #[arg(short, long)]
        environment: Option<String>,
        /// A command to mount a remote drive
        #[arg(long)]
        sync_command: Option<String>,
        /// A command to run a markdown preview server
        #[arg(long)]
        preview_command: Option<String>,
        /// Commands to run on shutdown (repeatable)
        #[arg(long = "stop-command")]
        stop_commands: Vec<String>,
        /// Run in the background
        #[arg(short, long)]
        daemonize: bool,
    },
    /// Print every registered id
    Ls {
        /// Path of the knowledge base root
        path: Option<PathBuf>,
        /// Print ids with their paths as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a category or entry from a snippet
    Create {
        /// Snippet name
        snippet: String,
        /// Snippet parameters (destination first unless the snippet fixes it)
        params: Vec<String>,
        /// Path of the knowledge base root
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// List available snippets
    Snippets,
    /// Pick a random entry
    Random {
        /// Path of the knowledge base root
        path: Option<PathBuf>,
        /// Start from this category id
        #[arg(long)]
        from: Option<String>,
        /// Skip categories with this id (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
        /// Open the entry in $EDITOR
        #[arg(long)]
        open: bool,
        /// Keep offering entries, opening each accepted one in $EDITOR
        #[arg(short, long, conflicts_with = "open")]
        interactive: bool,
    },
}
