use anyhow::{anyhow, bail, Context};
use clap::Parser;
use daemonize::Daemonize;
use para::core::config::Config;
use para::indexing::scanner::{scan, ScanOptions};
use para::render::engine::TemplateEngine;
use para::render::index::{scan_and_render, IndexRenderer};
use para::runtime::runner::run_sync;
use para::runtime::service::{Service, ServiceOptions};
use para::scaffold::snippet::{Snippet, SnippetInstantiator};
use para::tree::random::{random_entry, random_loop};
use para::ui::cli::{Cli, Commands};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::new(cli.base_dir.clone())?;

    match cli.command {
        Commands::Init => handle_init(&config),
        Commands::Index {
            path,
            title,
            environment,
        } => handle_index(&config, path, title, environment),
        Commands::Clean { path } => handle_clean(&config, path),
        Commands::Run {
            path,
            title,
            environment,
            sync_command,
            preview_command,
            stop_commands,
            daemonize,
        } => {
            let root = resolve_root(path)?;
            let mut start_commands = config.settings.start_commands.clone();
            start_commands.extend(sync_command);
            start_commands.extend(preview_command);
            let mut all_stop_commands = config.settings.stop_commands.clone();
            all_stop_commands.extend(stop_commands);

            let options = ServiceOptions {
                scan: scan_options(&config, title, environment),
                templates_dir: Some(config.templates_dir.clone()),
                debounce: Duration::from_millis(config.settings.debounce_ms),
                start_commands,
                stop_commands: all_stop_commands,
                root,
            };
            handle_run(&config, options, daemonize)
        }
        Commands::Ls { path, json } => handle_ls(&config, path, json),
        Commands::Create {
            snippet,
            params,
            path,
        } => handle_create(&config, path, &snippet, &params),
        Commands::Snippets => handle_snippets(&config),
        Commands::Random {
            path,
            from,
            exclude,
            open,
            interactive,
        } => handle_random(&config, path, from, &exclude, open, interactive),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Knowledge base root: the given path or the current directory
fn resolve_root(path: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    let path = match path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    path.canonicalize()
        .with_context(|| format!("Cannot open knowledge base at {}", path.display()))
}

fn scan_options(config: &Config, title: Option<String>, environment: Option<String>) -> ScanOptions {
    let mut options = ScanOptions::from_settings(&config.settings);
    if let Some(title) = title {
        options = options.with_title(title);
    }
    if let Some(environment) = environment {
        options = options.with_environment(environment);
    }
    options
}

fn renderer(config: &Config) -> IndexRenderer<TemplateEngine> {
    IndexRenderer::new(TemplateEngine::with_dir(&config.templates_dir))
}

fn handle_init(config: &Config) -> anyhow::Result<()> {
    if config.is_initialized() {
        println!("para is already initialized at: {}", config.base_dir.display());
        return Ok(());
    }
    config.init()?;
    println!("✓ Created {}", config.base_dir.display());
    println!("  Snippets:  {}", config.snippets_dir.display());
    println!("  Templates: {}", config.templates_dir.display());
    Ok(())
}

fn handle_index(
    config: &Config,
    path: Option<PathBuf>,
    title: Option<String>,
    environment: Option<String>,
) -> anyhow::Result<()> {
    let root = resolve_root(path)?;
    let options = scan_options(config, title, environment);
    let (scanned, stats) = scan_and_render(&root, &options, &renderer(config))?;

    println!(
        "Indexed {} categories ({} written, {} unchanged)",
        scanned.tree.categories().len(),
        stats.written,
        stats.unchanged
    );
    Ok(())
}

fn handle_clean(config: &Config, path: Option<PathBuf>) -> anyhow::Result<()> {
    let root = resolve_root(path)?;
    let scanned = scan(&root, &ScanOptions::from_settings(&config.settings))?;
    let removed = renderer(config).remove(&scanned.tree)?;
    println!("Removed {} index files", removed);
    Ok(())
}

fn handle_run(config: &Config, options: ServiceOptions, daemonize: bool) -> anyhow::Result<()> {
    if daemonize {
        config.init()?;
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_path)
            .with_context(|| format!("Cannot open {}", config.log_path.display()))?;
        let log_err = log.try_clone()?;

        Daemonize::new()
            .pid_file(&config.pid_path)
            .chown_pid_file(true)
            .working_directory("/")
            .stdout(log)
            .stderr(log_err)
            .start()
            .map_err(|e| anyhow!("Failed to daemonize: {}", e))?;
        info!("Running in the background, pid file {}", config.pid_path.display());
    }

    Service::new(options).run_until_interrupted()?;
    Ok(())
}

fn handle_ls(config: &Config, path: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let root = resolve_root(path)?;
    let scanned = scan(&root, &ScanOptions::from_settings(&config.settings))?;

    if json {
        let mut ids = serde_json::Map::new();
        for id in scanned.all_ids() {
            let node = scanned.resolve(id)?;
            ids.insert(
                id.to_string(),
                serde_json::Value::String(node.path.display().to_string()),
            );
        }
        println!("{}", serde_json::to_string_pretty(&ids)?);
    } else {
        for id in scanned.all_ids() {
            println!("{}", id);
        }
    }
    Ok(())
}

fn handle_create(
    config: &Config,
    path: Option<PathBuf>,
    snippet: &str,
    params: &[String],
) -> anyhow::Result<()> {
    let root = resolve_root(path)?;
    let options = ScanOptions::from_settings(&config.settings);
    let mut scanned = scan(&root, &options)?;

    let instantiator = SnippetInstantiator::new(&config.snippets_dir);
    let created = instantiator.create(&mut scanned, snippet, params)?;
    for file in &created {
        println!("✓ {}", file.display());
    }

    renderer(config).render(&scanned.tree)?;
    Ok(())
}

fn handle_snippets(config: &Config) -> anyhow::Result<()> {
    let instantiator = SnippetInstantiator::new(&config.snippets_dir);
    let names = instantiator.available()?;
    if names.is_empty() {
        println!("No snippets in {}", config.snippets_dir.display());
        return Ok(());
    }

    for name in names {
        match Snippet::load(&config.snippets_dir, &name) {
            Ok(snippet) => println!("{} <{}>", name, snippet.expected()),
            Err(e) => warn!("Skipping snippet {}: {}", name, e),
        }
    }
    Ok(())
}

fn handle_random(
    config: &Config,
    path: Option<PathBuf>,
    from: Option<String>,
    exclude: &[String],
    open: bool,
    interactive: bool,
) -> anyhow::Result<()> {
    let root = resolve_root(path)?;
    let scanned = scan(&root, &ScanOptions::from_settings(&config.settings))?;
    let start = match &from {
        Some(id) => scanned.resolve(id)?,
        None => scanned.root(),
    };

    if interactive {
        let opened = random_loop(
            &scanned.tree,
            start,
            exclude,
            &mut rand::thread_rng(),
            io::stdin().lock(),
            &mut io::stdout(),
            |entry| {
                open_in_editor(&entry.path).map_err(|e| para::Error::Command(e.to_string()))
            },
        )?;
        println!("Opened {} entries", opened);
        return Ok(());
    }

    let Some(entry) = random_entry(&scanned.tree, start, exclude, &mut rand::thread_rng()) else {
        bail!("No entries under {}", start.relative_id);
    };
    println!("{}", entry.path.display());

    if open {
        open_in_editor(&entry.path)?;
    }
    Ok(())
}

fn open_in_editor(path: &Path) -> anyhow::Result<()> {
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());
    let path = path.to_string_lossy();
    let quoted = shlex::try_quote(&path).map_err(|e| anyhow!("Cannot quote {}: {}", path, e))?;

    let status = run_sync(&format!("{} {}", editor, quoted))?;
    if !status.success() {
        bail!("{} exited with {}", editor, status);
    }
    Ok(())
}
