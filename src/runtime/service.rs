use super::runner::{run_async, run_sync, CommandHandle};
use crate::core::error::Result;
use crate::indexing::scanner::ScanOptions;
use crate::render::engine::TemplateEngine;
use crate::render::index::{scan_and_render, IndexRenderer};
use crate::ui::watch::{ChangeWatcher, WatcherHandle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

/// Everything the long-running `run` mode needs
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub root: PathBuf,
    pub scan: ScanOptions,
    pub templates_dir: Option<PathBuf>,
    pub debounce: Duration,
    /// Commands started in the background, e.g. a sync mount or preview server
    pub start_commands: Vec<String>,
    /// Commands run to completion during shutdown
    pub stop_commands: Vec<String>,
}

/// Watcher plus auxiliary commands, started and stopped together
pub struct Service {
    options: ServiceOptions,
    watcher: Option<WatcherHandle>,
    commands: Vec<CommandHandle>,
}

impl Service {
    pub fn new(options: ServiceOptions) -> Self {
        Self {
            options,
            watcher: None,
            commands: Vec::new(),
        }
    }

    fn renderer(&self) -> IndexRenderer<TemplateEngine> {
        let engine = match &self.options.templates_dir {
            Some(dir) => TemplateEngine::with_dir(dir),
            None => TemplateEngine::new(),
        };
        IndexRenderer::new(engine)
    }

    /// Build once, launch start commands, then begin watching
    pub fn start(&mut self) -> Result<()> {
        scan_and_render(&self.options.root, &self.options.scan, &self.renderer())?;

        for command in &self.options.start_commands {
            match run_async(command) {
                Ok(handle) => self.commands.push(handle),
                Err(e) => error!("Failed to start {}: {}", command, e),
            }
        }

        let watcher = ChangeWatcher::new(
            &self.options.root,
            self.options.scan.clone(),
            self.renderer(),
            self.options.debounce,
        );
        self.watcher = Some(watcher.start()?);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.watcher.as_ref().is_some_and(WatcherHandle::is_alive)
    }

    /// Stop the watcher and commands, run stop commands, join everything
    pub fn shutdown(&mut self) -> Result<()> {
        info!("Shutting down");
        if let Some(watcher) = self.watcher.as_mut() {
            watcher.stop();
        }
        for handle in self.commands.iter().filter(|handle| handle.is_alive()) {
            handle.stop();
        }

        for command in &self.options.stop_commands {
            match run_sync(command) {
                Ok(status) if !status.success() => warn!("{} exited with {}", command, status),
                Ok(_) => {}
                Err(e) => error!("Failed to run {}: {}", command, e),
            }
        }

        if let Some(watcher) = self.watcher.take() {
            watcher.join()?;
        }
        for handle in self.commands.drain(..) {
            let command = handle.command().to_string();
            if let Err(e) = handle.join() {
                warn!("Failed to join {}: {}", command, e);
            }
        }
        Ok(())
    }

    /// Run until Ctrl+C (or SIGTERM), then shut down
    pub fn run_until_interrupted(mut self) -> Result<()> {
        self.start()?;
        info!("Press Ctrl+C to stop watching...");
        let interrupted = wait_for_interrupt();
        let shutdown = self.shutdown();
        interrupted.and(shutdown)
    }
}

fn wait_for_interrupt() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut terminate = signal(SignalKind::terminate())?;
            tokio::select! {
                result = tokio::signal::ctrl_c() => result,
                _ = terminate.recv() => Ok(()),
            }
        }
        #[cfg(not(unix))]
        tokio::signal::ctrl_c().await
    })?;
    Ok(())
}
