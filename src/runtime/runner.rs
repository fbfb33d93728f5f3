//! External helper commands (sync mounts, preview servers, editors).

use crate::core::error::{Error, Result};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Split a shell-quoted command line into program and arguments
pub fn parse_command(command: &str) -> Result<(String, Vec<String>)> {
    let mut words = shlex::split(command)
        .ok_or_else(|| Error::Command(format!("Invalid quoting in {:?}", command)))?
        .into_iter();
    let program = words
        .next()
        .ok_or_else(|| Error::Command("Empty command".to_string()))?;
    Ok((program, words.collect()))
}

/// A command running on its own supervising thread
pub struct CommandHandle {
    command: String,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<Result<ExitStatus>>>,
}

impl CommandHandle {
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn is_alive(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    /// Ask the supervising thread to terminate the process
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Wait for the process to exit
    pub fn join(mut self) -> Result<ExitStatus> {
        let thread = self
            .thread
            .take()
            .ok_or_else(|| Error::Command(format!("{} was already joined", self.command)))?;
        thread
            .join()
            .map_err(|_| Error::Command(format!("Supervisor of {} panicked", self.command)))?
    }
}

fn spawn(command: &str, inherit_io: bool) -> Result<CommandHandle> {
    let (program, args) = parse_command(command)?;
    let stdio = || if inherit_io { Stdio::inherit() } else { Stdio::null() };

    info!("Running command {}", command);
    let child = Command::new(&program)
        .args(&args)
        .stdin(stdio())
        .stdout(stdio())
        .stderr(stdio())
        .spawn()
        .map_err(|e| Error::Command(format!("Failed to start {}: {}", command, e)))?;

    let stop = Arc::new(AtomicBool::new(false));
    let thread = {
        let stop = Arc::clone(&stop);
        let command = command.to_string();
        thread::Builder::new()
            .name(format!("para-cmd-{}", program))
            .spawn(move || supervise(child, &stop, &command))?
    };

    Ok(CommandHandle {
        command: command.to_string(),
        stop,
        thread: Some(thread),
    })
}

fn supervise(mut child: Child, stop: &AtomicBool, command: &str) -> Result<ExitStatus> {
    loop {
        if let Some(status) = child.try_wait()? {
            info!("Finished command {} ({})", command, status);
            return Ok(status);
        }
        if stop.load(Ordering::SeqCst) {
            if let Err(e) = child.kill() {
                warn!("Failed to stop {}: {}", command, e);
            }
            let status = child.wait()?;
            info!("Stopped command {}", command);
            return Ok(status);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Start `command` in the background and return immediately
pub fn run_async(command: &str) -> Result<CommandHandle> {
    spawn(command, false)
}

/// Run `command` with the terminal attached and wait for it to exit
pub fn run_sync(command: &str) -> Result<ExitStatus> {
    spawn(command, true)?.join()
}
