use para::{scan_and_render, ChangeWatcher, IndexRenderer, Result, ScanOptions};
use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const DEBOUNCE: Duration = Duration::from_millis(100);
const TIMEOUT: Duration = Duration::from_secs(10);

/// Poll `path` until its content satisfies `predicate` or the timeout expires
fn wait_for(path: &Path, predicate: impl Fn(&str) -> bool) -> bool {
    let started = Instant::now();
    while started.elapsed() < TIMEOUT {
        if let Ok(content) = fs::read_to_string(path) {
            if predicate(&content) {
                return true;
            }
        }
        thread::sleep(Duration::from_millis(50));
    }
    false
}

fn setup(root: &Path) -> Result<()> {
    fs::create_dir_all(root.join("work"))?;
    fs::write(root.join("work").join("plan.md"), "# Plan\n")?;
    scan_and_render(root, &ScanOptions::default(), &IndexRenderer::default())?;
    Ok(())
}

/// Test that a new entry shows up in its category's index
#[test]
fn test_watch_file_creation() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("kb");
    setup(&root)?;

    let watcher = ChangeWatcher::new(
        &root,
        ScanOptions::default(),
        IndexRenderer::default(),
        DEBOUNCE,
    );
    let handle = watcher.start()?;
    assert!(handle.is_alive());

    fs::write(root.join("work").join("fresh.md"), "# Fresh\n")?;
    let index = root.join("work").join("index.md");
    assert!(wait_for(&index, |content| content.contains("[Fresh](fresh.md)")));

    handle.join()?;
    Ok(())
}

/// Test that new categories and deletions are picked up
#[test]
fn test_watch_directory_changes() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("kb");
    setup(&root)?;

    let handle = ChangeWatcher::new(
        &root,
        ScanOptions::default(),
        IndexRenderer::default(),
        DEBOUNCE,
    )
    .start()?;

    fs::create_dir(root.join("home"))?;
    fs::write(root.join("home").join("chores.md"), "# Chores\n")?;
    assert!(wait_for(&root.join("home").join("index.md"), |content| {
        content.contains("[Chores](chores.md)")
    }));
    assert!(wait_for(&root.join("index.md"), |content| {
        content.contains("[home](home/index.md)")
    }));

    fs::remove_file(root.join("work").join("plan.md"))?;
    assert!(wait_for(&root.join("work").join("index.md"), |content| {
        !content.contains("[Plan]")
    }));

    handle.join()?;
    Ok(())
}

/// Test that a failed rebuild does not stop the watcher
#[test]
fn test_watch_survives_failed_rebuild() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("kb");
    setup(&root)?;

    let handle = ChangeWatcher::new(
        &root,
        ScanOptions::default(),
        IndexRenderer::default(),
        DEBOUNCE,
    )
    .start()?;

    let broken = root.join("work").join("broken.md");
    fs::write(&broken, [0xff, 0xfe, 0xfd])?;
    thread::sleep(DEBOUNCE * 5);
    assert!(handle.is_alive());

    fs::remove_file(&broken)?;
    fs::write(root.join("work").join("later.md"), "# Later\n")?;
    assert!(wait_for(&root.join("work").join("index.md"), |content| {
        content.contains("[Later](later.md)")
    }));

    handle.join()?;
    Ok(())
}
