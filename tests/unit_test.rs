use para::indexing::metadata::{parse_checkbox, parse_entry_text};
use para::render::index::{category_view, template_for, ItemView};
use para::scaffold::snippet::Snippet;
use para::tree::ordering::completion_priority;
use para::{scan, Completion, Config, Result, ScanOptions};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_settings_flow_into_scan_options() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let base_dir = temp_dir.path().join("para");
    fs::create_dir_all(&base_dir)?;
    fs::write(
        base_dir.join("config.yml"),
        "title: Brain\nenvironment: home\nreferencable_extensions: [png]\n",
    )?;

    let config = Config::new(Some(base_dir))?;
    let options = ScanOptions::from_settings(&config.settings);
    assert_eq!(options.title, "Brain");
    assert_eq!(options.environment, "home");
    assert_eq!(options.referencable_extensions, vec!["png"]);

    Ok(())
}

#[test]
fn test_completion_priorities() {
    assert!(completion_priority(Completion::Incomplete) < completion_priority(Completion::Unset));
    assert!(completion_priority(Completion::Unset) < completion_priority(Completion::Complete));
}

#[test]
fn test_checkbox_markers() {
    assert_eq!(parse_checkbox("- [ ] open").map(|(c, _)| c), Some(Completion::Incomplete));
    assert_eq!(parse_checkbox("- [_] open").map(|(c, _)| c), Some(Completion::Incomplete));
    assert_eq!(parse_checkbox("- [x] done").map(|(c, _)| c), Some(Completion::Complete));
    assert_eq!(parse_checkbox("plain text"), None);
}

#[test]
fn test_entry_text_without_heading() {
    let parsed = parse_entry_text("---\n\n1. numbered\nFirst prose line\n");
    assert_eq!(parsed.name, None);
    assert_eq!(parsed.complete, Completion::Unset);
    assert_eq!(parsed.description.as_deref(), Some("First prose line"));
}

#[test]
fn test_template_levels() {
    assert_eq!(template_for(0), "category.md");
    assert_eq!(template_for(1), "category.md");
    assert_eq!(template_for(2), "subcategory.md");
    assert_eq!(template_for(5), "subcategory.md");
}

#[test]
fn test_category_view_sorts_entries() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let root = &temp_dir.path().join("kb");
    fs::create_dir(root)?;
    fs::write(root.join("a-done.md"), "# [x] A done\n")?;
    fs::write(root.join("b-note.md"), "# B note\n")?;
    fs::write(root.join("c-open.md"), "# [ ] C open\n")?;
    fs::write(root.join("d-open.md"), "# [ ] D open\n")?;
    fs::write(root.join("report.txt"), "text")?;
    fs::write(root.join("image.bmp"), "ignored")?;
    fs::create_dir(root.join("zeta"))?;
    fs::create_dir(root.join("alpha"))?;

    let scanned = scan(root, &ScanOptions::default())?;
    let view = category_view(&scanned.tree, scanned.root());

    fn names(items: &[ItemView]) -> Vec<String> {
        items.iter().map(|item| item.name.clone()).collect()
    }
    assert_eq!(names(&view.entries), vec!["C open", "D open", "B note", "A done"]);
    assert_eq!(names(&view.incompleted), vec!["C open", "D open"]);
    assert_eq!(names(&view.nonactionable), vec!["B note"]);
    assert_eq!(names(&view.completed), vec!["A done"]);
    assert_eq!(names(&view.subcategories), vec!["alpha", "zeta"]);
    assert_eq!(names(&view.referencable), vec!["report.txt"]);
    assert!(view.breadcrumbs.is_empty());

    Ok(())
}

#[test]
fn test_snippet_with_fixed_destination() -> Result<()> {
    let snippet = Snippet::parse_toml(
        Path::new("/snippets"),
        "daily",
        "[Snippet]\nprototype = \"daily.md\"\ndestination_id = \"journal\"\n",
    )?;
    assert_eq!(snippet.destination_id.as_deref(), Some("journal"));
    assert_eq!(snippet.expected(), "name");
    assert!(!snippet.is_category());

    Ok(())
}
