use super::node::{Node, Tree};
use crate::core::error::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;
use std::io::{BufRead, Write};

/// Pick a random entry from the subtree under `start`
///
/// Categories whose id or relative id is listed in `exclude` are skipped
/// together with everything below them.
pub fn random_entry<'a, R: Rng + ?Sized>(
    tree: &'a Tree,
    start: &'a Node,
    exclude: &[String],
    rng: &mut R,
) -> Option<&'a Node> {
    let is_excluded =
        |node: &Node| exclude.iter().any(|key| *key == node.id || *key == node.relative_id);

    let mut entries = Vec::new();
    let mut queue = VecDeque::from([start]);
    while let Some(category) = queue.pop_front() {
        if is_excluded(category) {
            continue;
        }
        queue.extend(tree.subcategories(category));
        entries.extend(tree.entries(category));
    }

    entries.choose(rng).copied()
}

/// Keep offering random entries until `input` runs dry
///
/// Each pick is announced as `Open <category>: <entry> (Y/n): `. Any answer
/// other than `n` or `no` hands the entry to `open`. Returns how many entries
/// were opened.
pub fn random_loop<R, I, W, F>(
    tree: &Tree,
    start: &Node,
    exclude: &[String],
    rng: &mut R,
    input: I,
    output: &mut W,
    mut open: F,
) -> Result<usize>
where
    R: Rng + ?Sized,
    I: BufRead,
    W: Write,
    F: FnMut(&Node) -> Result<()>,
{
    let mut opened = 0;
    let mut answers = input.lines();

    while let Some(entry) = random_entry(tree, start, exclude, rng) {
        let category = tree.parent(entry).map_or("", |parent| parent.name.as_str());
        write!(output, "Open {}: {} (Y/n): ", category, entry.name)?;
        output.flush()?;

        let Some(answer) = answers.next().transpose()? else {
            writeln!(output)?;
            break;
        };
        if matches!(answer.trim().to_lowercase().as_str(), "n" | "no") {
            continue;
        }
        open(entry)?;
        opened += 1;
    }
    Ok(opened)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::node::NodeKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Cursor;

    fn tree() -> Tree {
        let mut root = Node::new("/kb", NodeKind::Category, 0, "Root");
        root.id = "root".to_string();
        let mut tree = Tree::new(root);
        let root_id = tree.root().handle();

        for dir in ["archive", "active"] {
            let mut category = Node::new(format!("/kb/{dir}"), NodeKind::Category, 1, dir);
            category.id = dir.to_string();
            let category_id = tree.attach(root_id, category);

            let mut entry = Node::new(format!("/kb/{dir}/note.md"), NodeKind::Entry, 2, dir);
            entry.id = "note.md".to_string();
            tree.attach(category_id, entry);
        }
        tree
    }

    #[test]
    fn test_excluded_categories_are_skipped() {
        let tree = tree();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            let pick = random_entry(&tree, tree.root(), &["archive".to_string()], &mut rng).unwrap();
            assert_eq!(pick.name, "active");
        }
    }

    #[test]
    fn test_no_entries() {
        let tree = tree();
        let mut rng = StdRng::seed_from_u64(7);
        let exclude = vec!["root".to_string()];
        assert!(random_entry(&tree, tree.root(), &exclude, &mut rng).is_none());
    }

    #[test]
    fn test_loop_opens_until_input_ends() {
        let tree = tree();
        let mut rng = StdRng::seed_from_u64(7);
        let mut output = Vec::new();
        let mut opened = Vec::new();

        let count = random_loop(
            &tree,
            tree.root(),
            &["archive".to_string()],
            &mut rng,
            Cursor::new("y\nn\n\nNo\n"),
            &mut output,
            |entry| {
                opened.push(entry.path.clone());
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(count, 2);
        assert_eq!(opened.len(), 2);
        let prompts = String::from_utf8(output).unwrap();
        assert_eq!(prompts.matches("Open active: active (Y/n): ").count(), 5);
    }

    #[test]
    fn test_loop_without_entries() {
        let tree = tree();
        let mut rng = StdRng::seed_from_u64(7);
        let mut output = Vec::new();
        let exclude = vec!["root".to_string()];

        let count = random_loop(&tree, tree.root(), &exclude, &mut rng, Cursor::new("y\n"), &mut output, |_| {
            panic!("nothing to open")
        })
        .unwrap();
        assert_eq!(count, 0);
        assert!(output.is_empty());
    }
}
