use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::order::{compare_nodes, sort_recursive};
use crate::core::render::{Detached, View};
use crate::error::TreeError;
use crate::models::{Entry, EntryKind, NodeEvent, Origin, TreeNode, TreePath, split_path};

/// Attaches UI event handlers to every node the tree creates.
pub trait EventBinder: Send + Sync {
    fn bind(&self, node: &mut TreeNode);
}

#[derive(Debug, Default)]
pub struct NoEvents;

impl EventBinder for NoEvents {
    fn bind(&self, _node: &mut TreeNode) {}
}

/// Configuration for building a tree from a flat listing.
pub struct TreeBuilder {
    harness: Option<String>,
    binder: Arc<dyn EventBinder>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self {
            harness: None,
            binder: Arc::new(NoEvents),
        }
    }
}

impl fmt::Debug for TreeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeBuilder")
            .field("harness", &self.harness)
            .finish_non_exhaustive()
    }
}

/// Result of a successful build.
pub struct Built {
    pub tree: TreeView<Detached>,
    /// Path to the pre-selected harness file, if the listing contained one.
    pub harness: Option<TreePath>,
}

impl TreeBuilder {
    /// File to pre-select. A value containing `/` must match the full path,
    /// otherwise it is compared against file names.
    pub fn harness(mut self, harness: Option<String>) -> Self {
        self.harness = harness;
        self
    }

    pub fn binder(mut self, binder: Arc<dyn EventBinder>) -> Self {
        self.binder = binder;
        self
    }

    /// Build the tree from a listing ordered parent-before-child.
    ///
    /// Parents are never synthesized here: an entry whose parent directory has
    /// not been listed yet aborts the whole build.
    pub fn build(self, entries: &[Entry]) -> Result<Built, TreeError> {
        let mut root = TreeNode::root();
        let mut harness = None;

        for entry in entries {
            let segments = split_path(&entry.path)?;
            let parents = &segments[..segments.len() - 1];

            let mut parent = &mut root;
            for (depth, segment) in parents.iter().enumerate() {
                parent = match parent.children.iter_mut().find(|c| c.name == *segment) {
                    Some(child) if child.kind().is_dir() => child,
                    Some(child) => {
                        return Err(TreeError::NotADirectory {
                            path: entry.path.clone(),
                            parent: child.path().to_owned(),
                        });
                    }
                    None => {
                        return Err(TreeError::MissingParent {
                            path: entry.path.clone(),
                            parent: segments[..=depth].join("/"),
                        });
                    }
                };
            }

            if parent.child(entry.name()).is_some() {
                return Err(TreeError::DuplicateEntry {
                    path: entry.path.clone(),
                });
            }

            let mut node = TreeNode::new(entry.clone(), Origin::Listing);
            self.binder.bind(&mut node);

            if harness.is_none() && self.matches_harness(entry) {
                debug!(path = %entry.path, "pre-selecting harness file");
                node.selected = true;
                harness = Some(TreePath::from(entry.path.as_str()));
            }

            parent.children.push(node);
        }

        sort_recursive(&mut root);
        debug!(entries = entries.len(), "built directory tree");

        Ok(Built {
            tree: TreeView {
                root,
                view: Detached,
                binder: self.binder,
                generation: 0,
            },
            harness,
        })
    }

    fn matches_harness(&self, entry: &Entry) -> bool {
        match self.harness.as_deref() {
            Some(harness) if entry.kind == EntryKind::File => {
                if harness.contains('/') {
                    entry.path == harness
                } else {
                    entry.name() == harness
                }
            }
            _ => false,
        }
    }
}

/// In-memory mirror of the remote listing, owned together with its display.
pub struct TreeView<V = Detached> {
    root: TreeNode,
    view: V,
    binder: Arc<dyn EventBinder>,
    generation: u64,
}

impl TreeView<Detached> {
    pub fn builder() -> TreeBuilder {
        TreeBuilder::default()
    }
}

impl<V: View> TreeView<V> {
    /// Hand the tree to a display and render it once.
    pub fn attach<W: View>(self, view: W) -> TreeView<W> {
        let mut tree = TreeView {
            root: self.root,
            view,
            binder: self.binder,
            generation: self.generation,
        };
        tree.reload();
        tree
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// The synthetic root. It is never rendered and holds no entry of its own.
    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Number of reloads issued so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn reload(&mut self) {
        self.generation += 1;
        self.view.reload(&self.root);
    }

    pub fn lookup(&self, path: &str) -> Option<&TreeNode> {
        let indices = self.locate(path)?;
        let mut node = &self.root;
        for &index in &indices {
            node = &node.children[index];
        }
        Some(node)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.locate(path).is_some()
    }

    pub fn selected(&self) -> Option<&TreeNode> {
        self.walk().find(|node| node.is_selected())
    }

    /// Depth-first, pre-order iteration over every node except the root.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: self.root.children.iter().rev().collect(),
        }
    }

    /// Insert a confirmed entry, synthesizing any missing parent directories.
    ///
    /// Returns false without touching the tree when the path is malformed,
    /// crosses a file, or is already present.
    pub fn add_path(&mut self, path: &str, kind: EntryKind) -> bool {
        let segments = match split_path(path) {
            Ok(segments) => segments,
            Err(err) => {
                warn!("ignoring insertion: {err}");
                return false;
            }
        };
        let Some((name, parents)) = segments.split_last() else {
            return false;
        };

        let binder = &*self.binder;
        let mut parent = &mut self.root;
        for (depth, segment) in parents.iter().enumerate() {
            let index = match parent.children.iter().position(|c| c.name == *segment) {
                Some(index) if parent.children[index].kind().is_dir() => index,
                Some(index) => {
                    warn!(
                        path,
                        file = parent.children[index].path(),
                        "ignoring insertion below a file"
                    );
                    return false;
                }
                None => {
                    let mut placeholder = TreeNode::new(
                        Entry::dir(segments[..=depth].join("/")),
                        Origin::Placeholder,
                    );
                    binder.bind(&mut placeholder);
                    insert_child(parent, placeholder)
                }
            };
            parent = &mut parent.children[index];
        }

        if parent.child(name).is_some() {
            debug!(path, "entry already present");
            return false;
        }

        let mut node = TreeNode::new(Entry::new(path, kind), Origin::Created);
        binder.bind(&mut node);
        insert_child(parent, node);

        self.reload();
        true
    }

    /// Detach the node at `path` together with its subtree.
    ///
    /// A missing path is treated as already removed.
    pub fn remove_path(&mut self, path: &str) -> bool {
        let Some(indices) = self.locate(path) else {
            debug!(path, "nothing to remove");
            return false;
        };
        let Some((&last, ancestors)) = indices.split_last() else {
            return false;
        };

        let removed = self.node_at_mut(ancestors).children.remove(last);
        debug!(path, descendants = count_nodes(&removed) - 1, "removed entry");

        self.reload();
        true
    }

    /// Make `path` the only selected node and expand its ancestors.
    pub fn select_path(&mut self, path: &str) -> bool {
        let Some(indices) = self.locate(path) else {
            debug!(path, "nothing to select");
            return false;
        };

        clear_selection(&mut self.root);
        let mut node = &mut self.root;
        for &index in &indices {
            node.expanded = true;
            node = &mut node.children[index];
        }
        node.selected = true;

        self.reload();
        true
    }

    /// Expand every ancestor of the node named by `path`.
    pub fn expand_path(&mut self, path: &TreePath) -> bool {
        let Some(indices) = self.locate(&path.to_string()) else {
            return false;
        };

        let mut node = &mut self.root;
        for &index in &indices {
            node.expanded = true;
            node = &mut node.children[index];
        }

        self.reload();
        true
    }

    pub fn set_expanded(&mut self, path: &str, expanded: bool) -> bool {
        let Some(indices) = self.locate(path) else {
            return false;
        };
        let node = self.node_at_mut(&indices);
        if !node.kind().is_dir() || node.expanded == expanded {
            return false;
        }
        node.expanded = expanded;

        self.reload();
        true
    }

    /// Select the node and fire its `select` handlers.
    pub fn activate(&mut self, path: &str) -> bool {
        if !self.select_path(path) {
            return false;
        }
        if let Some(node) = self.lookup(path) {
            node.emit(&NodeEvent::Select);
        }
        true
    }

    /// Fire the node's `contextmenu` handlers, returning how many ran.
    pub fn context_menu(&self, path: &str, x: i32, y: i32) -> usize {
        self.lookup(path)
            .map_or(0, |node| node.emit(&NodeEvent::ContextMenu { x, y }))
    }

    /// Child indices leading to `path`.
    ///
    /// The walk ends as soon as the node reached carries the requested path,
    /// so a same-named node at another depth can never be matched.
    fn locate(&self, path: &str) -> Option<Vec<usize>> {
        let mut indices = Vec::new();
        let mut node = &self.root;
        for segment in path.split('/') {
            let index = node.children.iter().position(|c| c.name == segment)?;
            indices.push(index);
            node = &node.children[index];
            if node.path() == path {
                return Some(indices);
            }
        }
        None
    }

    fn node_at_mut(&mut self, indices: &[usize]) -> &mut TreeNode {
        let mut node = &mut self.root;
        for &index in indices {
            node = &mut node.children[index];
        }
        node
    }
}

pub struct Walk<'a> {
    stack: Vec<&'a TreeNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Insert at the sorted position and expand the parent so the child is visible.
fn insert_child(parent: &mut TreeNode, node: TreeNode) -> usize {
    let index = parent
        .children
        .partition_point(|child| compare_nodes(child, &node) == Ordering::Less);
    parent.children.insert(index, node);
    parent.expanded = true;
    index
}

fn clear_selection(node: &mut TreeNode) {
    node.selected = false;
    for child in &mut node.children {
        clear_selection(child);
    }
}

fn count_nodes(node: &TreeNode) -> usize {
    1 + node.children.iter().map(count_nodes).sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::render::AsciiView;
    use crate::models::EventKind;
    use std::sync::Mutex;

    type Snapshot = Vec<(String, EntryKind, bool, bool)>;

    fn snapshot<V: View>(tree: &TreeView<V>) -> Snapshot {
        tree.walk()
            .map(|n| (n.path().to_owned(), n.kind(), n.is_selected(), n.is_expanded()))
            .collect()
    }

    fn names(node: &TreeNode) -> Vec<&str> {
        node.children().iter().map(TreeNode::name).collect()
    }

    fn build(entries: &[Entry]) -> TreeView {
        TreeView::builder().build(entries).unwrap().tree
    }

    fn proof_listing() -> Vec<Entry> {
        vec![
            Entry::dir("cbmc"),
            Entry::dir("cbmc/proofs"),
            Entry::dir("cbmc/proofs/parse"),
            Entry::dir("src"),
            Entry::file("cbmc/proofs/parse/Makefile"),
            Entry::file("cbmc/proofs/parse/parse_harness.c"),
            Entry::file("src/parse.c"),
            Entry::file("README.md"),
        ]
    }

    #[test]
    fn builds_nested_listing_with_dirs_first() {
        let tree = build(&[
            Entry::dir("a"),
            Entry::file("a/b.txt"),
            Entry::file("c.txt"),
        ]);

        assert_eq!(names(tree.root()), vec!["a", "c.txt"]);
        let a = tree.lookup("a").unwrap();
        assert_eq!(a.kind(), EntryKind::Dir);
        assert_eq!(names(a), vec!["b.txt"]);
        assert_eq!(tree.generation(), 0);
    }

    #[test]
    fn build_sorts_unsorted_siblings() {
        let tree = build(&[
            Entry::file("zeta.c"),
            Entry::dir("Beta"),
            Entry::file("alpha.c"),
            Entry::dir("alpha"),
        ]);
        assert_eq!(names(tree.root()), vec!["alpha", "Beta", "alpha.c", "zeta.c"]);
    }

    #[test]
    fn child_before_parent_is_fatal() {
        let err = TreeView::builder()
            .build(&[Entry::file("a/b.txt"), Entry::dir("a")])
            .err()
            .unwrap();
        assert_eq!(
            err,
            TreeError::MissingParent {
                path: "a/b.txt".to_owned(),
                parent: "a".to_owned(),
            }
        );
    }

    #[test]
    fn entry_below_file_is_fatal() {
        let err = TreeView::builder()
            .build(&[Entry::file("a"), Entry::file("a/b.txt")])
            .err()
            .unwrap();
        assert!(matches!(err, TreeError::NotADirectory { .. }));
    }

    #[test]
    fn duplicate_and_malformed_entries_are_fatal() {
        let err = TreeView::builder()
            .build(&[Entry::dir("a"), Entry::dir("a")])
            .err()
            .unwrap();
        assert!(matches!(err, TreeError::DuplicateEntry { .. }));

        let err = TreeView::builder()
            .build(&[Entry::file("/etc/passwd")])
            .err()
            .unwrap();
        assert!(matches!(err, TreeError::InvalidPath { .. }));
    }

    #[test]
    fn every_listed_path_round_trips_through_lookup() {
        let listing = proof_listing();
        let tree = build(&listing);

        for entry in &listing {
            let node = tree.lookup(&entry.path).unwrap();
            assert_eq!(node.entry(), entry);
            assert_eq!(node.name(), entry.name());
            assert_eq!(node.origin(), Origin::Listing);
        }
        assert_eq!(tree.walk().count(), listing.len());
    }

    #[test]
    fn repeated_lookup_is_stable() {
        let tree = build(&proof_listing());
        let first = tree.lookup("src/parse.c").unwrap();
        let second = tree.lookup("src/parse.c").unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn lookup_missing_path_is_not_found() {
        let tree = build(&[
            Entry::dir("a"),
            Entry::file("a/b.txt"),
            Entry::file("c.txt"),
        ]);
        assert_eq!(tree.lookup("a/b.txt").unwrap().name(), "b.txt");
        assert!(tree.lookup("a/missing.txt").is_none());
        assert!(tree.lookup("").is_none());
        assert!(!tree.contains("c.txt/extra"));
    }

    #[test]
    fn lookup_distinguishes_same_names_at_different_depths() {
        let tree = build(&[
            Entry::dir("a"),
            Entry::dir("b"),
            Entry::dir("a/a"),
            Entry::file("a/a/a"),
            Entry::file("b/x"),
        ]);

        assert_eq!(tree.lookup("a").unwrap().path(), "a");
        assert_eq!(tree.lookup("a/a").unwrap().path(), "a/a");
        assert_eq!(tree.lookup("a/a/a").unwrap().kind(), EntryKind::File);
        assert!(tree.lookup("b/a").is_none());
        assert!(tree.lookup("a/a/a/a").is_none());
    }

    #[test]
    fn harness_file_is_preselected_by_name() {
        let built = TreeView::builder()
            .harness(Some("parse_harness.c".to_owned()))
            .build(&proof_listing())
            .unwrap();

        let harness = built.harness.unwrap();
        assert_eq!(harness.to_string(), "cbmc/proofs/parse/parse_harness.c");
        assert_eq!(
            built.tree.selected().unwrap().path(),
            "cbmc/proofs/parse/parse_harness.c"
        );
        assert!(!built.tree.lookup("cbmc").unwrap().is_expanded());
    }

    #[test]
    fn harness_with_slash_matches_full_path_only() {
        let listing = vec![
            Entry::dir("one"),
            Entry::dir("two"),
            Entry::file("one/h.c"),
            Entry::file("two/h.c"),
        ];
        let built = TreeView::builder()
            .harness(Some("two/h.c".to_owned()))
            .build(&listing)
            .unwrap();
        assert_eq!(built.harness.unwrap().to_string(), "two/h.c");

        let built = TreeView::builder()
            .harness(Some("missing.c".to_owned()))
            .build(&listing)
            .unwrap();
        assert!(built.harness.is_none());
        assert!(built.tree.selected().is_none());
    }

    #[test]
    fn add_path_synthesizes_expanded_parents() {
        let mut tree = build(&[]);

        assert!(tree.add_path("x/y/z.txt", EntryKind::File));

        let x = tree.lookup("x").unwrap();
        let y = tree.lookup("x/y").unwrap();
        let z = tree.lookup("x/y/z.txt").unwrap();
        assert!(x.is_placeholder() && x.is_expanded());
        assert!(y.is_placeholder() && y.is_expanded());
        assert_eq!(z.origin(), Origin::Created);
        assert_eq!(z.kind(), EntryKind::File);
        assert_eq!(tree.generation(), 1);
    }

    #[test]
    fn add_path_reuses_existing_parents_and_keeps_order() {
        let mut tree = build(&proof_listing());

        assert!(tree.add_path("src/lexer.c", EntryKind::File));
        assert!(tree.add_path("src/include", EntryKind::Dir));
        assert!(tree.add_path("src/Array.c", EntryKind::File));
        assert!(tree.add_path("aaa.txt", EntryKind::File));

        let src = tree.lookup("src").unwrap();
        assert!(src.is_expanded());
        assert!(!src.is_placeholder());
        assert_eq!(names(src), vec!["include", "Array.c", "lexer.c", "parse.c"]);
        assert_eq!(names(tree.root()), vec!["cbmc", "src", "aaa.txt", "README.md"]);
    }

    #[test]
    fn add_path_keeps_siblings_unique() {
        let mut tree = build(&proof_listing());
        let before = snapshot(&tree);

        assert!(!tree.add_path("src/parse.c", EntryKind::File));
        assert!(!tree.add_path("cbmc", EntryKind::Dir));
        assert_eq!(snapshot(&tree), before);
        assert_eq!(tree.generation(), 0);

        assert!(tree.add_path("cbmc/proofs/new/new_harness.c", EntryKind::File));
        assert!(tree.add_path("cbmc/proofs/new/Makefile", EntryKind::File));
        let new_dir = tree.lookup("cbmc/proofs/new").unwrap();
        assert_eq!(names(new_dir), vec!["Makefile", "new_harness.c"]);
        assert_eq!(
            names(tree.lookup("cbmc/proofs").unwrap()),
            vec!["new", "parse"]
        );
    }

    #[test]
    fn add_path_refuses_invalid_targets() {
        let mut tree = build(&proof_listing());
        let before = snapshot(&tree);

        assert!(!tree.add_path("README.md/inner.txt", EntryKind::File));
        assert!(!tree.add_path("a//b", EntryKind::File));
        assert!(!tree.add_path("", EntryKind::Dir));
        assert_eq!(snapshot(&tree), before);
    }

    #[test]
    fn remove_path_detaches_once() {
        let mut tree = build(&[
            Entry::dir("a"),
            Entry::file("a/b.txt"),
            Entry::file("c.txt"),
        ]);

        assert!(tree.remove_path("a/b.txt"));
        assert_eq!(tree.generation(), 1);
        assert!(tree.lookup("a").unwrap().children().is_empty());
        assert!(tree.lookup("c.txt").is_some());

        let before = snapshot(&tree);
        assert!(!tree.remove_path("a/b.txt"));
        assert_eq!(tree.generation(), 1);
        assert_eq!(snapshot(&tree), before);
    }

    #[test]
    fn remove_directory_drops_subtree_only() {
        let mut tree = build(&proof_listing());

        assert!(tree.remove_path("cbmc/proofs"));

        assert!(tree.lookup("cbmc").unwrap().children().is_empty());
        assert!(!tree.contains("cbmc/proofs/parse/parse_harness.c"));
        assert!(tree.contains("src/parse.c"));
        assert!(tree.contains("README.md"));
        assert_eq!(tree.walk().count(), 4);
    }

    #[test]
    fn selection_is_exclusive_and_reveals_ancestors() {
        let mut tree = TreeView::builder()
            .harness(Some("parse.c".to_owned()))
            .build(&proof_listing())
            .unwrap()
            .tree;

        assert!(tree.select_path("cbmc/proofs/parse/Makefile"));

        let selected: Vec<&str> = tree
            .walk()
            .filter(|n| n.is_selected())
            .map(TreeNode::path)
            .collect();
        assert_eq!(selected, vec!["cbmc/proofs/parse/Makefile"]);
        for ancestor in ["cbmc", "cbmc/proofs", "cbmc/proofs/parse"] {
            assert!(tree.lookup(ancestor).unwrap().is_expanded(), "{ancestor}");
        }
        assert!(!tree.lookup("src").unwrap().is_expanded());
    }

    #[test]
    fn selecting_missing_path_is_a_no_op() {
        let mut tree = build(&proof_listing());
        let before = snapshot(&tree);
        assert!(!tree.select_path("nope.c"));
        assert_eq!(snapshot(&tree), before);
        assert_eq!(tree.generation(), 0);
    }

    #[test]
    fn expand_path_and_toggle() {
        let mut tree = build(&proof_listing());

        assert!(tree.expand_path(&TreePath::from("cbmc/proofs/parse/Makefile")));
        assert!(tree.lookup("cbmc/proofs/parse").unwrap().is_expanded());
        assert!(!tree.expand_path(&TreePath::from("cbmc/nope")));

        assert!(tree.set_expanded("cbmc", false));
        assert!(!tree.lookup("cbmc").unwrap().is_expanded());
        assert!(!tree.set_expanded("cbmc", false));
        assert!(!tree.set_expanded("README.md", true));
    }

    struct Recorder(Mutex<Vec<String>>);

    impl EventBinder for Recorder {
        fn bind(&self, node: &mut TreeNode) {
            self.0.lock().unwrap().push(node.path().to_owned());
            if node.kind() == EntryKind::File {
                node.on(EventKind::Select, |_, _| {});
            }
            node.on(EventKind::ContextMenu, |_, _| {});
        }
    }

    #[test]
    fn binder_sees_every_created_node() {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let mut tree = TreeView::builder()
            .binder(recorder.clone())
            .build(&[Entry::dir("a"), Entry::file("a/b.txt")])
            .unwrap()
            .tree;

        tree.add_path("x/y.txt", EntryKind::File);

        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["a", "a/b.txt", "x", "x/y.txt"]
        );
        assert_eq!(tree.lookup("x").unwrap().listener_count(), 1);
        assert_eq!(tree.lookup("x/y.txt").unwrap().listener_count(), 2);
        assert_eq!(tree.context_menu("a", 10, 20), 1);
        assert_eq!(tree.context_menu("missing", 10, 20), 0);
    }

    #[test]
    fn activate_selects_and_fires_select_handlers() {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let mut tree = build(&[Entry::dir("a"), Entry::file("a/b.txt")]);

        let sink = Arc::clone(&fired);
        tree.root.children[0].children[0].on(EventKind::Select, move |_, node| {
            sink.lock().unwrap().push(node.path().to_owned());
        });

        assert!(tree.activate("a/b.txt"));
        assert!(!tree.activate("a/c.txt"));
        assert_eq!(*fired.lock().unwrap(), vec!["a/b.txt"]);
        assert!(tree.lookup("a/b.txt").unwrap().is_selected());
    }

    #[test]
    fn attached_view_is_reloaded_on_every_mutation() {
        let mut tree = build(&[Entry::dir("a"), Entry::file("a/b.txt")]).attach(AsciiView::default());
        assert_eq!(tree.view().reloads(), 1);
        assert_eq!(tree.view().frame(), "`-- a/\n");

        tree.select_path("a/b.txt");
        assert_eq!(tree.view().frame(), "`-- a/\n    `-- b.txt [selected]\n");

        tree.add_path("c.txt", EntryKind::File);
        tree.remove_path("a");
        assert_eq!(tree.view().frame(), "`-- c.txt\n");
        assert_eq!(tree.view().reloads(), 4);
        assert_eq!(tree.generation(), 4);
    }
}
