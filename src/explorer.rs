use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::backend::Backend;
use crate::core::{EventBinder, TreeView, View};
use crate::models::{EntryKind, EventKind, NodeEvent, TreeNode, split_path};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MenuKind {
    File,
    Dir,
}

/// Requests raised by node handlers for the editor side to act on.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NodeAction {
    Open {
        path: String,
    },
    ContextMenu {
        menu: MenuKind,
        path: String,
        x: i32,
        y: i32,
    },
}

/// Files open on select and get the file menu; directories get the directory menu.
struct ActionBinder {
    actions: UnboundedSender<NodeAction>,
}

impl EventBinder for ActionBinder {
    fn bind(&self, node: &mut TreeNode) {
        let menu = match node.kind() {
            EntryKind::File => {
                let actions = self.actions.clone();
                node.on(EventKind::Select, move |_, node| {
                    let _ = actions.send(NodeAction::Open {
                        path: node.path().to_owned(),
                    });
                });
                MenuKind::File
            }
            EntryKind::Dir => MenuKind::Dir,
        };

        let actions = self.actions.clone();
        node.on(EventKind::ContextMenu, move |event, node| {
            if let NodeEvent::ContextMenu { x, y } = *event {
                let _ = actions.send(NodeAction::ContextMenu {
                    menu,
                    path: node.path().to_owned(),
                    x,
                    y,
                });
            }
        });
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExplorerOptions {
    /// Harness file to select and open once the tree is loaded.
    pub harness: Option<String>,
}

/// Keeps the tree in step with backend round-trips.
///
/// The tree is only mutated after the backend has confirmed a change, and
/// the listing is fetched once.
pub struct Explorer<B, V> {
    backend: B,
    tree: TreeView<V>,
    actions: UnboundedReceiver<NodeAction>,
    /// Received from `actions` but not yet handed out.
    pending: VecDeque<NodeAction>,
}

impl<B: Backend, V: View> Explorer<B, V> {
    pub async fn load(backend: B, view: V, options: &ExplorerOptions) -> Result<Self> {
        let entries = backend
            .list()
            .await
            .context("Failed to fetch directory listing")?;

        let (sender, actions) = mpsc::unbounded_channel();
        let built = TreeView::builder()
            .harness(options.harness.clone())
            .binder(Arc::new(ActionBinder {
                actions: sender.clone(),
            }))
            .build(&entries)?;

        let mut tree = built.tree.attach(view);
        if let Some(harness) = built.harness {
            tree.expand_path(&harness);
            let _ = sender.send(NodeAction::Open {
                path: harness.to_string(),
            });
        }

        info!(entries = entries.len(), "directory tree loaded");
        Ok(Self {
            backend,
            tree,
            actions,
            pending: VecDeque::new(),
        })
    }

    pub fn tree(&self) -> &TreeView<V> {
        &self.tree
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Drain the actions raised by node handlers so far, oldest first.
    pub fn take_actions(&mut self) -> Vec<NodeAction> {
        self.receive();
        self.pending.drain(..).collect()
    }

    fn receive(&mut self) {
        while let Ok(action) = self.actions.try_recv() {
            self.pending.push_back(action);
        }
    }

    /// Remove and return the newest pending action matching `wanted`.
    /// Everything else stays queued for `take_actions`.
    fn claim(&mut self, wanted: impl Fn(&NodeAction) -> bool) -> Option<NodeAction> {
        self.receive();
        let index = self.pending.iter().rposition(wanted)?;
        self.pending.remove(index)
    }

    /// Create `name` below `parent` (top level when `None`) and mirror it in the tree.
    pub async fn create_entry(
        &mut self,
        parent: Option<&str>,
        name: &str,
        kind: EntryKind,
    ) -> Result<String> {
        if name.is_empty() {
            bail!("Name must not be empty");
        }
        let path = match parent {
            Some(parent) => format!("{parent}/{name}"),
            None => name.to_owned(),
        };
        split_path(&path)?;

        self.backend.create(&path, kind).await?;
        self.tree.add_path(&path, kind);
        Ok(path)
    }

    pub async fn delete_entry(&mut self, path: &str) -> Result<()> {
        self.backend.delete(path).await?;
        self.tree.remove_path(path);
        Ok(())
    }

    pub fn select(&mut self, path: &str) -> bool {
        self.tree.select_path(path)
    }

    /// Select `path` and, if it is a file, return its content.
    pub async fn open(&mut self, path: &str) -> Result<Option<String>> {
        if !self.tree.activate(path) {
            debug!(path, "cannot open a path missing from the tree");
            return Ok(None);
        }

        let requested = self
            .claim(|action| matches!(action, NodeAction::Open { path: p } if p == path))
            .is_some();
        if !requested {
            return Ok(None);
        }

        let content = self.backend.read_file(path).await?;
        Ok(Some(content))
    }

    /// Write `content` back to a file the tree knows about.
    pub async fn save_file(&mut self, path: &str, content: &str) -> Result<()> {
        match self.tree.lookup(path) {
            Some(node) if node.kind() == EntryKind::File => {}
            _ => bail!("{path}: not a file"),
        }
        self.backend.write_file(path, content).await?;
        debug!(path, "file saved");
        Ok(())
    }

    /// Raise the node's context menu at the pointer position.
    pub fn context_menu(&mut self, path: &str, x: i32, y: i32) -> Option<NodeAction> {
        if self.tree.context_menu(path, x, y) == 0 {
            return None;
        }
        self.claim(|action| matches!(action, NodeAction::ContextMenu { .. }))
    }
}
