use std::io::{self, Write};

use tracing::error;

use crate::models::TreeNode;

/// Display collaborator. A reload re-renders the whole tree from scratch.
pub trait View {
    fn reload(&mut self, root: &TreeNode);
}

/// A tree that has not been attached to any display yet.
#[derive(Debug, Default)]
pub struct Detached;

impl View for Detached {
    fn reload(&mut self, _root: &TreeNode) {}
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Descend into collapsed directories too.
    pub expand_all: bool,
}

/// Renders the visible tree as ASCII branches and keeps the latest frame.
#[derive(Debug, Default)]
pub struct AsciiView {
    options: RenderOptions,
    frame: String,
    reloads: usize,
}

impl AsciiView {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn frame(&self) -> &str {
        &self.frame
    }

    pub fn reloads(&self) -> usize {
        self.reloads
    }
}

impl View for AsciiView {
    fn reload(&mut self, root: &TreeNode) {
        let mut out = Vec::new();
        if let Err(err) = write_children(&mut out, root.children(), &self.options) {
            error!("failed to render tree: {err}");
            return;
        }
        self.frame = String::from_utf8_lossy(&out).into_owned();
        self.reloads += 1;
    }
}

/// Write the children of the (never rendered) root node.
pub fn write_children<W: Write>(
    writer: &mut W,
    children: &[TreeNode],
    options: &RenderOptions,
) -> io::Result<()> {
    write_children_inner(writer, children, options, &[])
}

fn write_children_inner<W: Write>(
    writer: &mut W,
    children: &[TreeNode],
    options: &RenderOptions,
    ancestor_has_more: &[bool],
) -> io::Result<()> {
    for (index, node) in children.iter().enumerate() {
        let is_last = index + 1 == children.len();

        for &has_more in ancestor_has_more {
            if has_more {
                writer.write_all(b"|   ")?;
            } else {
                writer.write_all(b"    ")?;
            }
        }

        if is_last {
            writer.write_all(b"`-- ")?;
        } else {
            writer.write_all(b"|-- ")?;
        }

        writer.write_all(node.name().as_bytes())?;
        if node.kind().is_dir() {
            writer.write_all(b"/")?;
        }
        if node.is_selected() {
            writer.write_all(b" [selected]")?;
        }
        writer.write_all(b"\n")?;

        let visible = node.is_expanded() || options.expand_all;
        if visible && !node.children().is_empty() {
            let mut next_ancestor_has_more = ancestor_has_more.to_vec();
            next_ancestor_has_more.push(!is_last);
            write_children_inner(writer, node.children(), options, &next_ancestor_has_more)?;
        }
    }

    Ok(())
}
