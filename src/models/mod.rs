mod entry;
mod tree;

pub use entry::{Entry, EntryKind, split_path};
pub use tree::{EventKind, Handler, NodeEvent, Origin, TreeNode, TreePath};
