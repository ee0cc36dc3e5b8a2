pub mod backend;
pub mod cli;
pub mod core;
pub mod error;
pub mod explorer;
pub mod logging;
pub mod models;

pub use error::TreeError;
pub use explorer::{Explorer, ExplorerOptions, MenuKind, NodeAction};
pub use models::{Entry, EntryKind, TreeNode, TreePath};
