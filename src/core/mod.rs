pub mod order;
pub mod render;
pub mod tree;

pub use render::{AsciiView, Detached, RenderOptions, View};
pub use tree::{Built, EventBinder, NoEvents, TreeBuilder, TreeView};
