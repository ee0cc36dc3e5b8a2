use std::fmt;
use std::sync::Arc;

use super::{Entry, EntryKind};

/// How a node came to exist in the tree.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Origin {
    Root,
    /// Loaded from the initial backend listing.
    Listing,
    /// Added after a confirmed create round-trip.
    Created,
    /// Intermediate directory synthesized locally by an insertion.
    Placeholder,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EventKind {
    Select,
    ContextMenu,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeEvent {
    Select,
    ContextMenu { x: i32, y: i32 },
}

impl NodeEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            NodeEvent::Select => EventKind::Select,
            NodeEvent::ContextMenu { .. } => EventKind::ContextMenu,
        }
    }
}

pub type Handler = Arc<dyn Fn(&NodeEvent, &TreeNode) + Send + Sync>;

#[derive(Clone, Default)]
struct Listeners(Vec<(EventKind, Handler)>);

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(|(kind, _)| kind))
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct TreeNode {
    pub(crate) name: String,
    pub(crate) entry: Entry,
    pub(crate) origin: Origin,
    pub(crate) selected: bool,
    pub(crate) expanded: bool,
    pub(crate) children: Vec<TreeNode>,
    listeners: Listeners,
}

impl TreeNode {
    pub(crate) fn root() -> Self {
        Self {
            name: String::new(),
            entry: Entry::dir(""),
            origin: Origin::Root,
            selected: false,
            expanded: true,
            children: Vec::new(),
            listeners: Listeners::default(),
        }
    }

    pub(crate) fn new(entry: Entry, origin: Origin) -> Self {
        Self {
            name: entry.name().to_owned(),
            entry,
            origin,
            selected: false,
            expanded: origin == Origin::Placeholder,
            children: Vec::new(),
            listeners: Listeners::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    pub fn path(&self) -> &str {
        &self.entry.path
    }

    pub fn kind(&self) -> EntryKind {
        self.entry.kind
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn is_placeholder(&self) -> bool {
        self.origin == Origin::Placeholder
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn children(&self) -> &[TreeNode] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Register a handler for one kind of UI event. Handlers live as long as the node.
    pub fn on<F>(&mut self, kind: EventKind, handler: F)
    where
        F: Fn(&NodeEvent, &TreeNode) + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(handler);
        self.listeners.0.push((kind, handler));
    }

    /// Invoke the handlers registered for the event's kind, returning how many ran.
    pub fn emit(&self, event: &NodeEvent) -> usize {
        let kind = event.kind();
        let mut invoked = 0;
        for (_, handler) in self.listeners.0.iter().filter(|(k, _)| *k == kind) {
            handler(event, self);
            invoked += 1;
        }
        invoked
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.0.len()
    }
}

/// Names leading from the root to a node, root excluded.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TreePath {
    segments: Vec<String>,
}

impl TreePath {
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl From<&str> for TreePath {
    fn from(path: &str) -> Self {
        Self {
            segments: path
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}
