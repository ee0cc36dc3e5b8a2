use thiserror::Error;

/// Structural failures while building a tree from a backend listing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("invalid path '{path}'")]
    InvalidPath { path: String },

    /// The listing named a child before its parent directory.
    #[error("invalid directory tree: parent '{parent}' of '{path}' has not been listed")]
    MissingParent { path: String, parent: String },

    #[error("invalid directory tree: '{parent}' is a file and cannot contain '{path}'")]
    NotADirectory { path: String, parent: String },

    #[error("invalid directory tree: '{path}' is listed more than once")]
    DuplicateEntry { path: String },
}
