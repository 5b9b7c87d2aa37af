//! Error types for dojo-core

use thiserror::Error;

/// Main error type for the dojo-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// No project matched a search term
    #[error("no projects found matching '{0}'")]
    ProjectNotFound(String),

    /// A numbered selection was out of range or not a number
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// Category name not in any known category set
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    /// Health fix target not recognized
    #[error("unknown fix target: {0} (expected git, python, node or all)")]
    UnknownFixTarget(String),

    /// Quick action not offered for the project type
    #[error("no '{action}' action available for {project_type} projects")]
    UnknownAction {
        action: String,
        project_type: String,
    },

    /// Rollback requested without a recorded migration
    #[error("no migration backup found")]
    NoBackup,

    /// Operation needs a directory inside the workspace
    #[error("not inside the workspace")]
    OutsideWorkspace,

    /// Editor or explorer could not be started
    #[error("failed to launch {0}")]
    Launch(String),
}

/// Result type alias for dojo-core
pub type Result<T> = std::result::Result<T, Error>;
