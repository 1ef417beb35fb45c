use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures from parsing tool names and reading or writing layouts.
/// Simulation and placement never fail; they log and carry on.
#[derive(Debug, Error)]
pub enum Error {
    /// A tool identifier that doesn't name any tool.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// An engine or car kind name that doesn't exist.
    #[error("unknown rolling stock kind: {0}")]
    UnknownKind(String),

    #[error("layout JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("layout snapshot: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
