use thiserror::Error;

/// Errors surfaced by a page renderer and its sessions.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to launch renderer: {0}")]
    Launch(String),

    #[error("Navigation timed out after {0} ms")]
    NavigationTimeout(u64),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Session is closed")]
    Closed,

    #[error("Unknown element handle {0}")]
    StaleElement(u64),

    #[error("Query failed for selector '{selector}': {reason}")]
    Query { selector: String, reason: String },

    #[error("Screenshot failed: {0}")]
    Screenshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Renderer error: {0}")]
    Other(String),
}

/// Errors surfaced by the artifact and document stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
