//! Browser session error types

use thiserror::Error;

/// Session-level errors. Each one is fatal to the single visitor that hit it
/// and never propagates to sibling sessions.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to open session: {0}")]
    OpenFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Timed out after {timeout_secs}s waiting for element '{element_id}'")]
    WaitTimeout { element_id: String, timeout_secs: u64 },

    #[error("Element interaction failed: {0}")]
    InteractionFailed(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Failed to close session: {0}")]
    CloseFailed(String),
}
