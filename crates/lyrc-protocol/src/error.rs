//! Error types for request parsing

use thiserror::Error;

/// Errors that can occur while parsing a request line
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The line contained no tokens
    #[error("empty request")]
    EmptyRequest,
}
