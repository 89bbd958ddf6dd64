//! Error types for the manipulation engine.

use crate::scene::ElementId;
use thiserror::Error;

/// Errors raised by editing operations.
///
/// Most interaction problems degrade to a fallback instead of an error
/// (an unmatched snap just does not snap). These variants cover calls that
/// break a caller contract, such as using a stale path decomposition.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EditError {
    #[error("Path node index {index} out of range (decomposition has {len} nodes)")]
    NodeOutOfRange { index: usize, len: usize },
    #[error("Operand index {index} out of range for path with {len} operands")]
    OperandOutOfRange { index: usize, len: usize },
    #[error("Element not found: {0}")]
    UnknownElement(ElementId),
    #[error("Element is not a path: {0}")]
    NotAPath(ElementId),
    #[error("No active path for node editing")]
    NoActivePath,
    #[error("Invalid preferences: {0}")]
    InvalidPreferences(String),
}

/// Result type for editing operations.
pub type EditResult<T> = Result<T, EditError>;
