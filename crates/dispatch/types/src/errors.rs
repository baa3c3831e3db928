//! Error types for the Dispatch layer

use crate::{CategoryKey, ResponderId, UnitId};

/// Errors that can occur in dispatch operations.
///
/// Every variant is a rejection: it is returned before any state changes.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Dispatch is frozen for another {remaining_ms}ms")]
    Frozen { remaining_ms: i64 },

    #[error("Unknown emergency category: {0}")]
    UnknownCategory(CategoryKey),

    #[error("Responder already in unit: {0}")]
    AlreadyInUnit(ResponderId),

    #[error("Responder not in a unit: {0}")]
    NotInUnit(ResponderId),

    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    #[error("Configuration I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),
}

/// Result type alias for dispatch operations
pub type DispatchResult<T> = Result<T, DispatchError>;
