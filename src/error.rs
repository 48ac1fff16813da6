//! Error types for rpcdispatch.

use thiserror::Error;

/// Main error type for all dispatch operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Category id outside the valid range `[0, MAX_CATEGORY_ID)`.
    #[error("invalid category id: {0}")]
    InvalidCategory(u32),

    /// No free category slot left in the registry table.
    #[error("category table full")]
    CategoryTableFull,

    /// No free callback slot left in the given category.
    #[error("callback table full for category {0}")]
    CategoryFull(u32),
}

/// Result type alias using DispatchError.
pub type Result<T> = std::result::Result<T, DispatchError>;
