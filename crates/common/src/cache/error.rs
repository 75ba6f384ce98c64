use thiserror::Error;

/// Errors returned by the tiered cache and shared stores
///
/// Absence is never an error; a missing key is `Ok(None)`.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The shared tier could not be reached
    #[error("Shared cache tier unavailable: {0}")]
    Unavailable(String),

    /// A value could not be encoded or a stored payload could not be decoded
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CacheError {
    /// Build [`CacheError::Unavailable`] from any displayable backend error
    pub fn unavailable(reason: impl std::fmt::Display) -> Self {
        Self::Unavailable(reason.to_string())
    }

    /// Whether the shared tier was unreachable
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
