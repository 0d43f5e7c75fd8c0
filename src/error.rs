use serde::{Deserialize, Serialize};
use thiserror::Error;

/// gRPC status number for NOT_FOUND.
pub const NOT_FOUND_CODE: u32 = 5;

/// Failures reported by the cache store.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CacheError {
    #[error("key not found: {key:?}")]
    NotFound { key: String },
}

impl CacheError {
    /// Status number a transport should report for this failure.
    pub fn code(&self) -> u32 {
        match self {
            CacheError::NotFound { .. } => NOT_FOUND_CODE,
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_grpc_status() {
        let err = CacheError::NotFound {
            key: "missing".to_string(),
        };
        assert_eq!(err.code(), 5);
        assert_eq!(err.to_string(), "key not found: \"missing\"");
    }
}
