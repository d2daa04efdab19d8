use std::error::Error;
use thiserror::Error;

/// Result alias for lobby store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Failure reported by a [`LobbyStore`](crate::dao::lobby_store::LobbyStore) backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not serve `operation`.
    #[error("lobby store unavailable during `{operation}`")]
    Unavailable {
        operation: &'static str,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A uniqueness constraint was violated (e.g. duplicate join code).
    #[error("storage conflict: {0}")]
    Conflict(String),
}

impl StorageError {
    /// Wrap a backend failure raised while running `operation`.
    pub fn unavailable(operation: &'static str, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            operation,
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_keeps_operation_and_source() {
        let err = StorageError::unavailable("list_participants", std::io::Error::other("reset"));
        assert_eq!(
            err.to_string(),
            "lobby store unavailable during `list_participants`"
        );
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("reset"));
    }
}
