//! Error types for the sync controller.

use picker_provider_core::ProviderError;
use thiserror::Error;

use crate::db::DbError;

/// Errors surfaced by the planner, engine, and orchestrator.
///
/// None of these cross the controller's public boundary: orchestration entry
/// points log the error and report plain boolean success, and setter methods
/// fold `FeatureDisabled` / `UnknownProvider` into a `false` return.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The cloud-picker feature is switched off in the configuration.
    #[error("cloud media is disabled")]
    FeatureDisabled,

    /// The authority is not in the relevant provider listing.
    #[error("unknown provider authority: {0}")]
    UnknownProvider(String),

    /// The cloud provider changed while the operation was in flight. The
    /// run is abandoned without retry and cloud queries stay disabled.
    #[error("sync request is obsolete: {0}")]
    RequestObsolete(String),

    /// Malformed collection info, a mid-run collection change, an unhonored
    /// required argument, or a repeated page token.
    #[error("illegal sync state: {0}")]
    IllegalState(String),

    /// A remote provider call failed.
    #[error("provider failure: {0}")]
    Provider(#[from] ProviderError),

    /// A database write or commit failed.
    #[error("database failure: {0}")]
    Database(DbError),

    /// The database rejected the request to open a write operation. The run
    /// aborts without advancing any persisted state.
    #[error("write operation rejected: {0}")]
    OperationUnopenable(String),

    /// A preference commit failed.
    #[error("preference store failure: {0}")]
    Prefs(String),
}

impl SyncError {
    /// Whether the orchestrator's reset-and-retry-once policy applies.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::IllegalState(_)
                | SyncError::Provider(_)
                | SyncError::Database(_)
                | SyncError::Prefs(_)
        )
    }

    pub(crate) fn from_db(err: DbError) -> Self {
        SyncError::Database(err)
    }

    pub(crate) fn from_prefs(err: anyhow::Error) -> Self {
        SyncError::Prefs(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(SyncError::IllegalState("bad".to_string()).is_retryable());
        assert!(SyncError::Provider(ProviderError::Remote("down".to_string())).is_retryable());
        assert!(!SyncError::RequestObsolete("swapped".to_string()).is_retryable());
        assert!(!SyncError::OperationUnopenable("no authority".to_string()).is_retryable());
        assert!(!SyncError::FeatureDisabled.is_retryable());
    }
}
