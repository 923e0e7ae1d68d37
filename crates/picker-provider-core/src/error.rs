//! Error types for provider implementations.

use thiserror::Error;

/// Errors a media provider can surface to the controller.
///
/// The controller treats every variant as transient: a failed sync keeps its
/// durable resume state and is retried by the orchestrator's policy, never by
/// the provider itself.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The remote call reached the provider but failed there.
    #[error("remote provider call failed: {0}")]
    Remote(String),

    /// The provider is installed but cannot currently serve requests.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Result alias used throughout provider implementations.
pub type Result<T> = std::result::Result<T, ProviderError>;
