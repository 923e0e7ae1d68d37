//! # picker-provider-core
//!
//! Core traits and types shared between the picker sync controller and the
//! media providers it consumes.
//!
//! A media provider publishes a *media collection*: the set of items it
//! currently exposes, identified by an opaque collection id and versioned by
//! a monotonically non-decreasing sync generation. Providers hand out their
//! items in pages, each page carrying the extras the controller needs to
//! validate the response (collection id, next page token, honored args).

mod error;
mod provider;
mod types;

pub use error::{ProviderError, Result};
pub use provider::MediaProvider;
pub use types::{
    args, MediaCollectionInfo, MediaPage, MediaQueryArgs, MediaRow, PageExtras, ProviderInfo,
};

/// Convenience re-exports for provider implementations.
pub mod prelude {
    pub use crate::error::{ProviderError, Result};
    pub use crate::provider::MediaProvider;
    pub use crate::types::{
        args, MediaCollectionInfo, MediaPage, MediaQueryArgs, MediaRow, PageExtras, ProviderInfo,
    };
}
