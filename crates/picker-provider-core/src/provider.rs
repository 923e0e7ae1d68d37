//! The `MediaProvider` trait implemented by every backend.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{MediaCollectionInfo, MediaPage, MediaQueryArgs, ProviderInfo};

/// A media-provider backend.
///
/// The controller consumes exactly three remote surfaces from a provider:
/// the collection-info method call and the paged `media` / `deleted-media`
/// queries. All three may block indefinitely; the controller imposes no
/// timeouts of its own.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Identity of this provider installation.
    fn info(&self) -> ProviderInfo;

    /// Fetch the provider's current collection id and sync generation.
    async fn media_collection_info(&self) -> Result<MediaCollectionInfo>;

    /// Query one page of media items.
    async fn query_media(&self, query: &MediaQueryArgs) -> Result<MediaPage>;

    /// Query one page of deleted media. Rows carry ids only; the remaining
    /// columns are unspecified.
    async fn query_deleted_media(&self, query: &MediaQueryArgs) -> Result<MediaPage>;
}
