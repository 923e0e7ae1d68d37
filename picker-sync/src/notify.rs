//! Change-notification URIs and their publisher.
//!
//! UI observers subscribe to a broadcast channel of URI strings. The
//! controller posts one `refresh-ui` notification when the cloud provider
//! changes, and one per-page notification while a paged sync lands rows,
//! carrying the page's first date-taken timestamp as payload.

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::engine::SyncOperation;

/// Base of every internal picker notification URI.
pub const NOTIFY_BASE: &str = "picker://internal";

/// Posted when the active cloud provider changes or becomes available.
pub const REFRESH_UI_URI: &str = "picker://internal/refresh-ui";

/// URI for a landed media page.
pub fn media_update_uri(date_taken_ms: i64) -> String {
    format!("{NOTIFY_BASE}/update/media/{date_taken_ms}")
}

/// URI for a landed album-content page.
pub fn album_update_uri(album_id: &str, date_taken_ms: i64) -> String {
    format!("{NOTIFY_BASE}/update/album_content/{album_id}/{date_taken_ms}")
}

/// The notification URI for one committed page, if the operation notifies.
pub fn page_notification_uri(
    operation: SyncOperation,
    album_id: Option<&str>,
    date_taken_ms: i64,
) -> Option<String> {
    match operation {
        SyncOperation::AddMedia => Some(media_update_uri(date_taken_ms)),
        SyncOperation::AddAlbumMedia => {
            album_id.map(|album| album_update_uri(album, date_taken_ms))
        }
        SyncOperation::RemoveMedia => match album_id {
            Some(album) => Some(album_update_uri(album, date_taken_ms)),
            None => Some(media_update_uri(date_taken_ms)),
        },
    }
}

/// Publishes change-notification URIs to UI observers.
///
/// Cloning is cheap; clones share the same channel. Publishing with no
/// subscribers is a silent no-op.
#[derive(Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<String>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    pub fn notify(&self, uri: impl Into<String>) {
        let uri = uri.into();
        debug!("Publishing change notification: {}", uri);
        // An Err means no live subscribers, which is fine.
        let _ = self.tx.send(uri);
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

// ============================================================================
// Media store service
// ============================================================================

/// The OS storage service interested in cloud-provider changes.
///
/// Notification is best-effort: the controller logs failures and never
/// propagates them.
pub trait MediaStoreService: Send + Sync {
    fn cloud_provider_changed(&self, authority: Option<&str>) -> Result<()>;
}

/// Default implementation that only logs.
pub struct LoggingMediaStore;

impl MediaStoreService for LoggingMediaStore {
    fn cloud_provider_changed(&self, authority: Option<&str>) -> Result<()> {
        info!("Media store notified of cloud provider change: {:?}", authority);
        Ok(())
    }
}
