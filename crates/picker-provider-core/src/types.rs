//! Wire types exchanged between the controller and media providers.

use serde::{Deserialize, Serialize};

/// Query argument names a provider may report back as honored.
///
/// A provider that ignores an argument simply omits it from
/// [`PageExtras::honored_args`]; the sync engine decides per operation which
/// arguments were required.
pub mod args {
    pub const PAGE_TOKEN: &str = "page_token";
    pub const PAGE_SIZE: &str = "page_size";
    pub const SYNC_GENERATION: &str = "sync_generation";
    pub const ALBUM_ID: &str = "album_id";
}

/// Identity of an installed media provider.
///
/// `authority` is globally unique on the device; `uid` is the process
/// identity the host OS assigned to the owning package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub authority: String,
    pub package_name: String,
    pub uid: i32,
}

impl ProviderInfo {
    pub fn new(
        authority: impl Into<String>,
        package_name: impl Into<String>,
        uid: i32,
    ) -> Self {
        Self {
            authority: authority.into(),
            package_name: package_name.into(),
            uid,
        }
    }

    /// The sentinel value meaning "no provider".
    pub fn empty() -> Self {
        Self {
            authority: String::new(),
            package_name: String::new(),
            uid: -1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.authority.is_empty()
    }
}

impl std::fmt::Display for ProviderInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "<none>")
        } else {
            write!(f, "{} ({}, uid={})", self.authority, self.package_name, self.uid)
        }
    }
}

/// Snapshot of a provider's current collection.
///
/// A change in `media_collection_id` means the catalog was replaced
/// wholesale; `last_media_sync_generation` only ever moves forward within a
/// single collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaCollectionInfo {
    pub media_collection_id: String,
    pub last_media_sync_generation: i64,
}

impl MediaCollectionInfo {
    pub fn new(media_collection_id: impl Into<String>, last_media_sync_generation: i64) -> Self {
        Self {
            media_collection_id: media_collection_id.into(),
            last_media_sync_generation,
        }
    }
}

/// Arguments for a paged media query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaQueryArgs {
    /// Opaque token identifying the page to fetch; `None` starts from the top.
    pub page_token: Option<String>,
    /// Requested page size; providers may ignore it.
    pub page_size: Option<i32>,
    /// Only return items changed strictly after this generation.
    pub sync_generation: Option<i64>,
    /// Restrict the query to a single album.
    pub album_id: Option<String>,
}

/// One media item row as returned by a provider.
///
/// `date_taken_ms` doubles as the change-notification payload; for deleted
/// media only `id` is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRow {
    pub id: String,
    pub date_taken_ms: i64,
    pub size_bytes: i64,
    pub mime_type: String,
}

/// Response extras accompanying every page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageExtras {
    /// Collection the page belongs to. Must stay constant across the pages
    /// of a single sync run.
    pub media_collection_id: String,
    /// Token for the next page, or `None` when this page is the last.
    pub next_page_token: Option<String>,
    /// The query arguments the provider actually took into account.
    pub honored_args: Vec<String>,
}

impl PageExtras {
    pub fn honors(&self, arg: &str) -> bool {
        self.honored_args.iter().any(|a| a == arg)
    }
}

/// One page of provider results.
///
/// A well-behaved provider always populates `extras`; the sync engine treats
/// a missing extras block as a fatal response defect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPage {
    pub rows: Vec<MediaRow>,
    pub extras: Option<PageExtras>,
}

impl MediaPage {
    /// Date-taken of the first row, used as notification payload.
    pub fn first_date_taken_ms(&self) -> Option<i64> {
        self.rows.first().map(|row| row.date_taken_ms)
    }
}
