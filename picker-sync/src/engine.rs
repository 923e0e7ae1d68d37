//! Paged provider sync execution.
//!
//! The engine drains one provider operation (add, album add, or remove)
//! page by page. Each page is applied inside its own scoped database write
//! operation, and the resume token is persisted only after the page
//! committed, so a crashed run restarts at the last committed page instead
//! of from scratch.
//!
//! Pure validation (`validate_page`) is split from the side-effecting steps
//! (query, write, persist token, notify), so resumption and failure modes
//! can be tested by replaying page values.

use picker_provider_core::prelude::*;
use std::collections::HashSet;
use std::result::Result;
use std::sync::Arc;
use tracing::{debug, info};

use crate::db::{DbError, PickerDb, WriteOperation};
use crate::error::SyncError;
use crate::notify::{page_notification_uri, ChangeNotifier};
use crate::prefs::{ProviderScope, SyncPrefs};

/// The paged operations the engine can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncOperation {
    AddMedia,
    AddAlbumMedia,
    RemoveMedia,
}

impl SyncOperation {
    pub const ALL: [SyncOperation; 3] = [
        SyncOperation::AddMedia,
        SyncOperation::AddAlbumMedia,
        SyncOperation::RemoveMedia,
    ];

    /// Sync-prefs key suffix holding this operation's resume token.
    pub fn resume_key(self) -> &'static str {
        match self {
            SyncOperation::AddMedia => "media_add:resume",
            SyncOperation::AddAlbumMedia => "album_add:resume",
            SyncOperation::RemoveMedia => "media_remove:resume",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SyncOperation::AddMedia => "add_media",
            SyncOperation::AddAlbumMedia => "add_album",
            SyncOperation::RemoveMedia => "remove_media",
        }
    }
}

impl std::fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One paged sync run, fully described.
#[derive(Debug, Clone)]
pub struct PagedSyncRequest {
    pub scope: ProviderScope,
    pub operation: SyncOperation,
    /// Collection the pages must belong to. `None` skips the check (album
    /// syncs, which carry no generation).
    pub expected_collection_id: Option<String>,
    /// Page size / sync generation / album id for every query; the engine
    /// fills in the page token.
    pub base_query: MediaQueryArgs,
    /// Require the provider to honor `page_size`.
    pub enforce_paging: bool,
    /// Require the provider to honor `sync_generation`.
    pub is_incremental: bool,
}

impl PagedSyncRequest {
    /// The arguments the provider must confirm as honored for this run.
    fn required_args(&self) -> Vec<&'static str> {
        let mut required = Vec::new();
        if self.enforce_paging {
            required.push(args::PAGE_SIZE);
        }
        if self.is_incremental {
            required.push(args::SYNC_GENERATION);
        }
        if self.base_query.album_id.is_some() {
            required.push(args::ALBUM_ID);
        }
        required
    }
}

/// Executes paged provider queries and writes them through the db facade.
pub struct PagedSyncEngine {
    db: Arc<dyn PickerDb>,
    sync_prefs: Arc<SyncPrefs>,
    notifier: ChangeNotifier,
}

impl PagedSyncEngine {
    pub fn new(db: Arc<dyn PickerDb>, sync_prefs: Arc<SyncPrefs>, notifier: ChangeNotifier) -> Self {
        Self {
            db,
            sync_prefs,
            notifier,
        }
    }

    /// Run one paged sync to completion. Returns the total number of rows
    /// applied across all pages of this run.
    ///
    /// On any error the in-flight page rolls back and the persisted resume
    /// token still points at the last committed page.
    pub async fn run(
        &self,
        provider: &Arc<dyn MediaProvider>,
        request: PagedSyncRequest,
    ) -> Result<u64, SyncError> {
        let authority = provider.info().authority;
        let required = request.required_args();

        let mut page_token = self.sync_prefs.resume_token(request.scope, request.operation);
        if let Some(token) = &page_token {
            info!(
                "Resuming {} sync for '{}' at page token '{}'",
                request.operation, authority, token
            );
        }

        let mut tokens_seen: HashSet<String> = HashSet::new();
        let mut total_rows: u64 = 0;
        let mut pages: u32 = 0;

        loop {
            if let Some(token) = &page_token {
                tokens_seen.insert(token.clone());
            }

            let mut query = request.base_query.clone();
            query.page_token = page_token.clone();

            // The write operation opens before the provider query so a
            // rejected operation never costs a remote round trip.
            let mut op = self.begin_operation(&authority, &request)?;

            let page = match request.operation {
                SyncOperation::RemoveMedia => provider.query_deleted_media(&query).await?,
                _ => provider.query_media(&query).await?,
            };

            let extras = validate_page(&page, request.expected_collection_id.as_deref(), &required, &tokens_seen)?;
            let next_token = extras.next_page_token.clone();

            let written = op.execute(&page.rows).map_err(SyncError::from_db)?;
            total_rows += written as u64;
            pages += 1;

            let first_date_taken = page.first_date_taken_ms();

            op.set_success().map_err(SyncError::from_db)?;
            drop(op);

            // Token moves forward only after the page committed.
            self.sync_prefs
                .set_resume_token(request.scope, request.operation, next_token.as_deref())
                .map_err(SyncError::from_prefs)?;

            if let Some(date_taken_ms) = first_date_taken {
                if let Some(uri) = page_notification_uri(
                    request.operation,
                    query.album_id.as_deref(),
                    date_taken_ms,
                ) {
                    self.notifier.notify(uri);
                }
            }

            debug!(
                "{} page {} for '{}': {} row(s), next token {:?}",
                request.operation, pages, authority, written, next_token
            );

            match next_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(
            "Completed {} sync for '{}': {} row(s) across {} page(s)",
            request.operation, authority, total_rows, pages
        );
        Ok(total_rows)
    }

    fn begin_operation(
        &self,
        authority: &str,
        request: &PagedSyncRequest,
    ) -> Result<Box<dyn WriteOperation>, SyncError> {
        let result = match request.operation {
            SyncOperation::AddMedia => self.db.begin_add_media(authority),
            SyncOperation::AddAlbumMedia => {
                let album = request.base_query.album_id.as_deref().unwrap_or("");
                self.db.begin_add_album_media(authority, album)
            }
            SyncOperation::RemoveMedia => self.db.begin_remove_media(authority),
        };

        result.map_err(|err| match err {
            DbError::InvalidOperation(msg) => SyncError::OperationUnopenable(msg),
            other => SyncError::Database(other),
        })
    }
}

/// Validate one provider page against the run's expectations.
///
/// Checks, in order: the extras block is present; the page belongs to the
/// expected collection; every required argument was honored; the next page
/// token has not been seen this run (a repeat means the provider has a
/// cycle).
pub(crate) fn validate_page<'a>(
    page: &'a MediaPage,
    expected_collection_id: Option<&str>,
    required_args: &[&str],
    tokens_seen: &HashSet<String>,
) -> Result<&'a PageExtras, SyncError> {
    let extras = page.extras.as_ref().ok_or_else(|| {
        SyncError::IllegalState("provider page is missing its extras".to_string())
    })?;

    if let Some(expected) = expected_collection_id {
        if extras.media_collection_id != expected {
            return Err(SyncError::IllegalState(format!(
                "media collection changed mid-sync: expected '{}', got '{}'",
                expected, extras.media_collection_id
            )));
        }
    }

    for arg in required_args {
        if !extras.honors(arg) {
            return Err(SyncError::IllegalState(format!(
                "provider did not honor required arg '{arg}'"
            )));
        }
    }

    if let Some(next) = &extras.next_page_token {
        if tokens_seen.contains(next) {
            return Err(SyncError::IllegalState(format!(
                "provider returned page token '{next}' twice"
            )));
        }
    }

    Ok(extras)
}

// ============================================================================
// Tests
// ============================================================================
