//! The picker sync controller.
//!
//! A process-wide singleton that tracks the active cloud provider, plans and
//! executes media syncs against the local and cloud providers, and keeps the
//! picker database consistent with a snapshot of each provider's collection.
//!
//! # Locking
//!
//! Three named synchronization primitives serialize the controller against
//! concurrent callers:
//!
//! 1. the **cloud-provider lock** guards the active provider identity and
//!    every provider switch,
//! 2. the **cloud-sync lock** serializes end-to-end cloud syncs,
//! 3. the process-wide **idle-maintenance lock** serializes local full-media
//!    syncs with other maintenance jobs touching the picker database.
//!
//! When both sync locks are needed the order is cloud-sync before
//! cloud-provider, never the reverse. Sync code only reaches the
//! cloud-provider lock through a [`CloudSyncWindow`], which can only exist
//! while the cloud-sync lock is held, so the ordering is structural rather
//! than a convention.

use picker_provider_core::prelude::*;
use std::result::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::db::{DbError, PickerDb};
use crate::engine::{PagedSyncEngine, PagedSyncRequest, SyncOperation};
use crate::error::SyncError;
use crate::notify::{ChangeNotifier, LoggingMediaStore, MediaStoreService, REFRESH_UI_URI};
use crate::planner::{plan_sync, SyncPlan};
use crate::prefs::{CloudProviderSetting, ProviderScope, SyncPrefs, UserPrefs};
use crate::registry::ProviderRegistry;

/// The picker sync controller. See the module docs for the locking model.
pub struct PickerSyncController {
    config: Arc<Config>,
    registry: Arc<ProviderRegistry>,
    db: Arc<dyn PickerDb>,
    user_prefs: UserPrefs,
    sync_prefs: Arc<SyncPrefs>,
    notifier: ChangeNotifier,
    media_store: Arc<dyn MediaStoreService>,
    engine: PagedSyncEngine,
    /// Cloud-provider lock. The guarded value is the active provider, the
    /// empty sentinel when none is set.
    cloud_provider: Mutex<ProviderInfo>,
    /// Cloud-sync lock.
    cloud_sync_lock: Mutex<()>,
    /// Process-wide idle-maintenance lock, shared with other maintenance
    /// jobs so concurrent database work cannot deadlock.
    idle_maintenance_lock: Arc<Mutex<()>>,
}

/// Scope of one end-to-end cloud sync: the cloud-sync lock plus the
/// provider snapshot taken when the sync began.
struct CloudSyncWindow<'a> {
    _sync: tokio::sync::MutexGuard<'a, ()>,
    snapshot: ProviderInfo,
}

impl CloudSyncWindow<'_> {
    fn authority(&self) -> Option<String> {
        if self.snapshot.is_empty() {
            None
        } else {
            Some(self.snapshot.authority.clone())
        }
    }
}

impl PickerSyncController {
    /// Create a controller with default collaborators and run cloud-provider
    /// default selection.
    pub async fn new(
        config: Arc<Config>,
        registry: Arc<ProviderRegistry>,
        db: Arc<dyn PickerDb>,
        user_prefs: UserPrefs,
        sync_prefs: SyncPrefs,
    ) -> Self {
        Self::with_collaborators(
            config,
            registry,
            db,
            user_prefs,
            sync_prefs,
            Arc::new(LoggingMediaStore),
            Arc::new(Mutex::new(())),
            ChangeNotifier::default(),
        )
        .await
    }

    /// Create a controller with every collaborator injected. Tests use this
    /// to substitute fakes without any global mutation.
    #[allow(clippy::too_many_arguments)]
    pub async fn with_collaborators(
        config: Arc<Config>,
        registry: Arc<ProviderRegistry>,
        db: Arc<dyn PickerDb>,
        user_prefs: UserPrefs,
        sync_prefs: SyncPrefs,
        media_store: Arc<dyn MediaStoreService>,
        idle_maintenance_lock: Arc<Mutex<()>>,
        notifier: ChangeNotifier,
    ) -> Self {
        let sync_prefs = Arc::new(sync_prefs);
        let engine = PagedSyncEngine::new(
            Arc::clone(&db),
            Arc::clone(&sync_prefs),
            notifier.clone(),
        );

        let controller = Self {
            config,
            registry,
            db,
            user_prefs,
            sync_prefs,
            notifier,
            media_store,
            engine,
            cloud_provider: Mutex::new(ProviderInfo::empty()),
            cloud_sync_lock: Mutex::new(()),
            idle_maintenance_lock,
        };

        controller.initialize_cloud_provider().await;
        controller
    }

    // ========================================================================
    // Cloud provider state
    // ========================================================================

    /// Select the cloud provider, or clear it with `None`.
    ///
    /// Returns `false` when the cloud feature is disabled or the authority
    /// is not in the allow-listed provider listing.
    pub async fn set_cloud_provider(&self, authority: Option<&str>) -> bool {
        self.set_cloud_provider_internal(authority, false).await
    }

    /// Like [`set_cloud_provider`](Self::set_cloud_provider) but ignoring
    /// the allow-list. For tests and legacy support tooling.
    pub async fn force_set_cloud_provider(&self, authority: Option<&str>) -> bool {
        self.set_cloud_provider_internal(authority, true).await
    }

    async fn set_cloud_provider_internal(
        &self,
        authority: Option<&str>,
        ignore_allowlist: bool,
    ) -> bool {
        if !self.config.is_cloud_media_enabled() {
            warn!("Ignoring cloud provider change: cloud media is disabled");
            return false;
        }

        let next = match authority {
            None => ProviderInfo::empty(),
            Some(authority) => {
                let info = self.registry.resolve(authority, ignore_allowlist);
                if info.is_empty() {
                    warn!("Ignoring unknown cloud provider '{}'", authority);
                    return false;
                }
                info
            }
        };

        let mut current = self.cloud_provider.lock().await;
        if current.authority == next.authority {
            debug!("Cloud provider is already {}", next);
            return true;
        }

        match self.apply_cloud_provider_locked(&mut current, next, false).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to switch cloud provider: {e}");
                false
            }
        }
    }

    /// The active cloud authority, if any.
    pub async fn cloud_provider(&self) -> Option<String> {
        let current = self.cloud_provider.lock().await;
        if current.is_empty() {
            None
        } else {
            Some(current.authority.clone())
        }
    }

    /// Full identity of the active cloud provider, the empty sentinel when
    /// none is set.
    pub async fn cloud_provider_info(&self) -> ProviderInfo {
        self.cloud_provider.lock().await.clone()
    }

    /// Handle removal of an installed package.
    ///
    /// If the removed package owned the active cloud provider, the selection
    /// is cleared, the persisted setting returns to never-configured, and
    /// default selection runs again against the remaining providers.
    pub async fn notify_package_removed(&self, package: &str) {
        let removed = self.registry.remove_package(package);
        if !removed.is_empty() {
            info!("Package '{}' removed with providers {:?}", package, removed);
        }

        let was_active = {
            let current = self.cloud_provider.lock().await;
            !current.is_empty() && current.package_name == package
        };
        if !was_active {
            return;
        }

        info!(
            "Active cloud provider package '{}' was removed; clearing selection",
            package
        );
        self.set_cloud_provider(None).await;

        // The clear above records the explicit-unset sentinel; package
        // removal must leave the setting never-configured instead so a new
        // provider can be auto-selected.
        if let Err(e) = self.user_prefs.clear_cloud_authority() {
            warn!("Failed to clear persisted cloud authority: {e:#}");
        }

        self.initialize_cloud_provider().await;
    }

    /// Whether queries against this authority are currently served: always
    /// true for the local provider, true for the active cloud provider.
    pub async fn is_provider_enabled(&self, authority: &str) -> bool {
        if authority == self.config.picker.local_provider_authority {
            return true;
        }
        let current = self.cloud_provider.lock().await;
        !current.is_empty() && current.authority == authority
    }

    /// As [`is_provider_enabled`](Self::is_provider_enabled), additionally
    /// requiring the caller uid to match the provider's.
    pub async fn is_provider_enabled_for_uid(&self, authority: &str, uid: i32) -> bool {
        if authority == self.config.picker.local_provider_authority {
            return self
                .registry
                .get(authority)
                .map(|p| p.info().uid == uid)
                .unwrap_or(false);
        }
        let current = self.cloud_provider.lock().await;
        !current.is_empty() && current.authority == authority && current.uid == uid
    }

    /// Whether the authority belongs to any installed provider with the
    /// given uid, active or not, allow-listed or not.
    pub fn is_provider_supported(&self, authority: &str, uid: i32) -> bool {
        if authority == self.config.picker.local_provider_authority {
            return self
                .registry
                .get(authority)
                .map(|p| p.info().uid == uid)
                .unwrap_or(false);
        }
        self.registry
            .all_available()
            .iter()
            .any(|info| info.authority == authority && info.uid == uid)
    }

    /// Pick the cloud provider at start-up (and after package removal).
    ///
    /// An explicitly cleared setting stays cleared. Otherwise a sole
    /// available provider wins, then a still-available cached selection,
    /// then the configured default package. When the choice differs from
    /// the cached one it is persisted, which also tells observers that
    /// cloud media just became available.
    async fn initialize_cloud_provider(&self) {
        if !self.config.is_cloud_media_enabled() {
            debug!("Cloud media disabled; picker runs local-only");
            let mut current = self.cloud_provider.lock().await;
            *current = ProviderInfo::empty();
            return;
        }

        let cached = match self.user_prefs.cloud_setting() {
            CloudProviderSetting::Unset => {
                debug!("Cloud provider explicitly cleared by the user; skipping default selection");
                let mut current = self.cloud_provider.lock().await;
                *current = ProviderInfo::empty();
                return;
            }
            CloudProviderSetting::NotSet => None,
            CloudProviderSetting::Set(authority) => Some(authority),
        };

        let available = self.registry.available();
        let choice = if available.len() == 1 {
            available[0].clone()
        } else if let Some(info) = cached
            .as_ref()
            .and_then(|cached| available.iter().find(|info| &info.authority == cached))
        {
            info.clone()
        } else if let Some(info) = self
            .config
            .default_cloud_provider_package()
            .and_then(|pkg| available.iter().find(|info| info.package_name == pkg))
        {
            info.clone()
        } else {
            ProviderInfo::empty()
        };

        let cached_authority = cached.unwrap_or_default();
        let mut current = self.cloud_provider.lock().await;
        if choice.authority == cached_authority {
            debug!("Cloud provider default selection kept {}", choice);
            *current = choice;
        } else {
            info!("Cloud provider default selection chose {}", choice);
            if let Err(e) = self.apply_cloud_provider_locked(&mut current, choice, true).await {
                error!("Failed to apply default cloud provider: {e}");
            }
        }
    }

    /// Commit a provider change while the cloud-provider lock is held.
    ///
    /// Cloud queries go dark before the new authority is persisted; only a
    /// later successful sync re-enables them. `auto_selected` distinguishes
    /// default selection from a user action: auto-selecting nothing removes
    /// the persisted key instead of recording the explicit-unset sentinel.
    async fn apply_cloud_provider_locked(
        &self,
        current: &mut ProviderInfo,
        next: ProviderInfo,
        auto_selected: bool,
    ) -> Result<(), SyncError> {
        self.db.set_cloud_authority(None).map_err(SyncError::Database)?;

        let authority = if next.is_empty() {
            None
        } else {
            Some(next.authority.clone())
        };
        if authority.is_none() && auto_selected {
            self.user_prefs
                .clear_cloud_authority()
                .map_err(SyncError::from_prefs)?;
        } else {
            self.user_prefs
                .set_cloud_authority(authority.as_deref())
                .map_err(SyncError::from_prefs)?;
        }

        info!("Cloud provider changed: {} -> {}", current, next);
        if let Err(e) = self.media_store.cloud_provider_changed(authority.as_deref()) {
            warn!("Failed to notify media store of provider change: {e:#}");
        }
        self.notifier.notify(REFRESH_UI_URI);

        *current = next;
        Ok(())
    }

    // ========================================================================
    // Sync orchestration
    // ========================================================================

    /// Sync the local provider, then the cloud provider.
    pub async fn sync_all_media(&self) -> bool {
        let local = self.sync_all_media_from_local().await;
        let cloud = self.sync_all_media_from_cloud().await;
        local && cloud
    }

    /// Sync all media from the local provider.
    pub async fn sync_all_media_from_local(&self) -> bool {
        let _idle = self.idle_maintenance_lock.lock().await;

        let authority = self.config.picker.local_provider_authority.clone();
        match self
            .sync_all_media_for(ProviderScope::Local, Some(authority), true, false)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                error!("Local media sync failed: {e}");
                false
            }
        }
    }

    /// Sync all media from the active cloud provider.
    ///
    /// Cloud queries are disabled for the duration of the sync and
    /// re-enabled only if the active provider still matches the snapshot
    /// taken at the start.
    pub async fn sync_all_media_from_cloud(&self) -> bool {
        let window = match self.begin_cloud_sync().await {
            Ok(window) => window,
            Err(e) => {
                error!("Failed to start cloud sync: {e}");
                return false;
            }
        };

        let authority = window.authority();
        let result = self
            .sync_all_media_for(ProviderScope::Cloud, authority, true, true)
            .await;

        match result {
            Ok(()) => {
                if let Err(e) = self.reset_all_album_media(&window).await {
                    warn!("Album media reset after cloud sync failed: {e}");
                }
                self.finish_cloud_sync(&window).await
            }
            Err(SyncError::RequestObsolete(msg)) => {
                info!("Cloud sync abandoned: {msg}");
                false
            }
            Err(e) => {
                error!("Cloud media sync failed: {e}");
                false
            }
        }
    }

    /// Sync the contents of one album. Always a full reset followed by a
    /// paged add; incremental album sync is not supported, so failures are
    /// not retried (a retry could not do anything different).
    pub async fn sync_album_media(&self, album_id: &str, is_local: bool) -> bool {
        let (scope, authority) = if is_local {
            (
                ProviderScope::Local,
                Some(self.config.picker.local_provider_authority.clone()),
            )
        } else {
            (ProviderScope::Cloud, self.cloud_provider().await)
        };

        match self.sync_album_once(scope, authority.as_deref(), album_id).await {
            Ok(()) => true,
            Err(e) => {
                error!("Album '{album_id}' sync failed: {e}");
                false
            }
        }
    }

    /// Drop everything synced for both providers: media rows, album rows,
    /// collection cursors, and resume tokens.
    pub async fn reset_all_media(&self) -> bool {
        let local_authority = self.config.picker.local_provider_authority.clone();

        let mut ok = true;
        for result in [
            self.reset_media_for(ProviderScope::Local, Some(&local_authority)).await,
            self.reset_media_for(ProviderScope::Cloud, None).await,
            self.run_reset_album_op(Some(&local_authority), None),
            self.run_reset_album_op(None, None),
        ] {
            if let Err(e) = result {
                error!("Reset failed: {e}");
                ok = false;
            }
        }
        ok
    }

    // ========================================================================
    // Cloud sync window
    // ========================================================================

    async fn begin_cloud_sync(&self) -> Result<CloudSyncWindow<'_>, SyncError> {
        let sync_guard = self.cloud_sync_lock.lock().await;
        let snapshot = self.cloud_provider.lock().await.clone();

        // Cloud rows disappear from picker queries for the whole sync.
        self.db.set_cloud_authority(None).map_err(SyncError::Database)?;

        Ok(CloudSyncWindow {
            _sync: sync_guard,
            snapshot,
        })
    }

    /// Re-enable cloud queries, but only if the active provider still
    /// matches the snapshot the sync ran against.
    async fn finish_cloud_sync(&self, window: &CloudSyncWindow<'_>) -> bool {
        if window.snapshot.is_empty() {
            return true;
        }

        let current = self.cloud_provider.lock().await;
        if current.authority != window.snapshot.authority {
            info!(
                "Cloud provider changed during sync ({} -> {}); cloud queries stay disabled",
                window.snapshot, current
            );
            return true;
        }

        match self.db.set_cloud_authority(Some(window.snapshot.authority.as_str())) {
            Ok(()) => {
                debug!("Cloud queries re-enabled for {}", window.snapshot);
                true
            }
            Err(e) => {
                error!("Failed to re-enable cloud queries: {e}");
                false
            }
        }
    }

    /// Reset album contents after a successful cloud media sync; albums are
    /// re-synced lazily when the UI opens them.
    // TODO: narrow this to the cloud provider's albums once the picker UI
    // re-fetches local albums on its own.
    async fn reset_all_album_media(&self, window: &CloudSyncWindow<'_>) -> Result<(), SyncError> {
        let local_authority = self.config.picker.local_provider_authority.clone();
        self.run_reset_album_op(Some(&local_authority), None)?;

        let cloud_authority = window.authority();
        self.run_reset_album_op(cloud_authority.as_deref(), None)?;

        for scope in [ProviderScope::Local, ProviderScope::Cloud] {
            self.sync_prefs
                .set_resume_token(scope, SyncOperation::AddAlbumMedia, None)
                .map_err(SyncError::from_prefs)?;
        }
        Ok(())
    }

    // ========================================================================
    // Planner dispatch
    // ========================================================================

    /// Plan and execute one provider's media sync, with the retry policy:
    /// a retryable failure causes one reset followed by one more attempt.
    async fn sync_all_media_for(
        &self,
        scope: ProviderScope,
        authority: Option<String>,
        retry_on_failure: bool,
        enforce_paging: bool,
    ) -> Result<(), SyncError> {
        match self.sync_media_once(scope, authority.as_deref(), enforce_paging).await {
            Err(e) if retry_on_failure && e.is_retryable() => {
                warn!("{scope} media sync failed ({e}); resetting and retrying once");
                self.reset_media_for(scope, authority.as_deref()).await?;
                self.sync_media_once(scope, authority.as_deref(), enforce_paging).await
            }
            other => other,
        }
    }

    async fn sync_media_once(
        &self,
        scope: ProviderScope,
        authority: Option<&str>,
        enforce_paging: bool,
    ) -> Result<(), SyncError> {
        let Some(authority) = authority else {
            // No provider set: drop whatever an earlier provider left behind.
            debug!("No {scope} provider; resetting synced media");
            return self.reset_media_for(scope, None).await;
        };

        let provider = self
            .registry
            .get(authority)
            .ok_or_else(|| SyncError::UnknownProvider(authority.to_string()))?;

        let latest = provider.media_collection_info().await?;

        if scope == ProviderScope::Cloud {
            self.ensure_cloud_provider_still(authority).await?;
        }

        let cached = self.sync_prefs.cached_collection(scope);
        let page_size = self.config.picker.sync_page_size;

        match plan_sync(&cached, &latest)? {
            SyncPlan::Skip => {
                debug!("{scope} media is already current");
                Ok(())
            }
            SyncPlan::Reset => self.reset_media_for(scope, Some(authority)).await,
            SyncPlan::Full { latest } => {
                info!("Running full {scope} media sync for '{authority}'");
                self.reset_media_for(scope, Some(authority)).await?;

                let request = PagedSyncRequest {
                    scope,
                    operation: SyncOperation::AddMedia,
                    expected_collection_id: Some(latest.media_collection_id.clone()),
                    base_query: MediaQueryArgs {
                        page_token: None,
                        page_size: Some(page_size),
                        sync_generation: None,
                        album_id: None,
                    },
                    enforce_paging,
                    is_incremental: false,
                };
                self.engine.run(&provider, request).await?;

                self.cache_collection_info(scope, authority, &latest).await
            }
            SyncPlan::Incremental { from_generation, latest } => {
                info!(
                    "Running incremental {scope} media sync for '{authority}' from generation {from_generation}"
                );
                let base_query = MediaQueryArgs {
                    page_token: None,
                    page_size: Some(page_size),
                    sync_generation: Some(from_generation),
                    album_id: None,
                };

                let add = PagedSyncRequest {
                    scope,
                    operation: SyncOperation::AddMedia,
                    expected_collection_id: Some(latest.media_collection_id.clone()),
                    base_query: base_query.clone(),
                    enforce_paging,
                    is_incremental: true,
                };
                self.engine.run(&provider, add).await?;

                let remove = PagedSyncRequest {
                    scope,
                    operation: SyncOperation::RemoveMedia,
                    expected_collection_id: Some(latest.media_collection_id.clone()),
                    base_query,
                    enforce_paging,
                    is_incremental: true,
                };
                self.engine.run(&provider, remove).await?;

                self.cache_collection_info(scope, authority, &latest).await
            }
        }
    }

    async fn sync_album_once(
        &self,
        scope: ProviderScope,
        authority: Option<&str>,
        album_id: &str,
    ) -> Result<(), SyncError> {
        if album_id.is_empty() {
            return Err(SyncError::IllegalState("empty album id".to_string()));
        }

        // Album contents always re-sync from a clean slate.
        self.run_reset_album_op(authority, Some(album_id))?;
        self.sync_prefs
            .set_resume_token(scope, SyncOperation::AddAlbumMedia, None)
            .map_err(SyncError::from_prefs)?;

        let Some(authority) = authority else {
            debug!("No {scope} provider; album '{album_id}' reset only");
            return Ok(());
        };

        let provider = self
            .registry
            .get(authority)
            .ok_or_else(|| SyncError::UnknownProvider(authority.to_string()))?;

        info!("Syncing album '{album_id}' from '{authority}'");
        let request = PagedSyncRequest {
            scope,
            operation: SyncOperation::AddAlbumMedia,
            expected_collection_id: None,
            base_query: MediaQueryArgs {
                page_token: None,
                page_size: Some(self.config.picker.sync_page_size),
                sync_generation: None,
                album_id: Some(album_id.to_string()),
            },
            enforce_paging: scope == ProviderScope::Cloud,
            is_incremental: false,
        };
        self.engine.run(&provider, request).await?;
        Ok(())
    }

    /// Fail with `RequestObsolete` if the given authority is no longer the
    /// active cloud provider.
    async fn ensure_cloud_provider_still(&self, authority: &str) -> Result<(), SyncError> {
        let current = self.cloud_provider.lock().await;
        if current.authority != authority {
            return Err(SyncError::RequestObsolete(format!(
                "cloud provider changed from '{}' to {}",
                authority, current
            )));
        }
        Ok(())
    }

    /// Record the synced collection cursor. For the cloud scope the write
    /// is skipped if the provider changed while the sync ran; the stale
    /// cursor must not describe the new provider's collection.
    async fn cache_collection_info(
        &self,
        scope: ProviderScope,
        authority: &str,
        latest: &MediaCollectionInfo,
    ) -> Result<(), SyncError> {
        if scope == ProviderScope::Cloud {
            let current = self.cloud_provider.lock().await;
            if current.authority != authority {
                warn!(
                    "Cloud provider changed during sync; dropping collection cursor for '{authority}'"
                );
                return Ok(());
            }
        }
        self.sync_prefs
            .cache_collection(scope, latest)
            .map_err(SyncError::from_prefs)
    }

    /// Reset synced media and clear the collection cursor for one scope.
    async fn reset_media_for(
        &self,
        scope: ProviderScope,
        authority: Option<&str>,
    ) -> Result<(), SyncError> {
        // A cloud reset sweeps every non-local row; after a provider swap
        // the previous provider's rows must not linger.
        let target = match scope {
            ProviderScope::Local => authority,
            ProviderScope::Cloud => None,
        };
        let mut op = self.db.begin_reset_media(target).map_err(begin_error)?;
        op.execute(&[]).map_err(SyncError::from_db)?;
        op.set_success().map_err(SyncError::from_db)?;
        drop(op);

        self.sync_prefs
            .clear_collection(scope)
            .map_err(SyncError::from_prefs)?;

        info!("Reset {scope} media state");
        Ok(())
    }

    fn run_reset_album_op(
        &self,
        authority: Option<&str>,
        album_id: Option<&str>,
    ) -> Result<(), SyncError> {
        let mut op = self
            .db
            .begin_reset_album_media(authority, album_id)
            .map_err(begin_error)?;
        op.execute(&[]).map_err(SyncError::from_db)?;
        op.set_success().map_err(SyncError::from_db)?;
        Ok(())
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Human-readable state dump for bug reports.
    pub async fn dump_state(&self) -> String {
        use std::fmt::Write as _;

        let mut out = String::new();
        let _ = writeln!(out, "Picker sync controller state:");
        let _ = writeln!(
            out,
            "  local provider authority: {}",
            self.config.picker.local_provider_authority
        );

        let current = self.cloud_provider.lock().await.clone();
        let _ = writeln!(out, "  cloud provider: {current}");

        let _ = writeln!(out, "  available cloud providers:");
        for info in self.registry.available() {
            let _ = writeln!(out, "    {info}");
        }

        let _ = writeln!(
            out,
            "  persisted cloud authority: {:?}",
            self.user_prefs.raw_cloud_authority()
        );

        for scope in [ProviderScope::Local, ProviderScope::Cloud] {
            let cached = self.sync_prefs.cached_collection(scope);
            let _ = writeln!(
                out,
                "  {} collection cursor: ({:?}, {})",
                scope, cached.id, cached.generation
            );
        }

        out
    }
}

fn begin_error(err: DbError) -> SyncError {
    match err {
        DbError::InvalidOperation(msg) => SyncError::OperationUnopenable(msg),
        other => SyncError::Database(other),
    }
}
