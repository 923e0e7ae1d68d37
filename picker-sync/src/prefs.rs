//! Persistent preference namespaces.
//!
//! Two flat key-value namespaces back the controller:
//!
//! - *user-prefs*: which cloud provider the user selected (a single key)
//! - *sync-prefs*: per-provider collection cursors and resumable page tokens
//!
//! Each namespace is a JSON map on disk. Every write rewrites the file
//! atomically (temp file + rename), so a crash mid-commit leaves the
//! previous state intact. Reads never fail; missing values yield documented
//! defaults (`None` strings, `-1` generations).

use anyhow::{Context, Result};
use picker_provider_core::MediaCollectionInfo;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::engine::SyncOperation;

/// The persisted value meaning "the user explicitly cleared the cloud
/// provider". Distinct from the key being absent, which means "never
/// configured".
pub const CLOUD_PROVIDER_UNSET_SENTINEL: &str = "-";

/// The single user-prefs key.
pub const KEY_CLOUD_PROVIDER_AUTHORITY: &str = "cloud_provider_authority";

const KEY_MEDIA_COLLECTION_ID: &str = "media_collection_id";
const KEY_LAST_SYNC_GENERATION: &str = "last_media_sync_generation";

/// Default generation when nothing has been cached yet.
pub const DEFAULT_GENERATION: i64 = -1;

/// Which provider a sync-prefs entry belongs to.
///
/// Every sync-prefs key is prefixed so local and cloud cursors never
/// collide, and so a cloud provider swap can clear exactly the cloud half.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderScope {
    Local,
    Cloud,
}

impl ProviderScope {
    pub fn prefix(self) -> &'static str {
        match self {
            ProviderScope::Local => "local_provider:",
            ProviderScope::Cloud => "cloud_provider:",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProviderScope::Local => "local",
            ProviderScope::Cloud => "cloud",
        }
    }
}

impl std::fmt::Display for ProviderScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// PrefsStore
// ============================================================================

/// One flat key-value namespace persisted as a JSON map.
pub struct PrefsStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl PrefsStore {
    /// Open a namespace file, creating parent directories as needed. A
    /// missing file is an empty namespace.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create prefs directory: {:?}", parent))?;
        }

        let values = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prefs file: {:?}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse prefs file: {:?}", path))?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn get_i64(&self, key: &str, default: i64) -> i64 {
        self.get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Set or remove a single key and commit the namespace atomically.
    pub fn put(&self, key: &str, value: Option<&str>) -> Result<()> {
        let mut values = self.values.lock().unwrap();
        match value {
            Some(v) => values.insert(key.to_string(), v.to_string()),
            None => values.remove(key),
        };
        self.persist(&values)
    }

    pub fn put_i64(&self, key: &str, value: i64) -> Result<()> {
        self.put(key, Some(&value.to_string()))
    }

    /// Apply several edits in one atomic commit.
    pub fn put_all(&self, edits: &[(&str, Option<&str>)]) -> Result<()> {
        let mut values = self.values.lock().unwrap();
        for (key, value) in edits {
            match value {
                Some(v) => values.insert(key.to_string(), v.to_string()),
                None => values.remove(*key),
            };
        }
        self.persist(&values)
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(values).context("Failed to serialize prefs")?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)
            .with_context(|| format!("Failed to write prefs file: {:?}", tmp))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to commit prefs file: {:?}", self.path))?;

        Ok(())
    }
}

// ============================================================================
// UserPrefs
// ============================================================================

/// In-memory form of the persisted cloud provider selection.
///
/// The on-disk encoding keeps the legacy string form: an absent key is
/// `NotSet`, the `"-"` sentinel is `Unset`, anything else is `Set`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudProviderSetting {
    /// Never configured; default selection may pick a provider.
    NotSet,
    /// Explicitly cleared by the user; default selection must not run.
    Unset,
    /// This authority is active.
    Set(String),
}

/// The user-prefs namespace.
pub struct UserPrefs {
    store: PrefsStore,
}

impl UserPrefs {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            store: PrefsStore::open(path.as_ref().to_path_buf())?,
        })
    }

    /// Decode the persisted selection into its tagged form.
    pub fn cloud_setting(&self) -> CloudProviderSetting {
        match self.store.get(KEY_CLOUD_PROVIDER_AUTHORITY) {
            None => CloudProviderSetting::NotSet,
            Some(v) if v == CLOUD_PROVIDER_UNSET_SENTINEL => CloudProviderSetting::Unset,
            Some(v) => CloudProviderSetting::Set(v),
        }
    }

    /// Persist a selection. `None` records the explicit-clear sentinel.
    pub fn set_cloud_authority(&self, authority: Option<&str>) -> Result<()> {
        let value = authority.unwrap_or(CLOUD_PROVIDER_UNSET_SENTINEL);
        self.store.put(KEY_CLOUD_PROVIDER_AUTHORITY, Some(value))
    }

    /// Remove the key entirely, returning the setting to `NotSet`.
    pub fn clear_cloud_authority(&self) -> Result<()> {
        self.store.put(KEY_CLOUD_PROVIDER_AUTHORITY, None)
    }

    /// The raw persisted string, for diagnostics.
    pub fn raw_cloud_authority(&self) -> Option<String> {
        self.store.get(KEY_CLOUD_PROVIDER_AUTHORITY)
    }
}

// ============================================================================
// SyncPrefs
// ============================================================================

/// Cached collection cursor for one provider scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedCollection {
    /// `None` until a first successful sync.
    pub id: Option<String>,
    /// [`DEFAULT_GENERATION`] until a first successful sync.
    pub generation: i64,
}

impl CachedCollection {
    pub fn empty() -> Self {
        Self {
            id: None,
            generation: DEFAULT_GENERATION,
        }
    }
}

/// The sync-prefs namespace: collection cursors and resume tokens, keyed by
/// provider scope.
pub struct SyncPrefs {
    store: PrefsStore,
}

impl SyncPrefs {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            store: PrefsStore::open(path.as_ref().to_path_buf())?,
        })
    }

    fn collection_id_key(scope: ProviderScope) -> String {
        format!("{}{}", scope.prefix(), KEY_MEDIA_COLLECTION_ID)
    }

    fn generation_key(scope: ProviderScope) -> String {
        format!("{}{}", scope.prefix(), KEY_LAST_SYNC_GENERATION)
    }

    fn resume_key(scope: ProviderScope, operation: SyncOperation) -> String {
        format!("{}{}", scope.prefix(), operation.resume_key())
    }

    pub fn cached_collection(&self, scope: ProviderScope) -> CachedCollection {
        CachedCollection {
            id: self.store.get(&Self::collection_id_key(scope)),
            generation: self
                .store
                .get_i64(&Self::generation_key(scope), DEFAULT_GENERATION),
        }
    }

    /// Record a successfully synced collection cursor.
    ///
    /// Resume tokens never outlive the collection they belong to: when the
    /// collection id changes, all resume tokens for the scope are dropped in
    /// the same commit.
    pub fn cache_collection(&self, scope: ProviderScope, info: &MediaCollectionInfo) -> Result<()> {
        let id_key = Self::collection_id_key(scope);
        let gen_key = Self::generation_key(scope);
        let generation = info.last_media_sync_generation.to_string();

        let id_changed = self.store.get(&id_key).as_deref() != Some(info.media_collection_id.as_str());

        let mut edits: Vec<(String, Option<String>)> = vec![
            (id_key, Some(info.media_collection_id.clone())),
            (gen_key, Some(generation)),
        ];
        if id_changed {
            for op in SyncOperation::ALL {
                edits.push((Self::resume_key(scope, op), None));
            }
        }

        let borrowed: Vec<(&str, Option<&str>)> = edits
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_deref()))
            .collect();
        self.store.put_all(&borrowed)?;

        debug!(
            "Cached {} collection ({}, gen {})",
            scope, info.media_collection_id, info.last_media_sync_generation
        );
        Ok(())
    }

    /// Drop the cached cursor and every resume token for the scope.
    pub fn clear_collection(&self, scope: ProviderScope) -> Result<()> {
        let mut edits: Vec<(String, Option<String>)> = vec![
            (Self::collection_id_key(scope), None),
            (Self::generation_key(scope), None),
        ];
        for op in SyncOperation::ALL {
            edits.push((Self::resume_key(scope, op), None));
        }

        let borrowed: Vec<(&str, Option<&str>)> = edits
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_deref()))
            .collect();
        self.store.put_all(&borrowed)
    }

    pub fn resume_token(&self, scope: ProviderScope, operation: SyncOperation) -> Option<String> {
        self.store.get(&Self::resume_key(scope, operation))
    }

    pub fn set_resume_token(
        &self,
        scope: ProviderScope,
        operation: SyncOperation,
        token: Option<&str>,
    ) -> Result<()> {
        self.store.put(&Self::resume_key(scope, operation), token)
    }
}

// ============================================================================
// Tests
// ============================================================================
