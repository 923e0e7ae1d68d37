//! Test fixtures for integration tests.
//!
//! This module provides a complete controller environment backed by
//! temporary databases, scripted fake providers, and a recording media
//! store service.

use picker_sync::config::Config;
use picker_sync::controller::PickerSyncController;
use picker_sync::db::SqlitePickerDb;
use picker_sync::notify::{ChangeNotifier, MediaStoreService};
use picker_sync::prefs::{SyncPrefs, UserPrefs};
use picker_sync::registry::ProviderRegistry;
use provider_fake::FakeMediaProvider;
use std::sync::{Arc, Mutex as StdMutex};
use tempfile::TempDir;
use tokio::sync::Mutex;

pub const LOCAL_AUTHORITY: &str = "local";
pub const CLOUD_AUTHORITY: &str = "com.example.photos.cloudprovider";
pub const CLOUD_PACKAGE: &str = "com.example.photos";
pub const OTHER_CLOUD_AUTHORITY: &str = "com.other.gallery.cloudprovider";
pub const OTHER_CLOUD_PACKAGE: &str = "com.other.gallery";

/// A media store service that records every notification it receives.
#[derive(Default)]
pub struct RecordingMediaStore {
    pub calls: StdMutex<Vec<Option<String>>>,
}

impl MediaStoreService for RecordingMediaStore {
    fn cloud_provider_changed(&self, authority: Option<&str>) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(authority.map(|a| a.to_string()));
        Ok(())
    }
}

/// A complete controller environment on temporary storage.
pub struct TestEnv {
    pub dir: TempDir,
    pub config: Arc<Config>,
    pub registry: Arc<ProviderRegistry>,
    pub db: Arc<SqlitePickerDb>,
    pub local: Arc<FakeMediaProvider>,
    pub cloud: Arc<FakeMediaProvider>,
    pub notifier: ChangeNotifier,
    pub media_store: Arc<RecordingMediaStore>,
}

impl TestEnv {
    /// Environment with a local provider and one allow-listed cloud
    /// provider registered. The local provider starts with an empty
    /// single-page collection so local syncs succeed out of the box.
    pub fn new() -> Self {
        Self::with_config(default_config())
    }

    pub fn with_config(config: Config) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let dir = TempDir::new().unwrap();
        let config = Arc::new(config);

        let db = Arc::new(
            SqlitePickerDb::open_at(&dir.path().join("picker.db"), LOCAL_AUTHORITY).unwrap(),
        );

        let registry = Arc::new(ProviderRegistry::new(Arc::clone(&config)));

        let local = Arc::new(FakeMediaProvider::new(LOCAL_AUTHORITY, "com.device.media", 1000));
        local.set_collection("local-collection", 0);
        local.script_media_pages(vec![vec![]]);
        registry.register_arc(local.clone());

        let cloud = Arc::new(FakeMediaProvider::new(CLOUD_AUTHORITY, CLOUD_PACKAGE, 10071));
        registry.register_arc(cloud.clone());

        Self {
            dir,
            config,
            registry,
            db,
            local,
            cloud,
            notifier: ChangeNotifier::default(),
            media_store: Arc::new(RecordingMediaStore::default()),
        }
    }

    /// Register a second allow-listed cloud provider.
    pub fn register_other_cloud(&self) -> Arc<FakeMediaProvider> {
        let other = Arc::new(FakeMediaProvider::new(
            OTHER_CLOUD_AUTHORITY,
            OTHER_CLOUD_PACKAGE,
            10072,
        ));
        self.registry.register_arc(other.clone());
        other
    }

    /// Build the controller. Seed preferences *before* this call; the
    /// controller runs default cloud-provider selection while constructing.
    pub async fn controller(&self) -> PickerSyncController {
        PickerSyncController::with_collaborators(
            Arc::clone(&self.config),
            Arc::clone(&self.registry),
            self.db.clone(),
            self.user_prefs(),
            self.sync_prefs(),
            self.media_store.clone(),
            Arc::new(Mutex::new(())),
            self.notifier.clone(),
        )
        .await
    }

    /// A fresh handle onto the user-prefs file. Use before the controller
    /// exists (seeding) or for read-only assertions afterwards.
    pub fn user_prefs(&self) -> UserPrefs {
        UserPrefs::open(self.dir.path().join("user_prefs.json")).unwrap()
    }

    /// A fresh handle onto the sync-prefs file. Same caveats as
    /// [`user_prefs`](Self::user_prefs).
    pub fn sync_prefs(&self) -> SyncPrefs {
        SyncPrefs::open(self.dir.path().join("sync_prefs.json")).unwrap()
    }
}

pub fn default_config() -> Config {
    let mut config = Config::default();
    config.picker.local_provider_authority = LOCAL_AUTHORITY.to_string();
    config.picker.allowed_cloud_packages =
        vec![CLOUD_PACKAGE.to_string(), OTHER_CLOUD_PACKAGE.to_string()];
    config
}
