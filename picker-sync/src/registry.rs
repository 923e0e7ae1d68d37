//! # Provider Registry
//!
//! Manages the collection of installed media providers and provides lookup
//! functionality.
//!
//! The registry stores providers by authority and exposes two listings of
//! cloud-provider candidates: `available` (filtered by the configured
//! allow-list) and `all_available` (every installed candidate, used for
//! support checks). The built-in local provider is registered here too but
//! never appears in either cloud listing.

use picker_provider_core::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::config::Config;

/// Registry of installed media providers.
///
/// Providers are stored as trait objects to enable runtime polymorphism.
/// Registration and package removal mutate through a `RwLock`, so the
/// registry can be shared behind an `Arc` with the controller.
pub struct ProviderRegistry {
    config: Arc<Config>,
    providers: RwLock<HashMap<String, Arc<dyn MediaProvider>>>,
}

impl ProviderRegistry {
    /// Create a new empty provider registry.
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            providers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a provider under its authority.
    ///
    /// If a provider with the same authority already exists, it is replaced.
    pub fn register<P>(&self, provider: P)
    where
        P: MediaProvider + 'static,
    {
        self.register_arc(Arc::new(provider));
    }

    pub fn register_arc(&self, provider: Arc<dyn MediaProvider>) {
        let authority = provider.info().authority;
        debug!("Registering provider '{}'", authority);
        self.providers.write().unwrap().insert(authority, provider);
    }

    /// Get a provider by authority.
    pub fn get(&self, authority: &str) -> Option<Arc<dyn MediaProvider>> {
        self.providers.read().unwrap().get(authority).cloned()
    }

    /// Remove every provider belonging to a package. Returns the removed
    /// authorities.
    pub fn remove_package(&self, package: &str) -> Vec<String> {
        let mut providers = self.providers.write().unwrap();
        let removed: Vec<String> = providers
            .iter()
            .filter(|(_, p)| p.info().package_name == package)
            .map(|(authority, _)| authority.clone())
            .collect();
        for authority in &removed {
            providers.remove(authority);
        }
        removed
    }

    /// Cloud-provider candidates that pass the allow-list.
    pub fn available(&self) -> Vec<ProviderInfo> {
        self.cloud_candidates(|info| self.config.is_package_allowed(&info.package_name))
    }

    /// Every installed cloud-provider candidate, ignoring the allow-list.
    /// Used for support checks and diagnostics, never for selection.
    pub fn all_available(&self) -> Vec<ProviderInfo> {
        self.cloud_candidates(|_| true)
    }

    /// Resolve an authority to its `ProviderInfo`, or the empty sentinel if
    /// the authority is unknown or filtered out.
    pub fn resolve(&self, authority: &str, ignore_allowlist: bool) -> ProviderInfo {
        let listing = if ignore_allowlist {
            self.all_available()
        } else {
            self.available()
        };
        listing
            .into_iter()
            .find(|info| info.authority == authority)
            .unwrap_or_else(ProviderInfo::empty)
    }

    /// Get the number of registered providers, the local one included.
    pub fn count(&self) -> usize {
        self.providers.read().unwrap().len()
    }

    fn cloud_candidates(&self, keep: impl Fn(&ProviderInfo) -> bool) -> Vec<ProviderInfo> {
        let local = &self.config.picker.local_provider_authority;
        let mut infos: Vec<ProviderInfo> = self
            .providers
            .read()
            .unwrap()
            .values()
            .map(|p| p.info())
            .filter(|info| &info.authority != local)
            .filter(|info| keep(info))
            .collect();
        infos.sort_by(|a, b| a.authority.cmp(&b.authority));
        infos
    }
}
