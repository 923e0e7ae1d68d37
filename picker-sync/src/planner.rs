//! Decides what kind of sync a provider needs.
//!
//! The planner compares the cached collection cursor against the provider's
//! latest [`MediaCollectionInfo`] and produces a [`SyncPlan`]. It is a pure
//! function: fetching the latest info and re-checking the active cloud
//! authority happen in the orchestrator, so planning decisions can be tested
//! by value.

use picker_provider_core::MediaCollectionInfo;
use tracing::debug;

use crate::error::SyncError;
use crate::prefs::CachedCollection;

/// The planner's verdict for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPlan {
    /// Cache and provider agree; nothing to do.
    Skip,
    /// Drop everything synced for this provider.
    Reset,
    /// Resync the collection from scratch.
    Full { latest: MediaCollectionInfo },
    /// Fetch changes after `from_generation`, then apply deletions.
    Incremental {
        from_generation: i64,
        latest: MediaCollectionInfo,
    },
}

/// Compute the sync plan for a provider whose latest collection info has
/// been fetched.
///
/// A missing collection id or a negative generation is a provider defect
/// and fails the run as [`SyncError::IllegalState`].
pub fn plan_sync(
    cached: &CachedCollection,
    latest: &MediaCollectionInfo,
) -> Result<SyncPlan, SyncError> {
    if latest.media_collection_id.is_empty() {
        return Err(SyncError::IllegalState(
            "provider returned an empty media collection id".to_string(),
        ));
    }
    if latest.last_media_sync_generation < 0 {
        return Err(SyncError::IllegalState(format!(
            "provider returned a negative sync generation: {}",
            latest.last_media_sync_generation
        )));
    }

    let plan = if cached.id.as_deref() != Some(latest.media_collection_id.as_str()) {
        SyncPlan::Full { latest: latest.clone() }
    } else if cached.generation == latest.last_media_sync_generation {
        SyncPlan::Skip
    } else {
        SyncPlan::Incremental {
            from_generation: cached.generation,
            latest: latest.clone(),
        }
    };

    debug!(
        "Planned sync: cached=({:?}, {}), latest=({}, {}) -> {:?}",
        cached.id,
        cached.generation,
        latest.media_collection_id,
        latest.last_media_sync_generation,
        plan_label(&plan),
    );

    Ok(plan)
}

fn plan_label(plan: &SyncPlan) -> &'static str {
    match plan {
        SyncPlan::Skip => "skip",
        SyncPlan::Reset => "reset",
        SyncPlan::Full { .. } => "full",
        SyncPlan::Incremental { .. } => "incremental",
    }
}
