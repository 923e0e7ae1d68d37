//! # provider-fake
//!
//! A scripted media provider for testing and development.
//!
//! The fake serves pages from in-memory scripts keyed by page token and does
//! not connect to any real media store. Tests drive it through setters:
//! collection id and generation, page chains, honored-arg overrides, failure
//! injection, and per-query gates for interleaving concurrent callers.

use async_trait::async_trait;
use chrono::Utc;
use picker_provider_core::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use uuid::Uuid;

/// Build rows with the given ids and descending date-taken values.
pub fn rows(ids: &[&str]) -> Vec<MediaRow> {
    let base = Utc::now().timestamp_millis();
    ids.iter()
        .enumerate()
        .map(|(i, id)| MediaRow {
            id: id.to_string(),
            date_taken_ms: base - i as i64,
            size_bytes: 1024,
            mime_type: "image/jpeg".to_string(),
        })
        .collect()
}

/// Build `n` rows with generated ids, for bulk page scripts.
pub fn generated_rows(n: usize) -> Vec<MediaRow> {
    let base = Utc::now().timestamp_millis();
    (0..n)
        .map(|i| MediaRow {
            id: Uuid::new_v4().to_string(),
            date_taken_ms: base - i as i64,
            size_bytes: 2048,
            mime_type: "image/jpeg".to_string(),
        })
        .collect()
}

/// Build a complete page by hand, for shaping defective responses.
pub fn page(
    ids: &[&str],
    collection_id: &str,
    next_page_token: Option<&str>,
    honored_args: &[&str],
) -> MediaPage {
    MediaPage {
        rows: rows(ids),
        extras: Some(PageExtras {
            media_collection_id: collection_id.to_string(),
            next_page_token: next_page_token.map(|t| t.to_string()),
            honored_args: honored_args.iter().map(|a| a.to_string()).collect(),
        }),
    }
}

/// A rendezvous point hit when the fake serves its N-th media query.
///
/// The provider notifies `reached` and then parks until `release` fires,
/// letting a test interleave other controller calls mid-sync.
#[derive(Clone)]
pub struct QueryGate {
    pub reached: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl QueryGate {
    pub fn new() -> Self {
        Self {
            reached: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }
}

impl Default for QueryGate {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct FakeState {
    collection: Option<MediaCollectionInfo>,
    /// Media pages keyed by requested page token.
    media_pages: HashMap<Option<String>, MediaPage>,
    /// Deleted-media pages keyed by requested page token.
    deleted_pages: HashMap<Option<String>, MediaPage>,
    /// Album pages keyed by (album id, requested page token).
    album_pages: HashMap<(String, Option<String>), MediaPage>,
    omit_extras: bool,
    omitted_honored: HashSet<String>,
    collection_info_error: Option<String>,
    query_error: Option<String>,
    gate: Option<(u32, QueryGate)>,
}

/// A scripted in-memory media provider.
pub struct FakeMediaProvider {
    info: ProviderInfo,
    state: Mutex<FakeState>,
    collection_info_queries: AtomicU32,
    media_queries: AtomicU32,
    deleted_queries: AtomicU32,
    recorded_media_queries: Mutex<Vec<MediaQueryArgs>>,
    recorded_deleted_queries: Mutex<Vec<MediaQueryArgs>>,
}

impl FakeMediaProvider {
    pub fn new(authority: &str, package: &str, uid: i32) -> Self {
        Self {
            info: ProviderInfo::new(authority, package, uid),
            state: Mutex::new(FakeState::default()),
            collection_info_queries: AtomicU32::new(0),
            media_queries: AtomicU32::new(0),
            deleted_queries: AtomicU32::new(0),
            recorded_media_queries: Mutex::new(Vec::new()),
            recorded_deleted_queries: Mutex::new(Vec::new()),
        }
    }

    /// Set the collection id and generation reported by collection-info.
    pub fn set_collection(&self, id: &str, generation: i64) {
        self.state.lock().unwrap().collection =
            Some(MediaCollectionInfo::new(id, generation));
    }

    /// Script a chain of media pages. Page `i` is reachable at token `p{i}`
    /// (the first at no token) and links to the next; the last page ends
    /// the chain.
    pub fn script_media_pages(&self, pages: Vec<Vec<MediaRow>>) {
        let mut state = self.state.lock().unwrap();
        let collection = Self::collection_id(&state);
        state.media_pages = Self::chain(pages, &collection);
    }

    /// Script a chain of deleted-media pages, tokens as in
    /// [`script_media_pages`](Self::script_media_pages).
    pub fn script_deleted_pages(&self, pages: Vec<Vec<MediaRow>>) {
        let mut state = self.state.lock().unwrap();
        let collection = Self::collection_id(&state);
        state.deleted_pages = Self::chain(pages, &collection);
    }

    /// Script a chain of pages for one album.
    pub fn script_album_pages(&self, album_id: &str, pages: Vec<Vec<MediaRow>>) {
        let mut state = self.state.lock().unwrap();
        let collection = Self::collection_id(&state);
        let chained = Self::chain(pages, &collection);
        for (token, mut scripted) in chained {
            if let Some(extras) = &mut scripted.extras {
                extras.honored_args.push(args::ALBUM_ID.to_string());
            }
            state
                .album_pages
                .insert((album_id.to_string(), token), scripted);
        }
    }

    /// Place one raw page at a token, for cycles and mismatched collections.
    pub fn insert_media_page(&self, token: Option<&str>, page: MediaPage) {
        self.state
            .lock()
            .unwrap()
            .media_pages
            .insert(token.map(|t| t.to_string()), page);
    }

    /// Serve every page without its extras block.
    pub fn omit_extras(&self) {
        self.state.lock().unwrap().omit_extras = true;
    }

    /// Drop one argument from every page's honored list.
    pub fn omit_honored_arg(&self, arg: &str) {
        self.state
            .lock()
            .unwrap()
            .omitted_honored
            .insert(arg.to_string());
    }

    /// Fail the next and all further collection-info calls.
    pub fn fail_collection_info(&self, message: &str) {
        self.state.lock().unwrap().collection_info_error = Some(message.to_string());
    }

    /// Fail the next and all further media/deleted queries.
    pub fn fail_queries(&self, message: &str) {
        self.state.lock().unwrap().query_error = Some(message.to_string());
    }

    /// Clear a previously injected query failure.
    pub fn clear_query_failure(&self) {
        self.state.lock().unwrap().query_error = None;
    }

    /// Park the `at_query`-th media query (1-based) on the gate.
    pub fn set_query_gate(&self, at_query: u32, gate: QueryGate) {
        self.state.lock().unwrap().gate = Some((at_query, gate));
    }

    pub fn collection_info_count(&self) -> u32 {
        self.collection_info_queries.load(Ordering::SeqCst)
    }

    pub fn media_query_count(&self) -> u32 {
        self.media_queries.load(Ordering::SeqCst)
    }

    pub fn deleted_query_count(&self) -> u32 {
        self.deleted_queries.load(Ordering::SeqCst)
    }

    /// Every media query received so far, in order.
    pub fn media_queries_seen(&self) -> Vec<MediaQueryArgs> {
        self.recorded_media_queries.lock().unwrap().clone()
    }

    /// Every deleted-media query received so far, in order.
    pub fn deleted_queries_seen(&self) -> Vec<MediaQueryArgs> {
        self.recorded_deleted_queries.lock().unwrap().clone()
    }

    fn collection_id(state: &FakeState) -> String {
        state
            .collection
            .as_ref()
            .map(|c| c.media_collection_id.clone())
            .unwrap_or_else(|| "fake-collection".to_string())
    }

    fn chain(pages: Vec<Vec<MediaRow>>, collection_id: &str) -> HashMap<Option<String>, MediaPage> {
        let last = pages.len().saturating_sub(1);
        pages
            .into_iter()
            .enumerate()
            .map(|(i, rows)| {
                let token = if i == 0 { None } else { Some(format!("p{i}")) };
                let next = if i == last { None } else { Some(format!("p{}", i + 1)) };
                let page = MediaPage {
                    rows,
                    extras: Some(PageExtras {
                        media_collection_id: collection_id.to_string(),
                        next_page_token: next,
                        honored_args: vec![
                            args::PAGE_SIZE.to_string(),
                            args::SYNC_GENERATION.to_string(),
                        ],
                    }),
                };
                (token, page)
            })
            .collect()
    }

    /// Common handling for both query surfaces.
    async fn serve(
        &self,
        query: &MediaQueryArgs,
        deleted: bool,
    ) -> Result<MediaPage> {
        let gate = {
            let (counter, recorder) = if deleted {
                (&self.deleted_queries, &self.recorded_deleted_queries)
            } else {
                (&self.media_queries, &self.recorded_media_queries)
            };
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            recorder.lock().unwrap().push(query.clone());

            let state = self.state.lock().unwrap();
            if let Some(message) = &state.query_error {
                return Err(ProviderError::Remote(message.clone()));
            }
            match &state.gate {
                Some((at, gate)) if !deleted && *at == n => Some(gate.clone()),
                _ => None,
            }
        };

        if let Some(gate) = gate {
            gate.reached.notify_one();
            gate.release.notified().await;
        }

        let state = self.state.lock().unwrap();
        let scripted = if deleted {
            state.deleted_pages.get(&query.page_token)
        } else if let Some(album) = &query.album_id {
            state
                .album_pages
                .get(&(album.clone(), query.page_token.clone()))
        } else {
            state.media_pages.get(&query.page_token)
        };

        let mut page = scripted
            .cloned()
            .ok_or_else(|| {
                ProviderError::Remote(format!(
                    "no page scripted at token {:?}",
                    query.page_token
                ))
            })?;

        if state.omit_extras {
            page.extras = None;
        } else if let Some(extras) = &mut page.extras {
            extras
                .honored_args
                .retain(|arg| !state.omitted_honored.contains(arg));
        }

        Ok(page)
    }
}

#[async_trait]
impl MediaProvider for FakeMediaProvider {
    fn info(&self) -> ProviderInfo {
        self.info.clone()
    }

    async fn media_collection_info(&self) -> Result<MediaCollectionInfo> {
        self.collection_info_queries.fetch_add(1, Ordering::SeqCst);

        let state = self.state.lock().unwrap();
        if let Some(message) = &state.collection_info_error {
            return Err(ProviderError::Remote(message.clone()));
        }
        state
            .collection
            .clone()
            .ok_or_else(|| ProviderError::Unavailable("no collection scripted".to_string()))
    }

    async fn query_media(&self, query: &MediaQueryArgs) -> Result<MediaPage> {
        self.serve(query, false).await
    }

    async fn query_deleted_media(&self, query: &MediaQueryArgs) -> Result<MediaPage> {
        self.serve(query, true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collection_info_roundtrip() {
        let fake = FakeMediaProvider::new("com.fake.cloud", "com.fake", 1);
        fake.set_collection("C1", 42);

        let info = fake.media_collection_info().await.unwrap();
        assert_eq!(info.media_collection_id, "C1");
        assert_eq!(info.last_media_sync_generation, 42);
        assert_eq!(fake.collection_info_count(), 1);
    }

    #[tokio::test]
    async fn test_scripted_chain_links_pages() {
        let fake = FakeMediaProvider::new("com.fake.cloud", "com.fake", 1);
        fake.set_collection("C1", 1);
        fake.script_media_pages(vec![rows(&["a", "b"]), rows(&["c"])]);

        let first = fake
            .query_media(&MediaQueryArgs::default())
            .await
            .unwrap();
        assert_eq!(first.rows.len(), 2);
        let extras = first.extras.unwrap();
        assert_eq!(extras.media_collection_id, "C1");
        assert_eq!(extras.next_page_token.as_deref(), Some("p1"));

        let second = fake
            .query_media(&MediaQueryArgs {
                page_token: Some("p1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(second.rows.len(), 1);
        assert_eq!(second.extras.unwrap().next_page_token, None);
    }

    #[tokio::test]
    async fn test_unknown_token_is_remote_error() {
        let fake = FakeMediaProvider::new("com.fake.cloud", "com.fake", 1);
        fake.set_collection("C1", 1);

        let err = fake
            .query_media(&MediaQueryArgs {
                page_token: Some("nope".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Remote(_)));
    }

    #[tokio::test]
    async fn test_album_pages_honor_album_arg() {
        let fake = FakeMediaProvider::new("com.fake.cloud", "com.fake", 1);
        fake.set_collection("C1", 1);
        fake.script_album_pages("album-1", vec![rows(&["a"])]);

        let page = fake
            .query_media(&MediaQueryArgs {
                album_id: Some("album-1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(page.extras.unwrap().honors(args::ALBUM_ID));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let fake = FakeMediaProvider::new("com.fake.cloud", "com.fake", 1);
        fake.set_collection("C1", 1);
        fake.script_media_pages(vec![rows(&["a"])]);
        fake.fail_queries("simulated outage");

        assert!(fake.query_media(&MediaQueryArgs::default()).await.is_err());

        fake.clear_query_failure();
        assert!(fake.query_media(&MediaQueryArgs::default()).await.is_ok());
    }

    #[test]
    fn test_generated_rows_are_unique() {
        let generated = generated_rows(10);
        let ids: std::collections::HashSet<_> =
            generated.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids.len(), 10);
    }
}
