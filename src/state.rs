//! Loaded index cache shared by the server's tools.
//!
//! Tool handlers call [`IndexState::get`] with an optional path. Parsed
//! indexes are cached by canonical path and reused while the file on disk is
//! unchanged; concurrent requests for the same file await one shared load.

use crate::config::expand_tilde;
use crate::index::{Dialect, Report, SearchIndex, locate_index_file, read_index_file, validate};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tokio::sync::{Mutex, RwLock};
use xxhash_rust::xxh3::xxh3_64;

/// Default number of parsed indexes kept in memory.
pub const DEFAULT_CACHE_SIZE: NonZeroUsize = NonZeroUsize::new(16).unwrap();

type SharedLoad = Shared<BoxFuture<'static, Result<Arc<LoadedIndex>, String>>>;

/// Identity of an index file's contents at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub modified: Option<SystemTime>,
    pub len: u64,
    /// xxh3 of the file bytes
    pub hash: u64,
}

impl Fingerprint {
    pub fn of(contents: &[u8], modified: Option<SystemTime>) -> Self {
        Self {
            modified,
            len: contents.len() as u64,
            hash: xxh3_64(contents),
        }
    }

    /// Whether `path` still holds the contents this fingerprint was taken of.
    ///
    /// Matching size and mtime are trusted; otherwise the file is re-hashed.
    fn matches(&self, path: &Path) -> bool {
        let Ok(meta) = std::fs::metadata(path) else {
            return false;
        };
        if meta.len() == self.len && meta.modified().ok() == self.modified && self.modified.is_some()
        {
            return true;
        }
        std::fs::read(path).is_ok_and(|bytes| xxh3_64(&bytes) == self.hash)
    }
}

/// A parsed index with its validation report.
#[derive(Debug)]
pub struct LoadedIndex {
    /// Canonical path of the `searchindex.js` file
    pub path: PathBuf,
    pub dialect: Dialect,
    pub index: SearchIndex,
    pub report: Report,
    pub fingerprint: Fingerprint,
}

impl LoadedIndex {
    /// Reads, parses and validates an index file. Blocking.
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let start = Instant::now();
        let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        let (index, dialect, source) = read_index_file(path)?;
        let report = validate(&index);
        let fingerprint = Fingerprint::of(source.as_bytes(), modified);

        tracing::info!(
            "Loaded {} ({} dialect, {} documents, {} terms, {} errors) in {:?}",
            path.display(),
            dialect,
            index.docnames.len(),
            index.terms.len(),
            report.errors.len(),
            start.elapsed()
        );

        Ok(Self {
            path: path.to_path_buf(),
            dialect,
            index,
            report,
            fingerprint,
        })
    }
}

/// Shared state for loaded indexes.
pub struct IndexState {
    cache: Arc<RwLock<LruCache<PathBuf, Arc<LoadedIndex>>>>,
    in_flight: Arc<Mutex<HashMap<PathBuf, SharedLoad>>>,
    /// Index used when a tool call names none
    active: RwLock<Option<PathBuf>>,
}

impl std::fmt::Debug for IndexState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexState")
            .field("cache_size", &self.cache.try_read().map(|c| c.len()).ok())
            .field("in_flight_count", &self.in_flight.try_lock().map(|m| m.len()).ok())
            .field("active", &self.active.try_read().map(|a| a.clone()).ok())
            .finish()
    }
}

impl Default for IndexState {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

impl IndexState {
    pub fn new(cache_size: NonZeroUsize) -> Self {
        Self {
            cache: Arc::new(RwLock::new(LruCache::new(cache_size))),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            active: RwLock::new(None),
        }
    }

    /// Resolves user input (file or build directory, `~` allowed) to a canonical index path.
    pub fn resolve_path(path: &str) -> Result<PathBuf, String> {
        let expanded = expand_tilde(path);
        let file = locate_index_file(Path::new(expanded.as_ref())).map_err(|e| e.to_string())?;
        file.canonicalize()
            .map_err(|e| format!("Failed to resolve {}: {}", file.display(), e))
    }

    /// Loads an index, reusing the cached copy while the file is unchanged.
    pub async fn load(&self, path: &str) -> Result<Arc<LoadedIndex>, String> {
        let path = Self::resolve_path(path)?;
        self.load_canonical(path).await
    }

    /// Loads an index and makes it the default for later calls.
    pub async fn load_and_activate(&self, path: &str) -> Result<Arc<LoadedIndex>, String> {
        let loaded = self.load(path).await?;
        self.set_active(loaded.path.clone()).await;
        Ok(loaded)
    }

    /// Makes an already resolved index path the default.
    pub async fn set_active(&self, path: PathBuf) {
        tracing::debug!("Active index: {}", path.display());
        *self.active.write().await = Some(path);
    }

    /// The index a tool call should use: `path` if given, else the active one.
    pub async fn get(&self, path: Option<&str>) -> Result<Arc<LoadedIndex>, String> {
        if let Some(path) = path.filter(|p| !p.trim().is_empty()) {
            return self.load(path).await;
        }
        let active = self.active.read().await.clone().ok_or_else(|| {
            "No index loaded. Use load_index with a path to a searchindex.js file or a \
             documentation build directory."
                .to_string()
        })?;
        self.load_canonical(active).await
    }

    pub async fn active_path(&self) -> Option<PathBuf> {
        self.active.read().await.clone()
    }

    pub async fn is_cached(&self, path: &Path) -> bool {
        self.cache.read().await.contains(path)
    }

    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
        self.in_flight.lock().await.clear();
    }

    /// Whether a load of `path` is still running.
    pub async fn is_loading(&self, path: &Path) -> bool {
        self.in_flight.lock().await.contains_key(path)
    }

    async fn load_canonical(&self, path: PathBuf) -> Result<Arc<LoadedIndex>, String> {
        let cached = self.cache.write().await.get(&path).cloned();
        if let Some(loaded) = cached {
            if is_fresh(&loaded).await {
                tracing::debug!("Cache hit for {}", path.display());
                return Ok(loaded);
            }
            tracing::info!("{} changed on disk, reloading", path.display());
            self.cache.write().await.pop(&path);
        }

        let maybe_future = self.in_flight.lock().await.get(&path).cloned();
        if let Some(future) = maybe_future {
            tracing::debug!("Awaiting in-flight load of {}", path.display());
            let result = future.await;
            match &result {
                Ok(loaded) if !is_fresh(loaded).await => {
                    tracing::info!("{} changed during load, reloading", path.display());
                    self.cache.write().await.pop(&path);
                }
                _ => return result,
            }
        }

        self.start_load(path).await
    }

    /// Registers a load and drives it on its own task. The task caches the
    /// result and clears its `in_flight` entry whether or not a caller waits.
    async fn start_load(&self, path: PathBuf) -> Result<Arc<LoadedIndex>, String> {
        let shared = {
            let mut in_flight = self.in_flight.lock().await;
            if let Some(existing) = in_flight.get(&path).cloned() {
                existing
            } else {
                let cache = Arc::clone(&self.cache);
                let pending = Arc::clone(&self.in_flight);
                let load_path = path.clone();
                let future: BoxFuture<'static, Result<Arc<LoadedIndex>, String>> =
                    Box::pin(async move {
                        let read_path = load_path.clone();
                        let result =
                            tokio::task::spawn_blocking(move || LoadedIndex::read(&read_path))
                                .await
                                .map_err(|e| format!("Index load task failed: {}", e))
                                .and_then(|loaded| {
                                    loaded.map(Arc::new).map_err(|e| format!("{:#}", e))
                                });
                        if let Ok(loaded) = &result {
                            cache.write().await.put(load_path.clone(), Arc::clone(loaded));
                        }
                        pending.lock().await.remove(&load_path);
                        result
                    });
                let shared = future.shared();
                in_flight.insert(path, shared.clone());
                tokio::spawn(shared.clone());
                shared
            }
        };

        shared.await
    }
}

/// Whether a loaded index still matches its file. Runs the check off the runtime.
async fn is_fresh(loaded: &Arc<LoadedIndex>) -> bool {
    let check = Arc::clone(loaded);
    tokio::task::spawn_blocking(move || check.fingerprint.matches(&check.path))
        .await
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use std::time::Duration;

    const MINIMAL: &str = r#"Search.setIndex({docnames:["index"],filenames:["index.rst"],titles:["Home"],terms:{home:0},titleterms:{home:0}})"#;

    fn write_index(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("searchindex.js");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn load_caches_by_canonical_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_index(dir.path(), MINIMAL);
        let state = IndexState::default();

        let first = state.load(&path.display().to_string()).await.unwrap();
        check!(state.is_cached(&first.path).await);
        let second = state.load(&dir.path().display().to_string()).await.unwrap();
        check!(Arc::ptr_eq(&first, &second));
        check!(first.dialect == Dialect::Legacy);
        check!(first.report.is_valid());
    }

    #[tokio::test]
    async fn changed_file_is_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_index(dir.path(), MINIMAL);
        let state = IndexState::default();

        let first = state.load(&path.display().to_string()).await.unwrap();
        write_index(
            dir.path(),
            r#"Search.setIndex({"docnames":["index","other"],"titles":["Home","Other"],"terms":{}})"#,
        );
        let second = state.load(&path.display().to_string()).await.unwrap();
        check!(!Arc::ptr_eq(&first, &second));
        check!(second.index.docnames.len() == 2);
        check!(second.dialect == Dialect::Json);
    }

    #[tokio::test]
    async fn get_without_active_index_errors() {
        let state = IndexState::default();
        let_assert!(Err(message) = state.get(None).await);
        check!(message.contains("No index loaded"));
    }

    #[tokio::test]
    async fn activation_sets_default() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), MINIMAL);
        let state = IndexState::default();

        let loaded = state
            .load_and_activate(&dir.path().display().to_string())
            .await
            .unwrap();
        check!(state.active_path().await == Some(loaded.path.clone()));
        let active = state.get(None).await.unwrap();
        check!(Arc::ptr_eq(&loaded, &active));
    }

    #[tokio::test]
    async fn parse_errors_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_index(dir.path(), "Search.setIndex({docnames:[)");
        let state = IndexState::default();
        let_assert!(Err(message) = state.load(&path.display().to_string()).await);
        check!(message.contains("line 1"));
        check!(!state.is_cached(&path.canonicalize().unwrap()).await);
    }

    #[tokio::test]
    async fn missing_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        let state = IndexState::default();
        let_assert!(Err(_) = state.load(&dir.path().join("nope").display().to_string()).await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_loads_share_result() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), MINIMAL);
        let state = Arc::new(IndexState::default());
        let target = dir.path().display().to_string();

        let (a, b) = tokio::join!(state.load(&target), state.load(&target));
        let (a, b) = (a.unwrap(), b.unwrap());
        check!(a.index == b.index);
    }

    fn large_index(terms: usize) -> String {
        let body: Vec<String> = (0..terms).map(|i| format!("t{}:0", i)).collect();
        format!(
            "Search.setIndex({{docnames:[\"index\"],titles:[\"Home\"],terms:{{{}}}}})",
            body.join(",")
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn abandoned_load_still_caches_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_index(dir.path(), &large_index(50_000));
        let canonical = path.canonicalize().unwrap();
        let target = path.display().to_string();
        let state = IndexState::default();

        let mut load = Box::pin(state.load(&target));
        let _ = futures::poll!(load.as_mut());
        drop(load);

        for _ in 0..1000 {
            if !state.is_loading(&canonical).await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        check!(!state.is_loading(&canonical).await);
        check!(state.is_cached(&canonical).await);

        write_index(
            dir.path(),
            r#"Search.setIndex({"docnames":["a","b","c"],"titles":["A","B","C"],"terms":{}})"#,
        );
        let reloaded = state.load(&target).await.unwrap();
        check!(reloaded.index.docnames.len() == 3);
        check!(!state.is_loading(&canonical).await);
    }

    #[test]
    fn fingerprint_detects_content_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_index(dir.path(), MINIMAL);
        let fingerprint = Fingerprint::of(MINIMAL.as_bytes(), None);
        check!(fingerprint.matches(&path));
        std::fs::write(&path, "changed").unwrap();
        check!(!fingerprint.matches(&path));
    }
}
