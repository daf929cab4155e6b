//! In-memory resolution cache
//!
//! Maps a [`CacheKey`] to the [`ResolvedConfig`] produced for it, plus a
//! second table memoizing effective options per file.
//!
//! # Guarantees
//!
//! - At most one resolution runs per key at a time. Concurrent lookups for a
//!   key that is being resolved wait for that resolution.
//! - Failed resolutions are never stored; the next lookup tries again.
//! - After [`ResolutionCache::flush`] returns, no lookup is served from an
//!   entry created before the flush. A resolution still in flight completes
//!   into a slot that is no longer reachable from the table, and lookups
//!   from an older generation cannot populate the file options table.
//!
//! # Tables
//!
//! | Name | Contents |
//! |------|----------|
//! | `resolved configs` | one entry per (directory, overrides) |
//! | `file options` | effective options per (key, file) |

pub mod key;

pub use key::CacheKey;

use crate::resolve::{FormatOptions, OverrideOptions, Resolve, ResolutionError, ResolvedConfig};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::OnceCell;
use tracing::debug;

pub const RESOLVED_CONFIGS: &str = "resolved configs";
pub const FILE_OPTIONS: &str = "file options";

/// Item count of one cache table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInfo {
    pub name: String,
    pub item_count: usize,
}

/// A stored resolution
#[derive(Debug)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub config: Arc<ResolvedConfig>,
    pub created_at: DateTime<Utc>,
    /// Modification times observed at resolution; `None` = did not exist
    mtimes: Vec<(PathBuf, Option<SystemTime>)>,
}

/// Result of [`ResolutionCache::get_or_resolve`]
#[derive(Debug, Clone)]
pub struct Lookup {
    pub key: CacheKey,
    pub config: Arc<ResolvedConfig>,
    /// Served from an existing entry rather than a resolution started by this call
    pub cache_hit: bool,
    generation: u64,
}

type Slot = Arc<OnceCell<Arc<CacheEntry>>>;

#[derive(Default)]
struct Tables {
    /// Bumped by every flush
    generation: u64,
    configs: HashMap<CacheKey, Slot>,
    file_options: HashMap<(CacheKey, PathBuf), FormatOptions>,
}

/// Per-process cache of resolved configurations
pub struct ResolutionCache {
    resolver: Arc<dyn Resolve>,
    revalidate: bool,
    tables: Mutex<Tables>,
}

impl ResolutionCache {
    pub fn new(resolver: Arc<dyn Resolve>) -> Self {
        Self {
            resolver,
            revalidate: false,
            tables: Mutex::new(Tables::default()),
        }
    }

    /// Re-check consulted files on every hit and drop entries whose files changed
    pub fn with_revalidate(mut self, revalidate: bool) -> Self {
        self.revalidate = revalidate;
        self
    }

    /// Return the cached resolution for `dir` + `overrides`, resolving on a miss
    pub async fn get_or_resolve(
        &self,
        dir: &Path,
        overrides: &OverrideOptions,
    ) -> Result<Lookup, ResolutionError> {
        let canonical = tokio::fs::canonicalize(dir)
            .await
            .map_err(|source| ResolutionError::UnreadableDirectory {
                path: dir.to_path_buf(),
                source,
            })?;
        let key = CacheKey::new(canonical, overrides);

        loop {
            let (generation, slot) = {
                let mut tables = self.tables.lock();
                let slot = tables.configs.entry(key.clone()).or_default().clone();
                (tables.generation, slot)
            };

            if let Some(entry) = slot.get() {
                if self.revalidate && is_stale(entry).await {
                    debug!(key = %key, "cached config is stale");
                    self.evict(&key, &slot);
                    continue;
                }
                debug!(
                    key = %key,
                    age_ms = (Utc::now() - entry.created_at).num_milliseconds(),
                    "config cache hit"
                );
                return Ok(Lookup {
                    key,
                    config: Arc::clone(&entry.config),
                    cache_hit: true,
                    generation,
                });
            }

            let resolved_here = AtomicBool::new(false);
            let result = {
                let flag = &resolved_here;
                let resolver = &self.resolver;
                let key = &key;
                slot.get_or_try_init(|| async move {
                    flag.store(true, Ordering::Release);
                    debug!(key = %key, "resolving config");
                    let config = resolver.resolve(key.dir(), overrides).await?;
                    let mtimes = record_mtimes(key.dir(), config.sources()).await;
                    Ok::<_, ResolutionError>(Arc::new(CacheEntry {
                        key: key.clone(),
                        config: Arc::new(config),
                        created_at: Utc::now(),
                        mtimes,
                    }))
                })
                .await
            };

            return match result {
                Ok(entry) => Ok(Lookup {
                    key,
                    config: Arc::clone(&entry.config),
                    cache_hit: !resolved_here.load(Ordering::Acquire),
                    generation,
                }),
                Err(e) => {
                    self.evict(&key, &slot);
                    Err(e)
                }
            };
        }
    }

    /// Effective options for `file`, memoized per key
    pub fn file_options(&self, lookup: &Lookup, file: &Path) -> FormatOptions {
        let index = (lookup.key.clone(), file.to_path_buf());
        if let Some(options) = self.tables.lock().file_options.get(&index) {
            return *options;
        }

        let options = lookup.config.options_for(file);

        let mut tables = self.tables.lock();
        if tables.generation == lookup.generation && tables.configs.contains_key(&lookup.key) {
            tables.file_options.insert(index, options);
        }
        options
    }

    /// Drop every entry in every table
    pub fn flush(&self) {
        let mut tables = self.tables.lock();
        let dropped = tables.configs.len();
        tables.configs.clear();
        tables.file_options.clear();
        tables.generation += 1;
        debug!(dropped, "flushed resolution cache");
    }

    /// Item counts per table
    pub fn snapshot(&self) -> Vec<CacheInfo> {
        let tables = self.tables.lock();
        vec![
            CacheInfo {
                name: RESOLVED_CONFIGS.to_string(),
                item_count: tables.configs.values().filter(|s| s.initialized()).count(),
            },
            CacheInfo {
                name: FILE_OPTIONS.to_string(),
                item_count: tables.file_options.len(),
            },
        ]
    }

    /// Remove `key` if it still maps to `slot`
    fn evict(&self, key: &CacheKey, slot: &Slot) {
        let mut tables = self.tables.lock();
        if tables
            .configs
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
        {
            tables.configs.remove(key);
            tables.file_options.retain(|(k, _), _| k != key);
        }
    }
}

async fn modified(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.and_then(|m| m.modified()).ok()
}

/// Consulted files plus every ancestor directory, so new config files show up
async fn record_mtimes(dir: &Path, sources: &[PathBuf]) -> Vec<(PathBuf, Option<SystemTime>)> {
    let mut mtimes = Vec::new();
    for path in sources.iter().map(PathBuf::as_path).chain(dir.ancestors()) {
        mtimes.push((path.to_path_buf(), modified(path).await));
    }
    mtimes
}

async fn is_stale(entry: &CacheEntry) -> bool {
    for (path, recorded) in &entry.mtimes {
        if modified(path).await != *recorded {
            return true;
        }
    }
    false
}
