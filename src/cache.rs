use std::fs;
use std::future::Future;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::utils::write_atomic;

pub const DEFAULT_TTL: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub ttl: Duration,
    /// Ignore the cache age and scrape anyway.
    pub force: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            force: false,
        }
    }
}

/// Persistent storage of one scraped collection.
pub trait CacheStore<T> {
    /// Last modification time, `None` when nothing is cached.
    fn modified(&self) -> Option<SystemTime>;

    fn load(&self) -> Result<Vec<T>>;

    fn store(&self, items: &[T]) -> Result<()>;
}

/// A JSON array in a flat file.
#[derive(Debug, Clone)]
pub struct FileCache<T> {
    path: PathBuf,
    _items: PhantomData<fn() -> T>,
}

impl<T> FileCache<T> {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            _items: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: DeserializeOwned> FileCache<T> {
    /// Whatever is cached, however old. Missing or corrupt files read as empty.
    pub fn load_any(&self) -> Vec<T> {
        if !self.path.exists() {
            return Vec::new();
        }

        self.read().unwrap_or_else(|err| {
            log::warn!("{err}");
            Vec::new()
        })
    }

    fn read(&self) -> Result<Vec<T>> {
        let raw = fs::read_to_string(&self.path).map_err(|err| match err.kind() {
            io::ErrorKind::InvalidData => Error::CacheCorrupt {
                path: self.path.clone(),
                reason: err.to_string(),
            },
            _ => Error::Io(err),
        })?;

        serde_json::from_str(&raw).map_err(|err| Error::CacheCorrupt {
            path: self.path.clone(),
            reason: err.to_string(),
        })
    }
}

impl<T: Serialize + DeserializeOwned> CacheStore<T> for FileCache<T> {
    fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|meta| meta.modified()).ok()
    }

    fn load(&self) -> Result<Vec<T>> {
        self.read()
    }

    fn store(&self, items: &[T]) -> Result<()> {
        let json = serde_json::to_string_pretty(items)?;
        write_atomic(&self.path, json.as_bytes())?;
        Ok(())
    }
}

/// Whether something modified at `modified` is still usable at `now`.
/// Timestamps from the future count as fresh.
pub fn is_fresh(modified: SystemTime, now: SystemTime, ttl: Duration) -> bool {
    match now.duration_since(modified) {
        Ok(age) => age <= ttl,
        Err(_) => true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Origin {
    Cache,
    Scrape,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Refreshed<T> {
    pub items: Vec<T>,
    pub origin: Origin,
}

impl<T: DeserializeOwned> Refreshed<T> {
    /// Cached contents regardless of age, for when no scrape is possible.
    pub fn stale(cache: &FileCache<T>) -> Self {
        Self {
            items: cache.load_any(),
            origin: Origin::Cache,
        }
    }
}

/// Serves the cache while it is fresh, otherwise awaits `refresh` and
/// replaces the cache with its result, even an empty one.
///
/// `refresh` is only polled on a miss. Unreadable caches count as a miss and
/// a failed write is logged; neither is returned to the caller.
pub async fn load_or_refresh<T, C, F>(cache: &C, config: &Config, now: SystemTime, refresh: F) -> Refreshed<T>
where
    C: CacheStore<T> + ?Sized,
    F: Future<Output = Vec<T>>,
{
    if !config.force {
        if let Some(modified) = cache.modified().filter(|modified| is_fresh(*modified, now, config.ttl)) {
            match cache.load() {
                Ok(items) => {
                    log::debug!("Cache modified {:?} ago is fresh", now.duration_since(modified).unwrap_or_default());
                    return Refreshed {
                        items,
                        origin: Origin::Cache,
                    };
                }
                Err(err) => log::warn!("{err}, refreshing"),
            }
        }
    }

    let items = refresh.await;

    if let Err(err) = cache.store(&items) {
        log::error!("Failed to persist {} scraped items: {err}", items.len());
    }

    Refreshed {
        items,
        origin: Origin::Scrape,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    fn cache_aged(dir: &Path, age: Duration) -> FileCache<u32> {
        let cache = FileCache::new(dir.join("items.json"));
        cache.store(&[1, 2, 3]).unwrap();
        let file = fs::File::options().write(true).open(cache.path()).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
        cache
    }

    fn refresh(calls: &Cell<usize>) -> impl Future<Output = Vec<u32>> + '_ {
        async move {
            calls.set(calls.get() + 1);
            vec![9]
        }
    }

    #[test]
    fn freshness_boundaries() {
        let now = SystemTime::now();
        let ttl = DEFAULT_TTL;
        assert!(is_fresh(now - (ttl - MINUTE), now, ttl));
        assert!(is_fresh(now - ttl, now, ttl));
        assert!(!is_fresh(now - (ttl + MINUTE), now, ttl));
        assert!(is_fresh(now + MINUTE, now, ttl));
    }

    #[tokio::test]
    async fn cache_within_ttl_is_served_without_scraping() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_aged(dir.path(), 11 * 60 * MINUTE + 59 * MINUTE);
        let calls = Cell::new(0);

        let result = load_or_refresh(&cache, &Config::default(), SystemTime::now(), refresh(&calls)).await;

        assert_eq!(result.origin, Origin::Cache);
        assert_eq!(result.items, vec![1, 2, 3]);
        assert_eq!(calls.get(), 0);
    }

    #[tokio::test]
    async fn expired_cache_is_rescraped_and_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_aged(dir.path(), 12 * 60 * MINUTE + MINUTE);
        let calls = Cell::new(0);

        let result = load_or_refresh(&cache, &Config::default(), SystemTime::now(), refresh(&calls)).await;

        assert_eq!(result.origin, Origin::Scrape);
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.load().unwrap(), vec![9]);
    }

    #[tokio::test]
    async fn force_bypasses_a_fresh_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_aged(dir.path(), MINUTE);
        let calls = Cell::new(0);
        let config = Config {
            force: true,
            ..Config::default()
        };

        let result = load_or_refresh(&cache, &config, SystemTime::now(), refresh(&calls)).await;
        assert_eq!(result.origin, Origin::Scrape);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn corrupt_cache_counts_as_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::<u32>::new(dir.path().join("items.json"));
        fs::write(cache.path(), "[1, 2,").unwrap();
        let calls = Cell::new(0);

        let result = load_or_refresh(&cache, &Config::default(), SystemTime::now(), refresh(&calls)).await;
        assert_eq!(result.origin, Origin::Scrape);
        assert_eq!(cache.load().unwrap(), vec![9]);
    }

    #[tokio::test]
    async fn empty_scrape_is_still_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::<u32>::new(dir.path().join("missing").join("items.json"));

        let result = load_or_refresh(&cache, &Config::default(), SystemTime::now(), async { Vec::new() }).await;

        assert!(result.items.is_empty());
        assert_eq!(fs::read_to_string(cache.path()).unwrap(), "[]");
    }

    #[test]
    fn load_any_tolerates_missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::<u32>::new(dir.path().join("items.json"));
        assert!(cache.load_any().is_empty());
        fs::write(cache.path(), "nope").unwrap();
        assert!(cache.load_any().is_empty());
    }

    #[derive(Debug, PartialEq, serde::Deserialize)]
    struct ReadOnly {
        id: u32,
    }

    #[test]
    fn stale_contents_only_need_deserializing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::<ReadOnly>::new(dir.path().join("items.json"));
        fs::write(cache.path(), r#"[{ "id": 4 }]"#).unwrap();

        let stale = Refreshed::stale(&cache);

        assert_eq!(stale.origin, Origin::Cache);
        assert_eq!(stale.items, vec![ReadOnly { id: 4 }]);
    }
}
