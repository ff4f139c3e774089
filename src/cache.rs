use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::ScrapeError;
use crate::fetcher::PageFetcher;

/// Hex characters kept from the URL digest. Collisions are not detected.
pub const KEY_LEN: usize = 12;

/// Deterministic cache filename stem for a URL.
pub fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let mut key = format!("{:x}", hasher.finalize());
    key.truncate(KEY_LEN);
    key
}

/// Flat directory of raw pages, one `<key>.html` per URL. Entries never expire.
#[derive(Debug, Clone)]
pub struct PageCache {
    dir: PathBuf,
}

impl PageCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.html", cache_key(url)))
    }

    /// Returns the cached page for `url`, downloading it through `fetcher`
    /// only when no cache file exists or `force_refresh` is set.
    pub fn load<F: PageFetcher + ?Sized>(
        &self,
        url: &str,
        force_refresh: bool,
        fetcher: &F,
    ) -> Result<String, ScrapeError> {
        fs::create_dir_all(&self.dir).map_err(|e| ScrapeError::io(&self.dir, e))?;

        let path = self.path_for(url);
        if path.exists() && !force_refresh {
            debug!(url, file = %path.display(), "cache hit");
            return read_lossy(&path);
        }

        let body = fetcher.fetch(url)?;
        fs::write(&path, &body).map_err(|e| ScrapeError::io(&path, e))?;

        let action = if force_refresh { "refreshed" } else { "cached" };
        let file = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        info!(
            "[{}] {} → {}",
            Utc::now().format("%H:%M:%S"),
            action,
            file
        );

        Ok(body)
    }
}

/// Reads a page from disk, replacing invalid UTF-8 rather than failing.
pub(crate) fn read_lossy(path: &Path) -> Result<String, ScrapeError> {
    let bytes = fs::read(path).map_err(|e| ScrapeError::io(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn take(&self) -> String {
            let bytes = std::mem::take(&mut *self.0.lock().unwrap());
            String::from_utf8(bytes).unwrap()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct CountingFetcher {
        body: &'static str,
        calls: Cell<usize>,
    }

    impl CountingFetcher {
        fn new(body: &'static str) -> Self {
            Self { body, calls: Cell::new(0) }
        }
    }

    impl PageFetcher for CountingFetcher {
        fn fetch(&self, _url: &str) -> Result<String, ScrapeError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.body.to_string())
        }
    }

    struct FailingFetcher;

    impl PageFetcher for FailingFetcher {
        fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
            Err(ScrapeError::Status {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                url: url.to_string(),
            })
        }
    }

    #[test]
    fn test_cache_key_is_short_and_stable() {
        let a = cache_key("https://www.amazon.com/dp/B09V366BDY");
        let b = cache_key("https://www.amazon.com/dp/B09V366BDY");
        assert_eq!(a, b);
        assert_eq!(a.len(), KEY_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, cache_key("https://www.amazon.com/dp/B000000000"));
    }

    #[test]
    fn test_path_for_uses_key() {
        let cache = PageCache::new("/tmp/raw");
        let url = "https://example.com/item";
        assert_eq!(
            cache.path_for(url),
            PathBuf::from("/tmp/raw").join(format!("{}.html", cache_key(url)))
        );
    }

    #[test]
    fn test_creates_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let cache = PageCache::new(tmp.path().join("data").join("raw"));
        let fetcher = CountingFetcher::new("<html></html>");

        cache.load("https://example.com/a", false, &fetcher).unwrap();
        assert!(cache.dir().is_dir());
        assert!(cache.path_for("https://example.com/a").exists());
    }

    #[test]
    fn test_second_load_hits_cache_only() {
        let tmp = TempDir::new().unwrap();
        let cache = PageCache::new(tmp.path());
        let fetcher = CountingFetcher::new("<p>first</p>");
        let url = "https://example.com/b";

        let first = cache.load(url, false, &fetcher).unwrap();
        let second = cache.load(url, false, &fetcher).unwrap();
        assert_eq!(first, "<p>first</p>");
        assert_eq!(second, first);
        assert_eq!(fetcher.calls.get(), 1);
    }

    #[test]
    fn test_existing_file_is_returned_unchanged() {
        let tmp = TempDir::new().unwrap();
        let cache = PageCache::new(tmp.path());
        let url = "https://example.com/c";
        fs::write(cache.path_for(url), "<p>stored</p>").unwrap();

        let fetcher = CountingFetcher::new("<p>fresh</p>");
        assert_eq!(cache.load(url, false, &fetcher).unwrap(), "<p>stored</p>");
        assert_eq!(fetcher.calls.get(), 0);
    }

    #[test]
    fn test_force_refresh_overwrites() {
        let tmp = TempDir::new().unwrap();
        let cache = PageCache::new(tmp.path());
        let url = "https://example.com/d";
        fs::write(cache.path_for(url), "<p>stale</p>").unwrap();

        let fetcher = CountingFetcher::new("<p>fresh</p>");
        assert_eq!(cache.load(url, true, &fetcher).unwrap(), "<p>fresh</p>");
        assert_eq!(fs::read_to_string(cache.path_for(url)).unwrap(), "<p>fresh</p>");
        assert_eq!(fetcher.calls.get(), 1);
    }

    #[test]
    fn test_fetch_failure_leaves_no_file() {
        let tmp = TempDir::new().unwrap();
        let cache = PageCache::new(tmp.path());
        let url = "https://example.com/e";

        let err = cache.load(url, false, &FailingFetcher).unwrap_err();
        assert!(err.is_network());
        assert!(!cache.path_for(url).exists());
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let tmp = TempDir::new().unwrap();
        let cache = PageCache::new(tmp.path());
        let url = "https://example.com/f";
        fs::write(cache.path_for(url), b"<p>caf\xff</p>").unwrap();

        let page = cache.load(url, false, &FailingFetcher).unwrap();
        assert_eq!(page, "<p>caf\u{FFFD}</p>");
    }

    #[test]
    fn test_logs_cached_and_refreshed_writes() {
        let tmp = TempDir::new().unwrap();
        let cache = PageCache::new(tmp.path());
        let fetcher = CountingFetcher::new("<p>page</p>");
        let url = "https://example.com/logged";
        let file = format!("{}.html", cache_key(url));

        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let stamp = regex::Regex::new(r"\[\d{2}:\d{2}:\d{2}\] (cached|refreshed) → ").unwrap();

        tracing::subscriber::with_default(subscriber, || {
            cache.load(url, false, &fetcher).unwrap();
            let out = logs.take();
            assert!(out.contains(&format!("cached → {file}")), "{out}");
            assert!(stamp.is_match(&out), "{out}");
            assert!(!out.contains("refreshed"), "{out}");

            cache.load(url, false, &fetcher).unwrap();
            assert_eq!(logs.take(), "");

            cache.load(url, true, &fetcher).unwrap();
            let out = logs.take();
            assert!(out.contains(&format!("refreshed → {file}")), "{out}");
            assert!(!out.contains("cached →"), "{out}");
            assert!(stamp.is_match(&out), "{out}");
        });
        assert_eq!(fetcher.calls.get(), 2);
    }
}
