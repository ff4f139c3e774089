pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod parser;

pub use cache::{PageCache, cache_key};
pub use config::ScraperConfig;
pub use error::ScrapeError;
pub use fetcher::{HttpFetcher, PageFetcher};
pub use models::ProductRecord;
pub use parser::{parse, parse_file, parse_price};

/// Cache-backed product page scraper.
pub struct Scraper<F = HttpFetcher> {
    cache: PageCache,
    fetcher: F,
}

impl Scraper<HttpFetcher> {
    pub fn new(config: ScraperConfig) -> Result<Self, ScrapeError> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::with_fetcher(config, fetcher))
    }
}

impl<F: PageFetcher> Scraper<F> {
    pub fn with_fetcher(config: ScraperConfig, fetcher: F) -> Self {
        Self {
            cache: PageCache::new(config.cache_dir),
            fetcher,
        }
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    /// Loads `url` from the cache (downloading on a miss or when
    /// `force_refresh` is set) and extracts its product fields.
    pub fn fetch_and_parse(&self, url: &str, force_refresh: bool) -> Result<ProductRecord, ScrapeError> {
        let html = self.cache.load(url, force_refresh, &self.fetcher)?;
        Ok(parse(url, &html))
    }
}

/// `Scraper::fetch_and_parse` with the default cache directory and client.
pub fn fetch_and_parse(url: &str, force_refresh: bool) -> Result<ProductRecord, ScrapeError> {
    Scraper::new(ScraperConfig::default())?.fetch_and_parse(url, force_refresh)
}
