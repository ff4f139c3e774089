use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str =
    "dropscout-bot/0.1 (+https://github.com/nolanwilson17/dropscout)";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Where pages are cached and how they are downloaded.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub cache_dir: PathBuf,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ScraperConfig {
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// `data/raw` under the crate root, one per checkout.
pub fn default_cache_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data").join("raw")
}
