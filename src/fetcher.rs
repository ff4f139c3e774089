use reqwest::blocking::Client;

use crate::config::ScraperConfig;
use crate::error::ScrapeError;

/// Source of raw page text for a URL.
pub trait PageFetcher {
    fn fetch(&self, url: &str) -> Result<String, ScrapeError>;
}

/// Blocking HTTP GET with the tool's User-Agent and a fixed timeout.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        let resp = self.client.get(url).send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                status,
                url: url.to_string(),
            });
        }

        resp.text().map_err(|e| e.into())
    }
}
