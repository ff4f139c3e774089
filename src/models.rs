use serde::Serialize;

/// Upper bound on `image_urls`.
pub const MAX_IMAGES: usize = 4;

/// Structured fields pulled out of a single product page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    /// URL or local path the page came from.
    pub url: String,
    pub title: Option<String>,
    /// Numeric price, no currency symbol.
    pub price: Option<f64>,
    /// "USD", "GBP", "EUR".
    pub currency: Option<String>,
    pub seller: Option<String>,
    pub ships_from: Option<String>,
    pub delivery_estimate: Option<String>,
    pub description: Option<String>,
    /// Up to `MAX_IMAGES` links, in page order.
    pub image_urls: Vec<String>,
}
