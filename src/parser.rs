use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::cache::read_lossy;
use crate::error::ScrapeError;
use crate::models::{MAX_IMAGES, ProductRecord};

// Amazon product page layout. Each list is tried in order.
static TITLE: LazyLock<Vec<Selector>> = LazyLock::new(|| selectors(&["#productTitle"]));

static PRICE: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&[
        ".a-price .a-offscreen",
        ".priceToPay .a-offscreen",
        "#priceblock_ourprice",
    ])
});

static SELLER: LazyLock<Vec<Selector>> =
    LazyLock::new(|| selectors(&["#sellerProfileTriggerId", "#tabular-buybox a"]));

static BUYBOX_SPAN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#tabular-buybox span").unwrap());
static SPAN: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span").unwrap());
const SHIPS_FROM_LABEL: &str = "Ships from";

static IMAGES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#main-image-container img").unwrap());
/// Primary source, lazy-load source, high-resolution source.
const IMAGE_ATTRS: [&str; 3] = ["src", "data-src", "data-old-hires"];

// Optional leading symbol, then digits with `.`/`,`/whitespace grouping.
static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([€£$])?\s*([\d.,\s]+)").unwrap());

fn selectors(css: &[&str]) -> Vec<Selector> {
    css.iter().map(|s| Selector::parse(s).unwrap()).collect()
}

/// Concatenated text nodes, trimmed at the ends only. Inner whitespace is
/// kept, so `Widget <b>X</b>` reads as `"Widget X"`, not `"WidgetX"`.
fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Trimmed text of the first hit of the first selector that matches at all.
/// An empty hit still wins.
fn first_text(doc: &Html, fallbacks: &[Selector]) -> Option<String> {
    fallbacks
        .iter()
        .find_map(|sel| doc.select(sel).next())
        .map(element_text)
}

/// Like `first_text`, but a hit with no text falls through to the next selector.
fn first_non_empty_text(doc: &Html, fallbacks: &[Selector]) -> Option<String> {
    fallbacks.iter().find_map(|sel| {
        doc.select(sel)
            .next()
            .map(element_text)
            .filter(|text| !text.is_empty())
    })
}

/// Splits visible price text into a number and an ISO currency code.
///
/// Commas are always treated as thousands separators, so decimal-comma
/// prices such as `"1.234,56"` come out wrong. A symbol that trails the
/// number is not picked up and the currency falls back to USD.
pub fn parse_price(text: &str) -> Option<(f64, &'static str)> {
    if text.is_empty() {
        return None;
    }

    let caps = PRICE_RE.captures(text)?;
    let digits: String = caps
        .get(2)?
        .as_str()
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '\u{202f}'))
        .collect();
    let value = digits.trim().parse::<f64>().ok()?;

    let currency = match caps.get(1).map(|m| m.as_str()) {
        Some("£") => "GBP",
        Some("€") => "EUR",
        _ => "USD",
    };
    Some((value, currency))
}

fn ships_from(doc: &Html) -> Option<String> {
    let label = doc
        .select(&BUYBOX_SPAN)
        .find(|el| el.text().collect::<String>().contains(SHIPS_FROM_LABEL))?;

    // The value is the next <span> in document order after the label.
    let mut spans = doc.select(&SPAN);
    spans.find(|el| *el == label)?;
    spans.next().map(element_text)
}

fn image_urls(doc: &Html) -> Vec<String> {
    doc.select(&IMAGES)
        .filter_map(|img| {
            IMAGE_ATTRS
                .iter()
                .find_map(|attr| img.value().attr(attr).filter(|v| !v.is_empty()))
        })
        .take(MAX_IMAGES)
        .map(String::from)
        .collect()
}

/// Extracts a record from raw page markup. Missing elements leave their
/// field empty; this never fails.
pub fn parse(source: &str, html: &str) -> ProductRecord {
    let doc = Html::parse_document(html);

    let title = first_text(&doc, &TITLE);
    let price_text = first_non_empty_text(&doc, &PRICE);
    let (price, currency) = match price_text.as_deref().and_then(parse_price) {
        Some((value, code)) => (Some(value), Some(code.to_string())),
        None => {
            debug!(source, raw = ?price_text, "no usable price");
            (None, None)
        }
    };

    ProductRecord {
        url: source.to_string(),
        title,
        price,
        currency,
        seller: first_text(&doc, &SELLER),
        ships_from: ships_from(&doc),
        delivery_estimate: None,
        description: None,
        image_urls: image_urls(&doc),
    }
}

/// Parses a page already on disk; the path becomes the record's source.
pub fn parse_file(path: impl AsRef<Path>) -> Result<ProductRecord, ScrapeError> {
    let path = path.as_ref();
    let html = read_lossy(path)?;
    Ok(parse(&path.to_string_lossy(), &html))
}
