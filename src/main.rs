use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_logger() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dropscout=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).compact())
        .init();
}

fn main() -> Result<()> {
    init_logger();

    let mut args = std::env::args().skip(1);
    let url = args.next().context("usage: dropscout <product-url> [--refresh]")?;
    let force_refresh = args.any(|a| a == "--refresh");

    let product = dropscout::fetch_and_parse(&url, force_refresh)
        .with_context(|| format!("failed to scrape {url}"))?;

    let title = product.title.as_deref().unwrap_or("Unknown Title");
    match (product.price, product.currency.as_deref()) {
        (Some(price), Some(currency)) => println!("{title}: {price:.2} {currency}"),
        _ => println!("{title}: no price"),
    }
    println!("{}", serde_json::to_string_pretty(&product)?);
    Ok(())
}
