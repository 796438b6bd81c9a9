//! Loading offer documents for offline categorization.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};
use tracing::debug;

/// Downloads the body of `url` as text, failing on non-success statuses.
pub async fn fetch_text<C: HttpClient>(client: &C, url: &str) -> Result<String> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    let text = resp.text().await?;
    debug!(url, bytes = text.len(), "Offer document downloaded");
    Ok(text)
}

/// Reads an offer document from a local path, or over HTTP(S) when `source`
/// is a URL.
#[tracing::instrument(skip(client))]
pub async fn load_offers<C: HttpClient>(client: &C, source: &str) -> Result<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        fetch_text(client, source).await
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read '{source}'"))
    }
}
