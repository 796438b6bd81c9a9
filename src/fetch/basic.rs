use super::client::HttpClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Trip responses of long-distance planners can take a while to render.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `reqwest` transport used by the `categorize` command for URL sources.
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    /// Builds a client that identifies as this crate and gives up on
    /// unresponsive TRIAS endpoints after 30 seconds.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client for offer downloads")?;
        Ok(Self(client))
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}
