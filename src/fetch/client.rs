use async_trait::async_trait;
use reqwest::{Request, Response};

/// Sends the GET requests that download offer documents.
///
/// Lets `categorize` run against a fake transport in tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
