use async_trait::async_trait;
use reqwest::{Request, Response};

/// Request execution seam. The data client swaps this for a canned
/// implementation in tests; production uses [`super::BasicClient`].
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
