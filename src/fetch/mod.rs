//! Thin HTTP seam for plain (unauthenticated) downloads: pre-signed result
//! links and lap chunk files.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Issues a GET for `url` and deserializes the JSON response body.
pub async fn fetch_json<T, C>(client: &C, url: &str) -> Result<T>
where
    T: DeserializeOwned,
    C: HttpClient,
{
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse().with_context(|| format!("invalid url {url}"))?,
    );

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("GET {url} returned {status}: {body}");
    }
    Ok(resp.json().await?)
}
