//! Authenticated client for the iRacing `/data` API.
//!
//! Most endpoints answer with an envelope pointing at a pre-signed download;
//! search endpoints answer with chunk file listings. This client follows
//! both shapes and hands typed records to the caller.

use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::debug;

use iracing_team_stats::data::{
    ChunkedResponse, Lap, LinkResponse, RaceRow, RatingHistory, RatingPoint, RosterMember,
    SearchResponse, SeriesInfo, Subsession, TeamData,
};
use iracing_team_stats::fetch::{BasicClient, fetch_json};

use crate::services::data_api::DataApi;

const OAUTH_URL: &str = "https://oauth.iracing.com/oauth2/token";
const BASE_URL: &str = "https://members-ng.iracing.com";

/// Credentials for the `password_limited` OAuth grant. Secrets are digested
/// client-side; the raw password never goes on the wire.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            username: required_env("IRACING_USERNAME")?,
            password: required_env("IRACING_PASSWORD")?,
            client_id: required_env("IRACING_CLIENT_ID")?,
            client_secret: required_env("IRACING_CLIENT_SECRET")?,
        })
    }
}

fn required_env(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{name} must be set"))
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    expires_in: i64,
}

struct Token {
    header_value: String,
    expires_at: DateTime<Utc>,
}

/// Constructed once per batch run and passed into whatever needs data; the
/// access token is checked and refreshed lazily on each request, so a run
/// that outlives the token keeps working.
pub struct IracingClient {
    base_url: String,
    http: reqwest::Client,
    downloader: BasicClient,
    credentials: Credentials,
    token: Mutex<Option<Token>>,
}

impl IracingClient {
    pub fn new(credentials: Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(30))
            .connect_timeout(StdDuration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: BASE_URL.to_string(),
            http,
            downloader: BasicClient::new(),
            credentials,
            token: Mutex::new(None),
        })
    }

    /// `base64(sha256(secret + lowercase(id)))`, the digest the token
    /// endpoint expects for both the password and the client secret.
    fn digest(secret: &str, id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        hasher.update(id.to_lowercase().as_bytes());
        BASE64.encode(hasher.finalize())
    }

    async fn bearer(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if let Some(current) = token.as_ref() {
            if Utc::now() < current.expires_at {
                return Ok(current.header_value.clone());
            }
        }

        debug!("Access token missing or expired, requesting a new one");
        let password = Self::digest(&self.credentials.password, &self.credentials.username);
        let client_secret = Self::digest(&self.credentials.client_secret, &self.credentials.client_id);
        let params = [
            ("grant_type", "password_limited"),
            ("client_id", self.credentials.client_id.as_str()),
            ("username", self.credentials.username.as_str()),
            ("password", password.as_str()),
            ("client_secret", client_secret.as_str()),
            ("scope", "iracing.auth"),
        ];

        let response = self
            .http
            .post(OAUTH_URL)
            .form(&params)
            .send()
            .await
            .context("token request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("token exchange failed with status {status}: {body}");
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .context("failed to parse token response")?;

        let header_value = format!("{} {}", parsed.token_type, parsed.access_token);
        let expires_at = Utc::now() + Duration::seconds(parsed.expires_in);
        *token = Some(Token {
            header_value: header_value.clone(),
            expires_at,
        });
        Ok(header_value)
    }

    /// GET an API endpoint with bearer auth and parse the JSON answer.
    async fn api_get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let bearer = self.bearer().await?;
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .get(&url)
            .query(query)
            .header("Authorization", bearer)
            .send()
            .await
            .with_context(|| format!("GET {path} failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("GET {path} returned {status}: {body}");
        }

        Ok(response.json().await?)
    }

    /// Follow a `{link}` envelope to its pre-signed payload. The download
    /// host rejects auth headers, so the plain downloader takes over there.
    async fn follow_link<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let envelope: LinkResponse = self.api_get(path, query).await?;
        fetch_json(&self.downloader, &envelope.link).await
    }

    /// Search endpoints publish their rows as chunk files; the first chunk
    /// covers the report window.
    async fn search_rows(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<RaceRow>> {
        let response: SearchResponse = self.api_get(path, query).await?;
        let Some(chunk_info) = response.data.chunk_info else {
            return Ok(Vec::new());
        };
        if chunk_info.rows == 0 || chunk_info.chunk_file_names.is_empty() {
            return Ok(Vec::new());
        }
        fetch_json(&self.downloader, &chunk_info.chunk_urls()[0]).await
    }
}

#[async_trait::async_trait]
impl DataApi for IracingClient {
    #[tracing::instrument(skip(self))]
    async fn team_roster(&self, team_id: u64) -> Result<Vec<RosterMember>> {
        let team: TeamData = self
            .follow_link(
                "/data/team/get",
                &[
                    ("team_id", team_id.to_string()),
                    ("include_licenses", "true".to_string()),
                ],
            )
            .await?;
        Ok(team.roster)
    }

    #[tracing::instrument(skip(self, event_types))]
    async fn recent_races(
        &self,
        cust_id: u64,
        event_types: &[u32],
        since: DateTime<Utc>,
    ) -> Result<Vec<RaceRow>> {
        let mut query = vec![
            ("cust_id", cust_id.to_string()),
            ("finish_range_begin", since.to_rfc3339()),
            ("official_only", "false".to_string()),
        ];
        if !event_types.is_empty() {
            let joined = event_types
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(",");
            query.push(("event_types", joined));
        }
        self.search_rows("/data/results/search_series", &query).await
    }

    #[tracing::instrument(skip(self))]
    async fn hosted_race_count(&self, cust_id: u64, since: DateTime<Utc>) -> Result<usize> {
        let rows = self
            .search_rows(
                "/data/results/search_hosted",
                &[
                    ("cust_id", cust_id.to_string()),
                    ("start_range_begin", since.to_rfc3339()),
                ],
            )
            .await?;
        Ok(rows.len())
    }

    #[tracing::instrument(skip(self))]
    async fn rating_history(&self, cust_id: u64, category_id: u32) -> Result<Vec<RatingPoint>> {
        let history: RatingHistory = self
            .follow_link(
                "/data/member/chart_data",
                &[
                    ("cust_id", cust_id.to_string()),
                    ("category_id", category_id.to_string()),
                    ("chart_type", "1".to_string()),
                ],
            )
            .await?;
        Ok(history.data)
    }

    #[tracing::instrument(skip(self))]
    async fn race_categories(&self) -> Result<Vec<SeriesInfo>> {
        self.follow_link("/data/series/get", &[]).await
    }

    #[tracing::instrument(skip(self))]
    async fn subsession(&self, subsession_id: u64) -> Result<Subsession> {
        self.follow_link(
            "/data/results/get",
            &[
                ("subsession_id", subsession_id.to_string()),
                ("include_licenses", "true".to_string()),
            ],
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn lap_chunks(&self, subsession_id: u64) -> Result<Vec<Vec<Lap>>> {
        let response: ChunkedResponse = self
            .follow_link(
                "/data/results/lap_chart_data",
                &[
                    ("subsession_id", subsession_id.to_string()),
                    ("simsession_number", "0".to_string()),
                ],
            )
            .await?;

        let Some(chunk_info) = response.chunk_info else {
            return Ok(Vec::new());
        };

        let mut chunks = Vec::with_capacity(chunk_info.chunk_file_names.len());
        for url in chunk_info.chunk_urls() {
            let laps: Vec<Lap> = fetch_json(&self.downloader, &url).await?;
            chunks.push(laps);
        }
        debug!(chunks = chunks.len(), "Lap data downloaded");
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_lowercases_the_id() {
        // The digest covers secret + lowercase(id); mixed-case ids must not
        // change the result.
        let a = IracingClient::digest("hunter2", "Driver@Example.com");
        let b = IracingClient::digest("hunter2", "driver@example.com");
        assert_eq!(a, b);
        // SHA-256 digests encode to 44 base64 characters.
        assert_eq!(a.len(), 44);
    }

    #[test]
    fn test_digest_depends_on_both_inputs() {
        let a = IracingClient::digest("hunter2", "driver@example.com");
        let b = IracingClient::digest("hunter3", "driver@example.com");
        let c = IracingClient::digest("hunter2", "other@example.com");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
