use crate::types::{ApiLeaderboardEntry, ApiLeaderboardResponse, ApiStakingSummary};
use anyhow::{Context, Result};
use reqwest::Url;
use std::time::Duration;

/// HTTP client for the KONG leaderboard export and staking summary endpoints.
pub struct KongClient {
    http: reqwest::Client,
    leaderboard_url: Url,
    summary_url: Url,
    max_retries: u32,
    backoff_base: Duration,
}

impl KongClient {
    pub fn new(leaderboard_url: &str, summary_url: &str) -> Result<Self> {
        Self::new_with_settings(
            leaderboard_url,
            summary_url,
            Duration::from_secs(30),
            0,
            Duration::from_millis(500),
        )
    }

    pub fn new_with_settings(
        leaderboard_url: &str,
        summary_url: &str,
        timeout: Duration,
        max_retries: u32,
        backoff_base: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            leaderboard_url: Url::parse(leaderboard_url)
                .with_context(|| format!("invalid leaderboard url: {leaderboard_url}"))?,
            summary_url: Url::parse(summary_url)
                .with_context(|| format!("invalid summary url: {summary_url}"))?,
            max_retries,
            backoff_base,
        })
    }

    pub fn leaderboard_url(&self) -> &str {
        self.leaderboard_url.as_str()
    }

    pub fn summary_url(&self) -> &str {
        self.summary_url.as_str()
    }

    pub async fn fetch_leaderboard(&self) -> Result<Vec<ApiLeaderboardEntry>> {
        let body = self.get_with_retry(&self.leaderboard_url).await?;
        let resp: ApiLeaderboardResponse =
            serde_json::from_slice(&body).context("failed to decode leaderboard payload")?;
        Ok(resp.leaderboard)
    }

    pub async fn fetch_summary(&self) -> Result<ApiStakingSummary> {
        let body = self.get_with_retry(&self.summary_url).await?;
        serde_json::from_slice(&body).context("failed to decode staking summary payload")
    }

    async fn get_with_retry(&self, url: &Url) -> Result<Vec<u8>> {
        let mut attempt = 0u32;
        let mut backoff = self.backoff_base;
        loop {
            match self.get_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        url = %url,
                        attempt,
                        wait_for = ?backoff,
                        error = %e,
                        "request failed; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
                Err(e) => return Err(e.context(format!("GET {url} failed"))),
            }
        }
    }

    async fn get_once(&self, url: &Url) -> Result<Vec<u8>> {
        let resp = self.http.get(url.clone()).send().await?.error_for_status()?;
        Ok(resp.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_rejects_relative_url() {
        assert!(KongClient::new("/leaderboard/export", "https://x/summary").is_err());
    }

    #[test]
    fn test_client_keeps_urls() {
        let client = KongClient::new(
            "https://kong-token-api.cyberkongz.com/leaderboard/export",
            "https://kong-token-api.cyberkongz.com/staking-summary",
        )
        .unwrap();
        assert!(client.leaderboard_url().ends_with("/leaderboard/export"));
        assert!(client.summary_url().ends_with("/staking-summary"));
    }

    #[tokio::test]
    async fn test_unreachable_host_fails_after_retries() {
        let client = KongClient::new_with_settings(
            "http://127.0.0.1:9/leaderboard/export",
            "http://127.0.0.1:9/staking-summary",
            Duration::from_millis(200),
            1,
            Duration::from_millis(1),
        )
        .unwrap();
        let err = client.fetch_summary().await.unwrap_err();
        assert!(err.to_string().contains("staking-summary"));
    }
}
