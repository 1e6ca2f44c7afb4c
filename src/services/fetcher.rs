//! Bounded-retry HTTP fetcher.
//!
//! Every attempt, success or not, is appended to the progress ledger so a
//! later replay can reconstruct per-page and per-artifact history.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::error::FetchError;
use crate::models::{CrawlerConfig, LedgerEvent};
use crate::storage::ProgressLedger;

/// Fetcher with a fixed attempt budget and inter-attempt delay.
///
/// Non-success status codes and network-level errors are treated identically
/// as transient failures. After the budget is exhausted the failure is
/// terminal: callers must not retry within the same run.
pub struct RetryingFetcher {
    max_retries: u32,
    retry_delay: Duration,
    ledger: Arc<ProgressLedger>,
}

impl RetryingFetcher {
    pub fn new(crawler: &CrawlerConfig, ledger: Arc<ProgressLedger>) -> Self {
        Self {
            max_retries: crawler.max_retries.max(1),
            retry_delay: Duration::from_secs(crawler.retry_delay_secs),
            ledger,
        }
    }

    /// Fetch a URL, returning the response body.
    ///
    /// `action` tags the ledger events (e.g. "fetch_page"); `page` scopes
    /// them to the owning catalog page.
    pub async fn fetch(
        &self,
        client: &Client,
        url: &str,
        action: &str,
        page: u32,
    ) -> Result<Vec<u8>, FetchError> {
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            match self.try_once(client, url).await {
                Ok(body) => {
                    self.ledger.append(
                        LedgerEvent::success(action)
                            .for_page(page)
                            .detail("url", url)
                            .detail("attempt", attempt),
                    );
                    return Ok(body);
                }
                Err(message) => {
                    log::warn!(
                        "attempt {}/{} for {} failed: {}",
                        attempt,
                        self.max_retries,
                        url,
                        message
                    );
                    self.ledger.append(
                        LedgerEvent::retry(action)
                            .for_page(page)
                            .detail("url", url)
                            .detail("attempt", attempt)
                            .detail("error", message.as_str()),
                    );
                    last_error = message;
                    if attempt < self.max_retries {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        self.ledger.append(
            LedgerEvent::failure(action)
                .for_page(page)
                .detail("url", url)
                .detail("attempts", self.max_retries)
                .detail("error", last_error.as_str()),
        );
        Err(FetchError {
            url: url.to_string(),
            attempts: self.max_retries,
            message: last_error,
        })
    }

    /// Fetch a URL and decode the body as text.
    pub async fn fetch_text(
        &self,
        client: &Client,
        url: &str,
        action: &str,
        page: u32,
    ) -> Result<String, FetchError> {
        let body = self.fetch(client, url, action, page).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    async fn try_once(&self, client: &Client, url: &str) -> Result<Vec<u8>, String> {
        let response = client.get(url).send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status));
        }
        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|e| e.to_string())
    }
}
