//! Media asset download and persistence.

use std::path::Path;
use std::sync::Arc;

use reqwest::Client;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::models::action;
use crate::services::RetryingFetcher;

/// Downloads binary assets referenced by records.
///
/// Delegates retries to the [`RetryingFetcher`]; a terminal failure here is
/// logged by the caller and does not abort the owning record.
pub struct MediaDownloader {
    fetcher: Arc<RetryingFetcher>,
}

impl MediaDownloader {
    pub fn new(fetcher: Arc<RetryingFetcher>) -> Self {
        Self { fetcher }
    }

    /// Fetch `url` through the given client and persist it at `dest`.
    ///
    /// The write is atomic (temp + rename), so a repeated download of the
    /// same asset is an idempotent overwrite. The file handle is released on
    /// every exit path.
    pub async fn save(&self, client: &Client, url: &str, dest: &Path, page: u32) -> Result<()> {
        let bytes = self
            .fetcher
            .fetch(client, url, action::FETCH_MEDIA, page)
            .await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = dest.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, dest).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CrawlerConfig;
    use crate::storage::ProgressLedger;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn downloader(tmp: &TempDir, max_retries: u32) -> MediaDownloader {
        let ledger = Arc::new(ProgressLedger::open(&tmp.path().join("ledger")).unwrap());
        let crawler = CrawlerConfig {
            max_retries,
            retry_delay_secs: 0,
            ..CrawlerConfig::default()
        };
        MediaDownloader::new(Arc::new(RetryingFetcher::new(&crawler, ledger)))
    }

    #[tokio::test]
    async fn save_writes_asset_to_destination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/main.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpegdata".to_vec()))
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let downloader = downloader(&tmp, 2);
        let dest = tmp.path().join("media/page_0001/1001_0.jpg");

        downloader
            .save(
                &Client::new(),
                &format!("{}/img/main.jpg", server.uri()),
                &dest,
                1,
            )
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"jpegdata");
        // No temp file left behind.
        assert!(!dest.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn save_overwrites_existing_asset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/main.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh".to_vec()))
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let downloader = downloader(&tmp, 2);
        let dest = tmp.path().join("1001_0.jpg");
        std::fs::write(&dest, b"stale").unwrap();

        downloader
            .save(
                &Client::new(),
                &format!("{}/img/main.jpg", server.uri()),
                &dest,
                1,
            )
            .await
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"fresh");
    }

    #[tokio::test]
    async fn save_failure_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/gone.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let downloader = downloader(&tmp, 2);
        let dest = tmp.path().join("gone_0.jpg");

        let result = downloader
            .save(
                &Client::new(),
                &format!("{}/img/gone.jpg", server.uri()),
                &dest,
                1,
            )
            .await;
        assert!(result.is_err());
        assert!(!dest.exists());
    }
}
