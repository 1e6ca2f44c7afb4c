//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Identity;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Target catalog description
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Output and ledger locations
    #[serde(default)]
    pub output: OutputConfig,

    /// Network egress identities (SOCKS5 proxies)
    #[serde(default)]
    pub identities: Vec<Identity>,

    /// Extraction rules for the target site
    #[serde(default)]
    pub selectors: SelectorConfig,

    /// Default request headers
    #[serde(default = "defaults::headers")]
    pub headers: Vec<Header>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    ///
    /// Identity pool emptiness is deliberately not checked here: a pool-less
    /// config is still usable for `--direct` smoke runs. `IdentityPool::
    /// from_identities` rejects an empty pool at startup instead.
    pub fn validate(&self) -> Result<()> {
        if self.catalog.base_url.trim().is_empty() {
            return Err(AppError::validation("catalog.base_url is empty"));
        }
        url::Url::parse(&self.catalog.base_url)
            .map_err(|e| AppError::validation(format!("catalog.base_url is invalid: {e}")))?;
        if self.catalog.total_pages == 0 {
            return Err(AppError::validation("catalog.total_pages must be > 0"));
        }
        if self.catalog.page_size == 0 {
            return Err(AppError::validation("catalog.page_size must be > 0"));
        }
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_retries == 0 {
            return Err(AppError::validation("crawler.max_retries must be > 0"));
        }
        if self.crawler.min_delay_ms > self.crawler.max_delay_ms {
            return Err(AppError::validation(
                "crawler.min_delay_ms must not exceed crawler.max_delay_ms",
            ));
        }
        for identity in &self.identities {
            if identity.host.trim().is_empty() {
                return Err(AppError::validation("identity host is empty"));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            crawler: CrawlerConfig::default(),
            output: OutputConfig::default(),
            identities: Vec::new(),
            selectors: SelectorConfig::default(),
            headers: defaults::headers(),
        }
    }
}

/// Paginated catalog description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Listing URL for the first page; later pages append the offset parameter
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Items per listing page, used to compute the offset
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,

    /// Total number of listing pages to walk
    #[serde(default = "defaults::total_pages")]
    pub total_pages: u32,

    /// Name of the offset query parameter
    #[serde(default = "defaults::offset_param")]
    pub offset_param: String,
}

impl CatalogConfig {
    /// Listing URL for a 1-based page number.
    ///
    /// Page 1 is the base URL itself; page n appends `offset=(n-1)*page_size`.
    pub fn listing_url(&self, page: u32) -> String {
        if page <= 1 {
            self.base_url.clone()
        } else {
            let sep = if self.base_url.contains('?') { '&' } else { '?' };
            format!(
                "{}{}{}={}",
                self.base_url,
                sep,
                self.offset_param,
                (page - 1) * self.page_size
            )
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            page_size: defaults::page_size(),
            total_pages: defaults::total_pages(),
            offset_param: defaults::offset_param(),
        }
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum attempts per fetch
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Delay between attempts in seconds
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_secs: u64,

    /// Lower bound of the randomized pre-request delay in milliseconds
    #[serde(default = "defaults::min_delay")]
    pub min_delay_ms: u64,

    /// Upper bound of the randomized pre-request delay in milliseconds
    #[serde(default = "defaults::max_delay")]
    pub max_delay_ms: u64,

    /// Skip TLS certificate verification (some proxy exits require this)
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_retries: defaults::max_retries(),
            retry_delay_secs: defaults::retry_delay(),
            min_delay_ms: defaults::min_delay(),
            max_delay_ms: defaults::max_delay(),
            accept_invalid_certs: false,
        }
    }
}

/// Output and ledger locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for page outputs and media
    #[serde(default = "defaults::data_dir")]
    pub data_dir: String,

    /// Directory holding one ledger file per run
    #[serde(default = "defaults::ledger_dir")]
    pub ledger_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
            ledger_dir: defaults::ledger_dir(),
        }
    }
}

/// Extraction rules for the target site's document structure.
///
/// These are the brittle, site-specific part of the crawler; everything else
/// treats them as opaque inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Selector for item links on a listing page
    #[serde(default = "defaults::item_link")]
    pub item_link: String,

    /// Attribute carrying the item link
    #[serde(default = "defaults::link_attr")]
    pub link_attr: String,

    /// Selector for one labeled field row on a detail page
    #[serde(default = "defaults::field_row")]
    pub field_row: String,

    /// Selector for the label element within a field row
    #[serde(default = "defaults::field_label")]
    pub field_label: String,

    /// Selector for the value element within a field row
    #[serde(default = "defaults::field_value")]
    pub field_value: String,

    /// Named prose sections located by element id
    #[serde(default = "defaults::sections")]
    pub sections: Vec<SectionRule>,

    /// Selector for the introductory description block
    #[serde(default = "defaults::intro")]
    pub intro: Option<String>,

    /// Field name for the introductory description
    #[serde(default = "defaults::intro_field")]
    pub intro_field: String,

    /// Selector for item images
    #[serde(default = "defaults::image")]
    pub image: String,

    /// Attribute carrying the image source
    #[serde(default = "defaults::image_attr")]
    pub image_attr: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            item_link: defaults::item_link(),
            link_attr: defaults::link_attr(),
            field_row: defaults::field_row(),
            field_label: defaults::field_label(),
            field_value: defaults::field_value(),
            sections: defaults::sections(),
            intro: defaults::intro(),
            intro_field: defaults::intro_field(),
            image: defaults::image(),
            image_attr: defaults::image_attr(),
        }
    }
}

/// A named prose section located by element id on a detail page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionRule {
    /// Field name the section text is stored under
    pub name: String,

    /// Element id to look up
    pub id: String,
}

/// A default request header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

mod defaults {
    use super::{Header, SectionRule};

    // Catalog defaults target the museum collection search the crawler was
    // built against.
    pub fn base_url() -> String {
        "https://www.metmuseum.org/art/collection/search?showOnly=withImage&department=11".into()
    }
    pub fn page_size() -> u32 {
        40
    }
    pub fn total_pages() -> u32 {
        67
    }
    pub fn offset_param() -> String {
        "offset".into()
    }

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".into()
    }
    pub fn timeout() -> u64 {
        15
    }
    pub fn max_retries() -> u32 {
        3
    }
    pub fn retry_delay() -> u64 {
        5
    }
    pub fn min_delay() -> u64 {
        1000
    }
    pub fn max_delay() -> u64 {
        3000
    }

    // Output defaults
    pub fn data_dir() -> String {
        "data".into()
    }
    pub fn ledger_dir() -> String {
        "data/ledger".into()
    }

    // Selector defaults
    pub fn item_link() -> String {
        "a.redundant-link_redundantlink__b5TFR".into()
    }
    pub fn link_attr() -> String {
        "href".into()
    }
    pub fn field_row() -> String {
        ".artwork-tombstone--item".into()
    }
    pub fn field_label() -> String {
        "span.artwork-tombstone--label".into()
    }
    pub fn field_value() -> String {
        "span.artwork-tombstone--value".into()
    }
    pub fn sections() -> Vec<SectionRule> {
        [
            ("Catalogue Entry", "catalogue-entry"),
            ("Technical Notes", "technical-notes"),
            (
                "Signatures, Inscriptions, and Markings",
                "signatures-inscriptions-and-markings",
            ),
            ("Provenance", "provenance"),
            ("Exhibition History", "exhibition-history"),
            ("References", "references"),
            ("Frame", "frame"),
            ("Notes", "notes"),
            ("Loan Restrictions", "loan-restrictions"),
        ]
        .into_iter()
        .map(|(name, id)| SectionRule {
            name: name.into(),
            id: id.into(),
        })
        .collect()
    }
    pub fn intro() -> Option<String> {
        Some(".artwork__intro__desc".into())
    }
    pub fn intro_field() -> String {
        "Intro Description".into()
    }
    pub fn image() -> String {
        "img.artwork__image".into()
    }
    pub fn image_attr() -> String {
        "src".into()
    }

    // Header defaults
    pub fn headers() -> Vec<Header> {
        vec![Header {
            name: "Accept".into(),
            value: "*/*".into(),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_retries() {
        let mut config = Config::default();
        config.crawler.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_delay_bounds() {
        let mut config = Config::default();
        config.crawler.min_delay_ms = 5000;
        config.crawler.max_delay_ms = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn listing_url_page_one_is_base() {
        let catalog = CatalogConfig::default();
        assert_eq!(catalog.listing_url(1), catalog.base_url);
    }

    #[test]
    fn listing_url_appends_offset() {
        let catalog = CatalogConfig {
            base_url: "https://example.com/search?dept=11".into(),
            page_size: 40,
            total_pages: 3,
            offset_param: "offset".into(),
        };
        assert_eq!(
            catalog.listing_url(2),
            "https://example.com/search?dept=11&offset=40"
        );
        assert_eq!(
            catalog.listing_url(3),
            "https://example.com/search?dept=11&offset=80"
        );
    }

    #[test]
    fn listing_url_without_query_uses_question_mark() {
        let catalog = CatalogConfig {
            base_url: "https://example.com/search".into(),
            page_size: 20,
            total_pages: 2,
            offset_param: "offset".into(),
        };
        assert_eq!(catalog.listing_url(2), "https://example.com/search?offset=20");
    }

    #[test]
    fn config_parses_identities_from_toml() {
        let toml_str = r#"
            [[identities]]
            host = "proxy.example.net"
            port = 11001
            country = "CZ"
            username = "user_0"
            password = "secret"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.identities.len(), 1);
        assert_eq!(config.identities[0].port, 11001);
        assert!(config.validate().is_ok());
    }
}
