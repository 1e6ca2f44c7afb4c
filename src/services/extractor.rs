//! Record extraction from fetched documents.
//!
//! The extraction strategy is deliberately swappable: the crawl pipeline only
//! sees the [`Extract`] trait. The concrete [`SelectorExtractor`] is driven
//! entirely by configured CSS selectors, since the rules are the brittle,
//! site-specific part of the system.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Record, SelectorConfig};
use crate::utils::resolve_url;

/// Extraction strategy for one target site.
///
/// Implementations must be deterministic and side-effect-free. Absence of an
/// expected field is not an error; the field is simply omitted.
pub trait Extract: Send + Sync {
    /// Item links on a listing page, in document order, resolved against `base`.
    fn extract_links(&self, html: &Html, base: &Url) -> Vec<String>;

    /// Build a record from an item's detail document.
    fn extract(&self, html: &Html, source_url: &str) -> Record;
}

/// Config-driven extractor: labeled field rows, named prose sections located
/// by element id, an optional intro block, and item images.
pub struct SelectorExtractor {
    item_link: Selector,
    link_attr: String,
    field_row: Selector,
    field_label: Selector,
    field_value: Selector,
    sections: Vec<(String, Selector)>,
    intro: Option<Selector>,
    intro_field: String,
    image: Selector,
    image_attr: String,
}

impl SelectorExtractor {
    /// Parse all configured selectors up front; invalid selectors fail fast.
    pub fn from_config(config: &SelectorConfig) -> Result<Self> {
        let mut sections = Vec::with_capacity(config.sections.len());
        for rule in &config.sections {
            let selector = Self::parse_selector(&format!("#{}", rule.id))?;
            sections.push((rule.name.clone(), selector));
        }

        Ok(Self {
            item_link: Self::parse_selector(&config.item_link)?,
            link_attr: config.link_attr.clone(),
            field_row: Self::parse_selector(&config.field_row)?,
            field_label: Self::parse_selector(&config.field_label)?,
            field_value: Self::parse_selector(&config.field_value)?,
            sections,
            intro: config
                .intro
                .as_deref()
                .map(Self::parse_selector)
                .transpose()?,
            intro_field: config.intro_field.clone(),
            image: Self::parse_selector(&config.image)?,
            image_attr: config.image_attr.clone(),
        })
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }

    fn clean_text(element: ElementRef<'_>) -> String {
        element
            .text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Extract for SelectorExtractor {
    fn extract_links(&self, html: &Html, base: &Url) -> Vec<String> {
        html.select(&self.item_link)
            .filter_map(|element| element.value().attr(&self.link_attr))
            .map(|href| resolve_url(base, href))
            .collect()
    }

    fn extract(&self, html: &Html, source_url: &str) -> Record {
        let mut record = Record::new(source_url);

        // Labeled field rows
        for row in html.select(&self.field_row) {
            let label = row.select(&self.field_label).next().map(Self::clean_text);
            let value = row.select(&self.field_value).next().map(Self::clean_text);
            if let (Some(label), Some(value)) = (label, value) {
                record.set(label, value);
            }
        }

        // Named prose sections
        for (name, selector) in &self.sections {
            if let Some(section) = html.select(selector).next() {
                record.set(name.clone(), Self::clean_text(section));
            }
        }

        // Intro description
        if let Some(intro) = &self.intro {
            if let Some(element) = html.select(intro).next() {
                record.set(self.intro_field.clone(), Self::clean_text(element));
            }
        }

        // Images
        record.media_urls = html
            .select(&self.image)
            .filter_map(|element| element.value().attr(&self.image_attr))
            .map(str::to_string)
            .collect();

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> SelectorExtractor {
        SelectorExtractor::from_config(&SelectorConfig::default()).unwrap()
    }

    const LISTING: &str = r#"
        <html><body>
          <a class="redundant-link_redundantlink__b5TFR" href="/art/collection/search/1001">A</a>
          <a class="other" href="/skip-me">B</a>
          <a class="redundant-link_redundantlink__b5TFR" href="/art/collection/search/1002">C</a>
        </body></html>
    "#;

    const DETAIL: &str = r#"
        <html><body>
          <div class="artwork-tombstone--item">
            <span class="artwork-tombstone--label">Title:</span>
            <span class="artwork-tombstone--value">The Harvesters</span>
          </div>
          <div class="artwork-tombstone--item">
            <span class="artwork-tombstone--label">Medium:</span>
            <span class="artwork-tombstone--value">Oil on wood</span>
          </div>
          <div class="artwork-tombstone--item">
            <span class="artwork-tombstone--label">Orphan label</span>
          </div>
          <div id="provenance">  Collection of   someone  </div>
          <div class="artwork__intro__desc"><p>A panel painting.</p></div>
          <img class="artwork__image" src="https://images.example.com/main.jpg"/>
        </body></html>
    "#;

    #[test]
    fn invalid_selector_fails_fast() {
        let config = SelectorConfig {
            item_link: "[[nope".into(),
            ..SelectorConfig::default()
        };
        assert!(matches!(
            SelectorExtractor::from_config(&config),
            Err(AppError::Selector { .. })
        ));
    }

    #[test]
    fn extract_links_resolves_and_keeps_order() {
        let html = Html::parse_document(LISTING);
        let base = Url::parse("https://www.example.org/art/collection/search").unwrap();
        let links = extractor().extract_links(&html, &base);

        assert_eq!(
            links,
            vec![
                "https://www.example.org/art/collection/search/1001",
                "https://www.example.org/art/collection/search/1002",
            ]
        );
    }

    #[test]
    fn extract_builds_labeled_fields() {
        let html = Html::parse_document(DETAIL);
        let record = extractor().extract(&html, "https://www.example.org/art/1001");

        assert_eq!(record.source_url, "https://www.example.org/art/1001");
        assert_eq!(record.get("Title:"), Some("The Harvesters"));
        assert_eq!(record.get("Medium:"), Some("Oil on wood"));
        // A row without a value element is simply omitted.
        assert_eq!(record.get("Orphan label"), None);
    }

    #[test]
    fn extract_collects_sections_and_intro() {
        let html = Html::parse_document(DETAIL);
        let record = extractor().extract(&html, "https://www.example.org/art/1001");

        assert_eq!(record.get("Provenance"), Some("Collection of someone"));
        assert_eq!(record.get("Intro Description"), Some("A panel painting."));
        // Sections absent from the document stay absent from the record.
        assert_eq!(record.get("Catalogue Entry"), None);
    }

    #[test]
    fn extract_collects_image_urls() {
        let html = Html::parse_document(DETAIL);
        let record = extractor().extract(&html, "https://www.example.org/art/1001");
        assert_eq!(record.media_urls, vec!["https://images.example.com/main.jpg"]);
    }

    #[test]
    fn extract_on_empty_document_yields_empty_record() {
        let html = Html::parse_document("<html><body></body></html>");
        let record = extractor().extract(&html, "https://www.example.org/art/1001");
        assert_eq!(record.field_count(), 0);
        assert!(record.media_urls.is_empty());
    }
}
