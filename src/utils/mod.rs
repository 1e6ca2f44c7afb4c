//! Utility functions and helpers.

pub mod http;

use sha2::{Digest, Sha256};
use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Last non-empty path segment of an item URL, sanitized for use in file
/// names. Returns `None` when the URL has no usable segment.
pub fn item_slug(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .next_back()?;

    let sanitizer = regex::Regex::new(r"[^A-Za-z0-9._-]+").ok()?;
    let slug = sanitizer.replace_all(segment, "-").trim_matches('-').to_string();
    if slug.is_empty() { None } else { Some(slug) }
}

/// Deterministic file name for the `index`-th media asset of an item.
///
/// Derived from the item URL slug (falling back to a hash of the media URL)
/// so repeated downloads overwrite instead of duplicating.
pub fn media_file_name(item_url: &str, media_url: &str, index: usize) -> String {
    let ext = media_extension(media_url);
    match item_slug(item_url) {
        Some(slug) => format!("{slug}_{index}.{ext}"),
        None => format!("{}_{index}.{ext}", short_hash(media_url)),
    }
}

/// File extension of a media URL's path, defaulting to `jpg`.
fn media_extension(media_url: &str) -> String {
    Url::parse(media_url)
        .ok()
        .and_then(|u| {
            u.path()
                .rsplit('/')
                .next()
                .and_then(|name| name.rsplit_once('.'))
                .map(|(_, ext)| ext.to_ascii_lowercase())
        })
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "jpg".to_string())
}

fn short_hash(s: &str) -> String {
    let digest = Sha256::digest(s.as_bytes());
    hex::encode(&digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://example.com/path/").unwrap();
        assert_eq!(
            resolve_url(&base, "page.html"),
            "https://example.com/path/page.html"
        );
        assert_eq!(
            resolve_url(&base, "/root.html"),
            "https://example.com/root.html"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x"),
            "https://other.com/x"
        );
    }

    #[test]
    fn test_item_slug() {
        assert_eq!(
            item_slug("https://example.com/art/collection/search/437654"),
            Some("437654".to_string())
        );
        assert_eq!(
            item_slug("https://example.com/items/vase%20blue/"),
            Some("vase-blue".to_string())
        );
        assert_eq!(item_slug("https://example.com/"), None);
    }

    #[test]
    fn test_media_file_name_uses_slug_and_ordinal() {
        assert_eq!(
            media_file_name(
                "https://example.com/art/437654",
                "https://images.example.com/main.jpg",
                0
            ),
            "437654_0.jpg"
        );
    }

    #[test]
    fn test_media_file_name_hash_fallback_is_stable() {
        let a = media_file_name("https://example.com/", "https://images.example.com/x.png", 1);
        let b = media_file_name("https://example.com/", "https://images.example.com/x.png", 1);
        assert_eq!(a, b);
        assert!(a.ends_with("_1.png"));
    }

    #[test]
    fn test_media_extension_defaults_to_jpg() {
        assert_eq!(
            media_file_name("https://example.com/art/1", "https://images.example.com/raw", 0),
            "1_0.jpg"
        );
    }
}
