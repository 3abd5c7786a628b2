//! Page text normalization and content digests.
//!
//! Change detection compares digests of the *visible text* of a page rather
//! than the raw bytes, so markup churn (attribute order, indentation, class
//! renames) does not count as a change.

use scraper::Html;
use sha2::{Digest, Sha256};

/// Elements whose text content is not part of the rendered page.
const NON_CONTENT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Extract the text content of an HTML (or plain text) document.
///
/// Text nodes are concatenated in document order without separators.
pub fn extract_text(raw: &str) -> String {
    let document = Html::parse_document(raw);
    let mut text = String::with_capacity(raw.len() / 2);

    for node in document.root_element().descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| NON_CONTENT_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            text.push_str(fragment);
        }
    }

    text
}

/// Collapse every run of whitespace into a single space and trim both ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize fetched page content for comparison.
pub fn normalize(raw: &str) -> String {
    collapse_whitespace(&extract_text(raw))
}

/// Compute the SHA-256 hex digest of a string's UTF-8 bytes.
pub fn compute_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Digest of a page's normalized text. Equal digests mean "unchanged".
pub fn content_digest(raw: &str) -> String {
    compute_hash(&normalize(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_simple_page() {
        assert_eq!(normalize("<html><body>Hello</body></html>"), "Hello");
        assert_eq!(
            normalize("<html><body>Hello World</body></html>"),
            "Hello World"
        );
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        let raw = "<html><body>\n  <p>Hello</p>\n\n\t<p>World</p>\n</body></html>";
        assert_eq!(normalize(raw), "Hello World");
    }

    #[test]
    fn test_normalize_ignores_attribute_changes() {
        let a = r#"<div class="a" id="x"><p>Same text</p></div>"#;
        let b = r#"<div id="x" class="b c"><p   data-v="2">Same text</p></div>"#;
        assert_eq!(normalize(a), normalize(b));
        assert_eq!(content_digest(a), content_digest(b));
    }

    #[test]
    fn test_normalize_skips_scripts_and_styles() {
        let raw = "<html><head><style>body { color: red }</style>\
                   <script>var t = 1700000000;</script></head>\
                   <body>Visible<noscript>enable js</noscript></body></html>";
        assert_eq!(normalize(raw), "Visible");
    }

    #[test]
    fn test_normalize_plain_text() {
        assert_eq!(normalize("  just   some\ntext  "), "just some text");
    }

    #[test]
    fn test_normalize_decodes_entities() {
        assert_eq!(normalize("<p>Fish &amp; Chips</p>"), "Fish & Chips");
    }

    #[test]
    fn test_collapse_whitespace_empty() {
        assert_eq!(collapse_whitespace(""), "");
        assert_eq!(collapse_whitespace(" \n\t "), "");
    }

    #[test]
    fn test_compute_hash_is_fixed_length_hex() {
        let hash = compute_hash("Hello");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(
            hash,
            "185f8db32271fe25f561a6fc938b2e264306ec304eda518007d1764826381969"
        );
    }

    #[test]
    fn test_content_digest_detects_text_change() {
        let d1 = content_digest("<html><body>Hello</body></html>");
        let d2 = content_digest("<html><body>Hello World</body></html>");
        assert_ne!(d1, d2);
        assert_eq!(d1, compute_hash("Hello"));
    }
}
