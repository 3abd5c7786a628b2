//! Watch-list loading.
//!
//! The watch-list is a newline-delimited text file of URLs. Blank lines are
//! ignored, there is no comment syntax, and order is preserved.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, warn};
use url::Url;

use crate::storage::StoreError;

/// Ordered, de-duplicated list of URLs to monitor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchList {
    urls: Vec<String>,
}

impl WatchList {
    /// Read a watch-list file. Errors are returned, not swallowed: a
    /// missing watch-list must not be mistaken for an empty one.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let contents = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        let list = Self::parse(&contents);
        debug!("Loaded {} URL(s) from {}", list.len(), path.display());
        Ok(list)
    }

    pub fn parse(contents: &str) -> Self {
        let mut seen = HashSet::new();
        let mut urls = Vec::new();

        for line in contents.lines() {
            let url = line.trim();
            if url.is_empty() {
                continue;
            }
            if !seen.insert(url) {
                warn!("Duplicate URL in watch-list ignored: {}", url);
                continue;
            }
            if let Err(e) = Url::parse(url) {
                warn!("Watch-list entry is not a valid URL ({}): {}", e, url);
            }
            urls.push(url.to_string());
        }

        Self { urls }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.iter().any(|u| u == url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn into_urls(self) -> Vec<String> {
        self.urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_skips_blanks_and_trims() {
        let list = WatchList::parse("\n  http://a.test  \n\n\thttp://b.test\n");
        assert_eq!(list.urls(), ["http://a.test", "http://b.test"]);
    }

    #[test]
    fn test_parse_preserves_order_and_dedupes() {
        let list = WatchList::parse("http://b.test\nhttp://a.test\nhttp://b.test\n");
        assert_eq!(list.urls(), ["http://b.test", "http://a.test"]);
    }

    #[test]
    fn test_invalid_url_still_watched() {
        let list = WatchList::parse("not a url\n");
        assert_eq!(list.len(), 1);
        assert!(list.contains("not a url"));
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let dir = tempdir().unwrap();
        assert!(WatchList::load(&dir.path().join("urls.txt")).is_err());
    }

    #[test]
    fn test_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "http://a.test\r\nhttp://b.test\r\n").unwrap();

        let list = WatchList::load(&path).unwrap();
        assert_eq!(list.into_urls(), vec!["http://a.test", "http://b.test"]);
    }
}
