//! Watch-list versus tracked-state set difference.

use std::collections::HashSet;

use crate::storage::StateMap;

/// URLs that appeared in or disappeared from the watch-list since the last run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// In the watch-list but not tracked, in watch-list order.
    pub added: Vec<String>,
    /// Tracked but no longer in the watch-list, in sorted order.
    pub removed: Vec<String>,
}

impl Reconciliation {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

pub fn reconcile(state: &StateMap, urls: &[String]) -> Reconciliation {
    let watched: HashSet<&str> = urls.iter().map(String::as_str).collect();

    let added = urls
        .iter()
        .filter(|url| !state.contains_key(url.as_str()))
        .cloned()
        .collect();
    let removed = state
        .keys()
        .filter(|url| !watched.contains(url.as_str()))
        .cloned()
        .collect();

    Reconciliation { added, removed }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(urls: &[&str]) -> StateMap {
        urls.iter()
            .map(|u| (u.to_string(), "digest".to_string()))
            .collect()
    }

    fn list(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn test_added_and_removed() {
        let r = reconcile(
            &state(&["http://a.test", "http://b.test"]),
            &list(&["http://c.test", "http://a.test"]),
        );
        assert_eq!(r.added, vec!["http://c.test"]);
        assert_eq!(r.removed, vec!["http://b.test"]);
        assert!(!r.is_noop());
    }

    #[test]
    fn test_added_keeps_watch_list_order() {
        let r = reconcile(&StateMap::new(), &list(&["http://z.test", "http://a.test"]));
        assert_eq!(r.added, vec!["http://z.test", "http://a.test"]);
        assert!(r.removed.is_empty());
    }

    #[test]
    fn test_empty_watch_list_removes_everything() {
        let r = reconcile(&state(&["http://a.test"]), &[]);
        assert_eq!(r.removed, vec!["http://a.test"]);
    }

    #[test]
    fn test_noop() {
        let r = reconcile(&state(&["http://a.test"]), &list(&["http://a.test"]));
        assert!(r.is_noop());
    }
}
