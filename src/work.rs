use std::collections::HashSet;
use std::path::Path;

use tracing::{info, warn};

use crate::error::ConfigError;
use crate::store::{self, LogRead};

/// One city page to scrape, plus the location it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub url: String,
    pub state: String,
    pub city: String,
}

impl WorkItem {
    /// Derive state and city from the last two path segments of the url,
    /// with `-` and `_` turned into spaces.
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let mut segments = path.trim_end_matches('/').rsplit('/');
        let city = segments.next().unwrap_or_default();
        let state = segments.next().unwrap_or_default();

        Self {
            url: url.to_string(),
            state: humanize(state),
            city: humanize(city),
        }
    }
}

fn humanize(segment: &str) -> String {
    segment.replace(['-', '_'], " ")
}

/// Pending work for one run.
#[derive(Debug)]
pub struct WorkList {
    pub total: usize,
    pub already_completed: usize,
    /// No usable completion log existed; the run starts from a clean slate.
    pub fresh_start: bool,
    pub pending: Vec<WorkItem>,
}

/// Every url in `all` that is not in `completed`, in the order of `all`.
pub fn pending_urls<'a>(all: &'a [String], completed: &[String]) -> Vec<&'a str> {
    let done: HashSet<&str> = completed.iter().map(String::as_str).collect();
    all.iter()
        .map(String::as_str)
        .filter(|url| !done.contains(url))
        .collect()
}

/// Load the url list and the completion log and compute what is left to do.
///
/// The url list is required. A missing or unreadable completion log counts as
/// an empty one.
pub fn load(url_list: &Path, completed: &Path) -> Result<WorkList, ConfigError> {
    let all = match store::read_urls(url_list) {
        Ok(LogRead::Loaded(urls)) if urls.is_empty() => {
            return Err(ConfigError::UrlListEmpty {
                path: url_list.to_path_buf(),
            })
        }
        Ok(LogRead::Loaded(urls)) => urls,
        Ok(LogRead::NotFound) => {
            return Err(ConfigError::UrlListMissing {
                path: url_list.to_path_buf(),
            })
        }
        Err(e) => {
            return Err(ConfigError::UrlListUnreadable {
                path: url_list.to_path_buf(),
                reason: e.to_string(),
            })
        }
    };

    let done = match store::read_urls(completed) {
        Ok(LogRead::Loaded(urls)) => urls,
        Ok(LogRead::NotFound) => {
            info!("No completion log at {}. Starting fresh.", completed.display());
            Vec::new()
        }
        Err(e) => {
            warn!("Completion log unreadable ({}). Starting fresh.", e);
            Vec::new()
        }
    };

    let pending: Vec<WorkItem> = pending_urls(&all, &done)
        .into_iter()
        .map(WorkItem::from_url)
        .collect();

    let list = WorkList {
        total: all.len(),
        already_completed: all.len() - pending.len(),
        fresh_start: done.is_empty(),
        pending,
    };
    info!(
        "{} urls known, {} already completed, {} pending",
        list.total,
        list.already_completed,
        list.pending.len()
    );
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn derives_state_and_city() {
        let item =
            WorkItem::from_url("http://www.valuepenguin.com/auto-insurance/new-york/new-york-city");
        assert_eq!(item.state, "new york");
        assert_eq!(item.city, "new york city");
    }

    #[test]
    fn trailing_slash_and_query() {
        let item =
            WorkItem::from_url("http://example.com/auto-insurance/ohio/canal_winchester/?page=2");
        assert_eq!(item.state, "ohio");
        assert_eq!(item.city, "canal winchester");
    }

    #[test]
    fn pending_is_set_difference_in_order() {
        let all = urls(&["u1", "u2", "u3", "u4", "u2"]);
        let done = urls(&["u2", "u4", "not-in-list"]);
        assert_eq!(pending_urls(&all, &done), vec!["u1", "u3"]);
    }

    #[test]
    fn nothing_completed() {
        let all = urls(&["u1", "u2"]);
        assert_eq!(pending_urls(&all, &[]), vec!["u1", "u2"]);
    }

    #[test]
    fn missing_url_list_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("city_urls.csv"), &dir.path().join("completed.csv"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UrlListMissing { .. }));
    }

    #[test]
    fn empty_url_list_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("city_urls.csv");
        std::fs::write(&list, "\n").unwrap();
        let err = load(&list, &dir.path().join("completed.csv")).unwrap_err();
        assert!(matches!(err, ConfigError::UrlListEmpty { .. }));
    }

    #[test]
    fn resumes_from_completion_log() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("city_urls.csv");
        let completed = dir.path().join("completed.csv");
        std::fs::write(&list, "http://x/il/a\nhttp://x/il/b\nhttp://x/il/c\n").unwrap();
        std::fs::write(&completed, "http://x/il/b\n").unwrap();

        let work = load(&list, &completed).unwrap();
        assert!(!work.fresh_start);
        assert_eq!(work.total, 3);
        assert_eq!(work.already_completed, 1);
        let pending: Vec<&str> = work.pending.iter().map(|w| w.url.as_str()).collect();
        assert_eq!(pending, vec!["http://x/il/a", "http://x/il/c"]);
    }

    #[test]
    fn empty_completion_log_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("city_urls.csv");
        let completed = dir.path().join("completed.csv");
        std::fs::write(&list, "http://x/il/a\n").unwrap();
        std::fs::write(&completed, "").unwrap();
        assert!(load(&list, &completed).unwrap().fresh_start);
    }
}
