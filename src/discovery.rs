use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};
use url::Url;

use crate::fetch::Fetcher;
use crate::parser::directory;
use crate::pool::WorkerPool;

/// Walk the directory root → state pages → city links and return every city url once.
///
/// State pages are fetched through `pool`; cities keep the order of their states.
pub async fn discover_city_urls<F: Fetcher>(
    fetcher: Arc<F>,
    pool: &WorkerPool,
    root_url: &str,
) -> Result<Vec<String>> {
    let root = Url::parse(root_url).with_context(|| format!("Invalid root url {}", root_url))?;

    info!("Fetching directory root: {}", root);
    let html = fetcher
        .fetch(root.as_str())
        .await
        .with_context(|| format!("Failed to fetch directory root {}", root))?;
    let states = directory::state_links(&html, &root)
        .ok_or_else(|| anyhow!("No states container on {}", root))?;
    info!("States found: {}", states.len());

    let mut listings = pool
        .map(states.into_iter().enumerate().collect(), move |(i, state_url): (usize, String)| {
            let fetcher = Arc::clone(&fetcher);
            async move { (i, city_links_of(fetcher.as_ref(), &state_url).await) }
        })
        .await;
    listings.sort_unstable_by_key(|(i, _)| *i);

    let mut seen = HashSet::new();
    let mut cities = Vec::new();
    for link in listings.into_iter().flat_map(|(_, links)| links) {
        if seen.insert(link.clone()) {
            cities.push(link);
        }
    }

    info!("City pages discovered: {}", cities.len());
    Ok(cities)
}

// A state page that cannot be read contributes no cities.
async fn city_links_of<F: Fetcher>(fetcher: &F, state_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(state_url) else {
        warn!("Skipping malformed state url {}", state_url);
        return Vec::new();
    };
    let html = match fetcher.fetch(state_url).await {
        Ok(html) => html,
        Err(e) => {
            warn!("Failed {}: {}", state_url, e);
            return Vec::new();
        }
    };
    directory::city_links(&html, &base).unwrap_or_else(|| {
        warn!("No city listing on {}", state_url);
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageError;
    use crate::fetch::mock::MockFetcher;

    const ROOT: &str = "http://www.valuepenguin.com/auto-insurance";

    async fn discover(fetcher: MockFetcher) -> Result<Vec<String>> {
        discover_city_urls(Arc::new(fetcher), &WorkerPool::new(2), ROOT).await
    }

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    #[tokio::test]
    async fn walks_states_to_cities() {
        let state = fixture("state_page");
        let fetcher = MockFetcher::default()
            .page(ROOT, &fixture("directory_root"))
            .page(&format!("{}/illinois", ROOT), &state)
            // Same listing twice: duplicates collapse.
            .page(&format!("{}/new-york", ROOT), &state);

        let cities = discover(fetcher).await.unwrap();
        assert_eq!(
            cities,
            vec![
                "http://www.valuepenguin.com/auto-insurance/illinois/oak-park",
                "http://www.valuepenguin.com/auto-insurance/illinois/springfield",
            ]
        );
    }

    #[tokio::test]
    async fn failing_state_is_skipped() {
        let fetcher = MockFetcher::default()
            .page(ROOT, &fixture("directory_root"))
            .page(&format!("{}/illinois", ROOT), &fixture("state_page"))
            .failing(&format!("{}/new-york", ROOT), PageError::Status(503));

        let cities = discover(fetcher).await.unwrap();
        assert_eq!(cities.len(), 2);
    }

    #[tokio::test]
    async fn root_without_states_is_error() {
        let fetcher = MockFetcher::default().page(ROOT, "<html><body></body></html>");
        assert!(discover(fetcher).await.is_err());
    }
}
