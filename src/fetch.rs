use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::PageError;
use crate::parser::listing;
use crate::store::Record;
use crate::work::WorkItem;

/// Source of page bodies. The pipeline only ever needs the text of a url.
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, PageError>> + Send;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client, timeout })
    }

    fn classify(&self, e: reqwest::Error) -> PageError {
        if e.is_timeout() {
            PageError::Timeout(self.timeout)
        } else {
            PageError::Request(e.to_string())
        }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, PageError> {
        let response = self.client.get(url).send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PageError::Status(status.as_u16()));
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                PageError::Timeout(self.timeout)
            } else {
                PageError::Parse(e.to_string())
            }
        })
    }
}

/// Where an item's processing stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Succeeded {
        item: WorkItem,
        records: Vec<Record>,
    },
    Failed {
        item: WorkItem,
        error: PageError,
    },
}

/// Fetch, parse and extract one city page. Never fails past this point:
/// errors come back as `ItemOutcome::Failed` and are reported on the log.
pub async fn scrape_item<F: Fetcher>(fetcher: &F, item: WorkItem) -> ItemOutcome {
    debug!(url = %item.url, "Fetching");
    let body = match fetcher.fetch(&item.url).await {
        Ok(body) => body,
        Err(error) => return failed(item, error),
    };

    debug!(url = %item.url, bytes = body.len(), "Parsing");
    if body.trim().is_empty() {
        return failed(item, PageError::Parse("empty document".into()));
    }

    let records = listing::extract_records(&body, &item);
    debug!(url = %item.url, records = records.len(), "Extracted");
    ItemOutcome::Succeeded { item, records }
}

fn failed(item: WorkItem, error: PageError) -> ItemOutcome {
    warn!("Failed {}: {}", item.url, error);
    ItemOutcome::Failed { item, error }
}
