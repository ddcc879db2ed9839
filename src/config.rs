use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

pub const URL_LIST_FILE: &str = "city_urls.csv";
pub const RECORDS_FILE: &str = "auto_insurance_info.csv";
pub const COMPLETED_FILE: &str = "completed.csv";
pub const ERRORS_FILE: &str = "errors.csv";

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_USER_AGENT: &str = concat!("agency_scraper/", env!("CARGO_PKG_VERSION"));

/// Directory root the discovery crawl starts from.
pub const DIRECTORY_ROOT_URL: &str = "http://www.valuepenguin.com/auto-insurance";

/// Everything a pipeline run needs to know, passed in at construction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub url_list: PathBuf,
    pub records: PathBuf,
    pub completed: PathBuf,
    pub errors: PathBuf,
    pub batch_size: usize,
    pub workers: usize,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub show_progress: bool,
}

impl PipelineConfig {
    /// Default file names rooted at `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            url_list: dir.join(URL_LIST_FILE),
            records: dir.join(RECORDS_FILE),
            completed: dir.join(COMPLETED_FILE),
            errors: dir.join(ERRORS_FILE),
            batch_size: DEFAULT_BATCH_SIZE,
            workers: num_cpus::get(),
            request_timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            show_progress: true,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch size must be at least 1".into()));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("worker count must be at least 1".into()));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::in_dir(".")
    }
}
