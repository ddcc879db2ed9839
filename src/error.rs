use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Fatal problems with the run's inputs or settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("url list {path} is missing")]
    UrlListMissing { path: PathBuf },
    #[error("url list {path} is unreadable: {reason}")]
    UrlListUnreadable { path: PathBuf, reason: String },
    #[error("url list {path} contains no urls")]
    UrlListEmpty { path: PathBuf },
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Failure to fetch or parse one page. Recorded in the error log, never fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("unparseable document: {0}")]
    Parse(String),
}

/// A single listing block could not be turned into a record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntityError {
    #[error("listing is missing its {0} field")]
    MissingField(&'static str),
}

/// Failure writing or reading one of the durable output files.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        StoreError::Csv {
            path: path.into(),
            source,
        }
    }
}

/// The only errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}
