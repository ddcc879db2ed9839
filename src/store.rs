use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub const RECORD_HEADER: [&str; 7] = [
    "State",
    "City",
    "Insurance Company Name",
    "Address",
    "Phone Number",
    "Fax",
    "Email",
];

/// One agency listing. Field order is the column order of the records file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Insurance Company Name")]
    pub company_name: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Phone Number")]
    pub phone: String,
    #[serde(rename = "Fax")]
    pub fax: String,
    #[serde(rename = "Email")]
    pub email: String,
}

/// Outcome of reading a one-url-per-row file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRead {
    NotFound,
    Loaded(Vec<String>),
}

impl LogRead {
    pub fn into_urls(self) -> Vec<String> {
        match self {
            LogRead::NotFound => Vec::new(),
            LogRead::Loaded(urls) => urls,
        }
    }
}

// ── url columns (url list, completion log, error log) ──

/// Read the first column of every row. Blank rows are skipped.
pub fn read_urls(path: &Path) -> Result<LogRead, StoreError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(LogRead::NotFound),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut urls = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| StoreError::csv(path, e))?;
        if let Some(url) = row.get(0).map(str::trim).filter(|u| !u.is_empty()) {
            urls.push(url.to_string());
        }
    }
    Ok(LogRead::Loaded(urls))
}

/// Append one row per url and fsync before returning.
pub fn append_urls<'a>(
    path: &Path,
    urls: impl IntoIterator<Item = &'a str>,
) -> Result<usize, StoreError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(open_append(path)?);

    let mut written = 0;
    for url in urls {
        writer
            .write_record([url])
            .map_err(|e| StoreError::csv(path, e))?;
        written += 1;
    }
    finish(path, writer)?;
    Ok(written)
}

/// Replace the url list with `urls`, one per row.
pub fn write_url_list(path: &Path, urls: &[String]) -> Result<(), StoreError> {
    let file = File::create(path).map_err(|e| StoreError::io(path, e))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    for url in urls {
        writer
            .write_record([url])
            .map_err(|e| StoreError::csv(path, e))?;
    }
    finish(path, writer)
}

// ── records file ──

/// Truncate the records file down to the header row.
pub fn reset_records(path: &Path) -> Result<(), StoreError> {
    let file = File::create(path).map_err(|e| StoreError::io(path, e))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer
        .write_record(RECORD_HEADER)
        .map_err(|e| StoreError::csv(path, e))?;
    finish(path, writer)
}

/// Append records and fsync. A missing or empty file gets the header first.
pub fn append_records(path: &Path, records: &[Record]) -> Result<(), StoreError> {
    let file = open_append(path)?;
    let is_empty = file.metadata().map_err(|e| StoreError::io(path, e))?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if is_empty {
        writer
            .write_record(RECORD_HEADER)
            .map_err(|e| StoreError::csv(path, e))?;
    }
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| StoreError::csv(path, e))?;
    }
    finish(path, writer)
}

fn open_append(path: &Path) -> Result<File, StoreError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| StoreError::io(path, e))
}

fn finish(path: &Path, writer: csv::Writer<File>) -> Result<(), StoreError> {
    let file = writer
        .into_inner()
        .map_err(|e| StoreError::io(path, e.into_error()))?;
    file.sync_all().map_err(|e| StoreError::io(path, e))
}
