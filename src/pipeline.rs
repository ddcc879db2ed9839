use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::fetch::{self, Fetcher, ItemOutcome};
use crate::pool::WorkerPool;
use crate::store::{self, Record};
use crate::work::{self, WorkItem};

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub already_completed: usize,
    pub pending: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub records: usize,
    pub batches: usize,
    pub cancelled: bool,
}

/// Batched, resumable scrape over every url not yet in the completion log.
pub struct Pipeline<F: Fetcher> {
    config: PipelineConfig,
    fetcher: Arc<F>,
    pool: WorkerPool,
    cancel: Arc<AtomicBool>,
}

impl<F: Fetcher> Pipeline<F> {
    pub fn new(config: PipelineConfig, fetcher: F) -> Self {
        let pool = WorkerPool::new(config.workers);
        Self {
            config,
            fetcher: Arc::new(fetcher),
            pool,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Setting the flag stops the run at the next batch boundary.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        self.config.validate()?;
        let work = work::load(&self.config.url_list, &self.config.completed)?;

        if work.fresh_start {
            info!("Resetting {}", self.config.records.display());
            store::reset_records(&self.config.records)?;
        }

        let mut summary = RunSummary {
            total: work.total,
            already_completed: work.already_completed,
            pending: work.pending.len(),
            ..Default::default()
        };
        if work.pending.is_empty() {
            info!("Nothing pending.");
            return Ok(summary);
        }

        info!(
            "Dispatching {} urls to {} workers in batches of {}",
            work.pending.len(),
            self.pool.workers(),
            self.config.batch_size
        );
        let pb = self.progress_bar(work.pending.len());
        for batch in work.pending.chunks(self.config.batch_size) {
            if self.cancel.load(Ordering::SeqCst) {
                info!("Cancelled before batch {}", summary.batches + 1);
                summary.cancelled = true;
                break;
            }

            let records = self.run_batch(batch, &mut summary, &pb).await;
            self.commit(batch, &records)?;

            summary.batches += 1;
            summary.records += records.len();
            info!(
                "Committed batch {} ({} urls, {} records)",
                summary.batches,
                batch.len(),
                records.len()
            );
        }
        pb.finish_and_clear();

        info!(
            "Processed {} urls ({} ok, {} errors), {} records",
            summary.processed, summary.succeeded, summary.failed, summary.records
        );
        Ok(summary)
    }

    /// Fan the batch out to the pool and gather records until every item returns.
    /// Failed items go to the error log as they arrive. An item that produced no
    /// outcome (its worker task panicked) is logged as failed once the batch drains.
    async fn run_batch(
        &self,
        batch: &[WorkItem],
        summary: &mut RunSummary,
        pb: &ProgressBar,
    ) -> Vec<Record> {
        let fetcher = Arc::clone(&self.fetcher);
        let mut rx = self.pool.spawn_map(batch.to_vec(), move |item: WorkItem| {
            let fetcher = Arc::clone(&fetcher);
            async move { fetch::scrape_item(fetcher.as_ref(), item).await }
        });

        let mut records = Vec::new();
        let mut returned: HashSet<String> = HashSet::with_capacity(batch.len());
        while let Some(outcome) = rx.recv().await {
            summary.processed += 1;
            match outcome {
                ItemOutcome::Succeeded {
                    item,
                    records: found,
                } => {
                    summary.succeeded += 1;
                    records.extend(found);
                    returned.insert(item.url);
                }
                ItemOutcome::Failed { item, .. } => {
                    summary.failed += 1;
                    self.log_error(&item.url);
                    returned.insert(item.url);
                }
            }
            pb.inc(1);
        }

        for item in batch.iter().filter(|w| !returned.contains(&w.url)) {
            error!("{} produced no result; recording it as failed", item.url);
            summary.processed += 1;
            summary.failed += 1;
            self.log_error(&item.url);
            pb.inc(1);
        }
        records
    }

    fn log_error(&self, url: &str) {
        if let Err(e) = store::append_urls(&self.config.errors, [url]) {
            error!("Could not record {} in error log: {}", url, e);
        }
    }

    /// Records first, then completion marks; both fsynced before the next batch.
    fn commit(&self, batch: &[WorkItem], records: &[Record]) -> Result<(), PipelineError> {
        store::append_records(&self.config.records, records)?;
        store::append_urls(&self.config.completed, batch.iter().map(|w| w.url.as_str()))?;
        Ok(())
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb
    }
}
