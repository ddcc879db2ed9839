mod config;
mod discovery;
mod error;
mod fetch;
mod parser;
mod pipeline;
mod pool;
mod store;
mod work;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::warn;

use config::{PipelineConfig, DIRECTORY_ROOT_URL};
use fetch::HttpFetcher;
use pipeline::Pipeline;
use pool::WorkerPool;

#[derive(Parser)]
#[command(name = "agency_scraper", about = "Resumable auto insurance agency directory scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the state directory and write the city url list
    Discover {
        #[command(flatten)]
        opts: RunOpts,
        /// Directory page to start from
        #[arg(long, default_value = DIRECTORY_ROOT_URL)]
        root: String,
    },
    /// Scrape every city page not yet in the completion log
    Run {
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Show progress counts
    Stats {
        #[command(flatten)]
        opts: RunOpts,
    },
}

#[derive(Args)]
struct RunOpts {
    /// Directory holding the url list, output and logs
    #[arg(short, long, default_value = ".")]
    data_dir: PathBuf,
    /// Pages per checkpointed batch
    #[arg(short, long, default_value_t = config::DEFAULT_BATCH_SIZE)]
    batch_size: usize,
    /// Concurrent workers (default: available CPUs)
    #[arg(short, long)]
    workers: Option<usize>,
    /// Per-request timeout in seconds
    #[arg(long, default_value_t = config::DEFAULT_TIMEOUT.as_secs())]
    timeout_secs: u64,
    /// Disable the progress bar
    #[arg(long)]
    quiet: bool,
}

impl RunOpts {
    fn into_config(self) -> PipelineConfig {
        let mut cfg = PipelineConfig::in_dir(&self.data_dir);
        cfg.batch_size = self.batch_size;
        if let Some(workers) = self.workers {
            cfg.workers = workers;
        }
        cfg.request_timeout = Duration::from_secs(self.timeout_secs);
        cfg.show_progress = !self.quiet;
        cfg
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Discover { opts, root } => {
            let cfg = opts.into_config();
            let fetcher = HttpFetcher::new(cfg.request_timeout, &cfg.user_agent)?;
            let pool = WorkerPool::new(cfg.workers);
            let urls = discovery::discover_city_urls(Arc::new(fetcher), &pool, &root).await?;
            store::write_url_list(&cfg.url_list, &urls)
                .with_context(|| format!("Failed to write {}", cfg.url_list.display()))?;
            println!("Wrote {} city urls to {}", urls.len(), cfg.url_list.display());
            Ok(())
        }
        Commands::Run { opts } => {
            let cfg = opts.into_config();
            let fetcher = HttpFetcher::new(cfg.request_timeout, &cfg.user_agent)?;
            let pipeline = Pipeline::new(cfg, fetcher);

            let cancel = pipeline.cancel_handle();
            tokio::spawn(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    if interrupt(&cancel) {
                        warn!("Interrupted again; exiting without committing.");
                        std::process::exit(130);
                    }
                    warn!("Interrupted; stopping after this batch. Ctrl-C again exits now.");
                }
            });

            let s = pipeline.run().await?;
            if s.pending == 0 {
                println!("No pending pages. All {} urls are completed.", s.total);
                return Ok(());
            }
            println!(
                "Done: {} pages in {} batches ({} ok, {} errors), {} records.",
                s.processed, s.batches, s.succeeded, s.failed, s.records
            );
            if s.cancelled {
                println!("Stopped early; run again to resume.");
            }
            Ok(())
        }
        Commands::Stats { opts } => {
            let cfg = opts.into_config();
            let total = store::read_urls(&cfg.url_list)?.into_urls();
            let completed = store::read_urls(&cfg.completed)?.into_urls();
            let errors = store::read_urls(&cfg.errors)?.into_urls();
            let pending = work::pending_urls(&total, &completed);
            println!("Total:     {}", total.len());
            println!("Completed: {}", completed.len());
            println!("Errors:    {}", errors.len());
            println!("Pending:   {}", pending.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Raise the cancel flag. Returns true when it was already raised.
fn interrupt(cancel: &AtomicBool) -> bool {
    cancel.swap(true, Ordering::SeqCst)
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }

    #[test]
    fn second_interrupt_requests_exit() {
        let cancel = AtomicBool::new(false);
        assert!(!interrupt(&cancel));
        assert!(cancel.load(Ordering::SeqCst));
        assert!(interrupt(&cancel));
    }

    #[test]
    fn cli_overrides_defaults() {
        let cli = Cli::parse_from([
            "agency_scraper",
            "run",
            "--data-dir",
            "/data",
            "-b",
            "25",
            "-w",
            "4",
        ]);
        let Commands::Run { opts } = cli.command else {
            panic!("expected run");
        };
        let cfg = opts.into_config();
        assert_eq!(cfg.batch_size, 25);
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.completed, PathBuf::from("/data/completed.csv"));
    }
}
