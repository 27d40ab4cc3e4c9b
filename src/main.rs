//! scan-indexer - Write-back buffered indexing of scan results
//!
//! Entry point for the CLI application.

use anyhow::{bail, Context, Result};
use clap::Parser;
use scan_indexer::config::{CliArgs, ScanConfig};
use scan_indexer::progress::{print_header, print_summary, ProgressReporter};
use scan_indexer::scan::{LocalScanner, ScanStats};
use scan_indexer::{BackgroundExecutor, DatabaseIndexer};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    // Validate and create config
    let config = ScanConfig::from_args(args).context("Invalid configuration")?;

    let executor = Arc::new(
        BackgroundExecutor::new(config.index.flush_workers)
            .context("Failed to start flush workers")?,
    );
    let indexer = Arc::new(
        DatabaseIndexer::new(&config.index, executor.clone())
            .context("Failed to initialize indexer")?,
    );

    if config.show_progress {
        let roots: Vec<String> = config.roots.iter().map(|r| r.display().to_string()).collect();
        print_header(
            &roots,
            indexer.engine(),
            &config.index.connection.display_target(),
        );
    }

    if !indexer.setup_connection() {
        bail!("Could not connect to the database, not starting scan");
    }

    // Setup signal handler for graceful shutdown
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, flushing and shutting down...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    let progress = config.show_progress.then(ProgressReporter::new);
    if let Some(ref p) = progress {
        p.set_status("Scanning...");
    }

    let start = Instant::now();
    for share in &config.shares {
        indexer.add_share(share.clone());
    }

    let mut stats = ScanStats::default();
    let scan_done = AtomicBool::new(false);

    thread::scope(|s| {
        if let Some(ref p) = progress {
            let indexer = Arc::clone(&indexer);
            let scan_done = &scan_done;
            s.spawn(move || {
                while !scan_done.load(Ordering::SeqCst) {
                    p.update(indexer.queue_size(), &indexer.stats().snapshot());
                    thread::sleep(Duration::from_millis(250));
                }
            });
        }

        let mut scanner = LocalScanner::new(
            &indexer,
            &config.exclude_patterns,
            config.flush_interval,
            &shutdown,
        );
        for root in &config.roots {
            info!("Scanning {}", root.display());
            scanner.scan(root, &mut stats);
            if stats.interrupted {
                break;
            }
        }
        scan_done.store(true, Ordering::SeqCst);
    });

    // Let queued background flushes finish, then drain whatever is left
    if let Err(e) = executor.shutdown() {
        warn!("Flush workers did not shut down cleanly: {}", e);
    }
    indexer.flush_sync();

    if indexer.queue_size() > 0 {
        warn!(remaining = indexer.queue_size(), "Records left unflushed after final flush");
    }

    let index_stats = indexer.stats().snapshot();
    if let Some(ref p) = progress {
        p.finish(if stats.interrupted { "Scan interrupted" } else { "Scan completed" });
    }

    print_summary(&stats, &index_stats, start.elapsed());

    if index_stats.flushes_failed > 0 || index_stats.records_dropped > 0 {
        info!(
            failed_flushes = index_stats.flushes_failed,
            dropped = index_stats.records_dropped,
            "Indexing completed with errors"
        );
    }

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("scan_indexer=debug,warn")
    } else {
        EnvFilter::new("scan_indexer=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
