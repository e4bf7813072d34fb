//! `crashstats fetch-data`: download raw crashes, dumps and processed crashes.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use crashstats::artifacts::{check_workers, fetch_crashes, CrashLayout, FetchOptions};
use crashstats::{CrashStatsClient, Transport};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use super::crash_ids_or_stdin;

/// Fetch crash data into OUTPUTDIR.
///
/// Raw crashes go in `raw_crash/20YYMMDD/<crash id>`, dumps in
/// `<dump name>/<crash id>` and processed crashes in
/// `processed_crash/<crash id>`.
#[derive(Args, Debug)]
pub struct FetchDataArgs {
    /// Directory to write crash data to
    pub outputdir: PathBuf,

    /// Crash ids, bp- prefixed ids or report urls; read from stdin when omitted
    pub crash_ids: Vec<String>,

    /// Fetch raw crashes (the default)
    #[arg(long, overrides_with = "no_raw")]
    pub raw: bool,

    /// Skip raw crashes (and therefore dumps)
    #[arg(long, overrides_with = "raw")]
    pub no_raw: bool,

    /// Fetch dumps; requires an API token
    #[arg(long)]
    pub dumps: bool,

    /// Fetch processed crashes
    #[arg(long)]
    pub processed: bool,

    /// Fetch files again even when they exist (the default)
    #[arg(long, overrides_with = "no_overwrite")]
    pub overwrite: bool,

    /// Keep files that already exist instead of fetching them again
    #[arg(long, overrides_with = "overwrite")]
    pub no_overwrite: bool,

    /// Number of crashes to fetch concurrently (1 to 10); more than one
    /// requires an API token
    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl FetchDataArgs {
    fn options(&self) -> FetchOptions {
        FetchOptions {
            raw: self.raw || !self.no_raw,
            dumps: self.dumps,
            processed: self.processed,
            overwrite: self.overwrite || !self.no_overwrite,
        }
    }
}

fn progress_bar(len: u64, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        bar.set_style(style.progress_chars("#>-"));
    }
    bar
}

/// Run the fetch-data command.
pub async fn run_fetch_data(client: &CrashStatsClient, args: FetchDataArgs) -> Result<()> {
    let has_token = client.has_token();
    let options = args.options();
    options.validate(has_token)?;
    let workers = check_workers(args.workers, has_token)?;

    if !has_token {
        warn!("No api token provided. Skipping dumps and personally identifiable information.");
    }
    info!(workers, ?options, "fetching crash data");

    let layout = CrashLayout::new(&args.outputdir);
    layout.check_root()?;

    let crash_ids = crash_ids_or_stdin(args.crash_ids.clone())?;
    let crash_ids: Vec<String> = crash_ids
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();
    if crash_ids.is_empty() {
        bail!("No crash ids specified.");
    }

    let total = crash_ids.len();
    let progress = progress_bar(total as u64, args.no_progress);
    let mut failed = 0usize;

    let mut results = std::pin::pin!(fetch_crashes(client, &layout, crash_ids, options, workers));
    while let Some((crash_id, result)) = results.next().await {
        match result {
            Ok(report) => {
                progress.set_message(format!(
                    "{}: {} written, {} skipped",
                    crash_id,
                    report.written.len(),
                    report.skipped.len()
                ));
            }
            Err(e) => {
                failed += 1;
                progress.suspend(|| warn!("{}: {}", crash_id, e));
            }
        }
        progress.inc(1);
    }
    progress.finish_with_message(format!("Done! {} crashes, {} failed", total, failed));

    if failed > 0 {
        bail!("Failed to fetch {} of {} crashes", failed, total);
    }
    Ok(())
}
