//! `crashstats reprocess`: send crash ids to the processor again.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use crashstats::reprocess::{collect_crash_ids, reprocess, ReprocessOptions, DEFAULT_SLEEP_SECS};
use crashstats::CrashStatsClient;
use tracing::{info, warn};

use super::crash_ids_or_stdin;

/// Send crash reports to the processor to be reprocessed.
///
/// Requires an API token with the reprocess crashes permission in
/// CRASHSTATS_API_TOKEN.
#[derive(Args, Debug)]
pub struct ReprocessArgs {
    /// Crash ids, bp- prefixed ids or report urls; read from stdin when omitted
    pub crash_ids: Vec<String>,

    /// Seconds to sleep between groups of crash ids
    #[arg(long, default_value_t = DEFAULT_SLEEP_SECS)]
    pub sleep: u64,

    /// Processor ruleset to use
    #[arg(long)]
    pub ruleset: Option<String>,

    /// Allow reprocessing more than 10,000 crash reports at once
    #[arg(long)]
    pub allow_many: bool,
}

/// Run the reprocess command.
pub async fn run_reprocess(client: &CrashStatsClient, args: ReprocessArgs) -> Result<()> {
    let (crash_ids, unrecognized) = collect_crash_ids(crash_ids_or_stdin(args.crash_ids)?);
    for item in &unrecognized {
        warn!("Crash id not recognized: {}", item);
    }

    eprintln!(
        "Reprocessing {} crashes sleeping {} seconds between groups...",
        crash_ids.len(),
        args.sleep
    );

    let options = ReprocessOptions {
        sleep: Duration::from_secs(args.sleep),
        ruleset: args.ruleset,
        allow_many: args.allow_many,
    };
    let summary = reprocess(client, &crash_ids, &options, |outcome| {
        let state = if outcome.accepted() {
            "sent".to_string()
        } else {
            format!("rejected with status {}", outcome.status)
        };
        eprintln!(
            "Group ending with {} ({}/{}): {}",
            outcome.last_crash_id, outcome.group, outcome.total_groups, state
        );
    })
    .await?;

    info!(?summary, "reprocess finished");
    if summary.rejected_groups > 0 {
        eprintln!(
            "Done! {} of {} groups were rejected.",
            summary.rejected_groups, summary.groups
        );
    } else {
        eprintln!("Done!");
    }
    Ok(())
}
