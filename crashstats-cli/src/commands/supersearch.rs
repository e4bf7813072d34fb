//! `crashstats supersearch`: record-level search across result pages.

use anyhow::Result;
use clap::Args;
use crashstats::params::AGGREGATION_PREFIXES;
use crashstats::render::{escape_whitespace, render_records, Format};
use crashstats::supersearch::{record_columns, with_record_defaults};
use crashstats::{CrashStatsClient, FlatRecord, Limit, SuperSearch};
use futures::TryStreamExt;
use tracing::debug;

use super::{build_params, print_output};

/// Fetch crash reports from Super Search.
///
/// Any `--field=value` not listed here becomes a Super Search parameter, e.g.
/// `--product=Firefox --_columns=uuid --_columns=build_id`. Output columns are
/// the `_columns` values (default `uuid`).
#[derive(Args, Debug)]
pub struct SupersearchArgs {
    /// Super Search url to base the query on
    #[arg(long)]
    pub supersearch_url: Option<String>,

    /// Number of results to fetch, or "all"
    #[arg(long, default_value = "100")]
    pub num: Limit,

    /// Print a header row
    #[arg(long)]
    pub headers: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Tab)]
    pub format: Format,
}

/// Run the supersearch command.
pub async fn run_supersearch(
    client: &CrashStatsClient,
    args: SupersearchArgs,
    search_args: &[String],
) -> Result<()> {
    let params = with_record_defaults(build_params(
        args.supersearch_url.as_deref(),
        AGGREGATION_PREFIXES,
        search_args,
    )?);
    debug!(?params, num = %args.num, "supersearch");

    let columns = record_columns(&params);
    let mut records = SuperSearch::new(client)
        .fetch(&params, args.num)
        .into_records(columns.clone());

    match args.format {
        // Streamed as pages arrive
        Format::Tab => {
            if args.headers {
                println!("{}", columns.join("\t"));
            }
            while let Some(record) = records.try_next().await? {
                let cells: Vec<String> = record
                    .cells(&columns)
                    .iter()
                    .map(|cell| escape_whitespace(cell))
                    .collect();
                println!("{}", cells.join("\t"));
            }
        }
        format => {
            let records: Vec<FlatRecord> = records.try_collect().await?;
            print_output(&render_records(format, &columns, &records, args.headers)?);
        }
    }

    Ok(())
}
