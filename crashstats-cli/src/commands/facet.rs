//! `crashstats supersearchfacet`: facet tables, optionally one row per period.

use anyhow::Result;
use chrono::Local;
use clap::{Args, ValueEnum};
use crashstats::facets::{run_facets, FacetQuery};
use crashstats::params::SEARCH_PREFIXES;
use crashstats::render::{render_tables, Format};
use crashstats::{CrashStatsClient, Granularity};

use super::{build_params, print_output};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PeriodChoice {
    /// One table for the whole range
    None,
    Hourly,
    Daily,
    Weekly,
}

impl PeriodChoice {
    fn granularity(self) -> Option<Granularity> {
        match self {
            PeriodChoice::None => None,
            PeriodChoice::Hourly => Some(Granularity::Hourly),
            PeriodChoice::Daily => Some(Granularity::Daily),
            PeriodChoice::Weekly => Some(Granularity::Weekly),
        }
    }
}

/// Fetch facet counts from Super Search.
///
/// Any `--field=value` not listed here becomes a Super Search parameter, e.g.
/// `--product=Firefox --_facets=version`. Without an aggregation the facet
/// defaults to `signature`.
#[derive(Args, Debug)]
pub struct FacetArgs {
    /// Super Search url to base the query on
    #[arg(long)]
    pub supersearch_url: Option<String>,

    /// Start date for the range; YYYY-MM-DD
    #[arg(long)]
    pub start_date: Option<String>,

    /// End date for the range; YYYY-MM-DD, defaults to today
    #[arg(long)]
    pub end_date: Option<String>,

    /// Range ending on the end date when no start date is given (e.g. 7d, 12h, 2w)
    #[arg(long, default_value = "7d")]
    pub relative_range: String,

    /// Facet once per period to get counts per period
    #[arg(long, value_enum, default_value = "none")]
    pub period: PeriodChoice,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Add a "--" row or column counting everything not listed
    #[arg(long)]
    pub leftover_count: bool,

    /// Mark dates falling on a weekend with "**"
    #[arg(long)]
    pub denote_weekends: bool,
}

/// Run the supersearchfacet command.
pub async fn run_facet(
    client: &CrashStatsClient,
    args: FacetArgs,
    search_args: &[String],
) -> Result<()> {
    let params = build_params(args.supersearch_url.as_deref(), SEARCH_PREFIXES, search_args)?;
    let query = FacetQuery {
        params,
        start_date: args.start_date,
        end_date: args.end_date,
        relative_range: args.relative_range,
        period: args.period.granularity(),
        leftover: args.leftover_count,
        denote_weekends: args.denote_weekends,
    };

    let tables = run_facets(client, &query, Local::now().date_naive()).await?;
    print_output(&render_tables(args.format, &tables)?);
    Ok(())
}
