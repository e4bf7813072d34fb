//! Turning facet command options into queries.

use chrono::NaiveDate;
use tracing::debug;

use super::fetch::{facet_by_period, facet_tables, response_key};
use super::totals::denote_weekends;
use crate::client::Transport;
use crate::error::{Error, Result};
use crate::params::{SearchParams, DATE, FACETS};
use crate::periods::{resolve_date_range, Granularity, Periods};
use crate::table::FlatTables;

/// Facet used when the query requests no aggregation.
pub const DEFAULT_FACET: &str = "signature";

/// Options of one facet run.
#[derive(Debug, Clone)]
pub struct FacetQuery {
    pub params: SearchParams,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Length of the range ending on the end date, e.g. `7d`
    pub relative_range: String,
    /// Query once per period instead of once for the whole range
    pub period: Option<Granularity>,
    pub leftover: bool,
    pub denote_weekends: bool,
}

impl FacetQuery {
    pub fn new(params: SearchParams) -> Self {
        Self {
            params,
            start_date: None,
            end_date: None,
            relative_range: "7d".to_string(),
            period: None,
            leftover: false,
            denote_weekends: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum FacetPlan {
    /// One query whose params carry the date filter.
    Single { params: SearchParams },
    /// One query per period for a single facet.
    ByPeriod {
        params: SearchParams,
        facet: String,
        periods: Periods,
    },
}

/// Decide which queries a facet run needs.
///
/// Without an aggregation the facet defaults to `signature`. An explicit
/// `date` filter in the params wins over the range options and disables the
/// per-period sweep. A per-period sweep needs exactly one `_facets` value.
pub fn plan_facets(query: &FacetQuery, today: NaiveDate) -> Result<FacetPlan> {
    let mut params = query.params.clone();
    if !params.has_aggregations() {
        params.set(FACETS, [DEFAULT_FACET]);
    }

    if params.contains(DATE) {
        return Ok(FacetPlan::Single { params });
    }

    let range = resolve_date_range(
        query.start_date.as_deref(),
        query.end_date.as_deref(),
        &query.relative_range,
        today,
    )?;

    match query.period {
        Some(granularity) => {
            let facet = match params.get(FACETS).unwrap_or_default() {
                [facet] => facet.clone(),
                _ => return Err(Error::invalid_argument("One '_facets' must be specified.")),
            };
            let periods = Periods::between(granularity, &range.start, &range.end)?;
            debug!(%granularity, start = %range.start, end = %range.end, "facet by period");
            Ok(FacetPlan::ByPeriod {
                params,
                facet,
                periods,
            })
        }
        None => {
            params.set(DATE, range.date_params());
            Ok(FacetPlan::Single { params })
        }
    }
}

/// Plan and run a facet query, returning the rendered-ready tables.
pub async fn run_facets(
    transport: &dyn Transport,
    query: &FacetQuery,
    today: NaiveDate,
) -> Result<FlatTables> {
    let mut tables = match plan_facets(query, today)? {
        FacetPlan::Single { params } => {
            debug!(?params, "facet");
            facet_tables(transport, &params, query.leftover).await?
        }
        FacetPlan::ByPeriod {
            params,
            facet,
            periods,
        } => {
            let table = facet_by_period(transport, &params, &facet, periods, query.leftover).await?;
            let mut tables = FlatTables::new();
            tables.insert(response_key(&facet), table);
            tables
        }
    };

    if query.denote_weekends {
        for (_, table) in tables.iter_mut() {
            denote_weekends(table);
        }
    }
    Ok(tables)
}
