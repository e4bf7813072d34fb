//! Facet queries against Super Search.

use tracing::{debug, info};

use super::flatten::flatten;
use super::normalize::{labeled_counts, normalize, slice_records, SliceTable};
use super::totals::add_totals;
use super::types::{FacetResponse, CARDINALITY_PREFIX, HISTOGRAM_PREFIX};
use crate::client::{Transport, SUPERSEARCH_ENDPOINT};
use crate::error::{Error, Result};
use crate::params::{SearchParams, DATE, FACETS, NAMED_AGGREGATION_PREFIXES, RESULTS_NUMBER};
use crate::periods::{format_period_point, period_date_params, Periods};
use crate::table::{FlatTable, FlatTables, TableKind, REMAINDER, TOTAL};

/// Key column of a per-period table.
pub const PERIOD_KEY: &str = "date";

/// Issue one zero-hit search and return its total and facets.
pub async fn fetch_facets(
    transport: &dyn Transport,
    params: &SearchParams,
) -> Result<FacetResponse> {
    let params = params.with(RESULTS_NUMBER, 0);
    let body = transport
        .get_json(SUPERSEARCH_ENDPOINT, &params.to_query_pairs())
        .await?;
    let response = FacetResponse::from_value(&body)?;
    debug!(total = response.total, facets = response.facets.len(), "fetched facets");
    Ok(response)
}

/// Key under which the response reports a requested aggregation.
///
/// `_cardinality.product` → `cardinality_product`, `_histogram.date` →
/// `histogram_date`, `_aggs.product.version` → `product`.
pub fn response_key(requested: &str) -> String {
    if let Some(field) = requested.strip_prefix("_cardinality.") {
        format!("{}{}", CARDINALITY_PREFIX, field)
    } else if let Some(field) = requested.strip_prefix("_histogram.") {
        format!("{}{}", HISTOGRAM_PREFIX, field)
    } else if let Some(fields) = requested.strip_prefix("_aggs.") {
        fields.split('.').next().unwrap_or(fields).to_string()
    } else {
        requested.to_string()
    }
}

/// Response keys every requested aggregation should appear under.
pub fn requested_facet_keys(params: &SearchParams) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    let mut add = |key: String| {
        if !keys.contains(&key) {
            keys.push(key);
        }
    };

    for facet in params.get(FACETS).unwrap_or_default() {
        add(response_key(facet));
    }
    for key in params.keys() {
        if NAMED_AGGREGATION_PREFIXES.iter().any(|p| key.starts_with(p)) {
            add(response_key(key));
        }
    }
    keys
}

/// Fail with `MissingField` for the first requested aggregation that is
/// absent from the response.
pub fn ensure_requested(params: &SearchParams, response: &FacetResponse) -> Result<()> {
    match requested_facet_keys(params)
        .into_iter()
        .find(|key| !response.facets.contains(key))
    {
        Some(missing) => Err(Error::MissingField(missing)),
        None => Ok(()),
    }
}

/// Fetch, check and flatten one facet query, adding totals.
pub async fn facet_tables(
    transport: &dyn Transport,
    params: &SearchParams,
    leftover: bool,
) -> Result<FlatTables> {
    let response = fetch_facets(transport, params).await?;
    ensure_requested(params, &response)?;

    let mut tables = flatten(&response.facets);
    add_totals(&mut tables, response.total, leftover);
    Ok(tables)
}

/// Query `facet` once per period and assemble one row per period.
///
/// Each row holds the period's term counts, an optional `--` remainder and the
/// period total. A failing period aborts the sweep.
pub async fn facet_by_period(
    transport: &dyn Transport,
    params: &SearchParams,
    facet: &str,
    periods: Periods,
    leftover: bool,
) -> Result<FlatTable> {
    let facet_key = response_key(facet);
    let base = params.with(FACETS, facet);
    let mut slices = SliceTable::new();

    for (start, end) in periods {
        let label = format_period_point(&start);
        info!(period = %label, facet = %facet_key, "fetching period");

        let slice_params = base.with_values(DATE, period_date_params(&start, &end));
        let response = fetch_facets(transport, &slice_params).await?;

        let total = i64::try_from(response.total).unwrap_or(i64::MAX);
        let mut counts = response
            .facets
            .get(&facet_key)
            .map(|facet| labeled_counts(facet.term_counts()))
            .unwrap_or_default();

        if leftover {
            let counted: i64 = counts.values().sum();
            counts.insert(REMAINDER.to_string(), total - counted);
        }
        counts.insert(TOTAL.to_string(), total);
        slices.insert(label, counts);
    }

    normalize(&mut slices);
    let mut table = FlatTable::new(PERIOD_KEY, TableKind::Histogram);
    table.records = slice_records(PERIOD_KEY, &facet_key, &slices)?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_key() {
        assert_eq!(response_key("product"), "product");
        assert_eq!(response_key("_cardinality.product"), "cardinality_product");
        assert_eq!(response_key("_histogram.date"), "histogram_date");
        assert_eq!(response_key("_aggs.product.version"), "product");
    }

    #[test]
    fn test_requested_facet_keys() {
        let params: SearchParams = [
            ("_facets", "product"),
            ("_facets", "_cardinality.install_time"),
            ("_aggs.product.version", "release_channel"),
            ("_histogram.date", "product"),
            ("product", "Firefox"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            requested_facet_keys(&params),
            vec!["product", "cardinality_install_time", "histogram_date"]
        );
    }

    #[test]
    fn test_ensure_requested() {
        let params: SearchParams = [("_facets", "product")].into_iter().collect();
        let body = serde_json::json!({"total": 0, "facets": {"version": []}});
        let response = FacetResponse::from_value(&body).unwrap();
        assert!(matches!(
            ensure_requested(&params, &response).unwrap_err(),
            Error::MissingField(f) if f == "product"
        ));
    }
}
