//! Facet (aggregation) queries: fetching, flattening into tables, and totals.

mod fetch;
mod flatten;
mod normalize;
mod plan;
mod totals;
mod types;

pub use fetch::{
    ensure_requested, facet_by_period, facet_tables, fetch_facets, requested_facet_keys,
    response_key, PERIOD_KEY,
};
pub use flatten::{flatten, truncate_midnight};
pub use normalize::{
    compare_terms, labeled_counts, normalize, observed_terms, slice_records, term_label, SliceTable,
    TermCounts,
};
pub use plan::{plan_facets, run_facets, FacetPlan, FacetQuery, DEFAULT_FACET};
pub use totals::{add_totals, denote_weekends};
pub use types::{FacetBucket, FacetResponse, FacetValue, Facets, CARDINALITY_PREFIX, HISTOGRAM_PREFIX};
