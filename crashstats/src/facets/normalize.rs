//! Uniform columns across query slices.
//!
//! Repeated facet queries (one per period, or one per histogram bucket) each
//! report only the terms they saw. Before the slices can be rendered as rows
//! of one table every slice needs every term; absent terms count as zero.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::table::{FlatRecord, REMAINDER, TOTAL};

/// term → count for one slice.
pub type TermCounts = BTreeMap<String, i64>;

/// slice label → term counts.
pub type SliceTable = BTreeMap<String, TermCounts>;

/// The remainder marker first, the total marker last, everything else in
/// between.
fn marker_rank(term: &str) -> u8 {
    match term {
        REMAINDER => 0,
        TOTAL => 2,
        _ => 1,
    }
}

fn numeric(term: &str) -> Option<f64> {
    term.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Order of columns and histogram buckets.
///
/// Markers rank as in [`marker_rank`]. Numeric terms (build ids, uptimes)
/// compare by value and come before other terms, which compare as strings.
pub fn compare_terms(a: &str, b: &str) -> Ordering {
    marker_rank(a).cmp(&marker_rank(b)).then_with(|| match (numeric(a), numeric(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    })
}

/// Label for a facet term used as a column or row key. A term spelled like
/// the `--` or `total` marker is quoted so the marker keeps its meaning.
pub fn term_label(term: &str) -> String {
    match term {
        REMAINDER | TOTAL => format!("\"{}\"", term),
        _ => term.to_string(),
    }
}

/// Term counts of one facet keyed by [`term_label`].
pub fn labeled_counts(counts: Vec<(String, u64)>) -> TermCounts {
    counts
        .into_iter()
        .map(|(term, count)| (term_label(&term), i64::try_from(count).unwrap_or(i64::MAX)))
        .collect()
}

/// Union of every term seen in any slice, in column order.
pub fn observed_terms(table: &SliceTable) -> Vec<String> {
    let terms: BTreeSet<&String> = table.values().flat_map(|counts| counts.keys()).collect();
    let mut terms: Vec<String> = terms.into_iter().cloned().collect();
    terms.sort_by(|a, b| compare_terms(a, b));
    terms
}

/// Give every slice every observed term, defaulting missing ones to zero.
///
/// Returns the column order.
pub fn normalize(table: &mut SliceTable) -> Vec<String> {
    let terms = observed_terms(table);
    for counts in table.values_mut() {
        for term in &terms {
            counts.entry(term.clone()).or_insert(0);
        }
    }
    terms
}

/// Rows of `{key_column: slice, term...: count}` in slice order.
///
/// Fails with `MissingField(facet)` when there are no slices at all.
pub fn slice_records(key_column: &str, facet: &str, table: &SliceTable) -> Result<Vec<FlatRecord>> {
    if table.is_empty() {
        return Err(Error::MissingField(facet.to_string()));
    }

    let terms = observed_terms(table);
    let records = table
        .iter()
        .map(|(slice, counts)| {
            terms.iter().fold(
                FlatRecord::new().with(key_column, slice.as_str()),
                |record, term| record.with(term.as_str(), counts.get(term).copied().unwrap_or(0)),
            )
        })
        .collect();
    Ok(records)
}
