//! Flatten nested aggregation responses into named tables.
//!
//! | facet shape                  | table name        | row                              |
//! |------------------------------|-------------------|----------------------------------|
//! | `K: [{term, count}]`         | `K`               | `{K: term, count}`               |
//! | `K: {value}`                 | `K`               | `{K: "value", value}`            |
//! | `K: [{term, count, facets}]` | `K / sub`         | `{K / sub: "term / subterm", count}` |
//! | `histogram_K: [...]` → `F`   | `histogram_K.F`   | `{histogram_K: date, terms..., total}` |

use chrono::{DateTime, Timelike};

use super::normalize::{compare_terms, labeled_counts, normalize, observed_terms, term_label, SliceTable};
use super::types::{FacetBucket, FacetValue, Facets};
use crate::table::{FlatRecord, FlatTable, FlatTables, TableKind, COUNT, TOTAL, VALUE};

const NESTED_SEPARATOR: &str = " / ";

pub fn flatten(facets: &Facets) -> FlatTables {
    let mut tables = FlatTables::new();
    for (name, value) in facets.iter() {
        match value {
            FacetValue::Cardinality { value } => {
                let mut table = FlatTable::new(name, TableKind::Cardinality);
                table
                    .records
                    .push(FlatRecord::new().with(name, VALUE).with(VALUE, *value));
                tables.insert(name, table);
            }
            FacetValue::Flat(buckets) => {
                let mut table = FlatTable::new(name, TableKind::Terms);
                table.records = buckets
                    .iter()
                    .map(|b| {
                        FlatRecord::new()
                            .with(name, term_label(&b.term))
                            .with(COUNT, b.count)
                    })
                    .collect();
                tables.insert(name, table);
            }
            FacetValue::Nested(buckets) => flatten_nested(name, buckets, &mut tables),
            FacetValue::Histogram(buckets) => flatten_histogram(name, buckets, &mut tables),
        }
    }
    tables
}

/// Recurse into each term's facets and merge the results under `"name / sub"`.
fn flatten_nested(name: &str, buckets: &[FacetBucket], tables: &mut FlatTables) {
    for bucket in buckets {
        for (sub_name, sub_table) in flatten(&bucket.facets) {
            let merged_name = format!("{}{}{}", name, NESTED_SEPARATOR, sub_name);
            let target = tables.get_or_insert(&merged_name, &merged_name, sub_table.kind);
            for record in sub_table.records {
                target
                    .records
                    .push(rekey(&merged_name, &bucket.term, &sub_table.key, record));
            }
        }
    }
}

/// Prefix a sub-table row's key with the outer term, moving a cardinality
/// `value` into `count`.
fn rekey(merged_name: &str, term: &str, sub_key: &str, mut record: FlatRecord) -> FlatRecord {
    let sub_term = record
        .remove(sub_key)
        .map(|s| s.to_string())
        .unwrap_or_default();

    if record.get(COUNT).is_none() {
        if let Some(value) = record.remove(VALUE) {
            record.insert(COUNT, value);
        }
    }

    let mut rekeyed = FlatRecord::new().with(
        merged_name,
        format!("{}{}{}", term, NESTED_SEPARATOR, sub_term),
    );
    for (key, value) in record.iter() {
        rekeyed.insert(key, value.clone());
    }
    rekeyed
}

/// One table per sub-facet field, one row per bucket.
fn flatten_histogram(name: &str, buckets: &[FacetBucket], tables: &mut FlatTables) {
    let mut buckets: Vec<(String, &FacetBucket)> = buckets
        .iter()
        .map(|b| (truncate_midnight(&b.term), b))
        .collect();
    buckets.sort_by(|a, b| compare_terms(&a.0, &b.0));

    let mut fields: Vec<&str> = Vec::new();
    for (_, bucket) in &buckets {
        for field in bucket.facets.names() {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
    }

    for field in fields {
        let table_name = format!("{}.{}", name, field);
        let is_cardinality = buckets.iter().any(|(_, b)| {
            matches!(b.facets.get(field), Some(FacetValue::Cardinality { .. }))
        });

        let mut table = FlatTable::new(name, TableKind::Histogram);
        if is_cardinality {
            table.records = buckets
                .iter()
                .map(|(term, bucket)| {
                    let value = match bucket.facets.get(field) {
                        Some(FacetValue::Cardinality { value }) => *value,
                        _ => 0,
                    };
                    FlatRecord::new().with(name, term.as_str()).with(VALUE, value)
                })
                .collect();
        } else {
            table.records = histogram_term_rows(name, field, &buckets);
        }
        tables.insert(table_name, table);
    }
}

fn histogram_term_rows(
    name: &str,
    field: &str,
    buckets: &[(String, &FacetBucket)],
) -> Vec<FlatRecord> {
    let mut slices = SliceTable::new();
    for (term, bucket) in buckets {
        let counts = bucket
            .facets
            .get(field)
            .map(|facet| labeled_counts(facet.term_counts()))
            .unwrap_or_default();
        slices.insert(term.clone(), counts);
    }
    normalize(&mut slices);
    let columns = observed_terms(&slices);

    buckets
        .iter()
        .map(|(term, bucket)| {
            let mut record = FlatRecord::new().with(name, term.as_str());
            if let Some(counts) = slices.get(term) {
                for column in &columns {
                    record.insert(column.as_str(), counts.get(column).copied().unwrap_or(0));
                }
            }
            record.insert(TOTAL, bucket.count);
            record
        })
        .collect()
}

/// `2022-06-24T00:00:00+00:00` → `2022-06-24`; anything else is kept as is.
pub fn truncate_midnight(term: &str) -> String {
    match DateTime::parse_from_rfc3339(term) {
        Ok(dt) if dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0 => {
            dt.format("%Y-%m-%d").to_string()
        }
        _ => term.to_string(),
    }
}
