//! Super Search query parameters.
//!
//! A [`SearchParams`] is built once per command from an optional seed URL plus
//! `--key=value` overrides and is never mutated afterwards. Pagination offsets
//! and per-period date ranges are applied to derived copies via
//! [`SearchParams::with`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum number of results the service returns per page.
pub const MAX_PAGE: u64 = 1000;

pub const RESULTS_OFFSET: &str = "_results_offset";
pub const RESULTS_NUMBER: &str = "_results_number";
pub const COLUMNS: &str = "_columns";
pub const SORT: &str = "_sort";
pub const FACETS: &str = "_facets";
pub const DATE: &str = "date";

/// Key prefixes for aggregations and their options; dropped from record searches.
pub const AGGREGATION_PREFIXES: &[&str] = &["_facets", "_aggs", "_histogram", "_cardinality"];

/// Aggregations named by field, e.g. `_histogram.date`.
pub const NAMED_AGGREGATION_PREFIXES: &[&str] = &["_aggs.", "_histogram.", "_cardinality."];

/// Keys the web UI adds for paging and column selection.
pub const SEARCH_PREFIXES: &[&str] = &["_columns", "_results_number", "_results_offset"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    params: BTreeMap<String, Vec<String>>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.params.get(key).map(Vec::as_slice)
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    /// Replace all values for `key`.
    pub fn set<I, S>(&mut self, key: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params
            .insert(key.into(), values.into_iter().map(Into::into).collect());
    }

    /// Append one value for `key`.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.entry(key.into()).or_default().push(value.into());
    }

    /// Set `key` only when it is absent.
    pub fn set_default<I, S>(&mut self, key: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !self.contains(key) {
            self.set(key, values);
        }
    }

    /// Derived copy with `key` replaced by a single value.
    pub fn with(&self, key: &str, value: impl ToString) -> Self {
        let mut derived = self.clone();
        derived.set(key, [value.to_string()]);
        derived
    }

    /// Derived copy with `key` replaced by several values.
    pub fn with_values<I, S>(&self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut derived = self.clone();
        derived.set(key, values);
        derived
    }

    /// Keys from `overrides` replace keys here wholesale.
    pub fn merge(mut self, overrides: SearchParams) -> Self {
        self.params.extend(overrides.params);
        self
    }

    /// Drop every key starting with one of `prefixes`.
    pub fn without_prefixes(mut self, prefixes: &[&str]) -> Self {
        self.params
            .retain(|key, _| !prefixes.iter().any(|p| key.starts_with(p)));
        self
    }

    /// Whether any aggregation (facet, aggs, histogram, cardinality) is requested.
    pub fn has_aggregations(&self) -> bool {
        self.params.keys().any(|key| is_aggregation_key(key))
    }

    /// Flatten into `(key, value)` pairs for a query string.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |v| (key.clone(), v.clone())))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SearchParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = SearchParams::new();
        for (key, value) in iter {
            params.push(key, value);
        }
        params
    }
}

/// `_facets` itself, or a `_aggs.`, `_histogram.` or `_cardinality.` field.
/// Options such as `_facets_size` are not aggregations.
pub fn is_aggregation_key(key: &str) -> bool {
    key == FACETS || NAMED_AGGREGATION_PREFIXES.iter().any(|p| key.starts_with(p))
}

/// Parse the query string of a Super Search URL, dropping keys that start
/// with any of `drop_prefixes`.
pub fn extract_supersearch_params(url: &str, drop_prefixes: &[&str]) -> Result<SearchParams> {
    let parsed = url::Url::parse(url)?;
    let params: SearchParams = parsed.query_pairs().collect();
    Ok(params.without_prefixes(drop_prefixes))
}

/// Convert `--key value` / `--key=value` tokens into search parameters.
///
/// Repeated keys accumulate. Values wrapped in double quotes are unquoted.
pub fn parse_args<I, S>(args: I) -> Result<SearchParams>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut params = SearchParams::new();
    let mut args = args.into_iter();

    while let Some(token) = args.next() {
        let token = token.as_ref();
        let Some(field) = token.strip_prefix("--") else {
            return Err(Error::invalid_argument(format!("unknown argument {:?}", token)));
        };

        let (field, value) = match field.split_once('=') {
            Some((field, value)) => (field.to_string(), value.to_string()),
            None => match args.next() {
                Some(value) => (field.to_string(), value.as_ref().to_string()),
                None => {
                    return Err(Error::invalid_argument(format!("arg {} has no value", token)))
                }
            },
        };

        if field.is_empty() {
            return Err(Error::invalid_argument(format!("unknown argument {:?}", token)));
        }

        params.push(field, strip_quotes(&value));
    }

    Ok(params)
}

fn strip_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}
