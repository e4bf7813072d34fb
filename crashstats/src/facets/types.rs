use serde::de::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub const CARDINALITY_PREFIX: &str = "cardinality_";
pub const HISTOGRAM_PREFIX: &str = "histogram_";

/// One `{term, count, facets}` bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetBucket {
    pub term: String,
    pub count: u64,
    pub facets: Facets,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FacetValue {
    /// Terms with counts and no sub-aggregations.
    Flat(Vec<FacetBucket>),
    /// Distinct-value count.
    Cardinality { value: u64 },
    /// Terms whose buckets carry their own facets.
    Nested(Vec<FacetBucket>),
    /// Date buckets, each optionally carrying facets.
    Histogram(Vec<FacetBucket>),
}

impl FacetValue {
    /// Classify one entry of a `facets` object by key prefix and shape.
    pub fn from_entry(key: &str, value: &Value) -> Result<Self> {
        if key.starts_with(CARDINALITY_PREFIX) || is_cardinality_shape(value) {
            let value = value
                .get("value")
                .and_then(as_count)
                .ok_or_else(|| shape_error(key, "cardinality without a numeric value"))?;
            return Ok(FacetValue::Cardinality { value });
        }

        let items = value
            .as_array()
            .ok_or_else(|| shape_error(key, "expected a list of buckets"))?;
        let buckets = items
            .iter()
            .map(|item| FacetBucket::from_value(key, item))
            .collect::<Result<Vec<_>>>()?;

        if key.starts_with(HISTOGRAM_PREFIX) {
            Ok(FacetValue::Histogram(buckets))
        } else if buckets.iter().any(|b| !b.facets.is_empty()) {
            Ok(FacetValue::Nested(buckets))
        } else {
            Ok(FacetValue::Flat(buckets))
        }
    }

    pub fn buckets(&self) -> &[FacetBucket] {
        match self {
            FacetValue::Flat(b) | FacetValue::Nested(b) | FacetValue::Histogram(b) => b,
            FacetValue::Cardinality { .. } => &[],
        }
    }

    /// `(term, count)` pairs; a cardinality reports itself as `("value", n)`.
    pub fn term_counts(&self) -> Vec<(String, u64)> {
        match self {
            FacetValue::Cardinality { value } => vec![("value".to_string(), *value)],
            _ => self
                .buckets()
                .iter()
                .map(|b| (b.term.clone(), b.count))
                .collect(),
        }
    }
}

impl FacetBucket {
    fn from_value(key: &str, value: &Value) -> Result<Self> {
        let term = value
            .get("term")
            .map(term_to_string)
            .ok_or_else(|| shape_error(key, "bucket without a term"))?;
        let count = value
            .get("count")
            .and_then(as_count)
            .ok_or_else(|| shape_error(key, "bucket without a count"))?;
        let facets = match value.get("facets") {
            Some(nested) => Facets::from_value(nested)?,
            None => Facets::default(),
        };

        Ok(Self {
            term,
            count,
            facets,
        })
    }
}

/// A `facets` object with its entries in response order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Facets {
    entries: Vec<(String, FacetValue)>,
}

impl Facets {
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) => Self::from_map(map),
            Value::Null => Ok(Self::default()),
            _ => Err(Error::UnexpectedResponse(
                "facets must be an object".to_string(),
            )),
        }
    }

    fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let entries = map
            .iter()
            .map(|(key, value)| Ok((key.clone(), FacetValue::from_entry(key, value)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    pub fn get(&self, name: &str) -> Option<&FacetValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FacetValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for Facets {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Facets::from_value(&value).map_err(serde::de::Error::custom)
    }
}

/// `{total, facets}` from a zero-hit Super Search request.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetResponse {
    pub total: u64,
    pub facets: Facets,
}

impl FacetResponse {
    pub fn from_value(value: &Value) -> Result<Self> {
        let total = value
            .get("total")
            .and_then(as_count)
            .ok_or_else(|| Error::UnexpectedResponse("response has no total".to_string()))?;
        let facets = match value.get("facets") {
            Some(facets) => Facets::from_value(facets)?,
            None => Facets::default(),
        };
        Ok(Self { total, facets })
    }
}

fn is_cardinality_shape(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.contains_key("value"))
}

fn as_count(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
}

fn term_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn shape_error(key: &str, reason: &str) -> Error {
    Error::UnexpectedResponse(format!("facet {:?}: {}", key, reason))
}
