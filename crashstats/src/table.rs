//! Flat tabular records handed to the renderers.

use std::fmt;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;

/// Category value standing for everything not individually listed.
pub const REMAINDER: &str = "--";
/// Category / column holding the grand total.
pub const TOTAL: &str = "total";
pub const COUNT: &str = "count";
pub const VALUE: &str = "value";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Str(String),
}

impl Scalar {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(n) => Some(*n),
            Scalar::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            Scalar::Int(_) => None,
        }
    }

    /// Convert a JSON value from a search hit.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Scalar::Str(String::new()),
            Value::String(s) => Scalar::Str(s.clone()),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Scalar::Int(i),
                None => Scalar::Str(n.to_string()),
            },
            other => Scalar::Str(other.to_string()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Int(n)
    }
}

impl From<u64> for Scalar {
    fn from(n: u64) -> Self {
        i64::try_from(n)
            .map(Scalar::Int)
            .unwrap_or_else(|_| Scalar::Str(n.to_string()))
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}

/// One row: ordered column name → scalar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatRecord {
    fields: Vec<(String, Scalar)>,
}

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`FlatRecord::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(key, value);
        self
    }

    /// Replace the value of an existing column or append a new one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Scalar>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Insert a column at `index`, removing any existing column of that name.
    pub fn insert_at(&mut self, index: usize, key: impl Into<String>, value: impl Into<Scalar>) {
        let key = key.into();
        self.fields.retain(|(k, _)| *k != key);
        let index = index.min(self.fields.len());
        self.fields.insert(index, (key, value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<Scalar> {
        let index = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(index).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Cell strings in `headers` order; missing columns render empty.
    pub fn cells(&self, headers: &[String]) -> Vec<String> {
        headers
            .iter()
            .map(|h| self.get(h).map(ToString::to_string).unwrap_or_default())
            .collect()
    }
}

impl Serialize for FlatRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// One row per term with a `count` column.
    Terms,
    /// Distinct-value counts; `value` column.
    Cardinality,
    /// One row per histogram bucket, one column per term.
    Histogram,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatTable {
    /// Primary-key column (facet name or slice label column).
    pub key: String,
    pub kind: TableKind,
    pub records: Vec<FlatRecord>,
}

impl FlatTable {
    pub fn new(key: impl Into<String>, kind: TableKind) -> Self {
        Self {
            key: key.into(),
            kind,
            records: Vec::new(),
        }
    }

    /// Union of all column names in first-seen order.
    pub fn headers(&self) -> Vec<String> {
        let mut headers: Vec<String> = Vec::new();
        for record in &self.records {
            for key in record.keys() {
                if !headers.iter().any(|h| h == key) {
                    headers.push(key.to_string());
                }
            }
        }
        headers
    }

    /// Sum of the integer `column` over all rows.
    pub fn sum(&self, column: &str) -> i64 {
        self.records
            .iter()
            .filter_map(|r| r.get(column).and_then(Scalar::as_i64))
            .sum()
    }
}

/// Named tables in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatTables {
    tables: Vec<(String, FlatTable)>,
}

impl FlatTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&FlatTable> {
        self.tables.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FlatTable> {
        self.tables.iter_mut().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    /// Insert, replacing any table of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, table: FlatTable) {
        let name = name.into();
        match self.get_mut(&name) {
            Some(existing) => *existing = table,
            None => self.tables.push((name, table)),
        }
    }

    /// Existing table `name`, or a fresh empty one appended at the end.
    pub fn get_or_insert(&mut self, name: &str, key: &str, kind: TableKind) -> &mut FlatTable {
        let index = match self.tables.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                self.tables.push((name.to_string(), FlatTable::new(key, kind)));
                self.tables.len() - 1
            }
        };
        &mut self.tables[index].1
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlatTable)> {
        self.tables.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut FlatTable)> {
        self.tables.iter_mut().map(|(n, t)| (n.as_str(), t))
    }

    pub fn names(&self) -> Vec<&str> {
        self.tables.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl IntoIterator for FlatTables {
    type Item = (String, FlatTable);
    type IntoIter = std::vec::IntoIter<(String, FlatTable)>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.into_iter()
    }
}

/// Serializes as `{table name: [records...]}`.
impl Serialize for FlatTables {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tables.len()))?;
        for (name, table) in &self.tables {
            map.serialize_entry(name, &table.records)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_insert_replaces() {
        let mut record = FlatRecord::new().with("product", "Firefox").with("count", 5i64);
        record.insert("count", 7i64);
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("count"), Some(&Scalar::Int(7)));
    }

    #[test]
    fn test_record_insert_at() {
        let mut record = FlatRecord::new()
            .with("date", "2022-06-24")
            .with("Fenix", 1i64)
            .with("total", 3i64);
        record.insert_at(1, REMAINDER, 2i64);
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["date", "--", "Fenix", "total"]);
    }

    #[test]
    fn test_record_serializes_in_order() {
        let record = FlatRecord::new().with("product", "Firefox").with("count", 5i64);
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"product":"Firefox","count":5}"#
        );
    }

    #[test]
    fn test_scalar_from_json() {
        assert_eq!(Scalar::from_json(&json!(null)), Scalar::Str(String::new()));
        assert_eq!(Scalar::from_json(&json!(12)), Scalar::Int(12));
        assert_eq!(Scalar::from_json(&json!(1.5)), Scalar::Str("1.5".into()));
        assert_eq!(Scalar::from_json(&json!(["a"])), Scalar::Str(r#"["a"]"#.into()));
        assert_eq!(Scalar::from(u64::MAX), Scalar::Str(u64::MAX.to_string()));
    }

    #[test]
    fn test_headers_union() {
        let mut table = FlatTable::new("product", TableKind::Terms);
        table.records.push(FlatRecord::new().with("product", "Firefox").with("count", 5i64));
        table.records.push(FlatRecord::new().with("product", "total").with("extra", 1i64));
        assert_eq!(table.headers(), vec!["product", "count", "extra"]);
        assert_eq!(table.sum("count"), 5);
    }

    #[test]
    fn test_tables_get_or_insert_keeps_order() {
        let mut tables = FlatTables::new();
        tables.get_or_insert("b", "b", TableKind::Terms);
        tables.get_or_insert("a", "a", TableKind::Terms);
        tables
            .get_or_insert("b", "b", TableKind::Terms)
            .records
            .push(FlatRecord::new().with("b", "x"));
        assert_eq!(tables.names(), vec!["b", "a"]);
        assert_eq!(tables.get("b").unwrap().records.len(), 1);
    }
}
