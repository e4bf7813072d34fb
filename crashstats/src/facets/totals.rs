//! Leftover (`--`) and `total` rows and columns.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::table::{FlatRecord, FlatTable, FlatTables, Scalar, TableKind, COUNT, REMAINDER, TOTAL};

const WEEKEND_MARKER: &str = " **";

/// Append remainder and total rows to term tables, and a remainder column to
/// histogram tables. Cardinality tables are untouched.
pub fn add_totals(tables: &mut FlatTables, total: u64, leftover: bool) {
    for (_, table) in tables.iter_mut() {
        match table.kind {
            TableKind::Terms => add_term_totals(table, total, leftover),
            TableKind::Histogram if leftover => add_histogram_remainder(table),
            _ => {}
        }
    }
}

fn add_term_totals(table: &mut FlatTable, total: u64, leftover: bool) {
    let total = i64::try_from(total).unwrap_or(i64::MAX);
    if leftover {
        let remainder = total - table.sum(COUNT);
        table
            .records
            .push(FlatRecord::new().with(table.key.as_str(), REMAINDER).with(COUNT, remainder));
    }
    table
        .records
        .push(FlatRecord::new().with(table.key.as_str(), TOTAL).with(COUNT, total));
}

/// `--` = row total minus every other numeric column, placed right after the
/// key column.
fn add_histogram_remainder(table: &mut FlatTable) {
    if !table.headers().iter().any(|h| h == TOTAL) {
        return;
    }

    let key = table.key.clone();
    for record in &mut table.records {
        let Some(row_total) = record.get(TOTAL).and_then(Scalar::as_i64) else {
            continue;
        };
        let counted: i64 = record
            .iter()
            .filter(|(column, _)| *column != key && *column != TOTAL && *column != REMAINDER)
            .filter_map(|(_, value)| value.as_i64())
            .sum();
        record.insert_at(1, REMAINDER, row_total - counted);
    }
}

/// Mark histogram rows whose date falls on a Saturday or Sunday.
pub fn denote_weekends(table: &mut FlatTable) {
    if table.kind != TableKind::Histogram {
        return;
    }

    let key = table.key.clone();
    for record in &mut table.records {
        let Some(label) = record.get(&key).and_then(Scalar::as_str) else {
            continue;
        };
        if is_weekend(label) {
            let marked = format!("{}{}", label, WEEKEND_MARKER);
            record.insert(key.as_str(), marked);
        }
    }
}

fn is_weekend(label: &str) -> bool {
    let date = label.get(..10).unwrap_or(label);
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(date) => matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_table() -> FlatTables {
        let mut table = FlatTable::new("product", TableKind::Terms);
        table.records = vec![
            FlatRecord::new().with("product", "Firefox").with("count", 5i64),
            FlatRecord::new().with("product", "Fenix").with("count", 4i64),
        ];
        let mut tables = FlatTables::new();
        tables.insert("product", table);
        tables
    }

    #[test]
    fn test_total_only() {
        let mut tables = product_table();
        add_totals(&mut tables, 19, false);
        let records = &tables.get("product").unwrap().records;
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[2],
            FlatRecord::new().with("product", "total").with("count", 19i64)
        );
    }

    #[test]
    fn test_leftover_then_total() {
        let mut tables = product_table();
        add_totals(&mut tables, 19, true);
        let records = &tables.get("product").unwrap().records;
        assert_eq!(
            records[2],
            FlatRecord::new().with("product", "--").with("count", 10i64)
        );
        assert_eq!(records[3].get("count"), Some(&Scalar::Int(19)));
    }

    #[test]
    fn test_cardinality_untouched() {
        let mut table = FlatTable::new("cardinality_product", TableKind::Cardinality);
        table
            .records
            .push(FlatRecord::new().with("cardinality_product", "value").with("value", 6i64));
        let mut tables = FlatTables::new();
        tables.insert("cardinality_product", table.clone());

        add_totals(&mut tables, 19, true);
        assert_eq!(tables.get("cardinality_product"), Some(&table));
    }

    #[test]
    fn test_histogram_remainder_column() {
        let mut table = FlatTable::new("histogram_date", TableKind::Histogram);
        table.records.push(
            FlatRecord::new()
                .with("histogram_date", "2022-06-24")
                .with("Fenix", 2i64)
                .with("Firefox", 5i64)
                .with("total", 10i64),
        );
        let mut tables = FlatTables::new();
        tables.insert("histogram_date.product", table);

        add_totals(&mut tables, 10, false);
        assert_eq!(tables.get("histogram_date.product").unwrap().headers().len(), 4);

        add_totals(&mut tables, 10, true);
        let table = tables.get("histogram_date.product").unwrap();
        assert_eq!(
            table.headers(),
            vec!["histogram_date", "--", "Fenix", "Firefox", "total"]
        );
        assert_eq!(table.records[0].get("--"), Some(&Scalar::Int(3)));
    }

    #[test]
    fn test_histogram_cardinality_has_no_remainder() {
        let mut table = FlatTable::new("histogram_date", TableKind::Histogram);
        table.records.push(
            FlatRecord::new()
                .with("histogram_date", "2022-06-24")
                .with("value", 6i64),
        );
        let mut tables = FlatTables::new();
        tables.insert("histogram_date.cardinality_product", table.clone());

        add_totals(&mut tables, 10, true);
        assert_eq!(tables.get("histogram_date.cardinality_product"), Some(&table));
    }

    #[test]
    fn test_denote_weekends() {
        let mut table = FlatTable::new("histogram_date", TableKind::Histogram);
        for date in ["2022-06-24", "2022-06-25", "2022-06-26", "2022-06-27"] {
            table
                .records
                .push(FlatRecord::new().with("histogram_date", date).with("total", 1i64));
        }
        denote_weekends(&mut table);

        let keys: Vec<String> = table
            .records
            .iter()
            .map(|r| r.get("histogram_date").unwrap().to_string())
            .collect();
        assert_eq!(
            keys,
            vec!["2022-06-24", "2022-06-25 **", "2022-06-26 **", "2022-06-27"]
        );
    }

    #[test]
    fn test_denote_weekends_ignores_term_tables() {
        let mut tables = product_table();
        let table = tables.get_mut("product").unwrap();
        let before = table.clone();
        denote_weekends(table);
        assert_eq!(*table, before);
    }
}
