//! CSV-backed reference data: security catalog, last prices, shares
//! outstanding, and classifier registry entries.
//!
//! | file | columns |
//! |---|---|
//! | catalog | `identifier,ticker,name,sector` (ticker and sector may be empty) |
//! | prices | `identifier,price` |
//! | shares outstanding | `identifier,shares_outstanding` |
//! | registry | `key,category` (key is an identifier or ticker) |

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;

use holdlab_core::domain::{Security, SecurityId, UNKNOWN_SECTOR};
use holdlab_core::{Classifier, InMemoryCatalog, PriceTable, SharesOutstandingTable};

use crate::loader::LoadError;

#[derive(Debug, Deserialize)]
struct CatalogRow {
    identifier: String,
    #[serde(default)]
    ticker: Option<String>,
    name: String,
    #[serde(default)]
    sector: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    identifier: String,
    price: f64,
}

#[derive(Debug, Deserialize)]
struct SharesRow {
    identifier: String,
    shares_outstanding: u64,
}

#[derive(Debug, Deserialize)]
struct RegistryRow {
    key: String,
    category: String,
}

/// Deserialize every row, tagging errors with the file and line.
fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<(u64, T)>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
    let mut rows = Vec::new();
    for record in reader.deserialize::<T>() {
        let row = record.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let line = rows.len() as u64 + 2;
        rows.push((line, row));
    }
    Ok(rows)
}

fn parse_id(path: &Path, line: u64, raw: &str) -> Result<SecurityId, LoadError> {
    SecurityId::parse(raw).ok_or_else(|| LoadError::InvalidRow {
        path: path.to_path_buf(),
        line,
        reason: "blank identifier".into(),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub fn load_catalog(path: &Path) -> Result<InMemoryCatalog, LoadError> {
    let mut catalog = InMemoryCatalog::new();
    for (line, row) in read_rows::<CatalogRow>(path)? {
        let id = parse_id(path, line, &row.identifier)?;
        let sector = non_empty(row.sector).unwrap_or_else(|| UNKNOWN_SECTOR.to_string());
        catalog.insert(Security::new(id, non_empty(row.ticker), row.name).with_sector(sector));
    }
    Ok(catalog)
}

pub fn load_prices(path: &Path) -> Result<PriceTable, LoadError> {
    let mut table = PriceTable::new();
    for (line, row) in read_rows::<PriceRow>(path)? {
        if !(row.price.is_finite() && row.price > 0.0) {
            return Err(LoadError::InvalidRow {
                path: path.to_path_buf(),
                line,
                reason: format!("price must be positive, got {}", row.price),
            });
        }
        table.insert(parse_id(path, line, &row.identifier)?, row.price);
    }
    Ok(table)
}

pub fn load_shares_outstanding(path: &Path) -> Result<SharesOutstandingTable, LoadError> {
    let mut table = SharesOutstandingTable::new();
    for (line, row) in read_rows::<SharesRow>(path)? {
        table.insert(parse_id(path, line, &row.identifier)?, row.shares_outstanding);
    }
    Ok(table)
}

/// Add curated `key → category` entries to the classifier's registry stage.
pub fn load_registry(path: &Path, classifier: &mut Classifier) -> Result<usize, LoadError> {
    let rows = read_rows::<RegistryRow>(path)?;
    for (_, row) in &rows {
        classifier.register(&row.key, &row.category);
    }
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use holdlab_core::{PriceProvider, SecurityCatalog, SharesOutstandingProvider};
    use std::io::Write;

    fn csv_file(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    #[test]
    fn catalog_with_optional_columns() {
        let f = csv_file(
            "identifier,ticker,name,sector\n\
             037833100, AAPL ,APPLE INC,Technology\n\
             G0176J109,,ALLEGION PLC,\n",
        );
        let catalog = load_catalog(f.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        let apple = catalog.by_ticker("aapl").unwrap();
        assert_eq!(apple.sector, "Technology");
        let allegion = catalog.by_identifier(&SecurityId::new("g0176j109")).unwrap();
        assert_eq!(allegion.ticker, None);
        assert!(!allegion.has_known_sector());
    }

    #[test]
    fn price_and_shares_tables() {
        let prices = load_prices(csv_file("identifier,price\nX,12.5\n").path()).unwrap();
        let shares = load_shares_outstanding(
            csv_file("identifier,shares_outstanding\nX,1000000\n").path(),
        )
        .unwrap();
        let x = Security::new(SecurityId::new("X"), None, "X CORP");
        assert_eq!(prices.last_price(&x), Some(12.5));
        let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        assert_eq!(shares.shares_outstanding(&x, date), Some(1_000_000));
    }

    #[test]
    fn bad_rows_report_line() {
        let err = load_prices(csv_file("identifier,price\nX,1.0\nY,-3\n").path()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidRow { line: 3, .. }));

        let err = load_shares_outstanding(csv_file("identifier,shares_outstanding\nX,lots\n").path())
            .unwrap_err();
        assert!(matches!(err, LoadError::Csv { .. }));
    }

    #[test]
    fn registry_feeds_classifier() {
        let mut classifier = Classifier::sectors();
        let n = load_registry(csv_file("key,category\nZYX,Industrials\n").path(), &mut classifier)
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(classifier.classify("ZYX HOLDINGS", Some("zyx")).category, "Industrials");
    }
}
