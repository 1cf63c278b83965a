//! Material and price catalogs keyed by canonical material name.
//!
//! Both catalogs are `;`-delimited text with `'` quoting and a header line.
//! They are read once per walk and never cached across walks.

pub mod price;
pub mod property;
pub mod user;

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::CatalogError;

pub use price::{
    bundled_price_catalog, load_price_catalog, parse_price_catalog, MeasureBasis, PriceCatalog,
    PriceEntry,
};
pub use property::{
    bundled_property_catalog, load_property_catalog, parse_property_catalog, PropertyCatalog,
    PropertyEntry,
};
pub use user::{load_user_catalog, load_user_price_catalog, UserCatalog};

/// Where a catalog comes from for one walk.
#[derive(Debug, Clone, Default)]
pub enum CatalogSource {
    /// The catalog compiled into the crate.
    #[default]
    Bundled,
    /// A delimited text file on disk.
    File(PathBuf),
    /// A user-uploaded, already parsed table.
    User(UserCatalog),
}

impl CatalogSource {
    pub fn load_properties(&self) -> Result<PropertyCatalog, CatalogError> {
        match self {
            CatalogSource::Bundled => bundled_property_catalog(),
            CatalogSource::File(path) => load_property_catalog(path),
            CatalogSource::User(table) => load_user_catalog(table),
        }
    }

    pub fn load_prices(&self) -> Result<PriceCatalog, CatalogError> {
        match self {
            CatalogSource::Bundled => bundled_price_catalog(),
            CatalogSource::File(path) => load_price_catalog(path),
            CatalogSource::User(table) => load_user_price_catalog(table),
        }
    }
}

/// Reads every data row of a catalog, skipping rows with an empty key.
pub(crate) fn read_rows<R: Read>(reader: R) -> Result<Vec<Vec<String>>, CatalogError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .quote(b'\'')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let row: Vec<String> = record.iter().map(str::to_string).collect();
        if row.first().is_some_and(|key| !key.is_empty()) {
            rows.push(row);
        }
    }

    Ok(rows)
}

pub(crate) fn open_catalog(path: &Path) -> Result<File, CatalogError> {
    File::open(path).map_err(|source| CatalogError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses a numeric cell, accepting a decimal comma. When both separators
/// occur the later one is the decimal mark and the other groups thousands.
pub(crate) fn parse_number(key: &str, column: &'static str, value: &str) -> Result<f64, CatalogError> {
    let normalized = match (value.rfind('.'), value.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => value.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => value.replace(',', ""),
        (None, Some(_)) => value.replace(',', "."),
        _ => value.to_string(),
    };
    normalized
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CatalogError::InvalidNumber {
            key: key.to_string(),
            column,
            value: value.to_string(),
        })
}

/// Binds rows into a keyed map; later rows with the same key win.
pub(crate) fn bind_rows<T>(
    rows: Vec<Vec<String>>,
    bind: impl Fn(&[String]) -> Result<T, CatalogError>,
) -> Result<HashMap<String, T>, CatalogError> {
    rows.into_iter()
        .map(|row| bind(&row).map(|entry| (row[0].clone(), entry)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_accept_decimal_comma() {
        assert_eq!(parse_number("k", "density", "12,5").unwrap(), 12.5);
        assert_eq!(parse_number("k", "density", " 2400 ").unwrap(), 2400.0);
        assert_eq!(parse_number("k", "density", "1.234,5").unwrap(), 1234.5);
        assert_eq!(parse_number("k", "density", "1,234.5").unwrap(), 1234.5);
        assert_eq!(parse_number("k", "density", "2.400,00").unwrap(), 2400.0);
    }

    #[test]
    fn numbers_reject_text_and_infinity() {
        assert!(parse_number("k", "density", "heavy").is_err());
        assert!(parse_number("k", "density", "inf").is_err());
        assert!(parse_number("k", "density", "").is_err());
    }

    #[test]
    fn rows_skip_header_and_blank_keys() {
        let text = "name;density\n'Stahl';7850\n;1\n'Holz; weich';450\n";
        let rows = read_rows(text.as_bytes()).unwrap();
        assert_eq!(
            rows,
            vec![
                vec!["Stahl".to_string(), "7850".to_string()],
                vec!["Holz; weich".to_string(), "450".to_string()],
            ]
        );
    }

    #[test]
    fn bundled_catalogs_agree_on_keys() {
        let properties = CatalogSource::Bundled.load_properties().unwrap();
        let prices = CatalogSource::Bundled.load_prices().unwrap();
        assert!(!properties.is_empty());
        for key in properties.keys() {
            assert!(prices.contains_key(key), "no price for {key}");
        }
    }
}
