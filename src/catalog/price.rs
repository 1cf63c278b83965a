use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Serialize;

use super::{bind_rows, open_catalog, parse_number, read_rows};
use crate::error::CatalogError;

const BUNDLED: &str = include_str!("../../data/prices.csv");

/// Column names in file order after the key column.
pub const PRICE_COLUMNS: [&str; 5] = [
    "unit",
    "basis",
    "global_brutto",
    "local_brutto",
    "local_netto",
];

/// Which element quantity a unit price is multiplied by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MeasureBasis {
    Area,
    Mass,
    Length,
    Volume,
}

impl MeasureBasis {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "m2" | "m²" | "area" => Some(MeasureBasis::Area),
            "kg" | "mass" => Some(MeasureBasis::Mass),
            "m" | "length" => Some(MeasureBasis::Length),
            "m3" | "m³" | "volume" => Some(MeasureBasis::Volume),
            _ => None,
        }
    }
}

/// Unit prices for one canonical material. Missing tiers are zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceEntry {
    pub unit: String,
    pub basis: MeasureBasis,
    pub global_brutto: f64,
    pub local_brutto: f64,
    pub local_netto: f64,
}

pub type PriceCatalog = HashMap<String, PriceEntry>;

pub fn load_price_catalog<P: AsRef<Path>>(path: P) -> Result<PriceCatalog, CatalogError> {
    parse_price_catalog(open_catalog(path.as_ref())?)
}

pub fn parse_price_catalog<R: Read>(reader: R) -> Result<PriceCatalog, CatalogError> {
    bind_rows(read_rows(reader)?, bind_price_row)
}

pub fn bundled_price_catalog() -> Result<PriceCatalog, CatalogError> {
    parse_price_catalog(BUNDLED.as_bytes())
}

pub(crate) fn bind_price_row(row: &[String]) -> Result<PriceEntry, CatalogError> {
    let key = &row[0];
    // Key, unit and basis are required; price tiers may be left off.
    if row.len() < 3 {
        return Err(CatalogError::ShortRow {
            key: key.clone(),
            expected: 3,
            found: row.len(),
        });
    }

    let basis = MeasureBasis::parse(&row[2]).ok_or_else(|| CatalogError::InvalidBasis {
        key: key.clone(),
        value: row[2].clone(),
    })?;

    let tier = |i: usize| -> Result<f64, CatalogError> {
        match row.get(i + 1).map(String::as_str) {
            None | Some("") => Ok(0.0),
            Some(value) => parse_number(key, PRICE_COLUMNS[i], value),
        }
    };

    Ok(PriceEntry {
        unit: row[1].clone(),
        basis,
        global_brutto: tier(2)?,
        local_brutto: tier(3)?,
        local_netto: tier(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_unit_basis_and_tiers() {
        let text = "name;unit;basis;g;lb;ln\n'Stahl';'€/kg';'kg';2.9;2.7;2.25\n";
        let catalog = parse_price_catalog(text.as_bytes()).unwrap();
        let stahl = &catalog["Stahl"];
        assert_eq!(stahl.unit, "€/kg");
        assert_eq!(stahl.basis, MeasureBasis::Mass);
        assert_eq!(stahl.global_brutto, 2.9);
        assert_eq!(stahl.local_brutto, 2.7);
        assert_eq!(stahl.local_netto, 2.25);
    }

    #[test]
    fn missing_tiers_are_zero() {
        let text = "h\n'Folie';'€/m2';'area';4.2\n";
        let folie = &parse_price_catalog(text.as_bytes()).unwrap()["Folie"];
        assert_eq!(folie.global_brutto, 4.2);
        assert_eq!(folie.local_brutto, 0.0);
        assert_eq!(folie.local_netto, 0.0);
    }

    #[test]
    fn unknown_basis_is_an_error() {
        let text = "h\n'Stahl';'€/Stk';'piece';1\n";
        let err = parse_price_catalog(text.as_bytes()).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidBasis { .. }));
    }

    #[test]
    fn basis_aliases() {
        assert_eq!(MeasureBasis::parse("M3"), Some(MeasureBasis::Volume));
        assert_eq!(MeasureBasis::parse("length"), Some(MeasureBasis::Length));
        assert_eq!(MeasureBasis::parse("m²"), Some(MeasureBasis::Area));
        assert_eq!(MeasureBasis::parse("stk"), None);
    }
}
