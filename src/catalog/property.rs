use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Serialize;

use super::{bind_rows, open_catalog, parse_number, read_rows};
use crate::error::CatalogError;

const BUNDLED: &str = include_str!("../../data/passport.csv");

/// Column names in file order after the key column.
pub const PROPERTY_COLUMNS: [&str; 6] = [
    "density",
    "waste_grade",
    "recyclable_grade",
    "gwp",
    "ap",
    "penrt",
];

/// Material passport values for one canonical material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PropertyEntry {
    /// kg/m³
    pub density: f64,
    /// Fraction of mass ending up as waste, independent of `recyclable_grade`.
    pub waste_grade: f64,
    pub recyclable_grade: f64,
    /// Global warming potential per kg.
    pub gwp: f64,
    /// Acidification potential per kg.
    pub ap: f64,
    /// Non-renewable primary energy per kg.
    pub penrt: f64,
}

pub type PropertyCatalog = HashMap<String, PropertyEntry>;

pub fn load_property_catalog<P: AsRef<Path>>(path: P) -> Result<PropertyCatalog, CatalogError> {
    parse_property_catalog(open_catalog(path.as_ref())?)
}

pub fn parse_property_catalog<R: Read>(reader: R) -> Result<PropertyCatalog, CatalogError> {
    bind_rows(read_rows(reader)?, bind_property_row)
}

pub fn bundled_property_catalog() -> Result<PropertyCatalog, CatalogError> {
    parse_property_catalog(BUNDLED.as_bytes())
}

pub(crate) fn bind_property_row(row: &[String]) -> Result<PropertyEntry, CatalogError> {
    let key = &row[0];
    if row.len() < PROPERTY_COLUMNS.len() + 1 {
        return Err(CatalogError::ShortRow {
            key: key.clone(),
            expected: PROPERTY_COLUMNS.len() + 1,
            found: row.len(),
        });
    }

    let column = |i: usize| parse_number(key, PROPERTY_COLUMNS[i], &row[i + 1]);

    Ok(PropertyEntry {
        density: column(0)?,
        waste_grade: column(1)?,
        recyclable_grade: column(2)?,
        gwp: column(3)?,
        ap: column(4)?,
        penrt: column(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn binds_fixed_columns() {
        let text = "name;density;waste;recycle;gwp;ap;penrt\n'Stahlbeton';2400;0.05;0.85;0.17;0.0004;1.1\n";
        let catalog = parse_property_catalog(text.as_bytes()).unwrap();
        assert_eq!(
            catalog["Stahlbeton"],
            PropertyEntry {
                density: 2400.0,
                waste_grade: 0.05,
                recyclable_grade: 0.85,
                gwp: 0.17,
                ap: 0.0004,
                penrt: 1.1,
            }
        );
    }

    #[test]
    fn short_row_is_an_error() {
        let text = "name;density\n'Stahl';7850;0.1\n";
        let err = parse_property_catalog(text.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::ShortRow { found: 3, expected: 7, .. }
        ));
    }

    #[test]
    fn non_numeric_cell_is_an_error() {
        let text = "h\n'Stahl';7850;0.1;0.9;x;0;0\n";
        let err = parse_property_catalog(text.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::InvalidNumber { column: "gwp", .. }
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_property_catalog("/nonexistent/passport.csv").unwrap_err();
        assert!(matches!(err, CatalogError::FileRead { .. }));
    }

    #[test]
    fn bundled_catalog_has_non_negative_values() {
        let catalog = bundled_property_catalog().unwrap();
        assert!(catalog.contains_key("Stahlbeton"));
        for entry in catalog.values() {
            assert!(entry.density > 0.0);
            assert!((0.0..=1.0).contains(&entry.waste_grade));
            assert!((0.0..=1.0).contains(&entry.recyclable_grade));
            assert!(entry.gwp >= 0.0 && entry.ap >= 0.0 && entry.penrt >= 0.0);
        }
    }
}
