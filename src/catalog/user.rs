use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::price::{bind_price_row, PriceCatalog, PRICE_COLUMNS};
use super::property::{bind_property_row, PropertyCatalog, PROPERTY_COLUMNS};
use super::bind_rows;
use crate::error::CatalogError;

/// A catalog uploaded and edited by a user: a header naming the columns and
/// one string map per row key. `header[0]` names the key column; the
/// following entries name the value columns in catalog file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserCatalog {
    pub header: Vec<String>,
    pub data: BTreeMap<String, BTreeMap<String, String>>,
}

impl UserCatalog {
    /// Flattens the table into catalog rows, key first.
    fn rows(&self, value_columns: usize) -> Result<Vec<Vec<String>>, CatalogError> {
        if self.header.len() < value_columns + 1 {
            return Err(CatalogError::ShortHeader {
                expected: value_columns + 1,
                found: self.header.len(),
            });
        }

        self.data
            .iter()
            .filter(|(key, _)| !key.trim().is_empty())
            .map(|(key, values)| {
                let mut row = vec![key.trim().to_string()];
                for column in &self.header[1..=value_columns] {
                    let value = values.get(column).ok_or_else(|| CatalogError::MissingColumn {
                        key: key.clone(),
                        column: column.clone(),
                    })?;
                    row.push(value.trim().to_string());
                }
                Ok(row)
            })
            .collect()
    }
}

/// Property catalog from a user table with the passport column layout.
pub fn load_user_catalog(table: &UserCatalog) -> Result<PropertyCatalog, CatalogError> {
    bind_rows(table.rows(PROPERTY_COLUMNS.len())?, bind_property_row)
}

/// Price catalog from a user table with the price column layout.
pub fn load_user_price_catalog(table: &UserCatalog) -> Result<PriceCatalog, CatalogError> {
    bind_rows(table.rows(PRICE_COLUMNS.len())?, bind_price_row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(json: &str) -> UserCatalog {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn reads_columns_by_header_name() {
        let table = table(
            r#"{
                "header": ["Material", "Dichte", "Abfall", "Recycling", "GWP", "AP", "PENRT"],
                "data": {
                    "Stahl": {"PENRT": "19.8", "Dichte": "7850", "Abfall": "0,05",
                              "Recycling": "0.9", "GWP": "1.55", "AP": "0.0061"}
                }
            }"#,
        );
        let catalog = load_user_catalog(&table).unwrap();
        let stahl = catalog["Stahl"];
        assert_eq!(stahl.density, 7850.0);
        assert_eq!(stahl.waste_grade, 0.05);
        assert_eq!(stahl.penrt, 19.8);
    }

    #[test]
    fn missing_cell_names_the_column() {
        let table = table(
            r#"{"header": ["k", "a", "b", "c", "d", "e", "f"], "data": {"Stahl": {"a": "1"}}}"#,
        );
        let err = load_user_catalog(&table).unwrap_err();
        assert!(matches!(err, CatalogError::MissingColumn { ref column, .. } if column == "b"));
    }

    #[test]
    fn short_header_is_an_error() {
        let table = table(r#"{"header": ["k", "density"], "data": {}}"#);
        assert!(matches!(
            load_user_catalog(&table),
            Err(CatalogError::ShortHeader { expected: 7, found: 2 })
        ));
    }

    #[test]
    fn price_layout_from_user_table() {
        let table = table(
            r#"{"header": ["k", "unit", "basis", "g", "lb", "ln"],
                "data": {"Parkett": {"unit": "€/m2", "basis": "m2", "g": "95", "lb": "", "ln": "74.2"}}}"#,
        );
        let catalog = load_user_price_catalog(&table).unwrap();
        assert_eq!(catalog["Parkett"].local_brutto, 0.0);
        assert_eq!(catalog["Parkett"].local_netto, 74.2);
    }
}
