use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::catalog::{open_catalog, read_rows};
use crate::error::CatalogError;

const BUNDLED: &str = include_str!("../../data/translation.csv");

/// Where the translation table of a walk comes from.
#[derive(Debug, Clone, Default)]
pub enum TranslationSource {
    #[default]
    Bundled,
    File(PathBuf),
    Table(TranslationTable),
}

impl TranslationSource {
    pub fn load(&self) -> Result<TranslationTable, CatalogError> {
        match self {
            TranslationSource::Bundled => TranslationTable::bundled(),
            TranslationSource::File(path) => TranslationTable::load(path),
            TranslationSource::Table(table) => Ok(table.clone()),
        }
    }
}

/// Maps raw IFC material names to canonical catalog keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationTable {
    names: HashMap<String, String>,
}

impl TranslationTable {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            names: pairs
                .into_iter()
                .map(|(raw, canonical)| (raw.into().trim().to_string(), canonical.into()))
                .collect(),
        }
    }

    /// The table compiled into the crate.
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::parse(BUNDLED.as_bytes())
    }

    /// Reads `raw_name;canonical_name` rows in the catalog dialect.
    pub fn parse<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let rows = read_rows(reader)?;
        let mut pairs = Vec::with_capacity(rows.len());
        for row in rows {
            let [raw, canonical, ..] = row.as_slice() else {
                return Err(CatalogError::ShortRow {
                    key: row[0].clone(),
                    expected: 2,
                    found: row.len(),
                });
            };
            pairs.push((raw.clone(), canonical.clone()));
        }
        Ok(Self::from_pairs(pairs))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        Self::parse(open_catalog(path.as_ref())?)
    }

    #[must_use]
    pub fn translate(&self, raw_name: &str) -> Option<&str> {
        self.names.get(raw_name.trim()).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::bundled_property_catalog;

    #[test]
    fn bundled_variants_share_a_key() {
        let table = TranslationTable::bundled().unwrap();
        assert_eq!(table.translate("Beton, Stahlbeton Wand"), Some("Stahlbeton"));
        assert_eq!(table.translate("  Beton, Stahlbeton Decke "), Some("Stahlbeton"));
        assert_eq!(table.translate("Metall,Blech Grau"), Some("Metall Blech Grau"));
        assert_eq!(table.translate("Beton"), None);
    }

    #[test]
    fn bundled_translations_point_into_the_catalog() {
        let table = TranslationTable::bundled().unwrap();
        let catalog = bundled_property_catalog().unwrap();
        for canonical in table.names.values() {
            assert!(catalog.contains_key(canonical), "{canonical} not in catalog");
        }
    }

    #[test]
    fn short_rows_are_rejected() {
        let err = TranslationTable::parse("raw;canonical\n'Holz'\n".as_bytes()).unwrap_err();
        assert!(matches!(err, CatalogError::ShortRow { expected: 2, found: 1, .. }));
    }
}
