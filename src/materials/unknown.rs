use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

/// Names that fell out of the lookup pipeline during one walk.
#[derive(Debug, Default)]
pub struct UnknownNames {
    translation: Mutex<BTreeSet<String>>,
    passport: Mutex<BTreeSet<String>>,
    price: Mutex<BTreeSet<String>>,
}

/// Sorted snapshot of [`UnknownNames`] for operator review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnknownNameReport {
    /// Raw names with no translation entry.
    pub translation: BTreeSet<String>,
    /// Canonical names missing from the property catalog.
    pub passport: BTreeSet<String>,
    /// Canonical names missing from the price catalog.
    pub price: BTreeSet<String>,
}

impl UnknownNameReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.translation.is_empty() && self.passport.is_empty() && self.price.is_empty()
    }
}

fn insert(set: &Mutex<BTreeSet<String>>, name: &str) {
    let mut set = set.lock().unwrap_or_else(PoisonError::into_inner);
    if !set.contains(name) {
        set.insert(name.to_string());
    }
}

impl UnknownNames {
    pub fn record_translation(&self, raw_name: &str) {
        insert(&self.translation, raw_name);
    }

    pub fn record_passport(&self, name: &str) {
        insert(&self.passport, name);
    }

    pub fn record_price(&self, name: &str) {
        insert(&self.price, name);
    }

    #[must_use]
    pub fn into_report(self) -> UnknownNameReport {
        let take = |set: Mutex<BTreeSet<String>>| set.into_inner().unwrap_or_else(PoisonError::into_inner);
        UnknownNameReport {
            translation: take(self.translation),
            passport: take(self.passport),
            price: take(self.price),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sets_are_kept_apart_and_deduplicated() {
        let unknown = UnknownNames::default();
        unknown.record_translation("Beton");
        unknown.record_translation("Beton");
        unknown.record_passport("Lehm");
        let report = unknown.into_report();
        assert_eq!(report.translation, BTreeSet::from(["Beton".to_string()]));
        assert_eq!(report.passport, BTreeSet::from(["Lehm".to_string()]));
        assert!(report.price.is_empty());
        assert!(!report.is_empty());
    }

    #[test]
    fn concurrent_inserts_are_all_kept() {
        let unknown = UnknownNames::default();
        std::thread::scope(|s| {
            for t in 0..4 {
                let unknown = &unknown;
                s.spawn(move || {
                    for i in 0..50 {
                        unknown.record_price(&format!("m{}", (t * 50 + i) % 120));
                    }
                });
            }
        });
        assert_eq!(unknown.into_report().price.len(), 120);
    }
}
