//! Per-material mass, environmental and price totals.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::trace;

use super::resolver::resolve_material_names;
use super::translation::TranslationTable;
use super::unknown::{UnknownNameReport, UnknownNames};
use crate::catalog::{MeasureBasis, PriceCatalog, PriceEntry, PropertyCatalog, PropertyEntry};
use crate::error::MaterialResolutionError;
use crate::geometry::Quantities;
use crate::model::{Element, IfcProject};

/// Accumulated totals for one canonical material.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MaterialProperties {
    /// m³
    pub volume: f64,
    /// m²
    pub area: f64,
    /// m
    pub length: f64,
    /// kg
    pub mass: f64,
    pub waste_mass: f64,
    pub recyclable_mass: f64,
    pub penrt_ml: f64,
    pub gwp_ml: f64,
    pub ap_ml: f64,
    pub global_brutto_price: f64,
    pub local_brutto_price: f64,
    pub local_netto_price: f64,
}

impl MaterialProperties {
    /// Quantities of one material slot of an element.
    #[must_use]
    pub fn contribution(
        quantities: &Quantities,
        share: f64,
        properties: &PropertyEntry,
        price: Option<&PriceEntry>,
    ) -> Self {
        let volume = quantities.volume * share;
        let area = quantities.footprint_area * share;
        let length = quantities.max_extent;
        let mass = properties.density * volume;

        let mut contribution = Self {
            volume,
            area,
            length,
            mass,
            waste_mass: mass * properties.waste_grade,
            recyclable_mass: mass * properties.recyclable_grade,
            penrt_ml: mass * properties.penrt,
            gwp_ml: mass * properties.gwp,
            ap_ml: mass * properties.ap,
            ..Self::default()
        };

        if let Some(price) = price {
            let multiplier = match price.basis {
                MeasureBasis::Area => area,
                MeasureBasis::Mass => mass,
                MeasureBasis::Length => length,
                MeasureBasis::Volume => volume,
            };
            contribution.global_brutto_price = multiplier * price.global_brutto;
            contribution.local_brutto_price = multiplier * price.local_brutto;
            contribution.local_netto_price = multiplier * price.local_netto;
        }

        contribution
    }

    pub fn merge(&mut self, other: &Self) {
        self.volume += other.volume;
        self.area += other.area;
        self.length += other.length;
        self.mass += other.mass;
        self.waste_mass += other.waste_mass;
        self.recyclable_mass += other.recyclable_mass;
        self.penrt_ml += other.penrt_ml;
        self.gwp_ml += other.gwp_ml;
        self.ap_ml += other.ap_ml;
        self.global_brutto_price += other.global_brutto_price;
        self.local_brutto_price += other.local_brutto_price;
        self.local_netto_price += other.local_netto_price;
    }
}

/// How a multi-material element's quantities are split over its slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
pub enum LayerMeasurePolicy {
    /// Every slot is charged the whole element's volume and area.
    #[value(name = "whole")]
    WholeElement,
    /// Slots are charged their layer thickness share or constituent fraction.
    #[default]
    Apportioned,
}

impl LayerMeasurePolicy {
    fn share(self, share: Option<f64>) -> f64 {
        match self {
            LayerMeasurePolicy::WholeElement => 1.0,
            LayerMeasurePolicy::Apportioned => share.unwrap_or(1.0),
        }
    }
}

/// Shared material ledger of one walk.
#[derive(Debug)]
pub struct MaterialAccumulator<'c> {
    properties: &'c PropertyCatalog,
    prices: Option<&'c PriceCatalog>,
    translation: &'c TranslationTable,
    policy: LayerMeasurePolicy,
    ledger: Mutex<HashMap<String, MaterialProperties>>,
    unknown: UnknownNames,
}

impl<'c> MaterialAccumulator<'c> {
    /// Pricing is enabled when a price catalog is given.
    #[must_use]
    pub fn new(
        properties: &'c PropertyCatalog,
        prices: Option<&'c PriceCatalog>,
        translation: &'c TranslationTable,
        policy: LayerMeasurePolicy,
    ) -> Self {
        Self {
            properties,
            prices,
            translation,
            policy,
            ledger: Mutex::new(HashMap::new()),
            unknown: UnknownNames::default(),
        }
    }

    #[must_use]
    pub fn is_priced(&self) -> bool {
        self.prices.is_some()
    }

    /// Adds one element's material contributions and returns how many slots
    /// contributed. On error nothing of the element is applied.
    pub fn accumulate(
        &self,
        project: &IfcProject,
        element: &Element<'_>,
        quantities: &Quantities,
    ) -> Result<usize, MaterialResolutionError> {
        if element.class.skips_materials(self.is_priced()) {
            return Ok(0);
        }

        let mut contributions: Vec<(&str, MaterialProperties)> = Vec::new();
        for name in resolve_material_names(project, element.id()) {
            let name = name?;

            let Some(canonical) = self.translation.translate(name.raw_name) else {
                self.unknown.record_translation(name.raw_name.trim());
                continue;
            };
            let Some(properties) = self.properties.get(canonical) else {
                self.unknown.record_passport(canonical);
                continue;
            };
            let price = match self.prices {
                Some(prices) => match prices.get(canonical) {
                    Some(price) => Some(price),
                    None => {
                        self.unknown.record_price(canonical);
                        continue;
                    }
                },
                None => None,
            };

            let share = self.policy.share(name.share);
            contributions.push((
                canonical,
                MaterialProperties::contribution(quantities, share, properties, price),
            ));
        }

        if contributions.is_empty() {
            return Ok(0);
        }

        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        for (canonical, contribution) in &contributions {
            ledger
                .entry((*canonical).to_string())
                .or_default()
                .merge(contribution);
        }
        drop(ledger);

        trace!(element = element.id(), slots = contributions.len(), "Accumulated materials");
        Ok(contributions.len())
    }

    /// Sorted material totals and the unknown names seen.
    #[must_use]
    pub fn finish(self) -> (BTreeMap<String, MaterialProperties>, UnknownNameReport) {
        let ledger = self
            .ledger
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        (ledger.into_iter().collect(), self.unknown.into_report())
    }
}
