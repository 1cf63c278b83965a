//! Building-level area and volume metrics after ÖNORM B 1800.
//!
//! The model is a practical approximation: gross quantities are sums of
//! element quantities, with no deduction of overlaps or openings.

pub mod spatial;

use serde::Serialize;

use crate::error::DivisionUndefined;

pub use spatial::{Phase, SpatialAccumulator, SpatialContribution};

/// Rating assigned when no energy simulation is attached.
pub const UNKNOWN_ENERGY_RATING: &str = "Unknown";

/// Building metrics of one walk. Areas in m², volumes in m³.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingMetrics {
    /// Gross volume (BRI).
    pub brutto_rauminhalt: f64,
    /// Gross floor area (BGF).
    pub brutto_grundflaeche: f64,
    /// Built footprint (BF): ground-floor slabs.
    pub bebaute_flaeche: f64,
    /// Unbuilt plot area (UF). Needs a site boundary, always 0.
    pub unbebaute_flaeche: f64,
    /// Net room area (NRF): spaces.
    pub netto_raumflaeche: f64,
    /// Construction area (KGF): everything but slabs and spaces.
    pub konstruktions_grundflaeche: f64,
    /// Facade area. Needs facade classification, always 0.
    pub fassadenflaeche: f64,
    pub stockwerke: usize,
    /// Plot area from the site's property set.
    pub grundstuecksflaeche: f64,
    /// BGF / BF, 0 when BF is 0.
    pub bgf_bf_ratio: f64,
    /// BRI / BGF, 0 when BGF is 0.
    pub bri_bgf_ratio: f64,
    pub energie_bewertung: String,
}

impl Default for BuildingMetrics {
    fn default() -> Self {
        Self {
            brutto_rauminhalt: 0.0,
            brutto_grundflaeche: 0.0,
            bebaute_flaeche: 0.0,
            unbebaute_flaeche: 0.0,
            netto_raumflaeche: 0.0,
            konstruktions_grundflaeche: 0.0,
            fassadenflaeche: 0.0,
            stockwerke: 0,
            grundstuecksflaeche: 0.0,
            bgf_bf_ratio: 0.0,
            bri_bgf_ratio: 0.0,
            energie_bewertung: UNKNOWN_ENERGY_RATING.to_string(),
        }
    }
}

impl BuildingMetrics {
    pub(crate) fn apply(&mut self, contribution: &SpatialContribution) {
        self.brutto_rauminhalt += contribution.gross_volume;
        self.brutto_grundflaeche += contribution.gross_floor_area;
        self.bebaute_flaeche += contribution.built_footprint_area;
        self.netto_raumflaeche += contribution.net_room_area;
        self.konstruktions_grundflaeche += contribution.construction_area;
    }
}

/// `numerator / denominator`, undefined for a zero denominator.
pub fn ratio(
    numerator: f64,
    denominator: f64,
    names: (&'static str, &'static str),
) -> Result<f64, DivisionUndefined> {
    if denominator == 0.0 {
        return Err(DivisionUndefined {
            numerator: names.0,
            denominator: names.1,
        });
    }
    Ok(numerator / denominator)
}
