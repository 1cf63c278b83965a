use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use tracing::warn;

use super::{ratio, BuildingMetrics};
use crate::error::AccumulatorStateError;
use crate::geometry::Quantities;
use crate::model::ElementClass;

/// Lifecycle of a [`SpatialAccumulator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    Accumulating,
    Finalized,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::NotStarted => "not started",
            Phase::Accumulating => "accumulating",
            Phase::Finalized => "finalized",
        }
    }
}

/// What one element adds to the building metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpatialContribution {
    pub gross_volume: f64,
    pub gross_floor_area: f64,
    pub built_footprint_area: f64,
    pub net_room_area: f64,
    pub construction_area: f64,
}

impl SpatialContribution {
    /// Classification rules for an element with valid geometry:
    ///
    /// 1. gross volume takes every element's volume;
    /// 2. gross floor area takes the footprint of everything but slabs;
    /// 3. built footprint takes ground-floor slabs;
    /// 4. net room area takes spaces;
    /// 5. construction area takes everything but slabs and spaces.
    ///
    /// Rules 2 and 5 both fire for walls, columns and the like.
    #[must_use]
    pub fn classify(class: ElementClass, on_ground_floor: bool, quantities: &Quantities) -> Self {
        let area = quantities.footprint_area;
        let mut contribution = Self {
            gross_volume: quantities.volume,
            ..Self::default()
        };

        if !class.is_slab() {
            contribution.gross_floor_area = area;
        }
        if on_ground_floor && class.is_slab() {
            contribution.built_footprint_area = area;
        }
        if class.is_space() {
            contribution.net_room_area = area;
        } else if !class.is_slab() {
            contribution.construction_area = area;
        }

        contribution
    }
}

#[derive(Debug)]
struct State {
    phase: Phase,
    metrics: BuildingMetrics,
}

/// Accumulates [`BuildingMetrics`] from concurrently walked elements.
#[derive(Debug)]
pub struct SpatialAccumulator {
    ground_floor: HashSet<u64>,
    state: Mutex<State>,
}

impl SpatialAccumulator {
    /// `ground_floor` holds the ids of the ground-floor decomposition.
    #[must_use]
    pub fn new(ground_floor: HashSet<u64>) -> Self {
        Self {
            ground_floor,
            state: Mutex::new(State {
                phase: Phase::NotStarted,
                metrics: BuildingMetrics::default(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    #[must_use]
    pub fn is_on_ground_floor(&self, element_id: u64) -> bool {
        self.ground_floor.contains(&element_id)
    }

    pub fn start(&self) -> Result<(), AccumulatorStateError> {
        let mut state = self.lock();
        if state.phase != Phase::NotStarted {
            return Err(AccumulatorStateError {
                state: state.phase.name(),
            });
        }
        state.phase = Phase::Accumulating;
        Ok(())
    }

    /// Applies one element's contribution as a single update.
    pub fn add(
        &self,
        element_id: u64,
        class: ElementClass,
        quantities: &Quantities,
    ) -> Result<SpatialContribution, AccumulatorStateError> {
        let contribution =
            SpatialContribution::classify(class, self.is_on_ground_floor(element_id), quantities);

        let mut state = self.lock();
        if state.phase != Phase::Accumulating {
            return Err(AccumulatorStateError {
                state: state.phase.name(),
            });
        }
        state.metrics.apply(&contribution);
        Ok(contribution)
    }

    /// Sets the storey count and plot area, computes the ratios and closes
    /// the accumulator. Undefined ratios are reported as 0.
    pub fn finalize(
        &self,
        storeys: usize,
        plot_area: f64,
    ) -> Result<BuildingMetrics, AccumulatorStateError> {
        let mut state = self.lock();
        if state.phase != Phase::Accumulating {
            return Err(AccumulatorStateError {
                state: state.phase.name(),
            });
        }
        state.phase = Phase::Finalized;

        let metrics = &mut state.metrics;
        metrics.stockwerke = storeys;
        metrics.grundstuecksflaeche = plot_area;
        metrics.bgf_bf_ratio = ratio(
            metrics.brutto_grundflaeche,
            metrics.bebaute_flaeche,
            ("BGF", "BF"),
        )
        .unwrap_or_else(|e| {
            warn!("{e}, reporting 0");
            0.0
        });
        metrics.bri_bgf_ratio = ratio(
            metrics.brutto_rauminhalt,
            metrics.brutto_grundflaeche,
            ("BRI", "BGF"),
        )
        .unwrap_or_else(|e| {
            warn!("{e}, reporting 0");
            0.0
        });

        Ok(metrics.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const Q: Quantities = Quantities {
        volume: 3.0,
        footprint_area: 10.0,
        max_extent: 5.0,
    };

    #[test]
    fn classification_table() {
        // (class, ground floor, gross floor, built footprint, net room, construction)
        let table = [
            (ElementClass::Wall, false, 10.0, 0.0, 0.0, 10.0),
            (ElementClass::Wall, true, 10.0, 0.0, 0.0, 10.0),
            (ElementClass::Slab, false, 0.0, 0.0, 0.0, 0.0),
            (ElementClass::Slab, true, 0.0, 10.0, 0.0, 0.0),
            (ElementClass::Space, false, 10.0, 0.0, 10.0, 0.0),
            (ElementClass::Space, true, 10.0, 0.0, 10.0, 0.0),
            (ElementClass::Door, true, 10.0, 0.0, 0.0, 10.0),
            (ElementClass::Opening, false, 10.0, 0.0, 0.0, 10.0),
            (ElementClass::Column, true, 10.0, 0.0, 0.0, 10.0),
        ];

        for (class, ground, gross_floor, built, net_room, construction) in table {
            let c = SpatialContribution::classify(class, ground, &Q);
            assert_eq!(
                c,
                SpatialContribution {
                    gross_volume: 3.0,
                    gross_floor_area: gross_floor,
                    built_footprint_area: built,
                    net_room_area: net_room,
                    construction_area: construction,
                },
                "{class:?} on ground floor: {ground}"
            );
        }
    }

    #[test]
    fn lifecycle_is_enforced() {
        let acc = SpatialAccumulator::new(HashSet::new());
        assert_eq!(acc.phase(), Phase::NotStarted);
        assert_eq!(
            acc.add(1, ElementClass::Wall, &Q),
            Err(AccumulatorStateError {
                state: "not started"
            })
        );
        assert!(acc.finalize(0, 0.0).is_err());

        acc.start().unwrap();
        assert!(acc.start().is_err());
        acc.add(1, ElementClass::Wall, &Q).unwrap();
        acc.finalize(1, 0.0).unwrap();

        assert_eq!(acc.phase(), Phase::Finalized);
        assert_eq!(
            acc.add(2, ElementClass::Wall, &Q),
            Err(AccumulatorStateError { state: "finalized" })
        );
        assert!(acc.finalize(1, 0.0).is_err());
    }

    #[test]
    fn finalize_computes_ratios() {
        let acc = SpatialAccumulator::new(HashSet::from([2]));
        acc.start().unwrap();
        acc.add(1, ElementClass::Wall, &Q).unwrap();
        acc.add(2, ElementClass::Slab, &Q).unwrap();
        acc.add(3, ElementClass::Space, &Q).unwrap();
        let m = acc.finalize(2, 450.0).unwrap();

        assert_eq!(m.brutto_rauminhalt, 9.0);
        assert_eq!(m.brutto_grundflaeche, 20.0);
        assert_eq!(m.bebaute_flaeche, 10.0);
        assert_eq!(m.netto_raumflaeche, 10.0);
        assert_eq!(m.konstruktions_grundflaeche, 10.0);
        assert_eq!(m.stockwerke, 2);
        assert_eq!(m.grundstuecksflaeche, 450.0);
        assert_eq!(m.bgf_bf_ratio, 2.0);
        assert_eq!(m.bri_bgf_ratio, 0.45);
    }

    #[test]
    fn zero_denominators_finalize_to_zero() {
        let acc = SpatialAccumulator::new(HashSet::new());
        acc.start().unwrap();
        let m = acc.finalize(0, 0.0).unwrap();
        assert_eq!(m, BuildingMetrics::default());
    }
}
