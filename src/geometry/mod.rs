//! Geometric quantities of walked elements.
//!
//! The geometry kernel is a capability behind [`GeometryEngine`] so that the
//! accumulators can run against fakes. [`ExtrusionEngine`] is the built-in
//! engine for swept-solid and polygon-mesh bodies.

pub mod extrusion;
pub mod mesh;
pub mod profile;
pub mod settings;

use serde::Serialize;

use crate::error::GeometryError;
use crate::model::{Element, IfcProject};

pub use extrusion::{ExtrusionEngine, SolidShape};
pub use settings::GeometrySettings;

/// Builds a shape for an element and answers quantity queries on it.
/// Implementations must be safe to call from several worker threads.
pub trait GeometryEngine: Send + Sync {
    type Shape;

    fn create_shape(
        &self,
        project: &IfcProject,
        element: &Element<'_>,
    ) -> Result<Self::Shape, GeometryError>;

    /// m³
    fn volume(&self, shape: &Self::Shape) -> f64;

    /// Horizontal projected area in m².
    fn footprint_area(&self, shape: &Self::Shape) -> f64;

    /// Largest bounding-box dimension in m.
    fn max_extent(&self, shape: &Self::Shape) -> f64;
}

/// Per-element quantities in metres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Quantities {
    pub volume: f64,
    pub footprint_area: f64,
    pub max_extent: f64,
}

/// Measures one element. Fails when the engine cannot build a shape or the
/// shape yields non-finite or negative quantities.
pub fn measure<E>(
    engine: &E,
    project: &IfcProject,
    element: &Element<'_>,
) -> Result<Quantities, GeometryError>
where
    E: GeometryEngine + ?Sized,
{
    let shape = engine.create_shape(project, element)?;
    let quantities = Quantities {
        volume: engine.volume(&shape),
        footprint_area: engine.footprint_area(&shape),
        max_extent: engine.max_extent(&shape),
    };

    let valid = [
        quantities.volume,
        quantities.footprint_area,
        quantities.max_extent,
    ]
    .iter()
    .all(|q| q.is_finite() && *q >= 0.0);

    if !valid {
        return Err(GeometryError::Degenerate {
            id: element.id(),
            reason: format!("engine returned {quantities:?}"),
        });
    }

    Ok(quantities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::step::StepEntity;
    use crate::parser::StepFile;

    struct Fixed(f64);

    impl GeometryEngine for Fixed {
        type Shape = f64;

        fn create_shape(&self, _: &IfcProject, _: &Element<'_>) -> Result<f64, GeometryError> {
            Ok(self.0)
        }
        fn volume(&self, shape: &f64) -> f64 {
            *shape
        }
        fn footprint_area(&self, shape: &f64) -> f64 {
            *shape * 2.0
        }
        fn max_extent(&self, shape: &f64) -> f64 {
            *shape * 3.0
        }
    }

    fn wall() -> StepEntity {
        StepEntity {
            id: 7,
            entity_type: "IFCWALL".to_string(),
            values: vec![],
        }
    }

    #[test]
    fn measure_collects_engine_quantities() {
        let project = IfcProject::new("p".into(), StepFile::default(), "p.ifc".into());
        let entity = wall();
        let element = Element::new(&entity).unwrap();
        let q = measure(&Fixed(1.5), &project, &element).unwrap();
        assert_eq!(
            q,
            Quantities {
                volume: 1.5,
                footprint_area: 3.0,
                max_extent: 4.5
            }
        );
    }

    #[test]
    fn measure_rejects_non_finite_quantities() {
        let project = IfcProject::new("p".into(), StepFile::default(), "p.ifc".into());
        let entity = wall();
        let element = Element::new(&entity).unwrap();
        let err = measure(&Fixed(f64::NAN), &project, &element).unwrap_err();
        assert!(matches!(err, GeometryError::Degenerate { id: 7, .. }));
    }
}
