//! Built-in engine for swept-solid and polygon-mesh bodies.
//!
//! Handles `Body` representations made of `IfcExtrudedAreaSolid` items or
//! of the mesh items in [`mesh::MESH_ITEMS`], reached directly, through
//! boolean results (first operand only) or through mapped items. Openings
//! are not subtracted.

use glam::{DAffine3, DMat3, DVec2, DVec3};
use tracing::trace;

use super::mesh::{self, measure_mesh};
use super::profile::{self, convex_hull, missing, polygon_area, resolve};
use super::{GeometryEngine, GeometrySettings};
use crate::error::GeometryError;
use crate::model::{Element, IfcProject};
use crate::parser::step::{StepEntity, StepValue};

const MAX_PLACEMENT_DEPTH: usize = 64;
const VERTICAL_TOLERANCE: f64 = 1e-9;
const SOLID_REPRESENTATION_TYPES: &[&str] = &[
    "SweptSolid",
    "AdvancedSweptSolid",
    "Clipping",
    "CSG",
    "MappedRepresentation",
    "Tessellation",
    "Brep",
    "SurfaceModel",
];

/// Quantities of one element's body in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidShape {
    pub volume: f64,
    pub footprint_area: f64,
    pub min: DVec3,
    pub max: DVec3,
}

impl SolidShape {
    fn empty() -> Self {
        Self {
            volume: 0.0,
            footprint_area: 0.0,
            min: DVec3::splat(f64::INFINITY),
            max: DVec3::splat(f64::NEG_INFINITY),
        }
    }

    fn include(&mut self, point: DVec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    fn scaled(self, s: f64) -> Self {
        Self {
            volume: self.volume * s * s * s,
            footprint_area: self.footprint_area * s * s,
            min: self.min * s,
            max: self.max * s,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExtrusionEngine {
    settings: GeometrySettings,
}

impl ExtrusionEngine {
    #[must_use]
    pub fn new(settings: GeometrySettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &GeometrySettings {
        &self.settings
    }

    fn add_item(
        &self,
        project: &IfcProject,
        item: &StepEntity,
        transform: DAffine3,
        shape: &mut SolidShape,
    ) -> Result<(), GeometryError> {
        match item.entity_type.as_str() {
            "IFCEXTRUDEDAREASOLID" => add_extrusion(project, item, transform, shape),
            // Operator, FirstOperand, SecondOperand
            "IFCBOOLEANCLIPPINGRESULT" | "IFCBOOLEANRESULT" => {
                let first = item
                    .reference_at(1)
                    .ok_or_else(|| missing(item, "FirstOperand"))?;
                self.add_item(project, resolve(project, item.id, first)?, transform, shape)
            }
            // MappingSource, MappingTarget
            "IFCMAPPEDITEM" => {
                let source_id = item
                    .reference_at(0)
                    .ok_or_else(|| missing(item, "MappingSource"))?;
                let source = resolve(project, item.id, source_id)?;
                let target = match item.reference_at(1) {
                    Some(id) => transformation_operator(project, resolve(project, item.id, id)?)?,
                    None => DAffine3::IDENTITY,
                };
                // IfcRepresentationMap: MappingOrigin, MappedRepresentation
                let origin = axis2_placement_3d(project, source.id, source.reference_at(0))?;
                let mapped_id = source
                    .reference_at(1)
                    .ok_or_else(|| missing(source, "MappedRepresentation"))?;
                let mapped = resolve(project, source.id, mapped_id)?;
                let inner = transform * target * origin;
                for item_id in mapped.references_at(3) {
                    self.add_item(project, resolve(project, mapped.id, item_id)?, inner, shape)?;
                }
                Ok(())
            }
            t if mesh::MESH_ITEMS.contains(&t) => {
                let quantities = measure_mesh(project, item, transform)?;
                for point in quantities.points {
                    shape.include(point);
                }
                shape.volume += quantities.volume;
                shape.footprint_area += quantities.footprint_area;
                Ok(())
            }
            _ => Err(GeometryError::Unsupported {
                id: item.id,
                entity_type: item.entity_type.clone(),
            }),
        }
    }
}

impl GeometryEngine for ExtrusionEngine {
    type Shape = SolidShape;

    fn create_shape(
        &self,
        project: &IfcProject,
        element: &Element<'_>,
    ) -> Result<SolidShape, GeometryError> {
        let id = element.id();
        let representation = element
            .representation()
            .ok_or(GeometryError::NoRepresentation { id })?;

        let placement = if self.settings.use_world_coords {
            object_placement(project, id, element.placement(), 0)?
        } else {
            DAffine3::IDENTITY
        };

        let items = body_items(project, id, representation)?;
        let mut shape = SolidShape::empty();
        for item in items {
            self.add_item(project, item, placement, &mut shape)?;
        }

        let shape = shape.scaled(project.length_scale);
        if shape.volume <= self.settings.precision && shape.footprint_area <= self.settings.precision
        {
            return Err(GeometryError::Degenerate {
                id,
                reason: "body has no volume and no footprint".to_string(),
            });
        }

        trace!(id, volume = shape.volume, footprint = shape.footprint_area, "Built shape");
        Ok(shape)
    }

    fn volume(&self, shape: &SolidShape) -> f64 {
        shape.volume
    }

    fn footprint_area(&self, shape: &SolidShape) -> f64 {
        shape.footprint_area
    }

    fn max_extent(&self, shape: &SolidShape) -> f64 {
        let size = shape.max - shape.min;
        size.max_element().max(0.0)
    }
}

/// Items of the body representations of a product definition shape.
fn body_items<'a>(
    project: &'a IfcProject,
    element_id: u64,
    definition_id: u64,
) -> Result<Vec<&'a StepEntity>, GeometryError> {
    // IfcProductDefinitionShape: Name, Description, Representations
    let definition = resolve(project, element_id, definition_id)?;
    let representations = definition
        .references_at(2)
        .into_iter()
        .map(|id| resolve(project, definition.id, id))
        .collect::<Result<Vec<_>, _>>()?;

    // IfcShapeRepresentation: ContextOfItems, Identifier, Type, Items
    let body: Vec<&StepEntity> = {
        let named: Vec<&StepEntity> = representations
            .iter()
            .copied()
            .filter(|r| r.string_at(1) == Some("Body"))
            .collect();
        if named.is_empty() {
            representations
                .iter()
                .copied()
                .filter(|r| r.string_at(2).is_some_and(|t| SOLID_REPRESENTATION_TYPES.contains(&t)))
                .collect()
        } else {
            named
        }
    };

    if body.is_empty() {
        return Err(GeometryError::Unsupported {
            id: definition.id,
            entity_type: "representation without body".to_string(),
        });
    }

    body.iter()
        .flat_map(|r| r.references_at(3).into_iter().map(move |id| (r.id, id)))
        .map(|(from, id)| resolve(project, from, id))
        .collect()
}

/// ExtrudedAreaSolid: SweptArea, Position, ExtrudedDirection, Depth
fn add_extrusion(
    project: &IfcProject,
    solid: &StepEntity,
    transform: DAffine3,
    shape: &mut SolidShape,
) -> Result<(), GeometryError> {
    let profile_id = solid
        .reference_at(0)
        .ok_or_else(|| missing(solid, "SweptArea"))?;
    let profile = profile::profile(project, resolve(project, solid.id, profile_id)?)?;

    let position = axis2_placement_3d(project, solid.id, solid.reference_at(1))?;
    let direction_id = solid
        .reference_at(2)
        .ok_or_else(|| missing(solid, "ExtrudedDirection"))?;
    let direction = direction_3d(resolve(project, solid.id, direction_id)?)?;
    let depth = solid
        .real_at(3)
        .filter(|d| *d > 0.0)
        .ok_or_else(|| missing(solid, "Depth"))?;

    let local = transform * position;
    let offset = direction * depth;

    let bottom: Vec<DVec3> = profile
        .outline
        .iter()
        .map(|p| local.transform_point3(p.extend(0.0)))
        .collect();
    let top: Vec<DVec3> = profile
        .outline
        .iter()
        .map(|p| local.transform_point3(p.extend(0.0) + offset))
        .collect();
    for &p in bottom.iter().chain(&top) {
        shape.include(p);
    }

    let det = local.matrix3.determinant().abs();
    shape.volume += profile.area * depth * direction.z.abs() * det;

    let world_direction = local.matrix3.mul_vec3(direction).normalize_or_zero();
    let world_normal = local.matrix3.mul_vec3(DVec3::Z);
    let vertical = world_direction.z.abs() > 1.0 - VERTICAL_TOLERANCE
        && world_normal.normalize_or_zero().z.abs() > 1.0 - VERTICAL_TOLERANCE;

    shape.footprint_area += if vertical {
        profile.area * det / world_normal.length()
    } else {
        let projected: Vec<DVec2> = bottom.iter().chain(&top).map(|p| p.truncate()).collect();
        polygon_area(&convex_hull(&projected))
    };

    Ok(())
}

/// World transform of an `IfcLocalPlacement` chain.
fn object_placement(
    project: &IfcProject,
    element_id: u64,
    placement: Option<u64>,
    depth: usize,
) -> Result<DAffine3, GeometryError> {
    let Some(id) = placement else {
        return Ok(DAffine3::IDENTITY);
    };
    if depth > MAX_PLACEMENT_DEPTH {
        return Err(GeometryError::Degenerate {
            id: element_id,
            reason: "placement chain too deep or cyclic".to_string(),
        });
    }

    let placement = resolve(project, element_id, id)?;
    if !placement.is("IFCLOCALPLACEMENT") {
        return Err(GeometryError::Unsupported {
            id,
            entity_type: placement.entity_type.clone(),
        });
    }

    // PlacementRelTo, RelativePlacement
    let parent = object_placement(project, element_id, placement.reference_at(0), depth + 1)?;
    let relative = axis2_placement_3d(project, id, placement.reference_at(1))?;
    Ok(parent * relative)
}

/// `IfcAxis2Placement3D(Location, Axis, RefDirection)`; absent means identity.
fn axis2_placement_3d(
    project: &IfcProject,
    from: u64,
    placement: Option<u64>,
) -> Result<DAffine3, GeometryError> {
    let Some(id) = placement else {
        return Ok(DAffine3::IDENTITY);
    };
    let placement = resolve(project, from, id)?;

    let origin = match placement.reference_at(0) {
        Some(loc) => point_3d(resolve(project, id, loc)?)?,
        None => DVec3::ZERO,
    };
    let axis = optional_direction(project, id, placement.reference_at(1))?;
    let ref_direction = optional_direction(project, id, placement.reference_at(2))?;

    Ok(frame(origin, axis, ref_direction, 1.0))
}

/// `IfcCartesianTransformationOperator3D(Axis1, Axis2, LocalOrigin, Scale, Axis3)`.
/// Non-uniform scales use their first factor.
fn transformation_operator(
    project: &IfcProject,
    operator: &StepEntity,
) -> Result<DAffine3, GeometryError> {
    let x = optional_direction(project, operator.id, operator.reference_at(0))?;
    let z = optional_direction(project, operator.id, operator.reference_at(4))?;
    let origin = match operator.reference_at(2) {
        Some(loc) => point_3d(resolve(project, operator.id, loc)?)?,
        None => DVec3::ZERO,
    };
    let scale = operator.real_at(3).filter(|s| *s > 0.0).unwrap_or(1.0);
    Ok(frame(origin, z, x, scale))
}

/// Right-handed frame with `z` as the axis and `x` projected orthogonal to it.
fn frame(origin: DVec3, z: Option<DVec3>, x: Option<DVec3>, scale: f64) -> DAffine3 {
    let z_axis = z.unwrap_or(DVec3::Z);
    let candidate = x.unwrap_or_else(|| {
        if z_axis.x.abs() < 0.9 {
            DVec3::X
        } else {
            DVec3::Y
        }
    });
    let mut x_axis = (candidate - z_axis * z_axis.dot(candidate)).normalize_or_zero();
    if x_axis == DVec3::ZERO {
        x_axis = z_axis.any_orthonormal_vector();
    }
    let y_axis = z_axis.cross(x_axis);

    DAffine3::from_mat3_translation(
        DMat3::from_cols(x_axis * scale, y_axis * scale, z_axis * scale),
        origin,
    )
}

fn optional_direction(
    project: &IfcProject,
    from: u64,
    id: Option<u64>,
) -> Result<Option<DVec3>, GeometryError> {
    id.map(|id| direction_3d(resolve(project, from, id)?))
        .transpose()
}

/// `IfcDirection(DirectionRatios)`, normalized; 2D ratios get z = 0.
fn direction_3d(direction: &StepEntity) -> Result<DVec3, GeometryError> {
    coords_3d(direction.values.first())
        .map(DVec3::normalize_or_zero)
        .filter(|d| *d != DVec3::ZERO)
        .ok_or_else(|| missing(direction, "DirectionRatios"))
}

/// `IfcCartesianPoint(Coordinates)`; 2D points get z = 0.
pub(super) fn point_3d(point: &StepEntity) -> Result<DVec3, GeometryError> {
    coords_3d(point.values.first()).ok_or_else(|| missing(point, "Coordinates"))
}

pub(super) fn coords_3d(value: Option<&StepValue>) -> Option<DVec3> {
    let coords = value?.as_list()?;
    Some(DVec3::new(
        coords.first()?.as_f64()?,
        coords.get(1)?.as_f64()?,
        coords.get(2).and_then(StepValue::as_f64).unwrap_or(0.0),
    ))
}
