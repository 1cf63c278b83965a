//! 2D profiles swept by extrusions, in profile-local model units.

use std::f64::consts::PI;

use glam::{DAffine2, DVec2};

use crate::error::GeometryError;
use crate::model::IfcProject;
use crate::parser::step::{StepEntity, StepValue};

const CIRCLE_SEGMENTS: usize = 32;

/// A profile outline (for bounds and projections) and its exact net area.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub outline: Vec<DVec2>,
    pub area: f64,
}

pub(crate) fn resolve<'a>(
    project: &'a IfcProject,
    from: u64,
    id: u64,
) -> Result<&'a StepEntity, GeometryError> {
    project
        .entity(id)
        .ok_or(GeometryError::DanglingReference { id: from, target: id })
}

pub(crate) fn missing(entity: &StepEntity, attribute: &'static str) -> GeometryError {
    GeometryError::MissingAttribute {
        id: entity.id,
        entity_type: entity.entity_type.clone(),
        attribute,
    }
}

fn positive(entity: &StepEntity, index: usize, attribute: &'static str) -> Result<f64, GeometryError> {
    entity
        .real_at(index)
        .filter(|v| *v > 0.0)
        .ok_or_else(|| missing(entity, attribute))
}

/// Builds the profile of an `IfcProfileDef` entity.
pub fn profile(project: &IfcProject, entity: &StepEntity) -> Result<Profile, GeometryError> {
    match entity.entity_type.as_str() {
        // ProfileType, ProfileName, Position, XDim, YDim, [WallThickness | RoundingRadius]
        "IFCRECTANGLEPROFILEDEF"
        | "IFCROUNDEDRECTANGLEPROFILEDEF"
        | "IFCRECTANGLEHOLLOWPROFILEDEF" => {
            let x = positive(entity, 3, "XDim")?;
            let y = positive(entity, 4, "YDim")?;
            let mut area = x * y;
            if entity.is("IFCRECTANGLEHOLLOWPROFILEDEF") {
                let t = positive(entity, 5, "WallThickness")?;
                area -= (x - 2.0 * t).max(0.0) * (y - 2.0 * t).max(0.0);
            }
            let position = placement_2d(project, entity.id, entity.reference_at(2))?;
            let outline = [(-x, -y), (x, -y), (x, y), (-x, y)]
                .iter()
                .map(|&(px, py)| position.transform_point2(DVec2::new(px / 2.0, py / 2.0)))
                .collect();
            Ok(Profile { outline, area })
        }
        // ProfileType, ProfileName, Position, Radius, [WallThickness]
        "IFCCIRCLEPROFILEDEF" | "IFCCIRCLEHOLLOWPROFILEDEF" => {
            let r = positive(entity, 3, "Radius")?;
            let mut area = PI * r * r;
            if entity.is("IFCCIRCLEHOLLOWPROFILEDEF") {
                let inner = (r - positive(entity, 4, "WallThickness")?).max(0.0);
                area -= PI * inner * inner;
            }
            let position = placement_2d(project, entity.id, entity.reference_at(2))?;
            let outline = (0..CIRCLE_SEGMENTS)
                .map(|i| {
                    let angle = 2.0 * PI * i as f64 / CIRCLE_SEGMENTS as f64;
                    position.transform_point2(DVec2::new(r * angle.cos(), r * angle.sin()))
                })
                .collect();
            Ok(Profile { outline, area })
        }
        // ProfileType, ProfileName, OuterCurve, [InnerCurves]
        "IFCARBITRARYCLOSEDPROFILEDEF" | "IFCARBITRARYPROFILEDEFWITHVOIDS" => {
            let outer_id = entity
                .reference_at(2)
                .ok_or_else(|| missing(entity, "OuterCurve"))?;
            let outline = curve_points(project, resolve(project, entity.id, outer_id)?)?;
            let mut area = polygon_area(&outline);
            for inner_id in entity.references_at(3) {
                let inner = curve_points(project, resolve(project, entity.id, inner_id)?)?;
                area -= polygon_area(&inner);
            }
            Ok(Profile {
                outline,
                area: area.max(0.0),
            })
        }
        _ => Err(GeometryError::Unsupported {
            id: entity.id,
            entity_type: entity.entity_type.clone(),
        }),
    }
}

/// Vertices of a closed polyline or indexed poly-curve. Arc segments of an
/// indexed poly-curve are approximated by their chords.
fn curve_points(project: &IfcProject, curve: &StepEntity) -> Result<Vec<DVec2>, GeometryError> {
    let mut points = match curve.entity_type.as_str() {
        "IFCPOLYLINE" => curve
            .references_at(0)
            .into_iter()
            .map(|id| point_2d(resolve(project, curve.id, id)?))
            .collect::<Result<Vec<_>, _>>()?,
        "IFCINDEXEDPOLYCURVE" => {
            let list_id = curve.reference_at(0).ok_or_else(|| missing(curve, "Points"))?;
            let list = resolve(project, curve.id, list_id)?;
            list.values
                .first()
                .and_then(StepValue::as_list)
                .ok_or_else(|| missing(list, "CoordList"))?
                .iter()
                .map(|coords| coords_2d(coords).ok_or_else(|| missing(list, "CoordList")))
                .collect::<Result<Vec<_>, _>>()?
        }
        _ => {
            return Err(GeometryError::Unsupported {
                id: curve.id,
                entity_type: curve.entity_type.clone(),
            })
        }
    };

    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    if points.len() < 3 {
        return Err(GeometryError::Degenerate {
            id: curve.id,
            reason: format!("closed curve with {} points", points.len()),
        });
    }

    Ok(points)
}

fn coords_2d(value: &StepValue) -> Option<DVec2> {
    let coords = value.as_list()?;
    Some(DVec2::new(
        coords.first()?.as_f64()?,
        coords.get(1)?.as_f64()?,
    ))
}

/// `IfcCartesianPoint` projected to its first two coordinates.
fn point_2d(point: &StepEntity) -> Result<DVec2, GeometryError> {
    point
        .values
        .first()
        .and_then(coords_2d)
        .ok_or_else(|| missing(point, "Coordinates"))
}

/// `IfcAxis2Placement2D(Location, RefDirection)`; absent means identity.
fn placement_2d(
    project: &IfcProject,
    from: u64,
    placement: Option<u64>,
) -> Result<DAffine2, GeometryError> {
    let Some(id) = placement else {
        return Ok(DAffine2::IDENTITY);
    };
    let placement = resolve(project, from, id)?;

    let origin = match placement.reference_at(0) {
        Some(loc) => point_2d(resolve(project, id, loc)?)?,
        None => DVec2::ZERO,
    };
    let x_axis = match placement.reference_at(1) {
        Some(dir) => {
            let dir = resolve(project, id, dir)?;
            dir.values
                .first()
                .and_then(coords_2d)
                .map(DVec2::normalize_or_zero)
                .filter(|d| *d != DVec2::ZERO)
                .ok_or_else(|| missing(dir, "DirectionRatios"))?
        }
        None => DVec2::X,
    };

    Ok(DAffine2::from_cols(x_axis, x_axis.perp(), origin))
}

/// Unsigned shoelace area.
#[must_use]
pub fn polygon_area(points: &[DVec2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| points[i].perp_dot(points[(i + 1) % n]))
        .sum();
    (twice / 2.0).abs()
}

/// Convex hull (Andrew's monotone chain), counter-clockwise.
#[must_use]
pub fn convex_hull(points: &[DVec2]) -> Vec<DVec2> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup();
    if sorted.len() < 3 {
        return sorted;
    }

    let cross = |o: DVec2, a: DVec2, b: DVec2| (a - o).perp_dot(b - o);
    let mut hull: Vec<DVec2> = Vec::with_capacity(sorted.len() * 2);

    for &p in &sorted {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in sorted.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}
