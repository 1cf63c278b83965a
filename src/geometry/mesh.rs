//! Polygon mesh bodies: tessellated face sets, faceted breps and surface
//! models built from poly loops.
//!
//! Volume follows the divergence theorem: every planar face contributes the
//! signed volume of the cone from the origin over it, and a closed shell
//! sums to its enclosed volume regardless of where the origin lies. Open
//! shells still yield a footprint and extent but their volume is not
//! meaningful.

use glam::{DAffine3, DVec2, DVec3};

use super::extrusion::{coords_3d, point_3d};
use super::profile::{convex_hull, missing, polygon_area, resolve};
use crate::error::GeometryError;
use crate::model::IfcProject;
use crate::parser::step::{StepEntity, StepValue};

/// Representation items measured as polygon meshes.
pub const MESH_ITEMS: &[&str] = &[
    "IFCTRIANGULATEDFACESET",
    "IFCPOLYGONALFACESET",
    "IFCFACETEDBREP",
    "IFCFACETEDBREPWITHVOIDS",
    "IFCSHELLBASEDSURFACEMODEL",
    "IFCFACEBASEDSURFACEMODEL",
];

/// Quantities of one mesh item in model units, world coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshQuantities {
    pub volume: f64,
    pub footprint_area: f64,
    pub points: Vec<DVec3>,
}

#[derive(Debug, Clone, Default)]
struct Face {
    outer: Vec<DVec3>,
    inner: Vec<Vec<DVec3>>,
}

impl Face {
    /// Holes are wound against the outer loop whatever their file order.
    fn signed_volume(&self) -> f64 {
        let normal = newell(&self.outer);
        let holes: f64 = self
            .inner
            .iter()
            .map(|hole| {
                let v = cone_volume(hole);
                if newell(hole).dot(normal) > 0.0 {
                    -v
                } else {
                    v
                }
            })
            .sum();
        cone_volume(&self.outer) + holes
    }
}

#[derive(Debug, Default)]
struct Shell {
    faces: Vec<Face>,
    void: bool,
}

impl Shell {
    fn volume(&self) -> f64 {
        let v = self.faces.iter().map(Face::signed_volume).sum::<f64>().abs();
        if self.void {
            -v
        } else {
            v
        }
    }
}

/// Measures a mesh item placed by `transform`.
pub fn measure_mesh(
    project: &IfcProject,
    item: &StepEntity,
    transform: DAffine3,
) -> Result<MeshQuantities, GeometryError> {
    let shells = match item.entity_type.as_str() {
        "IFCTRIANGULATEDFACESET" => vec![triangulated_face_set(project, item, transform)?],
        "IFCPOLYGONALFACESET" => vec![polygonal_face_set(project, item, transform)?],
        // Outer
        "IFCFACETEDBREP" => vec![shell(project, item, item.reference_at(0), transform, false)?],
        // Outer, Voids
        "IFCFACETEDBREPWITHVOIDS" => {
            let mut shells = vec![shell(project, item, item.reference_at(0), transform, false)?];
            for void in item.references_at(1) {
                shells.push(shell(project, item, Some(void), transform, true)?);
            }
            shells
        }
        // SbsmBoundary / FbsmFaces
        "IFCSHELLBASEDSURFACEMODEL" | "IFCFACEBASEDSURFACEMODEL" => item
            .references_at(0)
            .into_iter()
            .map(|id| shell(project, item, Some(id), transform, false))
            .collect::<Result<_, _>>()?,
        _ => {
            return Err(GeometryError::Unsupported {
                id: item.id,
                entity_type: item.entity_type.clone(),
            })
        }
    };

    let volume = shells.iter().map(Shell::volume).sum::<f64>().max(0.0);
    let points: Vec<DVec3> = shells
        .iter()
        .flat_map(|s| &s.faces)
        .flat_map(|f| f.outer.iter().copied())
        .collect();
    let projected: Vec<DVec2> = points.iter().map(|p| p.truncate()).collect();

    Ok(MeshQuantities {
        volume,
        footprint_area: polygon_area(&convex_hull(&projected)),
        points,
    })
}

/// Coordinates, Normals, Closed, CoordIndex, PnIndex
fn triangulated_face_set(
    project: &IfcProject,
    set: &StepEntity,
    transform: DAffine3,
) -> Result<Shell, GeometryError> {
    let points = point_list(project, set, transform)?;
    let pn_index = indices(set.values.get(4));
    let triangles = set
        .values
        .get(3)
        .and_then(StepValue::as_list)
        .ok_or_else(|| missing(set, "CoordIndex"))?;

    let faces = triangles
        .iter()
        .map(|triangle| {
            Ok(Face {
                outer: index_loop(set, &points, &pn_index, Some(triangle))?,
                inner: Vec::new(),
            })
        })
        .collect::<Result<_, GeometryError>>()?;

    Ok(Shell {
        faces,
        void: false,
    })
}

/// Coordinates, Closed, Faces, PnIndex
fn polygonal_face_set(
    project: &IfcProject,
    set: &StepEntity,
    transform: DAffine3,
) -> Result<Shell, GeometryError> {
    let points = point_list(project, set, transform)?;
    let pn_index = indices(set.values.get(3));

    let mut faces = Vec::new();
    for face_id in set.references_at(2) {
        // IfcIndexedPolygonalFace(WithVoids): CoordIndex, InnerCoordIndices
        let face = resolve(project, set.id, face_id)?;
        let outer = index_loop(face, &points, &pn_index, face.values.first())?;
        let inner = face
            .values
            .get(1)
            .and_then(StepValue::as_list)
            .unwrap_or_default()
            .iter()
            .map(|hole| index_loop(face, &points, &pn_index, Some(hole)))
            .collect::<Result<_, _>>()?;
        faces.push(Face { outer, inner });
    }

    Ok(Shell {
        faces,
        void: false,
    })
}

/// `IfcCartesianPointList3D(CoordList)` of a face set, transformed.
fn point_list(
    project: &IfcProject,
    set: &StepEntity,
    transform: DAffine3,
) -> Result<Vec<DVec3>, GeometryError> {
    let list_id = set
        .reference_at(0)
        .ok_or_else(|| missing(set, "Coordinates"))?;
    let list = resolve(project, set.id, list_id)?;
    list.values
        .first()
        .and_then(StepValue::as_list)
        .ok_or_else(|| missing(list, "CoordList"))?
        .iter()
        .map(|coords| {
            coords_3d(Some(coords))
                .map(|p| transform.transform_point3(p))
                .ok_or_else(|| missing(list, "CoordList"))
        })
        .collect()
}

fn indices(value: Option<&StepValue>) -> Vec<usize> {
    value
        .and_then(StepValue::as_list)
        .unwrap_or_default()
        .iter()
        .filter_map(index)
        .collect()
}

fn index(value: &StepValue) -> Option<usize> {
    match value {
        StepValue::Integer(i) => usize::try_from(*i).ok(),
        _ => None,
    }
}

/// Resolves one loop of 1-based indices, through `PnIndex` when present.
fn index_loop(
    owner: &StepEntity,
    points: &[DVec3],
    pn_index: &[usize],
    value: Option<&StepValue>,
) -> Result<Vec<DVec3>, GeometryError> {
    let out_of_range = || GeometryError::Degenerate {
        id: owner.id,
        reason: "coordinate index out of range".to_string(),
    };

    value
        .and_then(StepValue::as_list)
        .ok_or_else(|| missing(owner, "CoordIndex"))?
        .iter()
        .map(|value| {
            let mut i = index(value).ok_or_else(out_of_range)?;
            if !pn_index.is_empty() {
                i = *i
                    .checked_sub(1)
                    .and_then(|k| pn_index.get(k))
                    .ok_or_else(out_of_range)?;
            }
            i.checked_sub(1)
                .and_then(|k| points.get(k))
                .copied()
                .ok_or_else(out_of_range)
        })
        .collect()
}

/// `IfcClosedShell` / `IfcOpenShell` / `IfcConnectedFaceSet(CfsFaces)`.
fn shell(
    project: &IfcProject,
    owner: &StepEntity,
    id: Option<u64>,
    transform: DAffine3,
    void: bool,
) -> Result<Shell, GeometryError> {
    let id = id.ok_or_else(|| missing(owner, "Outer"))?;
    let shell = resolve(project, owner.id, id)?;
    let faces = shell
        .references_at(0)
        .into_iter()
        .map(|face| poly_face(project, shell, face, transform))
        .collect::<Result<_, _>>()?;
    Ok(Shell { faces, void })
}

/// `IfcFace(Bounds)`; the outer bound is the `IfcFaceOuterBound`, else the first.
fn poly_face(
    project: &IfcProject,
    shell: &StepEntity,
    face_id: u64,
    transform: DAffine3,
) -> Result<Face, GeometryError> {
    let face = resolve(project, shell.id, face_id)?;
    let mut outer = None;
    let mut loops = Vec::new();

    for bound_id in face.references_at(0) {
        // IfcFaceBound: Bound, Orientation
        let bound = resolve(project, face.id, bound_id)?;
        let loop_id = bound
            .reference_at(0)
            .ok_or_else(|| missing(bound, "Bound"))?;
        let poly_loop = resolve(project, bound.id, loop_id)?;
        if !poly_loop.is("IFCPOLYLOOP") {
            return Err(GeometryError::Unsupported {
                id: loop_id,
                entity_type: poly_loop.entity_type.clone(),
            });
        }

        let mut points = poly_loop
            .references_at(0)
            .into_iter()
            .map(|p| point_3d(resolve(project, loop_id, p)?).map(|p| transform.transform_point3(p)))
            .collect::<Result<Vec<_>, _>>()?;
        if bound.values.get(1) == Some(&StepValue::Boolean(false)) {
            points.reverse();
        }

        if outer.is_none() && bound.is("IFCFACEOUTERBOUND") {
            outer = Some(points);
        } else {
            loops.push(points);
        }
    }

    let outer = match outer {
        Some(outer) => outer,
        None if !loops.is_empty() => loops.remove(0),
        None => return Err(missing(face, "Bounds")),
    };
    Ok(Face {
        outer,
        inner: loops,
    })
}

/// Signed volume of the fan of tetrahedra from the origin over a planar loop.
fn cone_volume(points: &[DVec3]) -> f64 {
    let Some((&first, rest)) = points.split_first() else {
        return 0.0;
    };
    rest.windows(2)
        .map(|w| first.dot(w[0].cross(w[1])))
        .sum::<f64>()
        / 6.0
}

/// Newell normal; its length is twice the loop area.
fn newell(points: &[DVec3]) -> DVec3 {
    let n = points.len();
    (0..n).map(|i| points[i].cross(points[(i + 1) % n])).sum()
}
