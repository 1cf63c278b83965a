use serde::Serialize;

/// Geometry settings profile handed to every engine. Every walk must use
/// the same profile for results to be comparable between runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometrySettings {
    /// Resolve placements into world coordinates.
    pub use_world_coords: bool,
    pub weld_vertices: bool,
    pub apply_default_materials: bool,
    pub generate_uvs: bool,
    /// Keep element hierarchy (decomposed parts stay attached to their parent).
    pub element_hierarchy: bool,
    pub keep_bounding_boxes: bool,
    pub use_material_names: bool,
    /// Quantities at or below this magnitude count as empty geometry.
    pub precision: f64,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            use_world_coords: true,
            weld_vertices: true,
            apply_default_materials: true,
            generate_uvs: true,
            element_hierarchy: true,
            keep_bounding_boxes: true,
            use_material_names: true,
            precision: 1e-16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_the_building_walk_profile() {
        let s = GeometrySettings::default();
        assert!(s.use_world_coords);
        assert!(s.weld_vertices);
        assert!(s.apply_default_materials);
        assert!(s.generate_uvs);
        assert!(s.element_hierarchy);
        assert!(s.keep_bounding_boxes);
        assert!(s.use_material_names);
        assert_eq!(s.precision, 1e-16);
    }
}
