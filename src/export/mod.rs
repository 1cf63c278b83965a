//! File writers standing in for the persistence layer.

pub mod csv;
pub mod json;

pub use crate::error::ExportError;
pub use csv::export_csv;
pub use json::export_json;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::MaterialProperties;
    use crate::metrics::BuildingMetrics;
    use crate::walk::WalkReport;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn report() -> WalkReport {
        let stahl = MaterialProperties {
            volume: 0.5,
            mass: 3925.0,
            ..MaterialProperties::default()
        };
        WalkReport {
            project: "Haus".to_string(),
            schema: "IFC4".to_string(),
            metrics: BuildingMetrics::default(),
            materials: BTreeMap::from([("Stahl".to_string(), stahl)]),
            unknown: crate::materials::UnknownNameReport::default(),
            elements: 1,
            processed: 1,
            skipped_geometry: 0,
            failed_materials: 0,
            elapsed: Duration::from_millis(5),
        }
    }

    #[test]
    fn csv_has_header_and_one_row_per_material() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("materials.csv");
        export_csv(&report(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("material,volume_m3,area_m2"));
        assert!(lines[1].starts_with("Stahl,0.5,0,0,3925,"));
    }

    #[test]
    fn json_holds_metrics_and_materials() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        export_json(&report(), &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["project"], "Haus");
        assert_eq!(value["metrics"]["energie_bewertung"], "Unknown");
        assert_eq!(value["materials"]["Stahl"]["mass"], 3925.0);
    }

    #[test]
    fn unwritable_path_is_a_create_error() {
        let err = export_csv(&report(), "/nonexistent/dir/out.csv").unwrap_err();
        assert!(matches!(err, ExportError::FileCreate { .. }));
    }
}
