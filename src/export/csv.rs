use crate::error::ExportError;
use crate::walk::WalkReport;
use std::fs::File;
use std::path::Path;

pub const MATERIAL_COLUMNS: [&str; 13] = [
    "material",
    "volume_m3",
    "area_m2",
    "length_m",
    "mass_kg",
    "waste_mass_kg",
    "recyclable_mass_kg",
    "penrt",
    "gwp",
    "ap",
    "global_brutto_price",
    "local_brutto_price",
    "local_netto_price",
];

/// Writes one row per canonical material, sorted by name.
pub fn export_csv<P: AsRef<Path>>(report: &WalkReport, path: P) -> Result<(), ExportError> {
    let path_ref = path.as_ref();
    let file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;

    let mut writer = csv::Writer::from_writer(file);

    writer.write_record(MATERIAL_COLUMNS)?;

    for (name, m) in &report.materials {
        let values = [
            m.volume,
            m.area,
            m.length,
            m.mass,
            m.waste_mass,
            m.recyclable_mass,
            m.penrt_ml,
            m.gwp_ml,
            m.ap_ml,
            m.global_brutto_price,
            m.local_brutto_price,
            m.local_netto_price,
        ];
        let mut record = vec![name.clone()];
        record.extend(values.iter().map(f64::to_string));
        writer.write_record(&record)?;
    }

    writer.flush().map_err(|e| ExportError::WriteError {
        message: e.to_string(),
    })?;

    Ok(())
}
