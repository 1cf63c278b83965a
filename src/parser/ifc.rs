use crate::error::ModelOpenError;
use crate::model::{IfcProject, Storey};
use crate::parser::step::{StepEntity, StepFile, StepValue};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Parses an IFC file and indexes the relationships the walk needs.
///
/// Supports both IFC2x3 and IFC4 schemas. Extracts:
/// - Project metadata (name, schema version, length unit)
/// - Building storeys with elevations
/// - Spatial containment and aggregation (element → storey, parent → children)
/// - Type objects and material associations
/// - Property sets
///
/// # Errors
///
/// Returns [`ModelOpenError::FileRead`] if the file cannot be read.
/// Returns [`ModelOpenError::InvalidStep`] if the STEP format is malformed.
///
/// # Example
///
/// ```no_run
/// use ifc_metrics::parser::parse_ifc_file;
///
/// let project = parse_ifc_file("model.ifc")?;
/// for storey in &project.storeys {
///     println!("{}: {} elements", storey.name, storey.element_count);
/// }
/// # Ok::<(), ifc_metrics::error::ModelOpenError>(())
/// ```
pub fn parse_ifc_file<P: AsRef<Path>>(path: P) -> Result<IfcProject, ModelOpenError> {
    let bytes = std::fs::read(&path).map_err(|source| ModelOpenError::FileRead {
        path: path.as_ref().to_path_buf(),
        source,
    })?;
    let content = String::from_utf8_lossy(&bytes);

    let step_file = StepFile::parse(&content)?;
    let file_path = path.as_ref().to_string_lossy().to_string();

    Ok(index_project(step_file, file_path))
}

/// Builds the project indices from an already parsed STEP file.
#[must_use]
pub fn index_project(step_file: StepFile, file_path: String) -> IfcProject {
    let project_name = extract_project_name(&step_file);
    let length_scale = extract_length_scale(&step_file);
    let storeys = extract_storeys(&step_file);
    let element_to_storey = extract_spatial_containment(&step_file);
    let decomposition = extract_decomposition(&step_file);
    let element_types = extract_type_relationships(&step_file);
    let element_materials = extract_material_associations(&step_file);
    let property_sets = extract_property_sets(&step_file);

    let mut project = IfcProject::new(project_name, step_file, file_path);
    project.length_scale = length_scale;

    // Count elements per storey
    let mut storey_counts: HashMap<u64, usize> = HashMap::new();
    for storey_id in element_to_storey.values() {
        *storey_counts.entry(*storey_id).or_insert(0) += 1;
    }
    project.storeys = storeys
        .into_iter()
        .map(|mut storey| {
            storey.element_count = storey_counts.get(&storey.id).copied().unwrap_or(0);
            storey
        })
        .collect();

    project.element_to_storey = element_to_storey;
    project.decomposition = decomposition;
    project.element_types = element_types;
    project.element_materials = element_materials;
    project.property_sets = property_sets;

    info!(
        file = %project.file_path,
        schema = %project.schema,
        entities = project.step.entities.len(),
        storeys = project.storeys.len(),
        length_scale = project.length_scale,
        "Opened IFC model"
    );

    project
}

fn extract_project_name(step_file: &StepFile) -> String {
    step_file
        .get_entities_by_type("IFCPROJECT")
        .first()
        .and_then(|e| e.string_at(2))
        .map_or_else(|| "Unknown Project".to_string(), str::to_string)
}

fn extract_storeys(step_file: &StepFile) -> Vec<Storey> {
    step_file
        .get_entities_by_type("IFCBUILDINGSTOREY")
        .iter()
        .map(|e| {
            let name = e
                .string_at(2)
                .map_or_else(|| format!("Storey #{}", e.id), str::to_string);

            // Index 9 = Elevation
            let elevation = e.real_at(9).unwrap_or(0.0);

            Storey {
                id: e.id,
                name,
                elevation,
                element_count: 0,
            }
        })
        .collect()
}

/// Metres per length unit from the project's `IfcUnitAssignment`.
fn extract_length_scale(step_file: &StepFile) -> f64 {
    let Some(assignment) = step_file
        .get_entities_by_type("IFCUNITASSIGNMENT")
        .into_iter()
        .next()
    else {
        return 1.0;
    };

    assignment
        .references_at(0)
        .into_iter()
        .filter_map(|id| step_file.get_entity(id))
        .find_map(|unit| length_unit_scale(step_file, unit))
        .unwrap_or(1.0)
}

fn length_unit_scale(step_file: &StepFile, unit: &StepEntity) -> Option<f64> {
    // IfcSIUnit / IfcConversionBasedUnit: index 1 = UnitType
    if unit.values.get(1) != Some(&StepValue::Enum("LENGTHUNIT".to_string())) {
        return None;
    }

    match unit.entity_type.as_str() {
        "IFCSIUNIT" => Some(si_prefix_scale(unit.values.get(2))),
        "IFCCONVERSIONBASEDUNIT" => {
            // Index 3 = ConversionFactor (IfcMeasureWithUnit: value, unit)
            let factor = step_file.get_entity(unit.reference_at(3)?)?;
            let value = factor.real_at(0)?;
            let base = factor
                .reference_at(1)
                .and_then(|id| step_file.get_entity(id))
                .map_or(1.0, |base| si_prefix_scale(base.values.get(2)));
            Some(value * base)
        }
        _ => None,
    }
}

fn si_prefix_scale(prefix: Option<&StepValue>) -> f64 {
    match prefix {
        Some(StepValue::Enum(p)) => match p.as_str() {
            "KILO" => 1e3,
            "HECTO" => 1e2,
            "DECA" => 1e1,
            "DECI" => 1e-1,
            "CENTI" => 1e-2,
            "MILLI" => 1e-3,
            "MICRO" => 1e-6,
            other => {
                debug!(prefix = other, "Unhandled SI prefix, assuming none");
                1.0
            }
        },
        _ => 1.0,
    }
}

/// Extract element → storey relationships from IFCRELCONTAINEDINSPATIALSTRUCTURE
fn extract_spatial_containment(step_file: &StepFile) -> HashMap<u64, u64> {
    let mut element_to_storey: HashMap<u64, u64> = HashMap::new();

    for rel in step_file.get_entities_by_type("IFCRELCONTAINEDINSPATIALSTRUCTURE") {
        // Index 4 = RelatedElements, Index 5 = RelatingStructure
        if let Some(structure_id) = rel.reference_at(5) {
            let is_storey = step_file
                .get_entity(structure_id)
                .is_some_and(|s| s.is("IFCBUILDINGSTOREY"));
            if !is_storey {
                continue;
            }
            for elem_id in rel.references_at(4) {
                element_to_storey.insert(elem_id, structure_id);
            }
        }
    }

    element_to_storey
}

/// Parent → children over containment, aggregation and nesting.
fn extract_decomposition(step_file: &StepFile) -> HashMap<u64, Vec<u64>> {
    let mut decomposition: HashMap<u64, Vec<u64>> = HashMap::new();

    for rel in step_file.get_entities_by_type("IFCRELCONTAINEDINSPATIALSTRUCTURE") {
        if let Some(parent) = rel.reference_at(5) {
            decomposition
                .entry(parent)
                .or_default()
                .extend(rel.references_at(4));
        }
    }

    for rel_type in ["IFCRELAGGREGATES", "IFCRELNESTS"] {
        for rel in step_file.get_entities_by_type(rel_type) {
            // Index 4 = RelatingObject, Index 5 = RelatedObjects
            if let Some(parent) = rel.reference_at(4) {
                decomposition
                    .entry(parent)
                    .or_default()
                    .extend(rel.references_at(5));
            }
        }
    }

    decomposition
}

/// Instance → type object from IFCRELDEFINESBYTYPE
fn extract_type_relationships(step_file: &StepFile) -> HashMap<u64, u64> {
    let mut element_types: HashMap<u64, u64> = HashMap::new();

    for rel in step_file.get_entities_by_type("IFCRELDEFINESBYTYPE") {
        // Index 4 = RelatedObjects, Index 5 = RelatingType
        if let Some(type_id) = rel.reference_at(5) {
            for instance in rel.references_at(4) {
                element_types.insert(instance, type_id);
            }
        }
    }

    element_types
}

/// Object (instance or type) → material select from IFCRELASSOCIATESMATERIAL
fn extract_material_associations(step_file: &StepFile) -> HashMap<u64, u64> {
    let mut element_materials: HashMap<u64, u64> = HashMap::new();

    for rel in step_file.get_entities_by_type("IFCRELASSOCIATESMATERIAL") {
        // Index 4 = RelatedObjects, Index 5 = RelatingMaterial
        if let Some(material_id) = rel.reference_at(5) {
            for object in rel.references_at(4) {
                element_materials.insert(object, material_id);
            }
        }
    }

    element_materials
}

fn extract_property_sets(
    step_file: &StepFile,
) -> HashMap<u64, HashMap<String, HashMap<String, StepValue>>> {
    let mut element_properties: HashMap<u64, HashMap<String, HashMap<String, StepValue>>> =
        HashMap::new();

    // Build property set id -> (name, properties) map
    let mut pset_props: HashMap<u64, (String, HashMap<String, StepValue>)> = HashMap::new();

    for pset in step_file.get_entities_by_type("IFCPROPERTYSET") {
        let pset_name = pset.string_at(2).unwrap_or_default().to_string();
        let mut props = HashMap::new();

        for prop_id in pset.references_at(4) {
            if let Some(prop) = step_file.get_entity(prop_id) {
                if prop.is("IFCPROPERTYSINGLEVALUE") {
                    let name = prop.string_at(0).unwrap_or_default();
                    if !name.is_empty() {
                        let value = prop.values.get(2).cloned().unwrap_or(StepValue::Null);
                        props.insert(name.to_string(), value);
                    }
                }
            }
        }

        pset_props.insert(pset.id, (pset_name, props));
    }

    // Link properties to elements via IFCRELDEFINESBYPROPERTIES
    for rel in step_file.get_entities_by_type("IFCRELDEFINESBYPROPERTIES") {
        let Some((pset_name, props)) = rel.reference_at(5).and_then(|id| pset_props.get(&id))
        else {
            continue;
        };

        for elem_id in rel.references_at(4) {
            element_properties
                .entry(elem_id)
                .or_default()
                .entry(pset_name.clone())
                .or_default()
                .extend(props.clone());
        }
    }

    element_properties
}
