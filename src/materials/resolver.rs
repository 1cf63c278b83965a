//! Unwraps the ways an IFC model attaches materials to an element.

use tracing::debug;

use crate::error::MaterialResolutionError;
use crate::model::IfcProject;
use crate::parser::step::StepEntity;

/// One material slot of an element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialName<'a> {
    /// True when the element is associated with exactly one `IfcMaterial`.
    pub is_single: bool,
    /// The layer, profile or constituent carrying the material, or the
    /// material itself for single materials and lists.
    pub sub_element: &'a StepEntity,
    pub raw_name: &'a str,
    /// Share of the element occupied by this slot: layer thickness share or
    /// constituent fraction. `None` when the model does not say.
    pub share: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Slot<'a> {
    sub_element: &'a StepEntity,
    material: u64,
    share: Option<f64>,
}

/// Lazy sequence of the material names of one element. Built fresh on
/// every call to [`resolve_material_names`].
#[derive(Debug)]
pub struct MaterialNames<'a> {
    project: &'a IfcProject,
    is_single: bool,
    slots: std::vec::IntoIter<Slot<'a>>,
    error: Option<MaterialResolutionError>,
}

impl<'a> Iterator for MaterialNames<'a> {
    type Item = Result<MaterialName<'a>, MaterialResolutionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(error) = self.error.take() {
            return Some(Err(error));
        }
        let slot = self.slots.next()?;
        Some(self.name(slot))
    }
}

impl<'a> MaterialNames<'a> {
    fn empty(project: &'a IfcProject) -> Self {
        Self {
            project,
            is_single: false,
            slots: Vec::new().into_iter(),
            error: None,
        }
    }

    fn name(&self, slot: Slot<'a>) -> Result<MaterialName<'a>, MaterialResolutionError> {
        let material = lookup(self.project, slot.sub_element.id, slot.material)?;
        // IfcMaterial: Name, Description, Category
        let raw_name = material.string_at(0).unwrap_or_default();
        if raw_name.trim().is_empty() {
            debug!(id = material.id, "Material has no name");
        }
        Ok(MaterialName {
            is_single: self.is_single,
            sub_element: slot.sub_element,
            raw_name,
            share: slot.share,
        })
    }
}

/// Material names associated with an element, directly or through its type
/// object. Elements without a material association yield nothing.
#[must_use]
pub fn resolve_material_names(project: &IfcProject, element_id: u64) -> MaterialNames<'_> {
    let Some(select_id) = project.material_of(element_id) else {
        debug!(element = element_id, "Element has no material association");
        return MaterialNames::empty(project);
    };

    let slots = lookup(project, element_id, select_id).and_then(|select| slots(project, select));
    match slots {
        Ok((is_single, slots)) => MaterialNames {
            project,
            is_single,
            slots: slots.into_iter(),
            error: None,
        },
        Err(error) => MaterialNames {
            error: Some(error),
            ..MaterialNames::empty(project)
        },
    }
}

fn lookup(project: &IfcProject, from: u64, id: u64) -> Result<&StepEntity, MaterialResolutionError> {
    project
        .entity(id)
        .ok_or(MaterialResolutionError::DanglingReference { id: from, target: id })
}

fn slots<'a>(
    project: &'a IfcProject,
    select: &'a StepEntity,
) -> Result<(bool, Vec<Slot<'a>>), MaterialResolutionError> {
    // A usage without its set is treated like an unrecognized select.
    let set = |index: usize| -> Result<Option<&'a StepEntity>, MaterialResolutionError> {
        select
            .reference_at(index)
            .map(|id| lookup(project, select.id, id))
            .transpose()
    };

    let slots = match select.entity_type.as_str() {
        "IFCMATERIAL" => {
            return Ok((
                true,
                vec![Slot {
                    sub_element: select,
                    material: select.id,
                    share: None,
                }],
            ))
        }
        // ForLayerSet
        "IFCMATERIALLAYERSETUSAGE" => match set(0)? {
            Some(layers) => layer_set(project, layers)?,
            None => Vec::new(),
        },
        "IFCMATERIALLAYERSET" => layer_set(project, select)?,
        // Material, LayerThickness
        "IFCMATERIALLAYER" => part(select, 0, None),
        // Materials
        "IFCMATERIALLIST" => select
            .references_at(0)
            .into_iter()
            .map(|id| {
                lookup(project, select.id, id).map(|material| Slot {
                    sub_element: material,
                    material: id,
                    share: None,
                })
            })
            .collect::<Result<_, _>>()?,
        // ForProfileSet
        "IFCMATERIALPROFILESETUSAGE" | "IFCMATERIALPROFILESETUSAGETAPERING" => match set(0)? {
            Some(profiles) => profile_set(project, profiles)?,
            None => Vec::new(),
        },
        "IFCMATERIALPROFILESET" => profile_set(project, select)?,
        // Name, Description, Material, Profile
        "IFCMATERIALPROFILE" => part(select, 2, None),
        // Name, Description, MaterialConstituents
        "IFCMATERIALCONSTITUENTSET" => constituent_set(project, select)?,
        // Name, Description, Material, Fraction
        "IFCMATERIALCONSTITUENT" => part(select, 2, select.real_at(3)),
        other => {
            debug!(id = select.id, entity_type = other, "Unhandled material select");
            Vec::new()
        }
    };

    Ok((false, slots))
}

/// A layer, profile or constituent as a one-element slot list; empty when
/// it carries no material.
fn part(entity: &StepEntity, material_index: usize, share: Option<f64>) -> Vec<Slot<'_>> {
    entity
        .reference_at(material_index)
        .map(|material| Slot {
            sub_element: entity,
            material,
            share,
        })
        .into_iter()
        .collect()
}

fn members<'a>(
    project: &'a IfcProject,
    set: &'a StepEntity,
    index: usize,
) -> Result<Vec<&'a StepEntity>, MaterialResolutionError> {
    set.references_at(index)
        .into_iter()
        .map(|id| lookup(project, set.id, id))
        .collect()
}

/// Shares of positive weights, or equal shares when no weight is known.
fn shares(weights: &[Option<f64>]) -> Vec<f64> {
    let total: f64 = weights.iter().flatten().filter(|w| **w > 0.0).sum();
    if total > 0.0 {
        weights
            .iter()
            .map(|w| w.filter(|w| *w > 0.0).map_or(0.0, |w| w / total))
            .collect()
    } else {
        vec![1.0 / weights.len().max(1) as f64; weights.len()]
    }
}

/// MaterialLayers; each layer's share is its thickness over the set thickness.
fn layer_set<'a>(
    project: &'a IfcProject,
    set: &'a StepEntity,
) -> Result<Vec<Slot<'a>>, MaterialResolutionError> {
    let layers = members(project, set, 0)?;
    let weights: Vec<Option<f64>> = layers.iter().map(|layer| layer.real_at(1)).collect();
    Ok(layers
        .into_iter()
        .zip(shares(&weights))
        .flat_map(|(layer, share)| part(layer, 0, Some(share)))
        .collect())
}

/// Name, Description, MaterialProfiles
fn profile_set<'a>(
    project: &'a IfcProject,
    set: &'a StepEntity,
) -> Result<Vec<Slot<'a>>, MaterialResolutionError> {
    Ok(members(project, set, 2)?
        .into_iter()
        .flat_map(|profile| part(profile, 2, None))
        .collect())
}

fn constituent_set<'a>(
    project: &'a IfcProject,
    set: &'a StepEntity,
) -> Result<Vec<Slot<'a>>, MaterialResolutionError> {
    let constituents = members(project, set, 2)?;
    let weights: Vec<Option<f64>> = constituents.iter().map(|c| c.real_at(3)).collect();
    Ok(constituents
        .into_iter()
        .zip(shares(&weights))
        .flat_map(|(constituent, share)| part(constituent, 2, Some(share)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{index_project, StepFile};
    use pretty_assertions::assert_eq;

    fn project(data: &str) -> IfcProject {
        let content = format!(
            "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('IFC4'));\nENDSEC;\nDATA;\n{data}\nENDSEC;\nEND-ISO-10303-21;\n"
        );
        index_project(StepFile::parse(&content).unwrap(), "m.ifc".to_string())
    }

    fn names(project: &IfcProject, id: u64) -> Vec<(bool, u64, String, Option<f64>)> {
        resolve_material_names(project, id)
            .map(|name| {
                let name = name.unwrap();
                (name.is_single, name.sub_element.id, name.raw_name.to_string(), name.share)
            })
            .collect()
    }

    #[test]
    fn single_material() {
        let p = project(
            "#1=IFCWALL('w',$,$,$,$,$,$,$,$);\n\
             #2=IFCMATERIAL('Beton, Stahlbeton',$,$);\n\
             #3=IFCRELASSOCIATESMATERIAL('r',$,$,$,(#1),#2);",
        );
        assert_eq!(names(&p, 1), vec![(true, 2, "Beton, Stahlbeton".to_string(), None)]);
    }

    #[test]
    fn layer_set_usage_skips_layers_without_material() {
        let p = project(
            "#1=IFCWALL('w',$,$,$,$,$,$,$,$);\n\
             #2=IFCMATERIAL('Gipskarton',$,$);\n\
             #3=IFCMATERIAL('Dämmung, Mineralwolle',$,$);\n\
             #4=IFCMATERIALLAYER(#2,10.,$,$,$,$,$);\n\
             #5=IFCMATERIALLAYER(#3,30.,$,$,$,$,$);\n\
             #6=IFCMATERIALLAYER($,10.,.T.,$,$,$,$);\n\
             #7=IFCMATERIALLAYERSET((#4,#5,#6),'AW',$);\n\
             #8=IFCMATERIALLAYERSETUSAGE(#7,.AXIS2.,.POSITIVE.,0.,$);\n\
             #9=IFCRELASSOCIATESMATERIAL('r',$,$,$,(#1),#8);",
        );
        assert_eq!(
            names(&p, 1),
            vec![
                (false, 4, "Gipskarton".to_string(), Some(0.2)),
                (false, 5, "Dämmung, Mineralwolle".to_string(), Some(0.6)),
            ]
        );
    }

    #[test]
    fn material_list_and_profile_set() {
        let p = project(
            "#1=IFCWINDOW('w',$,$,$,$,$,$,$,$,$,$,$,$);\n\
             #2=IFCMATERIAL('Glas, Normalglas',$,$);\n\
             #3=IFCMATERIAL('Holz, Bauholz',$,$);\n\
             #4=IFCMATERIALLIST((#2,#3));\n\
             #5=IFCRELASSOCIATESMATERIAL('r',$,$,$,(#1),#4);\n\
             #10=IFCBEAM('b',$,$,$,$,$,$,$,$);\n\
             #11=IFCMATERIALPROFILE($,$,#3,$,$,$);\n\
             #12=IFCMATERIALPROFILESET($,$,(#11),$);\n\
             #13=IFCMATERIALPROFILESETUSAGE(#12,$,$);\n\
             #14=IFCRELASSOCIATESMATERIAL('r2',$,$,$,(#10),#13);",
        );
        assert_eq!(
            names(&p, 1),
            vec![
                (false, 2, "Glas, Normalglas".to_string(), None),
                (false, 3, "Holz, Bauholz".to_string(), None),
            ]
        );
        assert_eq!(names(&p, 10), vec![(false, 11, "Holz, Bauholz".to_string(), None)]);
    }

    #[test]
    fn constituents_without_fractions_share_equally() {
        let p = project(
            "#1=IFCSLAB('s',$,$,$,$,$,$,$,$);\n\
             #2=IFCMATERIAL('Estrich',$,$);\n\
             #3=IFCMATERIAL('Dämmung, Trittschall',$,$);\n\
             #4=IFCMATERIALCONSTITUENT('a',$,#2,$,$);\n\
             #5=IFCMATERIALCONSTITUENT('b',$,#3,$,$);\n\
             #6=IFCMATERIALCONSTITUENTSET('Boden',$,(#4,#5));\n\
             #7=IFCRELASSOCIATESMATERIAL('r',$,$,$,(#1),#6);",
        );
        let shares: Vec<Option<f64>> = names(&p, 1).into_iter().map(|n| n.3).collect();
        assert_eq!(shares, vec![Some(0.5), Some(0.5)]);
    }

    #[test]
    fn no_association_and_unknown_selects_yield_nothing() {
        let p = project(
            "#1=IFCWALL('w',$,$,$,$,$,$,$,$);\n\
             #2=IFCWALL('w2',$,$,$,$,$,$,$,$);\n\
             #3=IFCMATERIALDEFINITIONREPRESENTATION($,$,(),#9);\n\
             #4=IFCRELASSOCIATESMATERIAL('r',$,$,$,(#2),#3);",
        );
        assert!(names(&p, 1).is_empty());
        assert!(names(&p, 2).is_empty());
    }

    #[test]
    fn dangling_references_are_errors() {
        let p = project(
            "#1=IFCWALL('w',$,$,$,$,$,$,$,$);\n\
             #2=IFCMATERIALLIST((#3,#99));\n\
             #3=IFCMATERIAL($,$,$);\n\
             #4=IFCRELASSOCIATESMATERIAL('r',$,$,$,(#1),#2);",
        );
        let results: Vec<_> = resolve_material_names(&p, 1).collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(MaterialResolutionError::DanglingReference { id: 2, target: 99 })
        ));
    }

    #[test]
    fn unnamed_material_keeps_its_slot_with_a_blank_name() {
        let p = project(
            "#1=IFCWALL('w',$,$,$,$,$,$,$,$);\n\
             #2=IFCMATERIAL($,$,$);\n\
             #3=IFCMATERIAL('Ziegel',$,$);\n\
             #4=IFCMATERIALLAYER(#2,10.,$,$,$,$,$);\n\
             #5=IFCMATERIALLAYER(#3,30.,$,$,$,$,$);\n\
             #6=IFCMATERIALLAYERSET((#4,#5),$,$);\n\
             #7=IFCRELASSOCIATESMATERIAL('r',$,$,$,(#1),#6);",
        );
        let results: Vec<MaterialName<'_>> = resolve_material_names(&p, 1)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            results,
            vec![
                MaterialName {
                    is_single: false,
                    sub_element: p.entity(4).unwrap(),
                    raw_name: "",
                    share: Some(0.25),
                },
                MaterialName {
                    is_single: false,
                    sub_element: p.entity(5).unwrap(),
                    raw_name: "Ziegel",
                    share: Some(0.75),
                },
            ]
        );
    }

    #[test]
    fn sequence_is_recomputed_per_call() {
        let p = project(
            "#1=IFCWALL('w',$,$,$,$,$,$,$,$);\n\
             #2=IFCMATERIAL('Estrich',$,$);\n\
             #3=IFCRELASSOCIATESMATERIAL('r',$,$,$,(#1),#2);",
        );
        assert_eq!(resolve_material_names(&p, 1).count(), 1);
        assert_eq!(resolve_material_names(&p, 1).count(), 1);
    }
}
