use super::Element;
use crate::parser::step::{StepEntity, StepFile, StepValue};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

/// An opened IFC model: the raw entity graph plus the relationship indices
/// the walk needs. Never mutated after [`crate::parser::parse_ifc_file`].
#[derive(Debug)]
pub struct IfcProject {
    pub name: String,
    pub schema: String,
    pub file_path: String,
    /// Metres per model length unit.
    pub length_scale: f64,
    /// Building storeys in file order.
    pub storeys: Vec<Storey>,
    pub step: StepFile,
    pub element_to_storey: HashMap<u64, u64>, // element_id → storey_id
    pub decomposition: HashMap<u64, Vec<u64>>, // parent → contained and aggregated children
    pub element_materials: HashMap<u64, u64>,  // object or type id → material select
    pub element_types: HashMap<u64, u64>,      // instance_id → type object id
    pub property_sets: HashMap<u64, HashMap<String, HashMap<String, StepValue>>>, // id → pset → property
}

#[derive(Debug, Clone, Serialize)]
pub struct Storey {
    pub id: u64,
    pub name: String,
    pub elevation: f64,
    pub element_count: usize,
}

impl IfcProject {
    #[must_use]
    pub fn new(name: String, step: StepFile, file_path: String) -> Self {
        Self {
            name,
            schema: step.schema.clone(),
            file_path,
            length_scale: 1.0,
            storeys: Vec::new(),
            step,
            element_to_storey: HashMap::new(),
            decomposition: HashMap::new(),
            element_materials: HashMap::new(),
            element_types: HashMap::new(),
            property_sets: HashMap::new(),
        }
    }

    #[must_use]
    pub fn entity(&self, id: u64) -> Option<&StepEntity> {
        self.step.get_entity(id)
    }

    /// Every product that has a representation, in file order.
    #[must_use]
    pub fn products(&self) -> Vec<Element<'_>> {
        let mut products: Vec<Element<'_>> = self
            .step
            .entities
            .values()
            .filter_map(Element::new)
            .filter(|e| e.representation().is_some())
            .collect();
        products.sort_by_key(Element::id);
        products
    }

    /// The storey at elevation exactly 0, else the first storey in file
    /// order. The flag is false when the fallback was used.
    #[must_use]
    pub fn ground_floor(&self) -> Option<(&Storey, bool)> {
        self.storeys
            .iter()
            .find(|s| s.elevation == 0.0)
            .map(|s| (s, true))
            .or_else(|| self.storeys.first().map(|s| (s, false)))
    }

    /// All elements transitively contained in or aggregated under `root`,
    /// excluding `root` itself.
    #[must_use]
    pub fn decomposition_of(&self, root: u64) -> HashSet<u64> {
        let mut found = HashSet::new();
        let mut queue = VecDeque::from([root]);

        while let Some(parent) = queue.pop_front() {
            for &child in self.decomposition.get(&parent).into_iter().flatten() {
                if child != root && found.insert(child) {
                    queue.push_back(child);
                }
            }
        }

        found
    }

    /// The material select associated with an element, inherited from its
    /// type object when the element has none of its own.
    #[must_use]
    pub fn material_of(&self, element_id: u64) -> Option<u64> {
        self.element_materials.get(&element_id).copied().or_else(|| {
            self.element_types
                .get(&element_id)
                .and_then(|type_id| self.element_materials.get(type_id))
                .copied()
        })
    }

    #[must_use]
    pub fn property(&self, id: u64, pset: &str, name: &str) -> Option<&StepValue> {
        self.property_sets.get(&id)?.get(pset)?.get(name)
    }

    /// Plot area from `Pset_SiteCommon.TotalArea` of the first site, in m².
    #[must_use]
    pub fn site_area(&self) -> f64 {
        self.step
            .get_entities_by_type("IFCSITE")
            .first()
            .and_then(|site| self.property(site.id, "Pset_SiteCommon", "TotalArea"))
            .and_then(StepValue::as_f64)
            .map_or(0.0, |area| area * self.length_scale * self.length_scale)
    }
}
