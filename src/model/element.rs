use super::ElementClass;
use crate::parser::step::StepEntity;

/// Read-only view of a walked product. IfcProduct attribute layout:
/// GlobalId, OwnerHistory, Name, Description, ObjectType, ObjectPlacement,
/// Representation.
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    pub entity: &'a StepEntity,
    pub class: ElementClass,
}

impl<'a> Element<'a> {
    /// Wraps an entity if it is a walked product. Types outside the known
    /// classes still count when they carry a GlobalId and a representation,
    /// so reinforcement and distribution elements are not lost.
    #[must_use]
    pub fn new(entity: &'a StepEntity) -> Option<Self> {
        let class = match ElementClass::from_entity_type(&entity.entity_type) {
            Some(class) => class,
            None if ElementClass::is_non_product(&entity.entity_type) => return None,
            None if entity.string_at(0).is_some() && entity.reference_at(6).is_some() => {
                ElementClass::Other
            }
            None => return None,
        };
        Some(Self { entity, class })
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.entity.id
    }

    #[must_use]
    pub fn entity_type(&self) -> &'a str {
        &self.entity.entity_type
    }

    #[must_use]
    pub fn global_id(&self) -> &'a str {
        self.entity.string_at(0).unwrap_or_default()
    }

    #[must_use]
    pub fn name(&self) -> Option<&'a str> {
        self.entity.string_at(2)
    }

    #[must_use]
    pub fn placement(&self) -> Option<u64> {
        self.entity.reference_at(5)
    }

    #[must_use]
    pub fn representation(&self) -> Option<u64> {
        self.entity.reference_at(6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::step::StepValue;

    fn entity(entity_type: &str, values: Vec<StepValue>) -> StepEntity {
        StepEntity {
            id: 1,
            entity_type: entity_type.to_string(),
            values,
        }
    }

    fn product_values() -> Vec<StepValue> {
        let mut values = vec![StepValue::String("g".to_string())];
        values.extend(std::iter::repeat(StepValue::Null).take(4));
        values.push(StepValue::Reference(5));
        values.push(StepValue::Reference(6));
        values
    }

    #[test]
    fn unlisted_products_with_a_representation_are_other() {
        for name in ["IFCREINFORCINGBAR", "IFCPIPESEGMENT", "IFCDUCTSEGMENT", "IFCTENDON"] {
            let e = entity(name, product_values());
            let element = Element::new(&e).unwrap();
            assert_eq!(element.class, ElementClass::Other);
            assert_eq!(element.representation(), Some(6));
        }
    }

    #[test]
    fn structure_and_relations_stay_out() {
        assert!(Element::new(&entity("IFCBUILDINGSTOREY", product_values())).is_none());
        assert!(Element::new(&entity("IFCRELSPACEBOUNDARY", product_values())).is_none());
        assert!(Element::new(&entity("IFCPRODUCTDEFINITIONSHAPE", vec![StepValue::Null])).is_none());
        assert!(Element::new(&entity("IFCCARTESIANPOINT", vec![StepValue::List(vec![])])).is_none());
    }

    #[test]
    fn listed_classes_do_not_need_a_representation() {
        let e = entity("IFCWALL", Vec::new());
        assert_eq!(Element::new(&e).map(|e| e.class), Some(ElementClass::Wall));
    }
}
