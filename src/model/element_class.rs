use serde::Serialize;

/// Closed classification of IFC products, decided once per element from
/// its entity type. Standard-case and elemented-case subtypes fold into
/// their supertype so rules never compare type strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ElementClass {
    Wall,
    Slab,
    Space,
    Door,
    Window,
    Opening,
    Proxy,
    Column,
    Beam,
    Roof,
    Covering,
    Stair,
    Ramp,
    Railing,
    CurtainWall,
    Plate,
    Member,
    Footing,
    Pile,
    Furnishing,
    Other,
}

const PRODUCT_CLASSES: &[(&str, ElementClass)] = &[
    ("IFCWALL", ElementClass::Wall),
    ("IFCWALLSTANDARDCASE", ElementClass::Wall),
    ("IFCWALLELEMENTEDCASE", ElementClass::Wall),
    ("IFCSLAB", ElementClass::Slab),
    ("IFCSLABSTANDARDCASE", ElementClass::Slab),
    ("IFCSLABELEMENTEDCASE", ElementClass::Slab),
    ("IFCSPACE", ElementClass::Space),
    ("IFCDOOR", ElementClass::Door),
    ("IFCDOORSTANDARDCASE", ElementClass::Door),
    ("IFCWINDOW", ElementClass::Window),
    ("IFCWINDOWSTANDARDCASE", ElementClass::Window),
    ("IFCOPENINGELEMENT", ElementClass::Opening),
    ("IFCOPENINGSTANDARDCASE", ElementClass::Opening),
    ("IFCVOIDINGFEATURE", ElementClass::Opening),
    ("IFCBUILDINGELEMENTPROXY", ElementClass::Proxy),
    ("IFCCOLUMN", ElementClass::Column),
    ("IFCCOLUMNSTANDARDCASE", ElementClass::Column),
    ("IFCBEAM", ElementClass::Beam),
    ("IFCBEAMSTANDARDCASE", ElementClass::Beam),
    ("IFCROOF", ElementClass::Roof),
    ("IFCCOVERING", ElementClass::Covering),
    ("IFCSTAIR", ElementClass::Stair),
    ("IFCSTAIRFLIGHT", ElementClass::Stair),
    ("IFCRAMP", ElementClass::Ramp),
    ("IFCRAMPFLIGHT", ElementClass::Ramp),
    ("IFCRAILING", ElementClass::Railing),
    ("IFCCURTAINWALL", ElementClass::CurtainWall),
    ("IFCPLATE", ElementClass::Plate),
    ("IFCPLATESTANDARDCASE", ElementClass::Plate),
    ("IFCMEMBER", ElementClass::Member),
    ("IFCMEMBERSTANDARDCASE", ElementClass::Member),
    ("IFCFOOTING", ElementClass::Footing),
    ("IFCPILE", ElementClass::Pile),
    ("IFCFURNISHINGELEMENT", ElementClass::Furnishing),
    ("IFCFURNITURE", ElementClass::Furnishing),
    ("IFCCHIMNEY", ElementClass::Other),
    ("IFCSHADINGDEVICE", ElementClass::Other),
    ("IFCBUILDINGELEMENTPART", ElementClass::Other),
    ("IFCELEMENTASSEMBLY", ElementClass::Other),
    ("IFCDISCRETEACCESSORY", ElementClass::Other),
    ("IFCMECHANICALFASTENER", ElementClass::Other),
    ("IFCFLOWTERMINAL", ElementClass::Other),
    ("IFCFLOWSEGMENT", ElementClass::Other),
    ("IFCFLOWFITTING", ElementClass::Other),
    ("IFCSANITARYTERMINAL", ElementClass::Other),
    ("IFCTRANSPORTELEMENT", ElementClass::Other),
];

/// Entities laid out like products that are never walked.
const NON_PRODUCTS: &[&str] = &[
    "IFCPROJECT",
    "IFCSITE",
    "IFCBUILDING",
    "IFCBUILDINGSTOREY",
    "IFCSPATIALZONE",
    "IFCEXTERNALSPATIALELEMENT",
    "IFCFACILITY",
    "IFCFACILITYPART",
    "IFCBRIDGE",
    "IFCBRIDGEPART",
    "IFCROAD",
    "IFCROADPART",
    "IFCRAILWAY",
    "IFCRAILWAYPART",
    "IFCMARINEFACILITY",
    "IFCGRID",
    "IFCANNOTATION",
    "IFCVIRTUALELEMENT",
    "IFCPROXY",
    "IFCPORT",
    "IFCDISTRIBUTIONPORT",
];

impl ElementClass {
    /// Classifies an upper-case STEP entity name. `None` means the entity
    /// is not a walked product (spatial structure, relationships, geometry).
    #[must_use]
    pub fn from_entity_type(entity_type: &str) -> Option<Self> {
        PRODUCT_CLASSES
            .iter()
            .find(|(name, _)| *name == entity_type)
            .map(|(_, class)| *class)
    }

    /// Spatial structure, relationships, structural analysis items, types
    /// and annotation. Anything else with a product layout is walked as
    /// [`ElementClass::Other`].
    #[must_use]
    pub fn is_non_product(entity_type: &str) -> bool {
        NON_PRODUCTS.contains(&entity_type)
            || entity_type.starts_with("IFCREL")
            || entity_type.starts_with("IFCSTRUCTURAL")
            || entity_type.starts_with("IFCALIGNMENT")
            || entity_type.ends_with("TYPE")
            || entity_type.ends_with("STYLE")
    }

    #[must_use]
    pub fn is_slab(self) -> bool {
        self == ElementClass::Slab
    }

    #[must_use]
    pub fn is_space(self) -> bool {
        self == ElementClass::Space
    }

    /// Whether the element carries no material takeoff. Doors and windows
    /// are only excluded from the priced variant.
    #[must_use]
    pub fn skips_materials(self, priced: bool) -> bool {
        match self {
            ElementClass::Space | ElementClass::Opening | ElementClass::Proxy => true,
            ElementClass::Door | ElementClass::Window => priced,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtypes_fold_into_supertype() {
        assert_eq!(
            ElementClass::from_entity_type("IFCWALLSTANDARDCASE"),
            Some(ElementClass::Wall)
        );
        assert_eq!(
            ElementClass::from_entity_type("IFCSLABSTANDARDCASE"),
            Some(ElementClass::Slab)
        );
    }

    #[test]
    fn spatial_structure_is_not_a_product() {
        assert_eq!(ElementClass::from_entity_type("IFCBUILDINGSTOREY"), None);
        assert_eq!(ElementClass::from_entity_type("IFCSITE"), None);
        assert_eq!(ElementClass::from_entity_type("IFCMATERIAL"), None);
    }

    #[test]
    fn non_products_are_recognized_by_name() {
        for name in [
            "IFCBUILDINGSTOREY",
            "IFCRELCONTAINEDINSPATIALSTRUCTURE",
            "IFCSTRUCTURALCURVEMEMBER",
            "IFCWALLTYPE",
            "IFCDOORSTYLE",
            "IFCANNOTATION",
            "IFCALIGNMENTSEGMENT",
        ] {
            assert!(ElementClass::is_non_product(name), "{name}");
        }
        assert!(!ElementClass::is_non_product("IFCREINFORCINGBAR"));
        assert!(!ElementClass::is_non_product("IFCPIPESEGMENT"));
    }

    #[test]
    fn material_exclusions_depend_on_pricing() {
        assert!(ElementClass::Space.skips_materials(false));
        assert!(ElementClass::Opening.skips_materials(false));
        assert!(ElementClass::Proxy.skips_materials(false));
        assert!(!ElementClass::Door.skips_materials(false));
        assert!(ElementClass::Door.skips_materials(true));
        assert!(ElementClass::Window.skips_materials(true));
        assert!(!ElementClass::Wall.skips_materials(true));
    }
}
