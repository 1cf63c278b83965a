//! Material takeoff: name resolution, translation to catalog keys and
//! accumulation of per-material totals.

pub mod accumulator;
pub mod resolver;
pub mod translation;
pub mod unknown;

pub use accumulator::{LayerMeasurePolicy, MaterialAccumulator, MaterialProperties};
pub use resolver::{resolve_material_names, MaterialName, MaterialNames};
pub use translation::{TranslationSource, TranslationTable};
pub use unknown::{UnknownNameReport, UnknownNames};
