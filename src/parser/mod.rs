pub mod ifc;
pub mod step;

pub use crate::error::ModelOpenError;
pub use ifc::{index_project, parse_ifc_file};
pub use step::{StepEntity, StepFile, StepValue};
