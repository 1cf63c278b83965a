pub mod element;
pub mod element_class;
pub mod project;

pub use element::Element;
pub use element_class::ElementClass;
pub use project::{IfcProject, Storey};
