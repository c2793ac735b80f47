//! Composition model: typed views, procurement rollup, assembly composition.

mod composition;
mod entities;
mod procurement;

pub use composition::{CompositionService, ASSEMBLIES, LINKS, PARTS};
pub use entities::{Assembly, AssemblyPartLink, AvailableItem, ChildRef, Part, Supplier};
pub use procurement::{EntityKind, ProcurementType};
