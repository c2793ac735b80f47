//! Transient typed views over fetched rows. Built on demand, never cached.

use super::procurement::{EntityKind, ProcurementType};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(rename = "PartID")]
    pub id: i64,
    #[serde(rename = "PartName")]
    pub name: String,
    #[serde(rename = "Model", default)]
    pub model: Option<String>,
    #[serde(rename = "Make", default)]
    pub make: Option<String>,
    #[serde(rename = "Manufacturer", default)]
    pub manufacturer: Option<String>,
    #[serde(rename = "DrawingID", default)]
    pub drawing_id: Option<i64>,
    #[serde(rename = "ManPartNum", default)]
    pub man_part_num: Option<String>,
    #[serde(rename = "ProcurementType", default)]
    pub procurement_type: Option<String>,
    #[serde(rename = "PartWeight", default)]
    pub weight: Option<f64>,
    #[serde(rename = "PartMaterial", default)]
    pub material: Option<String>,
}

impl Part {
    /// Stored type, or `Purchase` (with a warning) when absent or unknown.
    pub fn procurement(&self) -> ProcurementType {
        ProcurementType::coerce("Parts.ProcurementType", self.procurement_type.as_deref())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assembly {
    #[serde(rename = "AssemblyID")]
    pub id: i64,
    #[serde(rename = "AssemName")]
    pub name: String,
    #[serde(rename = "AssemCost", default)]
    pub cost: Option<f64>,
    #[serde(rename = "AssemWeight", default)]
    pub weight: Option<f64>,
    #[serde(rename = "AssemStatus", default)]
    pub status: Option<String>,
    #[serde(rename = "AssemNotes", default)]
    pub notes: Option<String>,
    #[serde(rename = "ProcurementType", default)]
    pub procurement_type: Option<String>,
}

impl Assembly {
    pub fn procurement(&self) -> ProcurementType {
        ProcurementType::coerce("Assemblies.ProcurementType", self.procurement_type.as_deref())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    #[serde(rename = "SupplierID")]
    pub id: i64,
    #[serde(rename = "SupplierName")]
    pub name: String,
    #[serde(rename = "PricePerUnit", default)]
    pub price_per_unit: Option<f64>,
    #[serde(rename = "PartID", default)]
    pub part_id: Option<i64>,
    #[serde(rename = "UnitOfOrder", default)]
    pub unit_of_order: Option<String>,
    #[serde(rename = "WebRef", default)]
    pub web_ref: Option<String>,
}

/// One row of `Assemblies_Parts`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssemblyPartLink {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "ParentAssemblyID")]
    pub parent_id: i64,
    #[serde(rename = "EntityType")]
    pub entity_type: EntityKind,
    #[serde(rename = "ProcurementType", default)]
    pub procurement_type: Option<String>,
    #[serde(rename = "ChildAssemblyID", default)]
    pub child_assembly_id: Option<i64>,
    #[serde(rename = "PartID", default)]
    pub part_id: Option<i64>,
    #[serde(rename = "Quantity")]
    pub quantity: f64,
}

impl AssemblyPartLink {
    /// The linked child, by kind and id.
    pub fn child(&self) -> Option<ChildRef> {
        match self.entity_type {
            EntityKind::Part => self.part_id.map(ChildRef::Part),
            EntityKind::Assembly => self.child_assembly_id.map(ChildRef::Assembly),
        }
    }

    pub fn cached_procurement(&self) -> ProcurementType {
        ProcurementType::coerce("Assemblies_Parts.ProcurementType", self.procurement_type.as_deref())
    }
}

/// Identifies a direct child of an assembly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChildRef {
    Part(i64),
    Assembly(i64),
}

impl ChildRef {
    pub fn kind(self) -> EntityKind {
        match self {
            ChildRef::Part(_) => EntityKind::Part,
            ChildRef::Assembly(_) => EntityKind::Assembly,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            ChildRef::Part(id) | ChildRef::Assembly(id) => id,
        }
    }

    /// Link column holding the child's id.
    pub fn link_column(self) -> &'static str {
        match self {
            ChildRef::Part(_) => "PartID",
            ChildRef::Assembly(_) => "ChildAssemblyID",
        }
    }
}

/// A part or assembly that could still be added to a given assembly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AvailableItem {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "EntityType")]
    pub entity_type: EntityKind,
    #[serde(rename = "ProcurementType", default)]
    pub procurement_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn part_reads_from_row_shape() {
        let part: Part = serde_json::from_value(json!({
            "PartID": 3,
            "PartName": "Bolt",
            "Model": null,
            "ProcurementType": "Make",
            "PartWeight": 0.25,
            "Dimensions": "M8"
        }))
        .unwrap();
        assert_eq!(part.id, 3);
        assert_eq!(part.procurement(), ProcurementType::Make);
        assert_eq!(part.weight, Some(0.25));
    }

    #[test]
    fn link_knows_its_child() {
        let link: AssemblyPartLink = serde_json::from_value(json!({
            "ID": 1,
            "ParentAssemblyID": 7,
            "EntityType": "Assembly",
            "ProcurementType": "Hybrid",
            "ChildAssemblyID": 9,
            "PartID": null,
            "Quantity": 2
        }))
        .unwrap();
        assert_eq!(link.child(), Some(ChildRef::Assembly(9)));
        assert_eq!(link.cached_procurement(), ProcurementType::Hybrid);
        assert_eq!(link.quantity, 2.0);
    }
}
