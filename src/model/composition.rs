//! Assembly composition: linking children to assemblies and keeping the procurement rollup current.
//!
//! Every mutation runs in one transaction: link change and rollup commit together or not at all.

use super::entities::{Assembly, AssemblyPartLink, AvailableItem, ChildRef, Part};
use super::procurement::{EntityKind, ProcurementType};
use crate::config::EntitySchema;
use crate::error::AppError;
use crate::service::{record_into, rollback_after, CrudService, RequestValidator};
use crate::sql::{
    compile_delete, compile_fetch, compile_insert, compile_select_by_id, compile_update_columns,
    FetchRequest, OrderBy, QuerySpec, Record,
};
use serde_json::Value;
use sqlx::sqlite::SqliteConnection;
use sqlx::{Sqlite, Transaction};
use std::collections::HashSet;
use std::sync::Arc;

pub const ASSEMBLIES: &str = "Assemblies";
pub const PARTS: &str = "Parts";
pub const LINKS: &str = "Assemblies_Parts";

/// The three schemas composition works over, resolved once per call.
struct Tables {
    assemblies: Arc<EntitySchema>,
    parts: Arc<EntitySchema>,
    links: Arc<EntitySchema>,
}

#[derive(Clone)]
pub struct CompositionService {
    crud: CrudService,
}

impl CompositionService {
    pub fn new(crud: CrudService) -> Self {
        CompositionService { crud }
    }

    pub fn crud(&self) -> &CrudService {
        &self.crud
    }

    /// Assigns a stored part. Re-assigning adds to the existing quantity.
    /// Returns the assembly's procurement type after the rollup.
    pub async fn add_part(
        &self,
        assembly_id: i64,
        part_id: i64,
        quantity: f64,
    ) -> Result<ProcurementType, AppError> {
        check_quantity(quantity)?;
        let t = self.tables()?;
        let (_guard, mut tx) = self.crud.database().begin().await?;
        let result = async {
            let part: Part = fetch_by_id(&mut tx, &t.parts, part_id).await?;
            assign_in(&mut tx, &t, assembly_id, &part, quantity).await
        }
        .await;
        finish(tx, result).await
    }

    /// Assigns an already-loaded part view; its procurement type is coerced softly.
    pub async fn assign_part(
        &self,
        assembly_id: i64,
        part: &Part,
        quantity: f64,
    ) -> Result<ProcurementType, AppError> {
        check_quantity(quantity)?;
        let t = self.tables()?;
        let (_guard, mut tx) = self.crud.database().begin().await?;
        let result = assign_in(&mut tx, &t, assembly_id, part, quantity).await;
        finish(tx, result).await
    }

    /// Nests one assembly in another. The link caches the child's current procurement type.
    pub async fn add_subassembly(
        &self,
        parent_id: i64,
        child_id: i64,
        quantity: f64,
    ) -> Result<ProcurementType, AppError> {
        check_quantity(quantity)?;
        if parent_id == child_id {
            return Err(AppError::Validation(format!(
                "assembly {} cannot contain itself",
                parent_id
            )));
        }
        let t = self.tables()?;
        let (_guard, mut tx) = self.crud.database().begin().await?;
        let result = async {
            fetch_by_id::<Assembly>(&mut tx, &t.assemblies, parent_id).await?;
            let child: Assembly = fetch_by_id(&mut tx, &t.assemblies, child_id).await?;
            if contains_assembly(&mut tx, &t, child_id, parent_id).await? {
                return Err(AppError::Validation(format!(
                    "assembly {} already contains {}; nesting would form a cycle",
                    child_id, parent_id
                )));
            }
            let link = ChildRef::Assembly(child_id);
            link_child(&mut tx, &t, parent_id, link, child.procurement(), quantity).await?;
            recompute_in(&mut tx, &t, parent_id).await
        }
        .await;
        finish(tx, result).await
    }

    /// Replaces the quantity of an existing link.
    pub async fn set_quantity(
        &self,
        assembly_id: i64,
        child: ChildRef,
        quantity: f64,
    ) -> Result<ProcurementType, AppError> {
        check_quantity(quantity)?;
        let t = self.tables()?;
        let (_guard, mut tx) = self.crud.database().begin().await?;
        let result = async {
            let link = find_link(&mut tx, &t, assembly_id, child)
                .await?
                .ok_or_else(|| missing_link(assembly_id, child))?;
            let mut values = Record::new();
            values.insert("Quantity".into(), Value::from(quantity));
            update_columns(&mut tx, &t.links, link.id, values).await?;
            recompute_in(&mut tx, &t, assembly_id).await
        }
        .await;
        finish(tx, result).await
    }

    pub async fn remove_child(
        &self,
        assembly_id: i64,
        child: ChildRef,
    ) -> Result<ProcurementType, AppError> {
        let t = self.tables()?;
        let delete = compile_delete(&t.links)?;
        let (_guard, mut tx) = self.crud.database().begin().await?;
        let result = async {
            let link = find_link(&mut tx, &t, assembly_id, child)
                .await?
                .ok_or_else(|| missing_link(assembly_id, child))?;
            let mut values = Record::new();
            values.insert("ID".into(), Value::from(link.id));
            CrudService::execute(&mut tx, &delete, &values).await?;
            recompute_in(&mut tx, &t, assembly_id).await
        }
        .await;
        finish(tx, result).await
    }

    /// Recomputes and stores the rollup without changing any link.
    pub async fn recompute(&self, assembly_id: i64) -> Result<ProcurementType, AppError> {
        let t = self.tables()?;
        let (_guard, mut tx) = self.crud.database().begin().await?;
        let result = async {
            fetch_by_id::<Assembly>(&mut tx, &t.assemblies, assembly_id).await?;
            recompute_in(&mut tx, &t, assembly_id).await
        }
        .await;
        finish(tx, result).await
    }

    pub async fn procurement_type(&self, assembly_id: i64) -> Result<ProcurementType, AppError> {
        let row = self
            .crud
            .fetch_one(ASSEMBLIES, &Value::from(assembly_id), false)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", ASSEMBLIES, assembly_id)))?;
        let assembly: Assembly = record_into(ASSEMBLIES, row)?;
        Ok(assembly.procurement())
    }

    /// (name, quantity) of every direct child, in link order. Read-only.
    pub async fn list_parts(&self, assembly_id: i64) -> Result<Vec<(String, f64)>, AppError> {
        self.tables()?;
        let q = QuerySpec::from_sql(
            r#"SELECT COALESCE(p."PartName", a."AssemName", '') AS "Name", l."Quantity" AS "Quantity"
FROM "Assemblies_Parts" l
LEFT JOIN "Parts" p ON l."EntityType" = 'Part' AND p."PartID" = l."PartID"
LEFT JOIN "Assemblies" a ON l."EntityType" = 'Assembly' AND a."AssemblyID" = l."ChildAssemblyID"
WHERE l."ParentAssemblyID" = :ParentAssemblyID
ORDER BY l."ID""#,
        );
        let mut values = Record::new();
        values.insert("ParentAssemblyID".into(), Value::from(assembly_id));
        let rows = {
            let _guard = self.crud.database().exclusive()?;
            let mut conn = self.crud.database().pool().acquire().await?;
            CrudService::query_many(&mut conn, &q, &values).await?
        };
        Ok(rows
            .into_iter()
            .map(|r| {
                let name = r.get("Name").and_then(Value::as_str).unwrap_or_default().to_string();
                let qty = r.get("Quantity").and_then(Value::as_f64).unwrap_or_default();
                (name, qty)
            })
            .collect())
    }

    /// Full link rows of the assembly.
    pub async fn list_children(&self, assembly_id: i64) -> Result<Vec<AssemblyPartLink>, AppError> {
        let request = FetchRequest::new()
            .filter("ParentAssemblyID", assembly_id)
            .order_by(OrderBy::asc("ID"));
        self.crud.fetch_as(LINKS, &request).await
    }

    /// Parts and assemblies not yet directly linked to the assembly, excluding the assembly itself.
    pub async fn available_items(&self, assembly_id: i64) -> Result<Vec<AvailableItem>, AppError> {
        self.tables()?;
        let q = QuerySpec::from_sql(
            r#"SELECT "PartID" AS "ID", "PartName" AS "Name", 'Part' AS "EntityType", "ProcurementType"
FROM "Parts"
WHERE NOT EXISTS (
  SELECT 1 FROM "Assemblies_Parts" l
  WHERE l."ParentAssemblyID" = :AssemblyID AND l."EntityType" = 'Part' AND l."PartID" = "Parts"."PartID")
UNION ALL
SELECT "AssemblyID", "AssemName", 'Assembly', "ProcurementType"
FROM "Assemblies"
WHERE "AssemblyID" <> :AssemblyID AND NOT EXISTS (
  SELECT 1 FROM "Assemblies_Parts" l
  WHERE l."ParentAssemblyID" = :AssemblyID AND l."EntityType" = 'Assembly'
    AND l."ChildAssemblyID" = "Assemblies"."AssemblyID")
ORDER BY "EntityType" DESC, "ID""#,
        );
        let mut values = Record::new();
        values.insert("AssemblyID".into(), Value::from(assembly_id));
        let rows = {
            let _guard = self.crud.database().exclusive()?;
            let mut conn = self.crud.database().pool().acquire().await?;
            CrudService::query_many(&mut conn, &q, &values).await?
        };
        rows.into_iter().map(|r| record_into("available item", r)).collect()
    }

    fn tables(&self) -> Result<Tables, AppError> {
        Ok(Tables {
            assemblies: self.crud.schema(ASSEMBLIES)?,
            parts: self.crud.schema(PARTS)?,
            links: self.crud.schema(LINKS)?,
        })
    }
}

fn check_quantity(quantity: f64) -> Result<(), AppError> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(AppError::Validation(format!(
            "quantity must be a positive number (got {})",
            quantity
        )));
    }
    Ok(())
}

fn missing_link(assembly_id: i64, child: ChildRef) -> AppError {
    AppError::NotFound(format!(
        "{} {} is not part of assembly {}",
        child.kind(),
        child.id(),
        assembly_id
    ))
}

async fn finish<T>(
    tx: Transaction<'static, Sqlite>,
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    match result {
        Ok(v) => {
            tx.commit().await?;
            Ok(v)
        }
        Err(e) => {
            rollback_after(tx, &e).await;
            Err(e)
        }
    }
}

async fn fetch_by_id<T>(
    conn: &mut SqliteConnection,
    schema: &EntitySchema,
    id: i64,
) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned,
{
    let pk = schema.primary_key()?;
    let q = compile_select_by_id(schema, false)?;
    let mut values = Record::new();
    values.insert(pk.name.clone(), Value::from(id));
    let row = CrudService::query_optional(conn, &q, &values)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", schema.name, id)))?;
    record_into(&schema.name, row)
}

async fn assign_in(
    conn: &mut SqliteConnection,
    t: &Tables,
    assembly_id: i64,
    part: &Part,
    quantity: f64,
) -> Result<ProcurementType, AppError> {
    fetch_by_id::<Assembly>(conn, &t.assemblies, assembly_id).await?;
    link_child(conn, t, assembly_id, ChildRef::Part(part.id), part.procurement(), quantity).await?;
    recompute_in(conn, t, assembly_id).await
}

async fn find_link(
    conn: &mut SqliteConnection,
    t: &Tables,
    assembly_id: i64,
    child: ChildRef,
) -> Result<Option<AssemblyPartLink>, AppError> {
    let request = FetchRequest::new()
        .filter("ParentAssemblyID", assembly_id)
        .filter("EntityType", child.kind().as_str())
        .filter(child.link_column(), child.id());
    let q = compile_fetch(&t.links, &request)?;
    let rows = CrudService::query_many(conn, &q, &request.filter_values()).await?;
    rows.into_iter()
        .next()
        .map(|r| record_into(LINKS, r))
        .transpose()
}

/// One link row per (assembly, child): an existing link gets the quantity added.
async fn link_child(
    conn: &mut SqliteConnection,
    t: &Tables,
    assembly_id: i64,
    child: ChildRef,
    procurement: ProcurementType,
    quantity: f64,
) -> Result<(), AppError> {
    if let Some(link) = find_link(conn, t, assembly_id, child).await? {
        let mut values = Record::new();
        values.insert("Quantity".into(), Value::from(link.quantity + quantity));
        update_columns(conn, &t.links, link.id, values).await?;
        tracing::debug!(assembly_id, child = ?child, added = quantity, "link quantity increased");
        return Ok(());
    }

    let mut data = Record::new();
    data.insert("ParentAssemblyID".into(), Value::from(assembly_id));
    data.insert("EntityType".into(), Value::from(child.kind().as_str()));
    data.insert("ProcurementType".into(), Value::from(procurement.as_str()));
    data.insert(child.link_column().into(), Value::from(child.id()));
    data.insert("Quantity".into(), Value::from(quantity));
    let data = RequestValidator::prepare_insert(&t.links, &data)?;
    let insert = compile_insert(&t.links)?;
    CrudService::execute(conn, &insert, &data).await?;
    tracing::debug!(assembly_id, child = ?child, quantity, "link created");
    Ok(())
}

/// Writes the given columns of one row, coerced and validated against the current schema.
async fn update_columns(
    conn: &mut SqliteConnection,
    schema: &EntitySchema,
    id: i64,
    values: Record,
) -> Result<u64, AppError> {
    let columns: Vec<&str> = values.keys().map(String::as_str).collect();
    let q = compile_update_columns(schema, &columns)?;
    let mut bound = RequestValidator::prepare_update(schema, &values)?;
    bound.insert(schema.primary_key()?.name.clone(), Value::from(id));
    Ok(CrudService::execute(conn, &q, &bound).await?.rows_affected())
}

/// Does `ancestor` contain `target` at any depth?
async fn contains_assembly(
    conn: &mut SqliteConnection,
    t: &Tables,
    ancestor: i64,
    target: i64,
) -> Result<bool, AppError> {
    let mut seen = HashSet::new();
    let mut pending = vec![ancestor];
    while let Some(current) = pending.pop() {
        if !seen.insert(current) {
            continue;
        }
        let request = FetchRequest::new()
            .filter("ParentAssemblyID", current)
            .filter("EntityType", EntityKind::Assembly.as_str());
        let q = compile_fetch(&t.links, &request)?;
        for row in CrudService::query_many(conn, &q, &request.filter_values()).await? {
            match row.get("ChildAssemblyID").and_then(Value::as_i64) {
                Some(id) if id == target => return Ok(true),
                Some(id) => pending.push(id),
                None => {}
            }
        }
    }
    Ok(false)
}

/// Rolls the direct children's cached types up into the assembly and stores the result.
async fn recompute_in(
    conn: &mut SqliteConnection,
    t: &Tables,
    assembly_id: i64,
) -> Result<ProcurementType, AppError> {
    let request = FetchRequest::new().filter("ParentAssemblyID", assembly_id);
    let q = compile_fetch(&t.links, &request)?;
    let children: Vec<ProcurementType> = CrudService::query_many(conn, &q, &request.filter_values())
        .await?
        .iter()
        .map(|r| {
            let raw = r.get("ProcurementType").and_then(Value::as_str);
            ProcurementType::coerce("Assemblies_Parts.ProcurementType", raw)
        })
        .collect();
    let rolled = ProcurementType::rollup(children);

    let mut values = Record::new();
    values.insert("ProcurementType".into(), Value::from(rolled.as_str()));
    if update_columns(conn, &t.assemblies, assembly_id, values).await? == 0 {
        return Err(AppError::NotFound(format!("{} {}", ASSEMBLIES, assembly_id)));
    }
    tracing::info!(assembly_id, procurement = %rolled, "procurement type recomputed");
    Ok(rolled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_service;
    use serde_json::json;

    fn record(v: Value) -> Record {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    async fn setup() -> CompositionService {
        CompositionService::new(test_service().await)
    }

    async fn assembly(c: &CompositionService, name: &str) -> i64 {
        let out = c.crud().add(ASSEMBLIES, record(json!({"AssemName": name}))).await.unwrap();
        out.id.as_i64().unwrap()
    }

    async fn part(c: &CompositionService, name: &str, procurement: &str) -> i64 {
        let out = c
            .crud()
            .add(PARTS, record(json!({"PartName": name, "ProcurementType": procurement})))
            .await
            .unwrap();
        out.id.as_i64().unwrap()
    }

    #[tokio::test]
    async fn robot_arm_rollup() {
        let c = setup().await;
        let arm = assembly(&c, "Robot Arm").await;
        let bolt = part(&c, "Bolt", "Purchase").await;
        let frame = part(&c, "Frame", "Make").await;

        assert_eq!(c.add_part(arm, bolt, 10.0).await.unwrap(), ProcurementType::Purchase);
        assert_eq!(c.procurement_type(arm).await.unwrap(), ProcurementType::Purchase);
        assert_eq!(c.add_part(arm, frame, 1.0).await.unwrap(), ProcurementType::Hybrid);
        assert_eq!(c.procurement_type(arm).await.unwrap(), ProcurementType::Hybrid);
    }

    #[tokio::test]
    async fn only_make_children_roll_up_to_make() {
        let c = setup().await;
        let a = assembly(&c, "Bracket").await;
        let p = part(&c, "Plate", "Make").await;
        assert_eq!(c.add_part(a, p, 2.0).await.unwrap(), ProcurementType::Make);
    }

    #[tokio::test]
    async fn reassignment_adds_quantity_on_one_row() {
        let c = setup().await;
        let a = assembly(&c, "Arm").await;
        let p = part(&c, "Bolt", "Purchase").await;
        c.add_part(a, p, 3.0).await.unwrap();
        c.add_part(a, p, 4.5).await.unwrap();
        let links = c.list_children(a).await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].quantity, 7.5);
        assert_eq!(c.list_parts(a).await.unwrap(), vec![("Bolt".to_string(), 7.5)]);
    }

    #[tokio::test]
    async fn generic_writes_cannot_duplicate_a_link() {
        let c = setup().await;
        let a = assembly(&c, "Arm").await;
        let p = part(&c, "Bolt", "Purchase").await;
        c.add_part(a, p, 2.0).await.unwrap();
        let link = c.list_children(a).await.unwrap()[0].id;

        let err = c.crud().clone_item(LINKS, Value::from(link)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = c
            .crud()
            .add(
                LINKS,
                record(json!({"ParentAssemblyID": a, "EntityType": "Part", "PartID": p, "Quantity": 1})),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        c.add_part(a, p, 3.0).await.unwrap();
        let links = c.list_children(a).await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].quantity, 5.0);
        assert_eq!(c.list_parts(a).await.unwrap(), vec![("Bolt".to_string(), 5.0)]);
    }

    #[tokio::test]
    async fn removing_last_child_resets_to_purchase() {
        let c = setup().await;
        let a = assembly(&c, "Arm").await;
        let p = part(&c, "Frame", "Make").await;
        assert_eq!(c.add_part(a, p, 1.0).await.unwrap(), ProcurementType::Make);
        assert_eq!(c.remove_child(a, ChildRef::Part(p)).await.unwrap(), ProcurementType::Purchase);
        assert!(c.list_parts(a).await.unwrap().is_empty());
        let err = c.remove_child(a, ChildRef::Part(p)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn set_quantity_replaces_and_validates() {
        let c = setup().await;
        let a = assembly(&c, "Arm").await;
        let p = part(&c, "Bolt", "Purchase").await;
        c.add_part(a, p, 3.0).await.unwrap();
        c.set_quantity(a, ChildRef::Part(p), 12.0).await.unwrap();
        assert_eq!(c.list_parts(a).await.unwrap()[0].1, 12.0);
        assert!(matches!(
            c.set_quantity(a, ChildRef::Part(p), 0.0).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            c.add_part(a, p, f64::NAN).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            c.set_quantity(a, ChildRef::Part(p + 100), 1.0).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn missing_part_leaves_nothing_behind() {
        let c = setup().await;
        let a = assembly(&c, "Arm").await;
        let err = c.add_part(a, 404, 1.0).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(c.list_children(a).await.unwrap().is_empty());
        assert!(c.crud().database().exclusive().is_ok());
    }

    #[tokio::test]
    async fn unknown_part_procurement_defaults_to_purchase() {
        let c = setup().await;
        let a = assembly(&c, "Arm").await;
        sqlx::query("INSERT INTO Parts (PartName, ProcurementType) VALUES ('Legacy', NULL), ('Odd', 'Buy')")
            .execute(c.crud().database().pool())
            .await
            .unwrap();
        c.add_part(a, 1, 1.0).await.unwrap();
        assert_eq!(c.add_part(a, 2, 1.0).await.unwrap(), ProcurementType::Purchase);
        let links = c.list_children(a).await.unwrap();
        assert!(links.iter().all(|l| l.procurement_type.as_deref() == Some("Purchase")));
    }

    #[tokio::test]
    async fn hybrid_subassembly_alone_rolls_up_to_purchase() {
        let c = setup().await;
        let top = assembly(&c, "Robot").await;
        let arm = assembly(&c, "Arm").await;
        let bolt = part(&c, "Bolt", "Purchase").await;
        let frame = part(&c, "Frame", "Make").await;
        c.add_part(arm, bolt, 10.0).await.unwrap();
        c.add_part(arm, frame, 1.0).await.unwrap();
        assert_eq!(c.add_subassembly(top, arm, 2.0).await.unwrap(), ProcurementType::Purchase);
        assert_eq!(c.list_parts(top).await.unwrap(), vec![("Arm".to_string(), 2.0)]);
        let links = c.list_children(top).await.unwrap();
        assert_eq!(links[0].child(), Some(ChildRef::Assembly(arm)));
        assert_eq!(links[0].cached_procurement(), ProcurementType::Hybrid);

        let motor = part(&c, "Motor", "Make").await;
        assert_eq!(c.add_part(top, motor, 1.0).await.unwrap(), ProcurementType::Hybrid);
    }

    #[tokio::test]
    async fn rollup_reads_cached_type_only() {
        let c = setup().await;
        let top = assembly(&c, "Robot").await;
        let arm = assembly(&c, "Arm").await;
        c.add_subassembly(top, arm, 1.0).await.unwrap();
        let frame = part(&c, "Frame", "Make").await;
        c.add_part(arm, frame, 1.0).await.unwrap();
        assert_eq!(c.procurement_type(arm).await.unwrap(), ProcurementType::Make);
        assert_eq!(c.recompute(top).await.unwrap(), ProcurementType::Purchase);
    }

    #[tokio::test]
    async fn nesting_rejects_self_and_cycles() {
        let c = setup().await;
        let a = assembly(&c, "A").await;
        let b = assembly(&c, "B").await;
        assert!(matches!(c.add_subassembly(a, a, 1.0).await, Err(AppError::Validation(_))));
        c.add_subassembly(a, b, 1.0).await.unwrap();
        assert!(matches!(c.add_subassembly(b, a, 1.0).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn available_items_skip_linked_and_self() {
        let c = setup().await;
        let a = assembly(&c, "A").await;
        let b = assembly(&c, "B").await;
        let bolt = part(&c, "Bolt", "Purchase").await;
        let nut = part(&c, "Nut", "Purchase").await;
        c.add_part(a, bolt, 1.0).await.unwrap();
        let items = c.available_items(a).await.unwrap();
        let ids: Vec<(EntityKind, i64)> = items.iter().map(|i| (i.entity_type, i.id)).collect();
        assert_eq!(ids, vec![(EntityKind::Part, nut), (EntityKind::Assembly, b)]);
    }

    #[tokio::test]
    async fn recompute_missing_assembly_is_not_found() {
        let c = setup().await;
        assert!(matches!(c.recompute(77).await, Err(AppError::NotFound(_))));
    }
}
