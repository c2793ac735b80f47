//! Maintenance entry point for an inventory database.
//!
//! `bom-admin`              row count per entity
//! `bom-admin backup`       timestamped copy into BOM_BACKUP_DIR
//! `bom-admin dump Parts`   every row of one entity as JSON
//! `bom-admin refresh`      reconcile the registry with the live tables

use bom_inventory::{
    apply_migrations, backup_database, load_registry, CrudService, Database, FetchRequest, Settings,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("bom_inventory=info")),
        )
        .init();

    let settings = Settings::from_env();
    let registry = load_registry(settings.schema_path.as_deref()).await?;
    let db = Database::connect(&settings).await?;
    apply_migrations(&db, &registry).await?;
    let names: Vec<String> = registry.entity_names().map(str::to_string).collect();
    let crud = CrudService::new(db.clone(), registry);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("backup") => {
            let path = backup_database(&db, &settings.backup_dir).await?;
            println!("{}", path.display());
        }
        Some("dump") => {
            let entity = args.get(1).ok_or("usage: bom-admin dump <Entity>")?;
            let rows = crud.fetch_all(entity, &FetchRequest::new().with_admin()).await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Some("refresh") => {
            for name in &names {
                let report = crud.refresh_from_storage(name).await?;
                println!(
                    "{}: kept {}, added {:?}, dropped {:?}",
                    name,
                    report.kept.len(),
                    report.added,
                    report.dropped
                );
            }
        }
        Some(other) => {
            tracing::error!(command = %other, "unknown command");
            return Err(format!("unknown command '{}' (expected backup, dump or refresh)", other).into());
        }
        None => {
            for name in &names {
                let rows = crud.fetch_all(name, &FetchRequest::new()).await?;
                println!("{:<20} {}", name, rows.len());
            }
        }
    }

    db.close().await;
    Ok(())
}
