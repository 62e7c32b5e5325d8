use crate::libs::catalog::{Catalog, CatalogConnector};
use crate::libs::error::{EmrError, Result};
use crate::libs::schema::{DatabaseSchema, ForeignKeySchema, ForeignKeyTarget, TableSchema};
use log::{error, info, warn};

/// Describe every table of the connector's database.
///
/// An unreachable database is `ConnectionFailed`; any catalog query failing
/// afterwards aborts the whole mapping with `MappingFailed`.
pub async fn map_schema(connector: &dyn CatalogConnector) -> Result<DatabaseSchema> {
    let database_name = connector.database_name();
    let mut catalog = connector.connect().await.map_err(|e| {
        error!("DB connection failed during mapping of {}: {}", database_name, e);
        EmrError::ConnectionFailed(e)
    })?;

    let mapped = map_catalog(catalog.as_mut(), database_name).await;
    if let Err(e) = catalog.close().await {
        warn!("Closing connection to {} failed: {}", database_name, e);
    }
    let schema = mapped.map_err(|e| {
        error!("Mapping of {} failed: {}", database_name, e);
        EmrError::MappingFailed(e)
    })?;
    info!(
        "Mapped {} table(s) in database {}",
        schema.tables.len(),
        database_name
    );
    Ok(schema)
}

async fn map_catalog(catalog: &mut dyn Catalog, database_name: &str) -> sqlx::Result<DatabaseSchema> {
    let table_names = catalog.list_tables().await?;
    if table_names.is_empty() {
        return Ok(DatabaseSchema::empty(database_name));
    }

    let mut tables = Vec::with_capacity(table_names.len());
    for name in table_names {
        tables.push(describe_table(catalog, name).await?);
    }

    Ok(DatabaseSchema {
        database_name: database_name.to_string(),
        tables,
        message: None,
    })
}

async fn describe_table(catalog: &mut dyn Catalog, name: String) -> sqlx::Result<TableSchema> {
    let mut columns = catalog.list_columns(&name).await?;
    let foreign_keys = catalog.foreign_keys(&name).await?;
    for column in &mut columns {
        column.foreign_key = column_foreign_key(&column.name, &foreign_keys);
    }

    let primary_key = catalog.primary_key(&name).await?;

    Ok(TableSchema {
        name,
        columns,
        primary_key_columns: (!primary_key.is_empty()).then_some(primary_key),
        foreign_keys: (!foreign_keys.is_empty()).then_some(foreign_keys),
    })
}

/// The first foreign key constraining exactly `column`. Later constraints on
/// the same column only show up in the table-level list.
fn column_foreign_key(column: &str, foreign_keys: &[ForeignKeySchema]) -> Option<ForeignKeyTarget> {
    let fk = foreign_keys
        .iter()
        .find(|fk| fk.constrained_columns.len() == 1 && fk.constrained_columns[0] == column)?;
    Some(ForeignKeyTarget {
        referred_table: fk.referred_table.clone(),
        referred_column: fk.referred_columns.first()?.clone(),
    })
}

/// Ask the database for its current time.
pub async fn check_connection(connector: &dyn CatalogConnector) -> Result<String> {
    connector.ping().await.map_err(|e| {
        error!("DB connection check failed: {}", e);
        EmrError::ConnectionFailed(e)
    })
}
