use crate::libs::config::DatabaseSettings;
use crate::libs::schema::{ColumnSchema, ForeignKeySchema};
use async_trait::async_trait;
use log::{debug, warn};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection, query_as};

/// Read access to a relational database's catalog.
///
/// Every method reports results in the order the catalog returns them.
#[async_trait]
pub trait Catalog: Send {
    async fn list_tables(&mut self) -> sqlx::Result<Vec<String>>;

    /// Columns of `table` with `foreign_key` left unset.
    async fn list_columns(&mut self, table: &str) -> sqlx::Result<Vec<ColumnSchema>>;

    /// Primary-key columns in constraint order; empty if the table has none.
    async fn primary_key(&mut self, table: &str) -> sqlx::Result<Vec<String>>;

    async fn foreign_keys(&mut self, table: &str) -> sqlx::Result<Vec<ForeignKeySchema>>;

    /// End the session, letting the server know the connection is going away.
    async fn close(self: Box<Self>) -> sqlx::Result<()> {
        Ok(())
    }
}

/// Opens catalog sessions against one database.
#[async_trait]
pub trait CatalogConnector: Send + Sync {
    fn database_name(&self) -> &str;

    async fn connect(&self) -> sqlx::Result<Box<dyn Catalog>>;

    /// Round-trip to the server, returning its current time as text.
    async fn ping(&self) -> sqlx::Result<String>;
}

const LIST_TABLES: &str = r#"
SELECT c.relname::text
FROM pg_catalog.pg_class c
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
WHERE n.nspname = $1 AND c.relkind IN ('r', 'p')
ORDER BY c.relname
"#;

const LIST_COLUMNS: &str = r#"
SELECT a.attname::text,
       pg_catalog.format_type(a.atttypid, a.atttypmod),
       NOT a.attnotnull,
       EXISTS (
           SELECT 1 FROM pg_catalog.pg_index i
           WHERE i.indrelid = c.oid AND i.indisprimary AND a.attnum = ANY (i.indkey)
       )
FROM pg_catalog.pg_attribute a
JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
WHERE n.nspname = $1 AND c.relname = $2 AND a.attnum > 0 AND NOT a.attisdropped
ORDER BY a.attnum
"#;

const PRIMARY_KEY: &str = r#"
SELECT a.attname::text
FROM pg_catalog.pg_constraint con
JOIN pg_catalog.pg_class c ON c.oid = con.conrelid
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
CROSS JOIN LATERAL unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord)
JOIN pg_catalog.pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
WHERE n.nspname = $1 AND c.relname = $2 AND con.contype = 'p'
ORDER BY k.ord
"#;

const FOREIGN_KEYS: &str = r#"
SELECT
    ARRAY(
        SELECT a.attname::text
        FROM unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord)
        JOIN pg_catalog.pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
        ORDER BY k.ord
    ),
    rc.relname::text,
    ARRAY(
        SELECT a.attname::text
        FROM unnest(con.confkey) WITH ORDINALITY AS k(attnum, ord)
        JOIN pg_catalog.pg_attribute a ON a.attrelid = con.confrelid AND a.attnum = k.attnum
        ORDER BY k.ord
    )
FROM pg_catalog.pg_constraint con
JOIN pg_catalog.pg_class c ON c.oid = con.conrelid
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
JOIN pg_catalog.pg_class rc ON rc.oid = con.confrelid
WHERE n.nspname = $1 AND c.relname = $2 AND con.contype = 'f'
ORDER BY con.conname
"#;

/// Catalog session over a single PostgreSQL connection.
pub struct PgCatalog {
    conn: PgConnection,
    schema: String,
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn list_tables(&mut self) -> sqlx::Result<Vec<String>> {
        let rows: Vec<(String,)> = query_as(LIST_TABLES)
            .bind(&self.schema)
            .fetch_all(&mut self.conn)
            .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn list_columns(&mut self, table: &str) -> sqlx::Result<Vec<ColumnSchema>> {
        let rows: Vec<(String, String, bool, bool)> = query_as(LIST_COLUMNS)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&mut self.conn)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(name, sql_type, nullable, primary_key)| {
                ColumnSchema::new(&name, &sql_type, nullable, primary_key)
            })
            .collect())
    }

    async fn primary_key(&mut self, table: &str) -> sqlx::Result<Vec<String>> {
        let rows: Vec<(String,)> = query_as(PRIMARY_KEY)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&mut self.conn)
            .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn foreign_keys(&mut self, table: &str) -> sqlx::Result<Vec<ForeignKeySchema>> {
        let rows: Vec<(Vec<String>, String, Vec<String>)> = query_as(FOREIGN_KEYS)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&mut self.conn)
            .await?;
        Ok(rows
            .into_iter()
            .map(
                |(constrained_columns, referred_table, referred_columns)| ForeignKeySchema {
                    constrained_columns,
                    referred_table,
                    referred_columns,
                },
            )
            .collect())
    }

    async fn close(self: Box<Self>) -> sqlx::Result<()> {
        self.conn.close().await
    }
}

/// Connects to PostgreSQL with one short-lived connection per session.
pub struct PgConnector {
    options: PgConnectOptions,
    database_name: String,
    schema: String,
}

impl PgConnector {
    pub fn new(settings: &DatabaseSettings) -> Self {
        Self {
            options: settings.connect_options(),
            database_name: settings.name.clone(),
            schema: settings.schema.clone(),
        }
    }

    async fn open(&self) -> sqlx::Result<PgConnection> {
        debug!("Connecting to database {}", self.database_name);
        self.options.connect().await
    }
}

#[async_trait]
impl CatalogConnector for PgConnector {
    fn database_name(&self) -> &str {
        &self.database_name
    }

    async fn connect(&self) -> sqlx::Result<Box<dyn Catalog>> {
        let conn = self.open().await?;
        Ok(Box::new(PgCatalog {
            conn,
            schema: self.schema.clone(),
        }))
    }

    async fn ping(&self) -> sqlx::Result<String> {
        let mut conn = self.open().await?;
        let row: sqlx::Result<(String,)> = query_as("SELECT NOW()::text")
            .fetch_one(&mut conn)
            .await;
        if let Err(e) = conn.close().await {
            warn!("Closing connection to {} failed: {}", self.database_name, e);
        }
        let (now,) = row?;
        Ok(now)
    }
}
