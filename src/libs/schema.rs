// schema.rs
use serde::Serialize;

/// Target of a single-column foreign key, as shown on the column itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyTarget {
    pub referred_table: String,
    pub referred_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: String,
    pub nullable: bool,
    pub primary_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKeyTarget>,
}

impl ColumnSchema {
    pub fn new(name: &str, sql_type: &str, nullable: bool, primary_key: bool) -> Self {
        Self {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            nullable,
            primary_key,
            foreign_key: None,
        }
    }
}

/// One FOREIGN KEY constraint; both column lists are in constraint order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeySchema {
    pub constrained_columns: Vec<String>,
    pub referred_table: String,
    pub referred_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_key_columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_keys: Option<Vec<ForeignKeySchema>>,
}

/// Snapshot of a database catalog, rebuilt on every mapping call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseSchema {
    pub database_name: String,
    pub tables: Vec<TableSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DatabaseSchema {
    /// A database without tables; reported with a message, not as an error.
    pub fn empty(database_name: &str) -> Self {
        Self {
            database_name: database_name.to_string(),
            tables: Vec::new(),
            message: Some(format!("No tables found in database '{}'.", database_name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn optional_keys_are_omitted() {
        let table = TableSchema {
            name: "notes".into(),
            columns: vec![ColumnSchema::new("body", "text", true, false)],
            primary_key_columns: None,
            foreign_keys: None,
        };
        assert_eq!(
            serde_json::to_value(&table).unwrap(),
            json!({
                "name": "notes",
                "columns": [
                    { "name": "body", "type": "text", "nullable": true, "primary_key": false }
                ]
            })
        );
    }

    #[test]
    fn empty_schema_carries_a_message() {
        let value = serde_json::to_value(DatabaseSchema::empty("emr")).unwrap();
        assert_eq!(
            value,
            json!({
                "database_name": "emr",
                "tables": [],
                "message": "No tables found in database 'emr'."
            })
        );
    }
}
