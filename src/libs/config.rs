// Configuration module
use sqlx::postgres::PgConnectOptions;
use std::fmt;
use thiserror::Error;

const DATABASE_VARIABLES: [&str; 5] = [
    "POSTGRES_USER",
    "POSTGRES_PASSWORD",
    "POSTGRES_HOST",
    "POSTGRES_PORT",
    "POSTGRES_DB",
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variables: {}", .0.join(", "))]
    MissingVariables(Vec<&'static str>),

    #[error("invalid value {value:?} for {name}: expected {expected}")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    /// `None` when no `POSTGRES_*` variable is set at all.
    pub database: Option<DatabaseSettings>,
    pub seed_demo_data: bool,
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// PostgreSQL connection settings
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub name: String,
    /// Schema walked by the mapper.
    pub schema: String,
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish()
    }
}

impl DatabaseSettings {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.name)
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let server = ServerSettings {
            host: var("EMR_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: match var("EMR_PORT") {
                Some(v) => parse("EMR_PORT", v, "a port number")?,
                None => 8000,
            },
            workers: match var("EMR_WORKERS") {
                Some(v) => Some(parse("EMR_WORKERS", v, "a worker count")?),
                None => None,
            },
        };

        let seed_demo_data = match var("EMR_SEED_DEMO_DATA") {
            Some(v) => parse_bool("EMR_SEED_DEMO_DATA", v)?,
            None => true,
        };

        let values: Vec<Option<String>> = DATABASE_VARIABLES.iter().map(|&n| var(n)).collect();
        let database = if values.iter().all(Option::is_none) {
            None
        } else {
            let missing: Vec<&'static str> = DATABASE_VARIABLES
                .iter()
                .zip(&values)
                .filter(|(_, v)| v.is_none())
                .map(|(name, _)| *name)
                .collect();
            if !missing.is_empty() {
                return Err(ConfigError::MissingVariables(missing));
            }
            let mut values = values.into_iter().flatten();
            let mut next = || values.next().unwrap_or_default();
            let (user, password, host, port, name) = (next(), next(), next(), next(), next());
            Some(DatabaseSettings {
                user,
                password,
                host,
                port: parse("POSTGRES_PORT", port, "a port number")?,
                name,
                schema: var("POSTGRES_SCHEMA").unwrap_or_else(|| "public".to_string()),
            })
        };

        Ok(Self {
            server,
            database,
            seed_demo_data,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse<T: std::str::FromStr>(
    name: &'static str,
    value: String,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value,
        expected,
    })
}

fn parse_bool(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value,
            expected: "a boolean",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn defaults_without_database() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr(), "127.0.0.1:8000");
        assert_eq!(cfg.server.workers, None);
        assert!(cfg.seed_demo_data);
        assert!(cfg.database.is_none());
    }

    #[test]
    fn full_database_settings() {
        let cfg = config(&[
            ("POSTGRES_USER", "emr"),
            ("POSTGRES_PASSWORD", "s3cret"),
            ("POSTGRES_HOST", "db.internal"),
            ("POSTGRES_PORT", "6543"),
            ("POSTGRES_DB", "clinic"),
            ("EMR_PORT", "9000"),
            ("EMR_SEED_DEMO_DATA", "no"),
        ])
        .unwrap();
        let db = cfg.database.unwrap();
        assert_eq!(db.user, "emr");
        assert_eq!(db.host, "db.internal");
        assert_eq!(db.port, 6543);
        assert_eq!(db.name, "clinic");
        assert_eq!(db.schema, "public");
        assert_eq!(cfg.server.port, 9000);
        assert!(!cfg.seed_demo_data);
        assert!(!format!("{db:?}").contains("s3cret"));
    }

    #[test]
    fn partial_database_settings_are_rejected() {
        let err = config(&[("POSTGRES_USER", "emr"), ("POSTGRES_DB", "clinic")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingVariables(vec!["POSTGRES_PASSWORD", "POSTGRES_HOST", "POSTGRES_PORT"])
        );
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let err = config(&[("EMR_PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "EMR_PORT", .. }));
        let err = config(&[("EMR_SEED_DEMO_DATA", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "EMR_SEED_DEMO_DATA", .. }));
    }
}
