use std::{env, fmt};

use sqlx::postgres::PgConnectOptions;

use crate::error::EtlError;

/// Administrative database used to check for and create the target database.
pub const ADMIN_DATABASE: &str = "postgres";

/// Connection parameters, read once at startup and passed to every component.
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub name: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
}

impl DbConfig {
    /// Read `DB_NAME`, `DB_USER`, `DB_PASSWORD`, `DB_HOST` and `DB_PORT`
    /// from the process environment.
    pub fn from_env() -> Result<Self, EtlError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, EtlError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| EtlError::Config(format!("{} is not set", key)))
        };
        let non_blank = |key: &str| -> Result<String, EtlError> {
            let value = required(key)?;
            if value.trim().is_empty() {
                return Err(EtlError::Config(format!("{} is empty", key)));
            }
            Ok(value.trim().to_string())
        };

        let port_raw = non_blank("DB_PORT")?;
        let port = port_raw.parse::<u16>().map_err(|_| {
            EtlError::Config(format!("DB_PORT must be a port number, got {:?}", port_raw))
        })?;

        Ok(Self {
            name: non_blank("DB_NAME")?,
            user: non_blank("DB_USER")?,
            // may legitimately be empty (trust auth)
            password: required("DB_PASSWORD")?,
            host: non_blank("DB_HOST")?,
            port,
        })
    }

    /// Options for connecting to `database` on the configured server.
    pub fn connect_options(&self, database: &str) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(database)
            .application_name("shipment-etl")
    }

    pub fn admin_options(&self) -> PgConnectOptions {
        self.connect_options(ADMIN_DATABASE)
    }

    pub fn target_options(&self) -> PgConnectOptions {
        self.connect_options(&self.name)
    }
}

// keep the password out of logs
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full() -> HashMap<String, String> {
        vars(&[
            ("DB_NAME", "train"),
            ("DB_USER", "etl"),
            ("DB_PASSWORD", "s3cret"),
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "5433"),
        ])
    }

    #[test]
    fn reads_all_parameters() {
        let env = full();
        let cfg = DbConfig::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(cfg.name, "train");
        assert_eq!(cfg.user, "etl");
        assert_eq!(cfg.password, "s3cret");
        assert_eq!(cfg.host, "db.internal");
        assert_eq!(cfg.port, 5433);
    }

    #[test]
    fn missing_variable_is_a_config_error() {
        for key in ["DB_NAME", "DB_USER", "DB_PASSWORD", "DB_HOST", "DB_PORT"] {
            let mut env = full();
            env.remove(key);
            let err = DbConfig::from_lookup(|k| env.get(k).cloned()).unwrap_err();
            match err {
                EtlError::Config(msg) => assert!(msg.contains(key), "{}", msg),
                other => panic!("unexpected error for {}: {:?}", key, other),
            }
        }
    }

    #[test]
    fn rejects_bad_port_and_blank_name() {
        let mut env = full();
        env.insert("DB_PORT".into(), "postgres".into());
        assert!(matches!(
            DbConfig::from_lookup(|k| env.get(k).cloned()),
            Err(EtlError::Config(_))
        ));

        let mut env = full();
        env.insert("DB_NAME".into(), "   ".into());
        assert!(matches!(
            DbConfig::from_lookup(|k| env.get(k).cloned()),
            Err(EtlError::Config(_))
        ));
    }

    #[test]
    fn empty_password_is_allowed() {
        let mut env = full();
        env.insert("DB_PASSWORD".into(), String::new());
        let cfg = DbConfig::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(cfg.password, "");
    }

    #[test]
    fn debug_redacts_password() {
        let env = full();
        let cfg = DbConfig::from_lookup(|k| env.get(k).cloned()).unwrap();
        let dbg = format!("{:?}", cfg);
        assert!(!dbg.contains("s3cret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn admin_and_target_databases_differ() {
        let env = full();
        let cfg = DbConfig::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(cfg.admin_options().get_database(), Some(ADMIN_DATABASE));
        assert_eq!(cfg.target_options().get_database(), Some("train"));
        assert_eq!(cfg.target_options().get_port(), 5433);
    }
}
