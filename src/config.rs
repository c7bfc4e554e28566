use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use log::{info, warn};
use redis::aio::MultiplexedConnection;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    Pool, Postgres,
};

use crate::{
    constants::{
        DEFAULT_DB_MAX_CONNECTIONS, MAX_COOKING_TIME, MAX_INGREDIENT_AMOUNT, MIN_COOKING_TIME,
        MIN_INGREDIENT_AMOUNT,
    },
    error::Error,
    export::ExportOptions,
    validation::RecipeLimits,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub database: PgConnectOptions,
    pub redis_url: Option<String>,
    pub max_connections: u32,
    pub limits: RecipeLimits,
    pub pdf_font_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` uses the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = match lookup("DATABASE_URL") {
            Some(url) => PgConnectOptions::from_str(&url)
                .map_err(|e| Error::Config(format!("Invalid DATABASE_URL: {e}")))?,
            None => {
                let user = lookup("POSTGRES_USER").unwrap_or_else(|| String::from("foodgram_user"));
                let password = lookup("POSTGRES_PASSWORD").unwrap_or_default();
                let db = lookup("POSTGRES_DB").unwrap_or_else(|| String::from("foodgram"));
                let host = lookup("DB_HOST").unwrap_or_else(|| String::from("localhost"));
                let port: u16 = try_load(&lookup, "DB_PORT", 5432)?;
                warn!("DATABASE_URL not set, using POSTGRES_* variables");
                // Parts are passed as-is so reserved URL characters need no escaping.
                PgConnectOptions::new()
                    .host(&host)
                    .port(port)
                    .username(&user)
                    .password(&password)
                    .database(&db)
            }
        };

        let limits = RecipeLimits {
            min_cooking_time: try_load(&lookup, "MIN_COOKING_TIME", MIN_COOKING_TIME)?,
            max_cooking_time: try_load(&lookup, "MAX_COOKING_TIME", MAX_COOKING_TIME)?,
            min_amount: try_load(&lookup, "MIN_INGREDIENT_AMOUNT", MIN_INGREDIENT_AMOUNT)?,
            max_amount: try_load(&lookup, "MAX_INGREDIENT_AMOUNT", MAX_INGREDIENT_AMOUNT)?,
        };

        if limits.min_cooking_time < 1 || limits.min_cooking_time > limits.max_cooking_time {
            return Err(Error::Config(String::from(
                "MIN_COOKING_TIME must be positive and not above MAX_COOKING_TIME",
            )));
        }
        if limits.min_amount < 1 || limits.min_amount > limits.max_amount {
            return Err(Error::Config(String::from(
                "MIN_INGREDIENT_AMOUNT must be positive and not above MAX_INGREDIENT_AMOUNT",
            )));
        }

        Ok(Self {
            database,
            redis_url: lookup("REDIS_URL"),
            max_connections: try_load(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            limits,
            pdf_font_path: lookup("PDF_FONT_PATH").map(PathBuf::from),
        })
    }

    pub async fn connect(&self) -> Result<Pool<Postgres>, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect_with(self.database.to_owned())
            .await?;

        Ok(pool)
    }

    /// Connects to Redis when `REDIS_URL` is configured.
    pub async fn connect_cache(&self) -> Result<Option<MultiplexedConnection>, Error> {
        match &self.redis_url {
            Some(url) => {
                let client = redis::Client::open(url.as_str())?;
                let connection = client.get_multiplexed_async_connection().await?;
                Ok(Some(connection))
            }
            None => Ok(None),
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            pdf_font_path: self.pdf_font_path.to_owned(),
        }
    }
}

fn try_load<F, T>(lookup: &F, key: &str, default: T) -> Result<T, Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|e| {
            warn!("Invalid {key} value: {e}");
            Error::Config(format!("Invalid {key} value {value:?}: {e}"))
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, Error> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config(&[("DATABASE_URL", "postgres://localhost/foodgram")]).unwrap();
        assert_eq!(config.database.get_host(), "localhost");
        assert_eq!(config.database.get_database(), Some("foodgram"));
        assert_eq!(config.limits, RecipeLimits::default());
        assert_eq!(config.max_connections, DEFAULT_DB_MAX_CONNECTIONS);
        assert!(config.redis_url.is_none());
        assert!(config.pdf_font_path.is_none());
    }

    #[test]
    fn database_url_is_assembled_from_parts() {
        let config = config(&[
            ("POSTGRES_USER", "chef"),
            ("POSTGRES_PASSWORD", "pw"),
            ("POSTGRES_DB", "recipes"),
            ("DB_HOST", "db"),
            ("DB_PORT", "6543"),
        ])
        .unwrap();
        assert_eq!(config.database.get_host(), "db");
        assert_eq!(config.database.get_port(), 6543);
        assert_eq!(config.database.get_username(), "chef");
        assert_eq!(config.database.get_database(), Some("recipes"));
    }

    #[test]
    fn reserved_characters_in_password_keep_host_and_database() {
        let config = config(&[
            ("POSTGRES_USER", "chef"),
            ("POSTGRES_PASSWORD", "p@ss/w#rd"),
            ("DB_HOST", "db"),
        ])
        .unwrap();
        assert_eq!(config.database.get_host(), "db");
        assert_eq!(config.database.get_port(), 5432);
        assert_eq!(config.database.get_username(), "chef");
        assert_eq!(config.database.get_database(), Some("foodgram"));
    }

    #[test]
    fn malformed_database_url_is_an_error() {
        assert!(matches!(
            config(&[("DATABASE_URL", "not a url")]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn limits_are_configurable() {
        let config = config(&[
            ("DATABASE_URL", "postgres://localhost/x"),
            ("MAX_COOKING_TIME", "600"),
        ])
        .unwrap();
        assert_eq!(config.limits.max_cooking_time, 600);
        assert_eq!(config.limits.min_cooking_time, MIN_COOKING_TIME);
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(matches!(
            config(&[
                ("DATABASE_URL", "postgres://localhost/x"),
                ("DB_MAX_CONNECTIONS", "many"),
            ]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            config(&[
                ("DATABASE_URL", "postgres://localhost/x"),
                ("MIN_COOKING_TIME", "10"),
                ("MAX_COOKING_TIME", "5"),
            ]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            config(&[
                ("DATABASE_URL", "postgres://localhost/x"),
                ("MIN_INGREDIENT_AMOUNT", "0"),
            ]),
            Err(Error::Config(_))
        ));
    }
}
