//! Runtime configuration read from environment variables.
//!
//! `main` loads a `.env` file first (if present) and then calls [`Config::from_env`].
//! Production is the default environment and refuses to start without real secrets;
//! `APP_ENV=development` substitutes local defaults and logs a warning for each one.

use std::path::PathBuf;

use crate::error::config::ConfigError;

/// Minimum length of the token signing secret, in bytes.
pub const MIN_JWT_SECRET_BYTES: usize = 32;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATABASE: &str = "ecommerce";
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

const DEV_MONGODB_URI: &str = "mongodb://localhost:27017";
const DEV_JWT_SECRET: &str = "development-only-signing-secret-do-not-deploy";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Production,
    Development,
}

/// Which document store backend to build at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    MongoDb,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub env: AppEnv,
    pub port: u16,
    pub store: StoreKind,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub bcrypt_cost: u32,

    /// Initial administrator, created at startup when both are set and missing.
    pub admin_name: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of a variable
    /// by name. Empty values count as unset.
    ///
    /// # Returns
    /// - `Ok(Config)` - All variables present or defaulted
    /// - `Err(ConfigError::MissingEnvVar)` - A production secret is absent
    /// - `Err(ConfigError::InvalidValue)` - A variable does not parse or is too weak
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let env = match var("APP_ENV").as_deref() {
            None | Some("production") | Some("prod") => AppEnv::Production,
            Some("development") | Some("dev") => AppEnv::Development,
            Some(other) => {
                return Err(ConfigError::invalid(
                    "APP_ENV",
                    format!("expected 'production' or 'development', got '{other}'"),
                ));
            }
        };

        let store = match var("STORE_BACKEND").as_deref() {
            None | Some("mongodb") => StoreKind::MongoDb,
            Some("memory") => StoreKind::Memory,
            Some(other) => {
                return Err(ConfigError::invalid(
                    "STORE_BACKEND",
                    format!("expected 'mongodb' or 'memory', got '{other}'"),
                ));
            }
        };

        // Secrets: required in production, defaulted with a warning in development.
        let secret = |key: &str, fallback: &str| match (var(key), env) {
            (Some(value), _) => Ok(value),
            (None, AppEnv::Production) => Err(ConfigError::MissingEnvVar(key.to_string())),
            (None, AppEnv::Development) => {
                tracing::warn!("{} is not set, using the development default", key);
                Ok(fallback.to_string())
            }
        };

        let jwt_secret = secret("JWT_SECRET", DEV_JWT_SECRET)?;
        if jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::invalid(
                "JWT_SECRET",
                format!("must be at least {MIN_JWT_SECRET_BYTES} bytes long"),
            ));
        }

        let mongodb_uri = match store {
            StoreKind::MongoDb => secret("MONGODB_URI", DEV_MONGODB_URI)?,
            StoreKind::Memory => var("MONGODB_URI").unwrap_or_default(),
        };

        let port = parse_or(var("PORT"), "PORT", DEFAULT_PORT)?;
        let max_upload_bytes = parse_or(var("MAX_UPLOAD_BYTES"), "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        let bcrypt_cost = parse_or(var("BCRYPT_COST"), "BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::invalid("BCRYPT_COST", "must be between 4 and 31"));
        }

        Ok(Self {
            env,
            port,
            store,
            mongodb_uri,
            mongodb_database: var("MONGODB_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            jwt_secret,
            upload_dir: PathBuf::from(var("UPLOAD_DIR").unwrap_or_else(|| DEFAULT_UPLOAD_DIR.to_string())),
            max_upload_bytes,
            bcrypt_cost,
            admin_name: var("ADMIN_NAME"),
            admin_password: var("ADMIN_PASSWORD"),
        })
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, name: &str, default: T) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::invalid(name, format!("cannot parse '{raw}'"))),
        None => Ok(default),
    }
}
