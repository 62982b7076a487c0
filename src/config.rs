use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug)]
pub struct ConfigError(String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Configuration Error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageBackend {
    Local { root: String },
    S3 { bucket: String, region: Option<String> },
}

/// Widths of `employees.first_name` and `employees.last_name` in the bootstrap migration.
/// Longer name limits would let names through validation that the insert then rejects.
pub const FIRST_NAME_COLUMN_WIDTH: u64 = 14;
pub const LAST_NAME_COLUMN_WIDTH: u64 = 16;

#[derive(Debug, Clone)]
pub struct ValidationLimits {
    pub first_name_max_len: u64,
    pub last_name_max_len: u64,
    pub photo_max_bytes: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            first_name_max_len: FIRST_NAME_COLUMN_WIDTH,
            last_name_max_len: LAST_NAME_COLUMN_WIDTH,
            photo_max_bytes: 2 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_addr: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub run_migrations: bool,
    pub transaction_timeout: Duration,
    pub jwt_secret: String,
    pub storage: StorageBackend,
    pub public_storage_url: String,
    pub limits: ValidationLimits,
    /// Zero disables the background sweep.
    pub orphan_sweep_interval: Duration,
    pub orphan_grace: Duration,
}

impl Settings {
    /// Reads settings from the process environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, ConfigError> {
            match lookup(key) {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => Err(ConfigError(format!("{} must be set", key))),
            }
        };

        let storage = match lookup("STORAGE_BACKEND").as_deref().unwrap_or("local") {
            "local" => StorageBackend::Local {
                root: lookup("STORAGE_LOCAL_ROOT").unwrap_or_else(|| "./storage".to_string()),
            },
            "s3" => StorageBackend::S3 {
                bucket: required("AWS_S3_BUCKET")?,
                region: lookup("AWS_REGION"),
            },
            other => {
                return Err(ConfigError(format!(
                    "STORAGE_BACKEND must be 'local' or 's3', got '{}'",
                    other
                )))
            }
        };

        let limits = ValidationLimits {
            first_name_max_len: name_limit(&lookup, "FIRST_NAME_MAX_LEN", FIRST_NAME_COLUMN_WIDTH)?,
            last_name_max_len: name_limit(&lookup, "LAST_NAME_MAX_LEN", LAST_NAME_COLUMN_WIDTH)?,
            photo_max_bytes: parse_or(
                &lookup,
                "PHOTO_MAX_BYTES",
                ValidationLimits::default().photo_max_bytes,
            )?,
        };

        Ok(Self {
            server_addr: lookup("SERVER_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            run_migrations: parse_or(&lookup, "RUN_MIGRATIONS", false)?,
            transaction_timeout: Duration::from_secs(parse_or(
                &lookup,
                "DB_TRANSACTION_TIMEOUT_SECS",
                5,
            )?),
            jwt_secret: required("JWT_SECRET")?,
            storage,
            public_storage_url: lookup("PUBLIC_STORAGE_URL")
                .unwrap_or_else(|| "http://127.0.0.1:8080/storage/".to_string()),
            limits,
            orphan_sweep_interval: Duration::from_secs(parse_or(
                &lookup,
                "ORPHAN_SWEEP_INTERVAL_SECS",
                3600,
            )?),
            orphan_grace: Duration::from_secs(parse_or(&lookup, "ORPHAN_GRACE_SECS", 3600)?),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError(format!("{} has an invalid value '{}'", key, raw))),
        None => Ok(default),
    }
}

/// A name length limit between 1 and the column width, defaulting to the width.
fn name_limit<F>(lookup: &F, key: &str, column_width: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let limit = parse_or(lookup, key, column_width)?;
    if limit == 0 || limit > column_width {
        return Err(ConfigError(format!(
            "{} must be between 1 and {} (the column width), got {}",
            key, column_width, limit
        )));
    }
    Ok(limit)
}
