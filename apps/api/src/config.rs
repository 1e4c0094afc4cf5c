use std::path::PathBuf;

use anyhow::{Context, Result};

/// Where responses and metadata are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres { database_url: String },
    Documents { data_dir: PathBuf },
    /// Process-local maps; everything is lost on restart.
    Memory,
}

impl StorageBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StorageBackend::Postgres { .. } => "postgres",
            StorageBackend::Documents { .. } => "json-documents",
            StorageBackend::Memory => "memory",
        }
    }
}

/// Application configuration loaded from environment variables.
/// Nothing is required: without `DATABASE_URL` the service falls back to
/// flat JSON documents under `DATA_DIR`.
#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageBackend,
    /// Directory holding the JSON documents and the legacy files read by
    /// the `migrate` command.
    pub data_dir: PathBuf,
    pub events_file: Option<PathBuf>,
    pub events_limit: usize,
    pub degrade_reads: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let data_dir = optional_env("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));

        Ok(Config {
            storage: select_backend(
                optional_env("STORAGE_BACKEND").as_deref(),
                optional_env("DATABASE_URL"),
                &data_dir,
            )?,
            data_dir,
            events_file: optional_env("EVENTS_FILE").map(PathBuf::from),
            events_limit: optional_env("EVENTS_LIMIT")
                .unwrap_or_else(|| "10".to_string())
                .parse::<usize>()
                .context("EVENTS_LIMIT must be a non-negative integer")?,
            degrade_reads: parse_bool(optional_env("DEGRADE_READS").as_deref())
                .context("DEGRADE_READS must be true or false")?,
            port: optional_env("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

/// An explicit `STORAGE_BACKEND` wins; otherwise Postgres is used whenever
/// `DATABASE_URL` is set.
fn select_backend(
    requested: Option<&str>,
    database_url: Option<String>,
    data_dir: &std::path::Path,
) -> Result<StorageBackend> {
    let documents = || StorageBackend::Documents {
        data_dir: data_dir.to_path_buf(),
    };
    match requested.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
        None => Ok(match database_url {
            Some(database_url) => StorageBackend::Postgres { database_url },
            None => documents(),
        }),
        Some("postgres") => Ok(StorageBackend::Postgres {
            database_url: database_url
                .context("STORAGE_BACKEND=postgres requires DATABASE_URL")?,
        }),
        Some("documents" | "json") => Ok(documents()),
        Some("memory") => Ok(StorageBackend::Memory),
        Some(other) => anyhow::bail!(
            "STORAGE_BACKEND must be postgres, documents or memory (got '{other}')"
        ),
    }
}

/// Reads a variable, treating an empty value the same as an unset one.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: Option<&str>) -> Result<bool> {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => anyhow::bail!("unrecognised boolean '{other}'"),
    }
}
