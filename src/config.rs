//! Typed runtime configuration selecting the storage and observability
//! backends.

use crate::observability::{
    ConsoleObservability, DEFAULT_SERVICE_NAME, Observability, OpenTelemetryObservability,
    PrometheusObservability,
};
use crate::task::{
    adapters::{
        json_file::JsonFileTaskRepository, memory::InMemoryTaskRepository,
        sqlite::SqliteTaskRepository,
    },
    ports::{TaskRepository, TaskRepositoryResult},
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while interpreting configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The storage backend name is not recognised.
    #[error("unknown storage backend '{0}' (expected memory, json or sqlite)")]
    UnknownStorage(String),
    /// The observability backend name is not recognised.
    #[error(
        "unknown observability backend '{0}' (expected disabled, console, verbose, otel or prometheus)"
    )]
    UnknownObservability(String),
}

/// Returns `$HOME/.ap/tasks.json`, or `./.ap/tasks.json` when `HOME` is unset.
#[must_use]
pub fn default_store_path() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
        .join(".ap")
        .join("tasks.json")
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_owned()
}

/// Persistence backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process-local map; contents vanish on exit.
    Memory,
    /// Single JSON array document.
    JsonFile {
        /// Location of the document.
        path: PathBuf,
    },
    /// `SQLite` database file.
    Sqlite {
        /// Location of the database file.
        path: PathBuf,
    },
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::JsonFile {
            path: default_store_path(),
        }
    }
}

impl StorageBackend {
    /// Builds a backend from its short name, using `path` for file-backed
    /// stores and [`default_store_path`] when no path is given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownStorage`] for an unrecognised name.
    pub fn from_name(name: &str, path: Option<PathBuf>) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "json" | "json_file" => Ok(Self::JsonFile {
                path: path.unwrap_or_else(default_store_path),
            }),
            "sqlite" => Ok(Self::Sqlite {
                path: path.unwrap_or_else(|| default_store_path().with_extension("db")),
            }),
            _ => Err(ConfigError::UnknownStorage(name.to_owned())),
        }
    }

    /// Opens the selected repository, creating files as needed.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError`](crate::task::ports::TaskRepositoryError)
    /// when the backing file or database cannot be prepared.
    pub async fn open_repository(&self) -> TaskRepositoryResult<Arc<dyn TaskRepository>> {
        let repository: Arc<dyn TaskRepository> = match self {
            Self::Memory => Arc::new(InMemoryTaskRepository::new()),
            Self::JsonFile { path } => Arc::new(JsonFileTaskRepository::open(path.clone()).await?),
            Self::Sqlite { path } => Arc::new(SqliteTaskRepository::open(path).await?),
        };
        Ok(repository)
    }
}

/// Observability backend selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum ObservabilityBackend {
    /// No spans or metrics.
    #[default]
    Disabled,
    /// Report through `tracing` and aggregate in memory.
    Console {
        /// Log every span and metric as it happens.
        #[serde(default)]
        verbose: bool,
    },
    /// Forward to `OpenTelemetry` SDK providers.
    OpenTelemetry {
        /// `service.name` resource attribute.
        #[serde(default = "default_service_name")]
        service_name: String,
    },
    /// In-process Prometheus-style collector.
    Prometheus,
}

impl ObservabilityBackend {
    /// Builds a backend from its short name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownObservability`] for an unrecognised name.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "disabled" | "none" | "off" => Ok(Self::Disabled),
            "console" => Ok(Self::Console { verbose: false }),
            "verbose" => Ok(Self::Console { verbose: true }),
            "otel" | "opentelemetry" => Ok(Self::OpenTelemetry {
                service_name: default_service_name(),
            }),
            "prometheus" => Ok(Self::Prometheus),
            _ => Err(ConfigError::UnknownObservability(name.to_owned())),
        }
    }

    /// Instantiates the selected backend, or `None` when disabled.
    #[must_use]
    pub fn build(&self) -> Option<Arc<dyn Observability>> {
        let backend: Arc<dyn Observability> = match self {
            Self::Disabled => return None,
            Self::Console { verbose } => Arc::new(ConsoleObservability::new(*verbose)),
            Self::OpenTelemetry { service_name } => {
                Arc::new(OpenTelemetryObservability::new(service_name.clone()))
            }
            Self::Prometheus => Arc::new(PrometheusObservability::new()),
        };
        Some(backend)
    }
}

/// Backend selection for a task tracker instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Persistence backend.
    pub storage: StorageBackend,
    /// Observability backend.
    pub observability: ObservabilityBackend,
}

impl TrackerConfig {
    /// Opens the configured repository.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError`](crate::task::ports::TaskRepositoryError)
    /// when the store cannot be prepared.
    pub async fn open_repository(&self) -> TaskRepositoryResult<Arc<dyn TaskRepository>> {
        self.storage.open_repository().await
    }

    /// Instantiates the configured observability backend.
    #[must_use]
    pub fn build_observability(&self) -> Option<Arc<dyn Observability>> {
        self.observability.build()
    }
}
