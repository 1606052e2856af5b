//! Configuration loading and backend factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use exador_core::driver::QuizRunConfig;
use exador_core::importer::{import_csv, NoopImportProgress};
use exador_core::model::Role;
use exador_core::traits::Backend;

use crate::memory::{student_profile, InMemoryStore};
use crate::rest::RestStore;

/// Where quiz data lives.
///
/// Note: Custom Debug impl masks credentials to keep them out of logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    Rest {
        url: String,
        api_key: String,
        /// User JWT; without it nobody is signed in.
        #[serde(default)]
        access_token: Option<String>,
    },
    Memory {
        /// CSV imported at startup.
        #[serde(default)]
        seed_csv: Option<PathBuf>,
        #[serde(default = "default_student_name")]
        student_name: String,
        #[serde(default = "default_role")]
        role: Role,
    },
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendConfig::Rest {
                url,
                api_key: _,
                access_token,
            } => f
                .debug_struct("Rest")
                .field("url", url)
                .field("api_key", &"***")
                .field("access_token", &access_token.as_ref().map(|_| "***"))
                .finish(),
            BackendConfig::Memory {
                seed_csv,
                student_name,
                role,
            } => f
                .debug_struct("Memory")
                .field("seed_csv", seed_csv)
                .field("student_name", student_name)
                .field("role", role)
                .finish(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Memory {
            seed_csv: None,
            student_name: default_student_name(),
            role: default_role(),
        }
    }
}

fn default_student_name() -> String {
    "Explorateur".to_string()
}
fn default_role() -> Role {
    Role::Student
}

/// Top-level exador configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExadorConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    /// How long a question's result stays on screen, in milliseconds.
    #[serde(default = "default_result_pause")]
    pub result_pause_ms: u64,
    /// Countdown for questions that carry none. Unset means unlimited.
    #[serde(default)]
    pub default_time_limit_secs: Option<u64>,
}

fn default_result_pause() -> u64 {
    2000
}

impl Default for ExadorConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            result_pause_ms: default_result_pause(),
            default_time_limit_secs: None,
        }
    }
}

impl ExadorConfig {
    /// Driver settings derived from this configuration.
    pub fn run_config(&self) -> QuizRunConfig {
        QuizRunConfig {
            result_pause: Duration::from_millis(self.result_pause_ms),
            default_time_limit: self
                .default_time_limit_secs
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let value = std::env::var(&result[start + 2..start + end]).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
    }
    result
}

fn resolve_backend_config(config: &BackendConfig) -> BackendConfig {
    match config {
        BackendConfig::Rest {
            url,
            api_key,
            access_token,
        } => BackendConfig::Rest {
            url: resolve_env_vars(url),
            api_key: resolve_env_vars(api_key),
            access_token: access_token
                .as_deref()
                .map(resolve_env_vars)
                .filter(|t| !t.is_empty()),
        },
        BackendConfig::Memory {
            seed_csv,
            student_name,
            role,
        } => BackendConfig::Memory {
            seed_csv: seed_csv
                .as_ref()
                .map(|p| PathBuf::from(resolve_env_vars(&p.to_string_lossy()))),
            student_name: resolve_env_vars(student_name),
            role: *role,
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `exador.toml` in the current directory
/// 2. `~/.config/exador/config.toml`
///
/// Environment variable overrides: `EXADOR_API_KEY`, `EXADOR_ACCESS_TOKEN`.
pub fn load_config() -> Result<ExadorConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ExadorConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("exador.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<ExadorConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ExadorConfig::default(),
    };

    // Apply env var overrides
    if let BackendConfig::Rest {
        api_key,
        access_token,
        ..
    } = &mut config.backend
    {
        if let Ok(key) = std::env::var("EXADOR_API_KEY") {
            *api_key = key;
        }
        if let Ok(token) = std::env::var("EXADOR_ACCESS_TOKEN") {
            *access_token = Some(token);
        }
    }

    config.backend = resolve_backend_config(&config.backend);

    // Relative seed paths are relative to the config file.
    if let (Some(path), BackendConfig::Memory { seed_csv: Some(seed), .. }) =
        (&config_path, &mut config.backend)
    {
        if seed.is_relative() {
            if let Some(dir) = path.parent() {
                *seed = dir.join(&*seed);
            }
        }
    }

    tracing::debug!(backend = ?config.backend, "configuration loaded");
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("exador"))
}

/// Create a backend instance from its configuration.
///
/// A memory backend imports its seed CSV, if any, and signs in a fresh
/// profile.
pub async fn create_backend(config: &BackendConfig) -> Result<Arc<dyn Backend>> {
    match config {
        BackendConfig::Rest {
            url,
            api_key,
            access_token,
        } => Ok(Arc::new(RestStore::new(url, api_key, access_token.clone())?)),
        BackendConfig::Memory {
            seed_csv,
            student_name,
            role,
        } => {
            let store = InMemoryStore::new();
            if let Some(path) = seed_csv {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("failed to read seed CSV: {}", path.display()))?;
                let report = import_csv(&store, &text, &NoopImportProgress)
                    .await
                    .with_context(|| format!("failed to import seed CSV: {}", path.display()))?;
                tracing::info!(imported = report.imported, "memory backend seeded");
            }

            let email = format!(
                "{}@exador.local",
                student_name.to_lowercase().replace(' ', ".")
            );
            let mut profile = student_profile(student_name, &email);
            profile.role = *role;
            store.sign_in_as(profile);
            Ok(Arc::new(store))
        }
    }
}
