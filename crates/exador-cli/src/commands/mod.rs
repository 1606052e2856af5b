pub mod chapters;
pub mod coach;
pub mod dashboard;
pub mod import;
pub mod init;
pub mod play;
pub mod validate;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use exador_core::traits::Backend;
use exador_store::config::{create_backend, load_config_from};
use exador_store::ExadorConfig;

/// Load the configuration and connect to its backend.
pub async fn connect(config_path: Option<PathBuf>) -> Result<(ExadorConfig, Arc<dyn Backend>)> {
    let config = load_config_from(config_path.as_deref())?;
    let backend = create_backend(&config.backend).await?;
    tracing::debug!(backend = backend.name(), "backend ready");
    Ok((config, backend))
}
