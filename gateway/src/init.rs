//! Initialization helpers for preparing runtime assets before starting the
//! gateway server.
//!
//! This module hosts the logic that powers the `policy-voice-gateway init` CLI
//! command. The command writes the built-in seed data to disk so operators can
//! edit it and point `DATA_PATH` at the result.
//!
//! Typical usage from the CLI:
//!
//! ```text
//! $ policy-voice-gateway init --output /app/data/seed.yaml
//! $ DATA_PATH=/app/data/seed.yaml policy-voice-gateway
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::core::store::{BUILTIN_SEED, SeedData};

/// Used when neither `--output` nor `DATA_PATH` is given
pub const DEFAULT_SEED_PATH: &str = "data/seed.yaml";

/// Resolve the output path: explicit argument, then `DATA_PATH`, then the default.
pub fn seed_output_path(output: Option<PathBuf>) -> PathBuf {
    output
        .or_else(|| {
            std::env::var("DATA_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SEED_PATH))
}

/// Write the built-in seed file and validate it.
pub async fn run(output: Option<PathBuf>, force: bool) -> Result<()> {
    let path = seed_output_path(output);
    let data = write_seed(&path, force).await?;

    println!(
        "Seed data written to {} ({} customers, {} customer policies, {} policy documents)",
        path.display(),
        data.customers.len(),
        data.customer_policies.len(),
        data.policies.len()
    );
    Ok(())
}

/// Write [`BUILTIN_SEED`] to `path`, then load it back.
pub async fn write_seed(path: &Path, force: bool) -> Result<SeedData> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) && !force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    tokio::fs::write(path, BUILTIN_SEED)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "Seed file written");

    SeedData::from_file(path).with_context(|| format!("Failed to validate {}", path.display()))
}
