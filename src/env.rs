use anyhow::{Context, Result};
use std::path::Path;

/// Load `.env` and then `.env.docker` from the project root into the process env.
/// The second file overrides the first. Returns the names of the files that were loaded.
pub fn load_env(root: &Path) -> Result<Vec<String>> {
    let mut loaded = Vec::new();

    let base = root.join(".env");
    if base.exists() {
        dotenvy::from_path(&base).with_context(|| format!("failed to load {}", base.display()))?;
        loaded.push(".env".to_string());
    }

    let docker = root.join(".env.docker");
    if docker.exists() {
        dotenvy::from_path_override(&docker)
            .with_context(|| format!("failed to load {}", docker.display()))?;
        loaded.push(".env.docker".to_string());
    }

    tracing::debug!(?loaded, "environment files");
    Ok(loaded)
}
