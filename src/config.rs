use crate::view::ActiveViewStore;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

/// The command shown when no history exists yet.
const DEFAULT_ACTIVE_VIEW: &str = "po";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    active_view: String,
}

/// YAML-backed store for the last active command. Read once at startup,
/// written through the dispatcher's successful-activation path.
#[derive(Debug, Clone)]
pub struct FileConfig {
    path: PathBuf,
    active_view: String,
}

impl FileConfig {
    /// Loads from the discovered config path, falling back to defaults
    /// when the file is absent or unreadable.
    pub fn load() -> Self {
        let path = discover_config_path();
        Self::load_from(path)
    }

    pub fn load_from(path: PathBuf) -> Self {
        let active_view = match fs::read_to_string(&path) {
            Ok(raw) => match serde_yaml::from_str::<ConfigFile>(&raw) {
                Ok(parsed) if !parsed.active_view.trim().is_empty() => parsed.active_view,
                Ok(_) => DEFAULT_ACTIVE_VIEW.to_string(),
                Err(error) => {
                    warn!("failed to parse config {}: {error}", path.display());
                    DEFAULT_ACTIVE_VIEW.to_string()
                }
            },
            Err(_) => DEFAULT_ACTIVE_VIEW.to_string(),
        };

        Self { path, active_view }
    }
}

impl ActiveViewStore for FileConfig {
    fn active_view(&self) -> String {
        self.active_view.clone()
    }

    fn set_active_view(&mut self, cmd: &str) {
        self.active_view = cmd.to_string();
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let contents = serde_yaml::to_string(&ConfigFile {
            active_view: self.active_view.clone(),
        })
        .context("failed to serialize config")?;
        fs::write(&self.path, contents)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

fn discover_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("MANTA_CONFIG")
        && !path.trim().is_empty()
    {
        return PathBuf::from(path);
    }

    let cwd_candidates = [PathBuf::from("manta.yaml"), PathBuf::from(".manta.yaml")];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return candidate;
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config/manta/config.yaml");
    }

    PathBuf::from("manta.yaml")
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_ACTIVE_VIEW, FileConfig};
    use crate::view::ActiveViewStore;

    #[test]
    fn missing_file_falls_back_to_default_view() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig::load_from(dir.path().join("config.yaml"));
        assert_eq!(config.active_view(), DEFAULT_ACTIVE_VIEW);
    }

    #[test]
    fn active_view_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.yaml");

        let mut config = FileConfig::load_from(path.clone());
        config.set_active_view("svc");
        config.save().unwrap();

        let reloaded = FileConfig::load_from(path);
        assert_eq!(reloaded.active_view(), "svc");
    }

    #[test]
    fn malformed_file_falls_back_to_default_view() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, ":: not yaml ::").unwrap();

        let config = FileConfig::load_from(path);
        assert_eq!(config.active_view(), DEFAULT_ACTIVE_VIEW);
    }
}
