//! Settings discovery and loading for ClusterFlow
//!
//! Settings are plain YAML; each consumer deserializes them into its own
//! type via [`load_settings`].

pub mod error;

pub use error::*;

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Environment variable pointing directly at a settings file
pub const CONFIG_PATH_ENV: &str = "CLUSTERFLOW_CONFIG_PATH";

const CANDIDATES: [&str; 4] = [
    "clusterflow.local.yaml",
    ".clusterflow.local.yaml",
    "clusterflow.yaml",
    ".clusterflow.yaml",
];

/// Get the ClusterFlow config directory, creating it if needed
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("clusterflow");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Find the settings file
///
/// Search order:
/// 1. `CLUSTERFLOW_CONFIG_PATH` (direct path)
/// 2. current directory: clusterflow.local.yaml, .clusterflow.local.yaml, clusterflow.yaml, .clusterflow.yaml
/// 3. `./.clusterflow/` directory, same order
/// 4. `~/.config/clusterflow/config.yaml` (global)
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(
            "{} points at missing file {}, falling back to search",
            CONFIG_PATH_ENV,
            path.display()
        );
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let project_dir = current_dir.join(".clusterflow");
    if project_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = project_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("clusterflow").join("config.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// Load settings from a specific file
pub fn load_settings_from<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    let settings = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Load settings from the discovered file, or defaults when there is none
pub fn load_settings<T: DeserializeOwned + Default>() -> Result<T> {
    match find_config_file() {
        Ok(path) => load_settings_from(&path),
        Err(ConfigError::ConfigFileNotFound) => {
            tracing::debug!("No settings file found, using defaults");
            Ok(T::default())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serial_test::serial;
    use std::fs;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Sample {
        region: Option<String>,
        retries: u32,
    }

    /// Run `f` inside `dir` with no settings reachable from the environment
    fn in_dir<R>(dir: &Path, f: impl FnOnce() -> R) -> R {
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir).unwrap();
        let config_home = dir.join("xdg");
        let result = temp_env::with_vars(
            [
                (CONFIG_PATH_ENV, None),
                ("XDG_CONFIG_HOME", Some(config_home.as_os_str())),
            ],
            f,
        );
        std::env::set_current_dir(original_dir).unwrap();
        result
    }

    #[test]
    #[serial]
    fn test_get_config_dir() {
        let config_dir = get_config_dir().unwrap();
        assert!(config_dir.ends_with("clusterflow"));
        assert!(config_dir.exists());
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("clusterflow.yaml"), "retries: 1").unwrap();

        let result = in_dir(temp_dir.path(), find_config_file).unwrap();
        assert!(result.ends_with("clusterflow.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_local_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("clusterflow.yaml"), "retries: 1").unwrap();
        fs::write(temp_dir.path().join("clusterflow.local.yaml"), "retries: 2").unwrap();

        let result = in_dir(temp_dir.path(), find_config_file).unwrap();
        assert!(result.ends_with("clusterflow.local.yaml"));
    }

    #[test]
    #[serial]
    fn test_hidden_local_beats_visible_shared() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join(".clusterflow.local.yaml"), "retries: 1").unwrap();
        fs::write(temp_dir.path().join("clusterflow.yaml"), "retries: 2").unwrap();

        let result = in_dir(temp_dir.path(), find_config_file).unwrap();
        assert!(result.ends_with(".clusterflow.local.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_project_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_dir = temp_dir.path().join(".clusterflow");
        fs::create_dir(&project_dir).unwrap();
        fs::write(project_dir.join("clusterflow.yaml"), "retries: 1").unwrap();

        let result = in_dir(temp_dir.path(), find_config_file).unwrap();
        assert!(result.ends_with(".clusterflow/clusterflow.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "retries: 3").unwrap();

        let result = temp_env::with_var(CONFIG_PATH_ENV, Some(&config_path), find_config_file);
        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    #[serial]
    fn test_find_config_file_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();

        let result = in_dir(temp_dir.path(), find_config_file);
        assert!(matches!(result, Err(ConfigError::ConfigFileNotFound)));
    }

    #[test]
    #[serial]
    fn test_load_settings_defaults_without_file() {
        let temp_dir = tempfile::tempdir().unwrap();

        let settings: Sample = in_dir(temp_dir.path(), load_settings).unwrap();
        assert_eq!(settings, Sample::default());
    }

    #[test]
    #[serial]
    fn test_load_settings_reads_discovered_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(
            temp_dir.path().join("clusterflow.yaml"),
            "region: eu-west-1\nretries: 4\n",
        )
        .unwrap();

        let settings: Sample = in_dir(temp_dir.path(), load_settings).unwrap();
        assert_eq!(
            settings,
            Sample {
                region: Some("eu-west-1".into()),
                retries: 4,
            }
        );
    }

    #[test]
    fn test_load_settings_from_invalid_yaml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("broken.yaml");
        fs::write(&path, "retries: [not, a, number]").unwrap();

        let result: Result<Sample> = load_settings_from(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
