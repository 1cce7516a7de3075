//! Config file discovery and loading.

use std::path::{Path, PathBuf};
use thiserror::Error;

use super::types::AppConfig;
use super::validation::{ConfigError, Validatable};

/// File name looked for in the working directory.
pub const CONFIG_FILE_NAME: &str = ".sbom-resolver.yaml";

/// Errors while loading a config file.
#[derive(Error, Debug)]
pub enum ConfigFileError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config in {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
}

/// Find a config file: the working directory first, then the user config
/// directory.
pub fn discover_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("sbom-resolver").join("config.yaml"))
        .filter(|path| path.is_file())
}

/// Load and validate a config file.
pub fn load_config_file(path: &Path) -> Result<AppConfig, ConfigFileError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: AppConfig =
        serde_yaml::from_str(&content).map_err(|source| ConfigFileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate().map_err(|source| ConfigFileError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(config)
}

/// Load the given file, or a discovered one, or defaults. Returns the config
/// and where it came from.
pub fn load_or_default(
    explicit: Option<&Path>,
) -> Result<(AppConfig, Option<PathBuf>), ConfigFileError> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config_file(),
    };
    match path {
        Some(path) => {
            let config = load_config_file(&path)?;
            tracing::debug!(path = %path.display(), "loaded config file");
            Ok((config, Some(path)))
        }
        None => Ok((AppConfig::default(), None)),
    }
}
