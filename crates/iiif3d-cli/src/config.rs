//! CLI configuration: where assets live and how new resources are named.
//!
//! Read from an explicit `--config` path, or from `iiif3d.toml` in the
//! working directory when present. RON and JSON files are accepted too; the
//! format is picked from the extension.

use std::path::{Path, PathBuf};

use iiif3d_core::mint::DEFAULT_ID_BASE;
use iiif3d_core::scaffold::{DEFAULT_MANIFEST_LABEL, DEFAULT_RIGHTS, ScaffoldOptions};
use iiif3d_core::{ExportOptions, ImportOptions};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "iiif3d.toml";

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unsupported config format: {file}")]
    UnsupportedFormat { file: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Config
// ===========================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Local copies of remote model assets, looked up by file name.
    pub asset_dir: PathBuf,
    /// Base URL for minted resource ids.
    pub id_base: String,
    /// `rights` of newly created manifests.
    pub default_rights: String,
    /// Label of newly created manifests.
    pub label: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            asset_dir: PathBuf::from("assets"),
            id_base: DEFAULT_ID_BASE.to_string(),
            default_rights: DEFAULT_RIGHTS.to_string(),
            label: DEFAULT_MANIFEST_LABEL.to_string(),
        }
    }
}

impl Config {
    /// Load `path`, or the default config file if it exists, or defaults.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let parse_err = |detail: String| ConfigError::Parse {
            file: path.to_path_buf(),
            detail,
        };
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
            Some("ron") => ron::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
            Some("json") => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    file: path.to_path_buf(),
                });
            }
        };
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn import_options(&self, root_name: Option<String>) -> ImportOptions {
        ImportOptions { root_name }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            id_base: self.id_base.clone(),
        }
    }

    pub fn scaffold_options(&self, label: Option<String>) -> ScaffoldOptions {
        ScaffoldOptions {
            id_base: self.id_base.clone(),
            rights: self.default_rights.clone(),
            label: label.unwrap_or_else(|| self.label.clone()),
        }
    }
}
