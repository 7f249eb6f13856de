// Kbedit Settings Module
// User-tunable import behaviour and the location of the rule store

use std::path::{Path, PathBuf};

use crate::import::ImportOptions;

/// Settings for kbedit
///
/// Loaded from a TOML file (default: ~/.config/kbedit/settings.toml).
/// Anything left out keeps its default.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Duplicate-detection threshold and order spacing
    import: ImportOptions,

    /// Explicit store snapshot path, if configured
    store_path: Option<PathBuf>,

    /// Path to the settings file (for reload)
    source_path: Option<PathBuf>,
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid setting value: {0}")]
    InvalidValue(String),
}

/// TOML representation for deserializing settings
#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SettingsToml {
    #[serde(default)]
    import: Option<ImportSettings>,

    #[serde(default)]
    store: Option<StoreSettings>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct ImportSettings {
    #[serde(default)]
    similarity_threshold: Option<f64>,
    #[serde(default)]
    order_spacing: Option<i64>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct StoreSettings {
    #[serde(default)]
    path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    pub fn new() -> Self {
        Self {
            import: ImportOptions::default(),
            store_path: None,
            source_path: None,
        }
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(&path)?;
        let mut settings = Self::from_toml(&content)?;
        settings.source_path = Some(path.as_ref().to_path_buf());
        Ok(settings)
    }

    /// Load settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let toml_settings: SettingsToml =
            toml::from_str(content).map_err(|e| SettingsError::TomlParse(e.to_string()))?;

        let mut settings = Self::new();

        if let Some(import) = toml_settings.import {
            if let Some(threshold) = import.similarity_threshold {
                if !(threshold > 0.0 && threshold <= 1.0) {
                    return Err(SettingsError::InvalidValue(format!(
                        "similarity_threshold must be in (0, 1], got {}",
                        threshold
                    )));
                }
                settings.import.similarity_threshold = threshold;
            }
            if let Some(spacing) = import.order_spacing {
                if spacing <= 0 {
                    return Err(SettingsError::InvalidValue(format!(
                        "order_spacing must be positive, got {}",
                        spacing
                    )));
                }
                settings.import.order_spacing = spacing;
            }
        }

        if let Some(store) = toml_settings.store {
            settings.store_path = store.path;
        }

        Ok(settings)
    }

    /// Get the default settings path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("kbedit").join("settings.toml"))
    }

    /// Load from default location (~/.config/kbedit/settings.toml)
    pub fn load_default() -> Result<Self, SettingsError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        Ok(Self::new())
    }

    pub fn import_options(&self) -> ImportOptions {
        self.import
    }

    /// Configured store path, else `<data dir>/kbedit/store.json`
    pub fn store_path(&self) -> Option<PathBuf> {
        self.store_path
            .clone()
            .or_else(|| dirs::data_dir().map(|p| p.join("kbedit").join("store.json")))
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Reload settings from the original file
    pub fn reload(&mut self) -> Result<(), SettingsError> {
        if let Some(ref path) = self.source_path {
            let new_settings = Self::from_file(path)?;
            *self = new_settings;
            Ok(())
        } else {
            Err(SettingsError::InvalidValue("No source path set".to_string()))
        }
    }
}

/// Create default settings content for a new installation
pub fn default_settings_content() -> &'static str {
    r#"# Kbedit Settings
# Place this file at: ~/.config/kbedit/settings.toml

[import]
# Share of sorted rule-group descriptions that must match for an import
# to count as a duplicate of an existing configuration
similarity_threshold = 0.8
# Order gap between consecutive imported rule-groups
order_spacing = 100

[store]
# Where configurations and rules are kept between runs
# path = "/home/me/.local/share/kbedit/store.json"
"#
}
