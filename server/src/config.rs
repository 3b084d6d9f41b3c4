use crate::error::{Result, TagError};
use log::warn;
use serde::{Deserialize, Serialize};
use shared::{CAROUSEL_DELIMITER, DATA_FILE_NAME, TICK_INTERVAL_MS};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Tag server configuration, read from YAML. Every field has a default.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TagConfig {
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
    #[serde(default)]
    pub debug: bool,
    /// Color names cycled through by rainbow tags, in order
    #[serde(default = "default_rainbow_color_names")]
    pub rainbow_color_names: Vec<String>,
    /// Color name to literal value
    #[serde(default = "default_available_colors")]
    pub available_colors: BTreeMap<String, String>,
    /// Directory holding the permanent tag file
    #[serde(default = "default_folder")]
    pub folder: PathBuf,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_carousel_delimiter")]
    pub carousel_delimiter: char,
}

fn default_enabled() -> bool {
    true
}

fn default_rainbow_color_names() -> Vec<String> {
    [
        "pink",
        "red",
        "crimson",
        "tomato",
        "orange",
        "gold",
        "lime",
        "light_green",
        "emerald",
        "teal",
        "aqua",
        "cyan",
        "blue",
        "purple",
        "deep_pink",
        "magenta",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}

fn default_available_colors() -> BTreeMap<String, String> {
    [
        ("pink", "#FF96DE"),
        ("red", "#C50000"),
        ("brown", "#944710"),
        ("silver", "#A0A0A0"),
        ("light_green", "#32CD32"),
        ("crimson", "#DC143C"),
        ("cyan", "#0087EB"),
        ("aqua", "#00FFFF"),
        ("deep_pink", "#FF1493"),
        ("tomato", "#FF6448"),
        ("yellow", "yellow"),
        ("magenta", "#FF0090"),
        ("blue_green", "#ADFFB8"),
        ("orange", "#FF9966"),
        ("lime", "#BFFF00"),
        ("green", "#228B22"),
        ("emerald", "#50C878"),
        ("carmine", "#960018"),
        ("nickel", "#727472"),
        ("mint", "#98F888"),
        ("army_green", "#4B5320"),
        ("pumpkin", "#EE7600"),
        ("gold", "#EFC01A"),
        ("teal", "#008080"),
        ("blue", "#005EBC"),
        ("purple", "#8137CE"),
        ("light_red", "#FD8272"),
        ("silver_blue", "#666699"),
        ("police_blue", "#002DB3"),
        ("white", "white"),
        ("black", "black"),
    ]
    .iter()
    .map(|(name, value)| (name.to_string(), value.to_string()))
    .collect()
}

fn default_folder() -> PathBuf {
    PathBuf::from("configs")
}

fn default_tick_interval_ms() -> u64 {
    TICK_INTERVAL_MS
}

fn default_carousel_delimiter() -> char {
    CAROUSEL_DELIMITER
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            is_enabled: default_enabled(),
            debug: false,
            rainbow_color_names: default_rainbow_color_names(),
            available_colors: default_available_colors(),
            folder: default_folder(),
            tick_interval_ms: default_tick_interval_ms(),
            carousel_delimiter: default_carousel_delimiter(),
        }
    }
}

impl TagConfig {
    /// Reads the configuration at `path`, falling back to defaults when the
    /// file does not exist or is blank.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            TagError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content)
            .map_err(|e| TagError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Checks the settings the refresh loop cannot run without.
    ///
    /// Palette entries with no matching color name are only warned about:
    /// they still resolve, just to their raw name.
    pub fn validate(&self) -> Result<()> {
        if self.rainbow_color_names.is_empty() {
            return Err(TagError::Config(
                "rainbow_color_names must not be empty".to_string(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(TagError::Config(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }

        let known: Vec<String> = self
            .available_colors
            .keys()
            .map(|name| name.to_lowercase())
            .collect();
        for name in &self.rainbow_color_names {
            if !known.contains(&name.to_lowercase()) {
                warn!(
                    "Rainbow color '{}' is not listed in available_colors and will be sent as-is",
                    name
                );
            }
        }

        Ok(())
    }

    pub fn data_file_path(&self) -> PathBuf {
        self.folder.join(DATA_FILE_NAME)
    }
}
