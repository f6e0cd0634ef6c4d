use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::CommandTranslator;
use crate::style::{MergeTarget, ZoomRange};

pub const DEFAULT_NAME: &str = "combined";
pub const DEFAULT_TILES_URL: &str = "pmtiles://{name}.pmtiles";
pub const DEFAULT_OUTPUT: &str = "style.json";
pub const DEFAULT_MIN_ZOOM: u8 = 0;
pub const DEFAULT_MAX_ZOOM: u8 = 14;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// placeholder in `tiles_url` replaced with the archive name
pub const NAME_PLACEHOLDER: &str = "{name}";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// combined style name, also the default source and archive name
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(default = "default_tiles_url")]
    pub tiles_url: String,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translator: Option<TranslatorConfig>,
    #[serde(default)]
    pub settings: Settings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            source_name: None,
            tiles_url: default_tiles_url(),
            output: default_output(),
            layers: vec![],
            translator: None,
            settings: Settings::default(),
        }
    }
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_tiles_url() -> String {
    DEFAULT_TILES_URL.to_string()
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT)
}

impl Config {
    /// style source id shared by every merged layer
    pub fn source(&self) -> &str {
        self.source_name.as_deref().unwrap_or(&self.name)
    }

    /// tile archive reference for `name`
    pub fn tiles_url_for(&self, name: &str) -> String {
        self.tiles_url.replace(NAME_PLACEHOLDER, name)
    }

    pub fn default_zoom(&self) -> ZoomRange {
        ZoomRange::new(
            self.settings.default_min_zoom,
            self.settings.default_max_zoom,
        )
    }

    /// identity of the combined document
    pub fn merge_target(&self) -> MergeTarget {
        MergeTarget {
            name: self.name.clone(),
            source: self.source().to_string(),
            url: self.tiles_url_for(&self.name),
            default_zoom: self.default_zoom(),
        }
    }

    pub fn command_translator(&self) -> Option<CommandTranslator> {
        self.translator.as_ref().map(TranslatorConfig::to_translator)
    }
}

/// one constituent of the combined style
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    pub name: String,
    pub sld: PathBuf,
    /// pre-translated style, skips the translator command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_zoom: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_zoom: Option<u8>,
}

/// external primary translator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    pub command: String,
    /// `{input}` and `{output}` are substituted
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl TranslatorConfig {
    pub fn to_translator(&self) -> CommandTranslator {
        CommandTranslator::new(
            self.command.clone(),
            self.args.clone(),
            Duration::from_secs(self.timeout_secs),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_min_zoom")]
    pub default_min_zoom: u8,
    #[serde(default = "default_max_zoom")]
    pub default_max_zoom: u8,
    /// produce constituents on separate threads
    #[serde(default)]
    pub parallel: bool,
}

fn default_min_zoom() -> u8 {
    DEFAULT_MIN_ZOOM
}

fn default_max_zoom() -> u8 {
    DEFAULT_MAX_ZOOM
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_min_zoom: DEFAULT_MIN_ZOOM,
            default_max_zoom: DEFAULT_MAX_ZOOM,
            parallel: false,
        }
    }
}
