mod schema;

pub use schema::{
    Config, LayerConfig, Settings, TranslatorConfig, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM,
    DEFAULT_NAME, DEFAULT_OUTPUT, DEFAULT_TILES_URL, DEFAULT_TIMEOUT_SECS,
};

use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::pipeline::ConstituentJob;

const CONFIG_ENV_VAR: &str = "SLDBRIDGE_CONFIG";
const CONFIG_FILE_NAME: &str = "sldbridge.json";

/// highest zoom level a vector tile archive can carry
pub const MAX_ZOOM_LEVEL: u8 = 24;

/// `--config`, then `SLDBRIDGE_CONFIG`, then `./sldbridge.json`
pub fn get_config_path(override_path: Option<&Path>) -> PathBuf {
    if let Some(path) = override_path {
        return expand(path);
    }

    if let Ok(path) = env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return expand(Path::new(&path));
        }
    }

    PathBuf::from(CONFIG_FILE_NAME)
}

pub fn load(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(anyhow!("config file not found: {}", path.display()));
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = json5::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

pub fn save(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let content = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    Ok(())
}

/// directory relative paths in the config resolve against
pub fn base_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// expand `~` and anchor relative paths at `base`
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    let expanded = expand(path);
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).to_string())
}

/// configured constituents in order, paths resolved against `base`
pub fn jobs(config: &Config, base: &Path) -> Vec<ConstituentJob> {
    config
        .layers
        .iter()
        .map(|layer| ConstituentJob {
            name: layer.name.clone(),
            legacy: resolve_path(base, &layer.sld),
            style: layer.style.as_ref().map(|p| resolve_path(base, p)),
            min_zoom: layer.min_zoom,
            max_zoom: layer.max_zoom,
        })
        .collect()
}

pub fn output_path(config: &Config, base: &Path) -> PathBuf {
    resolve_path(base, &config.output)
}

/// Verify configuration file and return a list of errors
pub fn verify(path: &Path) -> Result<Vec<String>> {
    let mut errors = Vec::new();

    if !path.exists() {
        return Err(anyhow!("config file not found: {}", path.display()));
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: Config = match json5::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            return Err(anyhow!("invalid JSON: {}", e));
        }
    };

    let base = base_dir(path);

    if config.name.trim().is_empty() {
        errors.push("name: must not be empty".to_string());
    }

    if config.layers.is_empty() {
        errors.push("layers: at least one layer is required".to_string());
    }

    let mut seen = HashSet::new();
    for (i, layer) in config.layers.iter().enumerate() {
        let prefix = format!("layers[{}]", i);

        if layer.name.trim().is_empty() {
            errors.push(format!("{}: name must not be empty", prefix));
        } else if !seen.insert(layer.name.as_str()) {
            errors.push(format!("{}: duplicate layer name '{}'", prefix, layer.name));
        }

        let sld = resolve_path(&base, &layer.sld);
        if !sld.is_file() {
            errors.push(format!("{}: sld file not found: {}", prefix, sld.display()));
        }

        if let Some(style) = &layer.style {
            let style = resolve_path(&base, style);
            if !style.is_file() {
                errors.push(format!(
                    "{}: style file not found: {}",
                    prefix,
                    style.display()
                ));
            }
        }

        if let Err(e) = validate_zoom(layer.min_zoom, layer.max_zoom) {
            errors.push(format!("{}: {}", prefix, e));
        }
    }

    if let Err(e) = validate_zoom(
        Some(config.settings.default_min_zoom),
        Some(config.settings.default_max_zoom),
    ) {
        errors.push(format!("settings: {}", e));
    }

    if let Some(translator) = &config.translator {
        if translator.command.trim().is_empty() {
            errors.push("translator: command must not be empty".to_string());
        }
        if translator.timeout_secs == 0 {
            errors.push("translator: timeout_secs must be greater than 0".to_string());
        }
    }

    Ok(errors)
}

fn validate_zoom(min: Option<u8>, max: Option<u8>) -> Result<(), String> {
    for zoom in [min, max].into_iter().flatten() {
        if zoom > MAX_ZOOM_LEVEL {
            return Err(format!(
                "zoom {} out of range (0-{})",
                zoom, MAX_ZOOM_LEVEL
            ));
        }
    }

    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(format!(
                "min zoom {} is greater than max zoom {}",
                min, max
            ));
        }
    }

    Ok(())
}

pub fn set_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["name"] => {
            config.name = non_empty(key, value)?;
        }
        ["source_name"] => {
            config.source_name = if value.trim().is_empty() {
                None
            } else {
                Some(value.to_string())
            };
        }
        ["tiles_url"] => {
            config.tiles_url = non_empty(key, value)?;
        }
        ["output"] => {
            config.output = PathBuf::from(non_empty(key, value)?);
        }
        ["settings", "default_min_zoom"] => {
            config.settings.default_min_zoom = parse_zoom(value)?;
        }
        ["settings", "default_max_zoom"] => {
            config.settings.default_max_zoom = parse_zoom(value)?;
        }
        ["settings", "parallel"] => {
            config.settings.parallel = parse_bool(value)?;
        }
        ["translator", "command"] => {
            let command = non_empty(key, value)?;
            match &mut config.translator {
                Some(translator) => translator.command = command,
                None => {
                    config.translator = Some(TranslatorConfig {
                        command,
                        args: vec![],
                        timeout_secs: DEFAULT_TIMEOUT_SECS,
                    })
                }
            }
        }
        ["translator", "timeout_secs"] => {
            let translator = config
                .translator
                .as_mut()
                .ok_or_else(|| anyhow!("No translator configured. Set translator.command first"))?;
            translator.timeout_secs = value
                .parse()
                .with_context(|| format!("Invalid number: {}", value))?;
        }
        _ => {
            return Err(anyhow!(
                "Unknown config key: {}. Valid keys include: name, source_name, tiles_url, output, settings.default_min_zoom, settings.default_max_zoom, settings.parallel, translator.command, translator.timeout_secs",
                key
            ));
        }
    }

    Ok(())
}

/// generates a default config with example layers and a translator
pub fn default_with_examples() -> Config {
    Config {
        name: "geology".to_string(),
        output: PathBuf::from("dist/style.json"),
        layers: vec![
            LayerConfig {
                name: "faults".to_string(),
                sld: PathBuf::from("styles/faults.sld"),
                style: None,
                min_zoom: Some(4),
                max_zoom: Some(12),
            },
            // pre-translated style instead of running the translator
            LayerConfig {
                name: "units".to_string(),
                sld: PathBuf::from("styles/units.sld"),
                style: Some(PathBuf::from("build/units.json")),
                min_zoom: None,
                max_zoom: None,
            },
        ],
        translator: Some(TranslatorConfig {
            command: "geostyler".to_string(),
            args: vec![
                "-s".to_string(),
                "sld".to_string(),
                "-t".to_string(),
                "mapbox".to_string(),
                "-o".to_string(),
                "{output}".to_string(),
                "{input}".to_string(),
            ],
            timeout_secs: 60,
        }),
        ..Config::default()
    }
}

fn non_empty(key: &str, value: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(anyhow!("{} must not be empty", key));
    }
    Ok(value.to_string())
}

fn parse_zoom(value: &str) -> Result<u8> {
    let zoom: u8 = value
        .parse()
        .with_context(|| format!("Invalid zoom level: {}", value))?;
    if zoom > MAX_ZOOM_LEVEL {
        return Err(anyhow!(
            "Zoom level {} out of range (0-{})",
            zoom,
            MAX_ZOOM_LEVEL
        ));
    }
    Ok(zoom)
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(anyhow!(
            "Invalid boolean value: {}. Use true/false, yes/no, 1/0, or on/off",
            value
        )),
    }
}
