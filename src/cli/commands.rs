use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use thiserror::Error;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::{self, Config};
use crate::error::ConvertError;
use crate::filters::extract_rules;
use crate::pipeline::{self, ConstituentJob, StyleTranslator};
use crate::style::{
    analyze, default_style, inject_labels, MergeTarget, StyleDocument, StyleTarget,
};

use super::exit_codes;
use super::output::{
    self, BuildData, ConvertData, FallbackData, LabelData, OutputMode, RulesData,
};

#[derive(Parser)]
#[command(name = "sldbridge")]
#[command(about = "Converts SLD styles into labelled vector tile styles")]
#[command(version)]
pub struct Cli {
    /// Path to config file (overrides SLDBRIDGE_CONFIG env var and ./sldbridge.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (auto-enabled when stdout is piped)
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Force text output even when stdout is piped
    #[arg(long, global = true, conflicts_with = "json")]
    pub no_json: bool,

    /// Suppress all output on success (errors still go to stderr)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log more (-v info, -vv debug); SLDBRIDGE_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        OutputMode::from_flags(self.json, self.no_json, self.quiet)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the titled rules of an SLD document
    Rules {
        /// SLD document
        sld: PathBuf,
    },

    /// Copy rule titles from an SLD document into a translated style
    Label {
        /// SLD document the style was translated from
        sld: PathBuf,

        /// Translated style document
        style: PathBuf,

        /// Write the labelled style here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compile a style straight from the SLD text, without a translator
    Fallback {
        /// SLD document
        sld: PathBuf,

        /// Layer name (defaults to the file stem)
        #[arg(long)]
        name: Option<String>,

        /// Write the style here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Produce a style for one SLD document through the full fallback chain
    Convert {
        /// SLD document
        sld: PathBuf,

        /// Pre-translated style used instead of the configured translator
        #[arg(long)]
        style: Option<PathBuf>,

        /// Layer name (defaults to the file stem)
        #[arg(long)]
        name: Option<String>,

        /// Write the style here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Produce every configured layer and merge them into one style
    Build {
        /// Combined style path (overrides the configured output)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a shell completion script to stdout
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Show configuration file path
    Path,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "settings.parallel")
        key: String,
        /// Value to set
        value: String,
    },
    /// Show an example configuration with layers and a translator
    Default,
    /// Verify configuration file for errors
    Verify,
}

/// failure locating, reading or validating the config file
#[derive(Debug, Error)]
#[error("{0:#}")]
pub struct ConfigError(anyhow::Error);

/// arguments that parse but make no sense together
#[derive(Debug, Error)]
#[error("{0}")]
pub struct InvalidArgs(String);

/// map an error to the exit code scripts see
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    for cause in error.chain() {
        if cause.downcast_ref::<ConfigError>().is_some() {
            return exit_codes::CONFIG_ERROR;
        }
        if cause.downcast_ref::<InvalidArgs>().is_some() {
            return exit_codes::INVALID_ARGS;
        }
        if let Some(e) = cause.downcast_ref::<ConvertError>() {
            if e.is_unsupported() {
                return exit_codes::UNSUPPORTED_DOCUMENT;
            }
        }
    }
    exit_codes::ERROR
}

/// print a failed command's error the way the output mode expects
pub fn report_error(mode: OutputMode, error: &anyhow::Error) {
    let code = exit_code_for(error);
    if mode.is_json() {
        let causes = error.chain().skip(1).map(|c| c.to_string()).collect();
        output::print_json_error(code, &error.to_string(), causes);
    } else {
        eprintln!("error: {:#}", error);
    }
}

fn load_config(path: &Path) -> Result<Config> {
    config::load(path).map_err(|e| anyhow::Error::new(ConfigError(e)))
}

/// the config when one exists, otherwise defaults
fn optional_config(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}

fn layer_name(name: Option<String>, sld: &Path) -> Result<String> {
    let name = match name {
        Some(name) => name,
        None => sld
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    if name.trim().is_empty() {
        return Err(InvalidArgs(format!(
            "cannot derive a layer name from {}, pass --name",
            sld.display()
        ))
        .into());
    }
    Ok(name)
}

/// standalone target for one layer: the layer is its own source
fn single_target(config: &Config, name: &str) -> MergeTarget {
    MergeTarget {
        name: name.to_string(),
        source: name.to_string(),
        url: config.tiles_url_for(name),
        default_zoom: config.default_zoom(),
    }
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// write a style to `output`, or to stdout when there is none
fn emit_style(style: &StyleDocument, output: Option<&Path>) -> Result<()> {
    let json = style.to_json_pretty().context("Failed to serialize style")?;
    match output {
        Some(path) => write_text(path, &json),
        None => {
            println!("{}", json);
            Ok(())
        }
    }
}

fn report_path_for(output: &Path) -> PathBuf {
    output.with_extension("report.json")
}

pub fn execute(cli: Cli) -> Result<()> {
    let output_mode = cli.output_mode();
    let config_path = config::get_config_path(cli.config.as_deref());

    match cli.command {
        Commands::Rules { sld } => {
            let text = pipeline::load_legacy(&sld)?;
            let rules = extract_rules(&text);

            match output_mode {
                OutputMode::Json => output::print_json(&RulesData {
                    document: sld.display().to_string(),
                    rules: &rules,
                }),
                OutputMode::Text => {
                    for rule in &rules {
                        println!("{}", output::format_rule(rule));
                    }
                }
                OutputMode::Quiet => {}
            }
            Ok(())
        }

        Commands::Label { sld, style, output } => {
            let text = pipeline::load_legacy(&sld)?;
            let rules = extract_rules(&text);

            let mut document = StyleDocument::from_json_str(&read_text(&style)?)
                .with_context(|| format!("Invalid style document: {}", style.display()))?;
            let report = inject_labels(&mut document, &rules);
            emit_style(&document, output.as_deref())?;

            // the style itself is the result when it went to stdout
            if let Some(path) = output {
                match output_mode {
                    OutputMode::Json => output::print_json(&LabelData {
                        action: "label",
                        output: path.display().to_string(),
                        labelled: report.labelled,
                        unmatched: report.unmatched,
                    }),
                    OutputMode::Text => {
                        println!(
                            "Labelled {} of {} layers: {}",
                            report.labelled,
                            document.layers.len(),
                            path.display()
                        );
                        for id in &report.unmatched {
                            println!("  - no rule for layer '{}'", id);
                        }
                    }
                    OutputMode::Quiet => {}
                }
            }
            Ok(())
        }

        Commands::Fallback { sld, name, output } => {
            let config = optional_config(&config_path)?;
            let name = layer_name(name, &sld)?;
            let text = pipeline::load_legacy(&sld)?;

            let target = StyleTarget::new(&name, &name, config.tiles_url_for(&name));
            let analysis = analyze(&text);
            let (style, used_default) = match analysis.to_style(&target) {
                Some(style) => (style, false),
                None => (
                    default_style(analysis.geometry, &target, &analysis.legend()),
                    true,
                ),
            };
            emit_style(&style, output.as_deref())?;

            if let Some(path) = output {
                match output_mode {
                    OutputMode::Json => output::print_json(&FallbackData {
                        action: "fallback",
                        output: path.display().to_string(),
                        geometry: analysis.geometry,
                        rules: analysis.rules.len(),
                        layers: style.layers.len(),
                        mixed_geometry: analysis.mixed_geometry,
                        default_style: used_default,
                    }),
                    OutputMode::Text if used_default => println!(
                        "No renderable rules ({} recognized), wrote default style: {}",
                        analysis.rules.len(),
                        path.display()
                    ),
                    OutputMode::Text => println!(
                        "Compiled {} layers from {} rules: {}",
                        style.layers.len(),
                        analysis.rules.len(),
                        path.display()
                    ),
                    OutputMode::Quiet => {}
                }
            }
            Ok(())
        }

        Commands::Convert {
            sld,
            style,
            name,
            output,
        } => {
            let config = optional_config(&config_path)?;
            let name = layer_name(name, &sld)?;
            let translator = config.command_translator();

            let mut job = ConstituentJob::new(&name, &sld);
            job.style = style;

            let target = single_target(&config, &name);
            let (document, report) = pipeline::convert(
                &job,
                &target,
                translator.as_ref().map(|t| t as &dyn StyleTranslator),
            )?;
            emit_style(&document, output.as_deref())?;

            if let Some(path) = output {
                match output_mode {
                    OutputMode::Json => output::print_json(&ConvertData {
                        action: "convert",
                        output: path.display().to_string(),
                        constituent: &report,
                    }),
                    OutputMode::Text => {
                        println!("{}", output::format_constituent(&report));
                        println!("Wrote {}", path.display());
                    }
                    OutputMode::Quiet => {}
                }
            }
            Ok(())
        }

        Commands::Build { output } => {
            let config = load_config(&config_path)?;
            if config.layers.is_empty() {
                return Err(ConfigError(anyhow!(
                    "no layers configured in {}",
                    config_path.display()
                ))
                .into());
            }

            let base = config::base_dir(&config_path);
            let jobs = config::jobs(&config, &base);
            let output = output.unwrap_or_else(|| config::output_path(&config, &base));
            let translator = config.command_translator();

            let (document, report) = pipeline::build(
                &jobs,
                &config.merge_target(),
                translator.as_ref().map(|t| t as &dyn StyleTranslator),
                config.settings.parallel,
            )?;

            let report_path = report_path_for(&output);
            emit_style(&document, Some(&output))?;
            let report_json =
                serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
            write_text(&report_path, &report_json)?;

            match output_mode {
                OutputMode::Json => output::print_json(&BuildData {
                    action: "build",
                    output: output.display().to_string(),
                    report_path: report_path.display().to_string(),
                    report: &report,
                }),
                OutputMode::Text => {
                    for constituent in &report.constituents {
                        println!("{}", output::format_constituent(constituent));
                    }
                    println!(
                        "Wrote {} layers (zoom {}-{}): {}",
                        document.layers.len(),
                        report.zoom.min,
                        report.zoom.max,
                        output.display()
                    );
                }
                OutputMode::Quiet => {}
            }
            Ok(())
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "sldbridge", &mut io::stdout());
            Ok(())
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let config = load_config(&config_path)?;
                let json =
                    serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
                println!("{}", json);
                Ok(())
            }
            ConfigCommands::Path => {
                println!("{}", config_path.display());
                Ok(())
            }
            ConfigCommands::Set { key, value } => {
                let mut config = optional_config(&config_path)?;
                config::set_value(&mut config, &key, &value).map_err(ConfigError)?;
                config::save(&config, &config_path)?;
                if !output_mode.is_quiet() {
                    println!("Set {} = {}", key, value);
                }
                Ok(())
            }
            ConfigCommands::Default => {
                let config = config::default_with_examples();
                let json =
                    serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
                println!("{}", json);
                Ok(())
            }
            ConfigCommands::Verify => {
                let errors = config::verify(&config_path).map_err(ConfigError)?;

                if errors.is_empty() {
                    if !output_mode.is_quiet() {
                        println!("✓ Configuration is valid: {}", config_path.display());
                    }
                    Ok(())
                } else {
                    if !output_mode.is_json() {
                        println!(
                            "✗ Configuration has {} error(s): {}",
                            errors.len(),
                            config_path.display()
                        );
                        println!();
                        for error in &errors {
                            println!("  - {}", error);
                        }
                    }
                    Err(ConfigError(anyhow!(
                        "configuration validation failed: {}",
                        errors.join("; ")
                    ))
                    .into())
                }
            }
        },
    }
}
