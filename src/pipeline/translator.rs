//! primary style translators
//!
//! the primary translator is an opaque external tool. this crate only cares
//! whether it produced a complete style document or failed.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::ConvertError;
use crate::style::StyleDocument;

/// placeholder replaced with the legacy document path
pub const INPUT_PLACEHOLDER: &str = "{input}";
/// placeholder replaced with a scratch file the tool writes its style to
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// turns a legacy document into a declarative style, or fails
pub trait StyleTranslator: Send + Sync {
    fn translate(&self, legacy: &Path) -> Result<StyleDocument, ConvertError>;

    /// short description for logs and reports
    fn describe(&self) -> String;
}

/// a style already translated ahead of time
#[derive(Debug, Clone)]
pub struct StyleFile {
    pub path: PathBuf,
}

impl StyleFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StyleTranslator for StyleFile {
    fn translate(&self, _legacy: &Path) -> Result<StyleDocument, ConvertError> {
        let content =
            fs::read_to_string(&self.path).map_err(|e| ConvertError::io(&self.path, e))?;
        Ok(StyleDocument::from_json_str(&content)?)
    }

    fn describe(&self) -> String {
        format!("style file {}", self.path.display())
    }
}

/// runs an external translator command
#[derive(Debug, Clone)]
pub struct CommandTranslator {
    pub command: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl CommandTranslator {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    fn expand_args(&self, input: &Path, output: &Path) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace(INPUT_PLACEHOLDER, &input.to_string_lossy())
                    .replace(OUTPUT_PLACEHOLDER, &output.to_string_lossy())
            })
            .collect()
    }

    fn writes_output_file(&self) -> bool {
        self.args.iter().any(|a| a.contains(OUTPUT_PLACEHOLDER))
    }
}

impl StyleTranslator for CommandTranslator {
    fn translate(&self, legacy: &Path) -> Result<StyleDocument, ConvertError> {
        let scratch = tempfile::tempdir()
            .map_err(|e| ConvertError::Translator(format!("no scratch directory: {}", e)))?;
        let output_path = scratch.path().join("style.json");
        let args = self.expand_args(legacy, &output_path);

        debug!(command = %self.command, ?args, "running style translator");

        let mut child = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ConvertError::Translator(format!("failed to start '{}': {}", self.command, e))
            })?;

        // drain pipes on their own threads so a chatty tool cannot block
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started.elapsed() >= self.timeout => {
                    child.kill().ok();
                    child.wait().ok();
                    return Err(ConvertError::Translator(format!(
                        "'{}' timed out after {}s",
                        self.command,
                        self.timeout.as_secs()
                    )));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    return Err(ConvertError::Translator(format!(
                        "failed to wait for '{}': {}",
                        self.command, e
                    )))
                }
            }
        };

        let stdout = stdout.map(join_output).unwrap_or_default();
        let stderr = stderr.map(join_output).unwrap_or_default();

        if !status.success() {
            return Err(ConvertError::Translator(format!(
                "'{}' exited with {}: {}",
                self.command,
                status,
                stderr.trim()
            )));
        }

        let content = if self.writes_output_file() {
            fs::read_to_string(&output_path).map_err(|e| ConvertError::io(&output_path, e))?
        } else {
            stdout
        };

        if content.trim().is_empty() {
            return Err(ConvertError::Translator(format!(
                "'{}' produced no style",
                self.command
            )));
        }

        Ok(StyleDocument::from_json_str(&content)?)
    }

    fn describe(&self) -> String {
        format!("command '{}'", self.command)
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        reader.read_to_string(&mut buf).ok();
        buf
    })
}

fn join_output(handle: thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}
