//! output formatting utilities for scriptable CLI output
//!
//! uses JSON-RPC 2.0 format for machine-readable output:
//! - success: {"jsonrpc": "2.0", "result": {...}, "id": null}
//! - error: {"jsonrpc": "2.0", "error": {"code": N, "message": "...", "data": {...}}, "id": null}

use serde::Serialize;
use std::io::IsTerminal;

use crate::filters::StyleRule;
use crate::pipeline::{BuildReport, ConstituentReport};
use crate::style::Geometry;

/// JSON-RPC version constant
const JSONRPC_VERSION: &str = "2.0";

/// output mode determines how results are formatted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// human-readable text output
    Text,
    /// machine-readable JSON-RPC 2.0 output
    Json,
    /// no output on success (errors still go to stderr)
    Quiet,
}

impl OutputMode {
    /// determine output mode from CLI flags and environment
    ///
    /// priority: quiet > json > no_json > auto-detect
    pub fn from_flags(json: bool, no_json: bool, quiet: bool) -> Self {
        if quiet {
            return Self::Quiet;
        }
        if json {
            return Self::Json;
        }
        if no_json {
            return Self::Text;
        }
        // auto-detect: JSON when stdout is not a TTY (piped)
        if !std::io::stdout().is_terminal() {
            Self::Json
        } else {
            Self::Text
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json)
    }

    pub fn is_quiet(&self) -> bool {
        matches!(self, Self::Quiet)
    }
}

/// JSON-RPC 2.0 success response
#[derive(Serialize)]
pub struct JsonRpcResponse<T: Serialize> {
    pub jsonrpc: &'static str,
    pub result: T,
    /// null for CLI responses (no request id)
    pub id: Option<String>,
}

impl<T: Serialize> JsonRpcResponse<T> {
    pub fn new(result: T) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            result,
            id: None,
        }
    }
}

/// JSON-RPC 2.0 error response
#[derive(Serialize)]
pub struct JsonRpcError {
    pub jsonrpc: &'static str,
    pub error: RpcError,
    pub id: Option<String>,
}

/// JSON-RPC 2.0 error object
#[derive(Serialize)]
pub struct RpcError {
    /// error code (sldbridge exit code, offset by -32000 for app-specific errors)
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ErrorData>,
}

/// additional error data
#[derive(Serialize)]
pub struct ErrorData {
    /// lower-level causes, outermost first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl JsonRpcError {
    /// create error with standard JSON-RPC error code range
    /// sldbridge uses -32000 to -32099 for application errors (per JSON-RPC spec)
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            error: RpcError {
                code: to_jsonrpc_code(code),
                message: message.into(),
                data: None,
            },
            id: None,
        }
    }

    pub fn with_causes(code: i32, message: impl Into<String>, causes: Vec<String>) -> Self {
        let mut error = Self::new(code, message);
        if !causes.is_empty() {
            error.error.data = Some(ErrorData { causes });
        }
        error
    }
}

/// convert sldbridge exit code to JSON-RPC error code
/// JSON-RPC reserves -32000 to -32099 for server/application errors
fn to_jsonrpc_code(code: i32) -> i32 {
    -32000 - code
}

// ============================================================================
// Result data structures for different commands
// ============================================================================

/// result data for the rules command
#[derive(Serialize)]
pub struct RulesData<'a> {
    pub document: String,
    pub rules: &'a [StyleRule],
}

/// result data for the label command
#[derive(Serialize)]
pub struct LabelData {
    pub action: &'static str,
    pub output: String,
    pub labelled: usize,
    pub unmatched: Vec<String>,
}

/// result data for the fallback command
#[derive(Serialize)]
pub struct FallbackData {
    pub action: &'static str,
    pub output: String,
    pub geometry: Geometry,
    pub rules: usize,
    pub layers: usize,
    pub mixed_geometry: bool,
    /// nothing was renderable, the fixed default style was written
    pub default_style: bool,
}

/// result data for the convert command
#[derive(Serialize)]
pub struct ConvertData<'a> {
    pub action: &'static str,
    pub output: String,
    pub constituent: &'a ConstituentReport,
}

/// result data for the build command
#[derive(Serialize)]
pub struct BuildData<'a> {
    pub action: &'static str,
    pub output: String,
    pub report_path: String,
    pub report: &'a BuildReport,
}

// ============================================================================
// Output functions
// ============================================================================

/// one rule as a single text line
pub fn format_rule(rule: &StyleRule) -> String {
    if rule.conditions.is_empty() {
        return format!("{} (no conditions)", rule.title);
    }
    let conditions: Vec<String> = rule
        .conditions
        .iter()
        .map(|c| format!("{} {} {}", c.property, c.op, c.value))
        .collect();
    format!("{}: {}", rule.title, conditions.join(" and "))
}

/// one constituent outcome as a single text line
pub fn format_constituent(report: &ConstituentReport) -> String {
    let mut line = format!(
        "{}: {} ({} rules, {} layers, {} labelled)",
        report.name, report.tier, report.rules, report.layers, report.labelled
    );
    if report.mixed_geometry {
        line.push_str(" [mixed geometry]");
    }
    line
}

/// print JSON-RPC success response to stdout
pub fn print_json<T: Serialize>(data: &T) {
    let response = JsonRpcResponse::new(data);
    if let Ok(json) = serde_json::to_string(&response) {
        println!("{}", json);
    }
}

/// print JSON-RPC error to stdout
pub fn print_json_error(code: i32, message: &str, causes: Vec<String>) {
    let error = JsonRpcError::with_causes(code, message, causes);
    if let Ok(json) = serde_json::to_string(&error) {
        println!("{}", json);
    }
}
