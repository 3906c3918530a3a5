//! CLI output formats
//!
//! Trees can be shown as treeviz or JSON. Diagnostics are printed one per line in the
//! `path:line:column: severity code: message` shape editors know how to jump to. Split
//! commands are printed as command envelopes, one JSON document per line.

use polyglot_kernel::{KernelCommand, KernelCommandEnvelope};
use polyglot_parser::polyglot::formats::{to_json_string, to_treeviz_str};
use polyglot_parser::polyglot::{Diagnostic, SyntaxTree};
use std::sync::Arc;

/// All tree formats `parse` accepts
pub const AVAILABLE_FORMATS: &[&str] = &["treeviz", "json"];

pub fn render_tree(tree: &SyntaxTree, format: &str) -> Result<String, String> {
    match format {
        "treeviz" => Ok(to_treeviz_str(tree)),
        "json" => to_json_string(tree)
            .map(|json| format!("{json}\n"))
            .map_err(|e| format!("JSON serialization failed: {}", e)),
        other => Err(format!(
            "Unknown format '{}'. Available formats: {}",
            other,
            AVAILABLE_FORMATS.join(", ")
        )),
    }
}

/// Positions are printed 1-based.
pub fn render_diagnostic(path: &str, diagnostic: &Diagnostic) -> String {
    format!(
        "{}:{}:{}: {} {}: {}",
        path,
        diagnostic.range.start.line + 1,
        diagnostic.range.start.column + 1,
        diagnostic.severity,
        diagnostic.code,
        diagnostic.message
    )
}

pub fn render_envelopes(commands: &[Arc<KernelCommand>]) -> Result<String, String> {
    let mut out = String::new();
    for command in commands {
        let line = KernelCommandEnvelope::from_command(command)
            .and_then(|envelope| envelope.serialize())
            .map_err(|e| format!("Envelope serialization failed: {}", e))?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}
