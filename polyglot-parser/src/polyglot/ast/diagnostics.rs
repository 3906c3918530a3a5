//! Diagnostics attached to syntax nodes
//!
//!     Parsing never fails. Unknown directives, bad parameters, malformed JSON and the like are
//!     recorded as [`Diagnostic`] values on the node where the problem was found. A tree's
//!     diagnostics are the concatenation of its nodes' diagnostics in document order.
//!
//!     Every diagnostic carries a stable [`DiagnosticCode`] so tools can filter on it without
//!     matching message text.

use super::range::Range;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic severity, most severe first. `Hidden` diagnostics are recorded but not shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
    Hidden,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Error => write!(f, "error"),
            DiagnosticSeverity::Warning => write!(f, "warning"),
            DiagnosticSeverity::Info => write!(f, "info"),
            DiagnosticSeverity::Hidden => write!(f, "hidden"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    #[serde(rename = "DNI101")]
    UnknownDirective,
    #[serde(rename = "DNI103")]
    UnknownParameterName,
    #[serde(rename = "DNI104")]
    MissingRequiredParameter,
    #[serde(rename = "DNI105")]
    TooManyOccurrencesOfParameter,
    #[serde(rename = "DNI106")]
    InvalidJsonInParameterValue,
    #[serde(rename = "DNI107")]
    ParametersMustAppearAfterSubcommands,
    #[serde(rename = "DNI108")]
    AmbiguousKernelName,
    #[serde(rename = "DNI109")]
    UnexpectedArgument,
    #[serde(rename = "DNI110")]
    UnknownExpressionType,
    #[serde(rename = "DNI301")]
    MissingBindingDelegate,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::UnknownDirective => "DNI101",
            DiagnosticCode::UnknownParameterName => "DNI103",
            DiagnosticCode::MissingRequiredParameter => "DNI104",
            DiagnosticCode::TooManyOccurrencesOfParameter => "DNI105",
            DiagnosticCode::InvalidJsonInParameterValue => "DNI106",
            DiagnosticCode::ParametersMustAppearAfterSubcommands => "DNI107",
            DiagnosticCode::AmbiguousKernelName => "DNI108",
            DiagnosticCode::UnexpectedArgument => "DNI109",
            DiagnosticCode::UnknownExpressionType => "DNI110",
            DiagnosticCode::MissingBindingDelegate => "DNI301",
        }
    }

    /// Severity a parser-produced diagnostic with this code is reported at.
    pub fn default_severity(self) -> DiagnosticSeverity {
        match self {
            DiagnosticCode::AmbiguousKernelName => DiagnosticSeverity::Warning,
            _ => DiagnosticSeverity::Error,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub range: Range,
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub code: DiagnosticCode,
    pub source: String,
}

impl Diagnostic {
    pub fn new(
        range: Range,
        severity: DiagnosticSeverity,
        code: DiagnosticCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            range,
            severity,
            message: message.into(),
            code,
            source: "polyglot-parser".to_string(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}]: {} at {}",
            self.severity, self.code, self.source, self.message, self.range.start
        )
    }
}
