//! Kernel events
//!
//!     Everything a running command reports is a [`KernelEvent`]: output, diagnostics, return
//!     values, and exactly one terminal event (`CommandSucceeded` or `CommandFailed`) for the
//!     command itself.

use crate::commands::KernelCommand;
use polyglot_parser::polyglot::{Diagnostic, PackageReference};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType", content = "event")]
pub enum EventPayload {
    CommandSucceeded {},
    #[serde(rename_all = "camelCase")]
    CommandFailed { message: String },
    #[serde(rename_all = "camelCase")]
    ErrorProduced { message: String },
    #[serde(rename_all = "camelCase")]
    DiagnosticsProduced { diagnostics: Vec<Diagnostic> },
    #[serde(rename_all = "camelCase")]
    ReturnValueProduced { value: serde_json::Value },
    #[serde(rename_all = "camelCase")]
    StandardOutputValueProduced { text: String },
    #[serde(rename_all = "camelCase")]
    DisplayedValueProduced { value: serde_json::Value },
    #[serde(rename_all = "camelCase")]
    PackageAdded { package: PackageReference },
}

impl EventPayload {
    pub fn event_type(&self) -> &'static str {
        match self {
            EventPayload::CommandSucceeded {} => "CommandSucceeded",
            EventPayload::CommandFailed { .. } => "CommandFailed",
            EventPayload::ErrorProduced { .. } => "ErrorProduced",
            EventPayload::DiagnosticsProduced { .. } => "DiagnosticsProduced",
            EventPayload::ReturnValueProduced { .. } => "ReturnValueProduced",
            EventPayload::StandardOutputValueProduced { .. } => "StandardOutputValueProduced",
            EventPayload::DisplayedValueProduced { .. } => "DisplayedValueProduced",
            EventPayload::PackageAdded { .. } => "PackageAdded",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventPayload::CommandSucceeded {} | EventPayload::CommandFailed { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct KernelEvent {
    pub command: Arc<KernelCommand>,
    pub payload: EventPayload,
}

impl KernelEvent {
    pub fn new(command: Arc<KernelCommand>, payload: EventPayload) -> Self {
        Self { command, payload }
    }

    pub fn succeeded(command: Arc<KernelCommand>) -> Self {
        Self::new(command, EventPayload::CommandSucceeded {})
    }

    pub fn failed(command: Arc<KernelCommand>, message: impl Into<String>) -> Self {
        Self::new(
            command,
            EventPayload::CommandFailed {
                message: message.into(),
            },
        )
    }

    pub fn standard_output(command: Arc<KernelCommand>, text: impl Into<String>) -> Self {
        Self::new(
            command,
            EventPayload::StandardOutputValueProduced { text: text.into() },
        )
    }

    pub fn return_value(command: Arc<KernelCommand>, value: serde_json::Value) -> Self {
        Self::new(command, EventPayload::ReturnValueProduced { value })
    }

    pub fn diagnostics(command: Arc<KernelCommand>, diagnostics: Vec<Diagnostic>) -> Self {
        Self::new(command, EventPayload::DiagnosticsProduced { diagnostics })
    }

    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }

    pub fn is_terminal(&self) -> bool {
        self.payload.is_terminal()
    }

    /// Terminal event of exactly this command (not of a descendant).
    pub fn is_terminal_for(&self, command: &KernelCommand) -> bool {
        self.is_terminal() && self.command.is_same_as(command)
    }
}

impl fmt::Display for KernelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} for {}", self.event_type(), self.command.token)
    }
}
