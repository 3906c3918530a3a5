//! Kernel commands
//!
//!     A [`KernelCommand`] is an immutable request shared as `Arc<KernelCommand>`. Commands
//!     produced by splitting a submission keep a reference to the command they came from, and
//!     their tokens extend the parent's token (`abc` → `abc.1`, `abc.2`), so any event can be
//!     traced back to the submission that caused it just by looking at its token.

use polyglot_parser::polyglot::ast::Range;
use polyglot_parser::polyglot::{Diagnostic, PackageReference, ParameterValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// What a command asks a kernel to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "commandType", content = "command")]
pub enum CommandPayload {
    #[serde(rename_all = "camelCase")]
    SubmitCode { code: String },
    #[serde(rename = "DirectiveCommand")]
    Directive(DirectiveCommand),
    #[serde(rename_all = "camelCase")]
    RequestDiagnostics { code: String },
    /// Produced instead of any other command when a submission has error diagnostics.
    #[serde(rename_all = "camelCase")]
    ParseFailure {
        message: String,
        diagnostics: Vec<Diagnostic>,
    },
}

impl CommandPayload {
    pub fn command_type(&self) -> &'static str {
        match self {
            CommandPayload::SubmitCode { .. } => "SubmitCode",
            CommandPayload::Directive(_) => "DirectiveCommand",
            CommandPayload::RequestDiagnostics { .. } => "RequestDiagnostics",
            CommandPayload::ParseFailure { .. } => "ParseFailure",
        }
    }

    /// Code carried by `SubmitCode` and `RequestDiagnostics`.
    pub fn code(&self) -> Option<&str> {
        match self {
            CommandPayload::SubmitCode { code } | CommandPayload::RequestDiagnostics { code } => {
                Some(code)
            }
            _ => None,
        }
    }
}

/// A directive invocation, bound against its declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveCommand {
    /// Directive name as declared, e.g. `#!connect`.
    pub name: String,
    /// Name plus subcommand, e.g. `#!connect jupyter`.
    pub invoked_directive: String,
    /// The directive line as written.
    pub raw: String,
    /// Declared parameter name and bound value, in declaration order.
    #[serde(default)]
    pub parameters: Vec<(String, ParameterValue)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
}

impl DirectiveCommand {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            invoked_directive: name.clone(),
            raw: name.clone(),
            name,
            parameters: Vec::new(),
            package: None,
            range: None,
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: ParameterValue) -> Self {
        self.parameters.push((name.into(), value));
        self
    }

    /// First value bound to `name` (`--name`).
    pub fn parameter(&self, name: &str) -> Option<&ParameterValue> {
        self.parameters
            .iter()
            .find(|(declared, _)| declared == name)
            .map(|(_, value)| value)
    }

    pub fn has_expressions(&self) -> bool {
        self.parameters.iter().any(|(_, value)| value.is_expression())
    }
}

/// A request to a kernel.
///
/// Identity is the token: two commands are the same command when their tokens are equal.
pub struct KernelCommand {
    pub token: String,
    pub id: Uuid,
    pub target_kernel_name: Option<String>,
    pub origin_uri: Option<String>,
    pub payload: CommandPayload,
    parent: Option<Arc<KernelCommand>>,
    child_count: AtomicUsize,
}

impl KernelCommand {
    /// A root command with a fresh token.
    pub fn new(payload: CommandPayload) -> Self {
        Self::with_token(Uuid::new_v4().simple().to_string(), payload)
    }

    pub fn with_token(token: impl Into<String>, payload: CommandPayload) -> Self {
        Self {
            token: token.into(),
            id: Uuid::new_v4(),
            target_kernel_name: None,
            origin_uri: None,
            payload,
            parent: None,
            child_count: AtomicUsize::new(0),
        }
    }

    pub fn submit_code(code: impl Into<String>) -> Self {
        Self::new(CommandPayload::SubmitCode { code: code.into() })
    }

    pub fn request_diagnostics(code: impl Into<String>) -> Self {
        Self::new(CommandPayload::RequestDiagnostics { code: code.into() })
    }

    pub fn directive(directive: DirectiveCommand) -> Self {
        Self::new(CommandPayload::Directive(directive))
    }

    pub fn target(mut self, kernel_name: impl Into<String>) -> Self {
        self.target_kernel_name = Some(kernel_name.into());
        self
    }

    pub fn origin(mut self, origin_uri: impl Into<String>) -> Self {
        self.origin_uri = Some(origin_uri.into());
        self
    }

    /// A command derived from `parent`, with the next child token.
    pub fn child_of(parent: &Arc<KernelCommand>, payload: CommandPayload) -> Self {
        let ordinal = parent.child_count.fetch_add(1, Ordering::Relaxed) + 1;
        let mut command = Self::with_token(format!("{}.{}", parent.token, ordinal), payload);
        command.parent = Some(Arc::clone(parent));
        command.origin_uri = parent.origin_uri.clone();
        command
    }

    /// A command standing for `token` under `parent`, used when events arrive for a command
    /// this process never created.
    pub fn correlated(
        parent: &Arc<KernelCommand>,
        token: impl Into<String>,
        payload: CommandPayload,
    ) -> Self {
        let mut command = Self::with_token(token, payload);
        command.parent = Some(Arc::clone(parent));
        command
    }

    /// Same token, id, parent and origin with a different payload.
    pub fn with_payload(&self, payload: CommandPayload) -> Self {
        Self {
            token: self.token.clone(),
            id: self.id,
            target_kernel_name: self.target_kernel_name.clone(),
            origin_uri: self.origin_uri.clone(),
            payload,
            parent: self.parent.clone(),
            child_count: AtomicUsize::new(self.child_count.load(Ordering::Relaxed)),
        }
    }

    pub fn parent(&self) -> Option<&Arc<KernelCommand>> {
        self.parent.as_ref()
    }

    /// The first segment of the token, shared by every command split from the same root.
    pub fn root_token(&self) -> &str {
        self.token.split('.').next().unwrap_or(&self.token)
    }

    pub fn is_same_as(&self, other: &KernelCommand) -> bool {
        self.token == other.token
    }

    pub fn is_self_or_descendant_of(&self, other: &KernelCommand) -> bool {
        is_self_or_descendant_token(&self.token, &other.token)
    }

    pub fn command_type(&self) -> &'static str {
        self.payload.command_type()
    }
}

pub(crate) fn is_self_or_descendant_token(token: &str, ancestor: &str) -> bool {
    token == ancestor
        || token
            .strip_prefix(ancestor)
            .is_some_and(|rest| rest.starts_with('.'))
}

impl fmt::Debug for KernelCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelCommand")
            .field("token", &self.token)
            .field("target_kernel_name", &self.target_kernel_name)
            .field("origin_uri", &self.origin_uri)
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for KernelCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.command_type(), self.token)?;
        if let Some(target) = &self.target_kernel_name {
            write!(f, " -> {target}")?;
        }
        Ok(())
    }
}
