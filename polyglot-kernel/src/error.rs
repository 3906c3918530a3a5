//! Error types for command dispatch

use polyglot_parser::polyglot::DirectiveConfigError;
use thiserror::Error;

/// Why a command failed.
///
/// The `Display` text is what ends up in the `CommandFailed` event, so variants that carry a
/// message from elsewhere print it unchanged.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("No kernel found with name '{0}'")]
    NoSuchKernel(String),

    #[error("Command cancelled.")]
    Cancelled,

    #[error("{0}")]
    ParseFailure(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Remote(String),

    #[error("{0}")]
    Binding(String),

    #[error("No handler registered for directive '{0}'")]
    UnhandledDirective(String),

    #[error("Kernel '{kernel}' does not support command '{command_type}'")]
    UnsupportedCommand { kernel: String, command_type: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Configuration(#[from] DirectiveConfigError),

    #[error("{0}")]
    Handler(String),
}

impl KernelError {
    pub fn handler(message: impl Into<String>) -> Self {
        KernelError::Handler(message.into())
    }
}

/// Failures moving envelopes between a proxy and its remote kernel.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport closed before the command completed")]
    Closed,

    #[error("malformed envelope: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Send(String),
}
