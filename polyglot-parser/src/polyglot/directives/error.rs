//! Errors raised while declaring directives and assembling a configuration

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveConfigError {
    /// Directive names must start with `#` and have at least one more character
    InvalidDirectiveName { name: String },
    InvalidAlias { directive: String, alias: String },
    /// A name or alias is already used by another directive of the same kernel
    DuplicateAlias { alias: String, kernel: String },
    DuplicateKernelName { name: String },
    UnknownDefaultKernel { name: String },
    /// Parameter names and aliases must start with `-`
    InvalidParameterName { directive: String, name: String },
}

impl fmt::Display for DirectiveConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectiveConfigError::InvalidDirectiveName { name } => {
                write!(f, "Invalid directive name '{name}': directives must start with '#'")
            }
            DirectiveConfigError::InvalidAlias { directive, alias } => {
                write!(f, "Invalid alias '{alias}' for directive '{directive}'")
            }
            DirectiveConfigError::DuplicateAlias { alias, kernel } => {
                write!(f, "Alias '{alias}' is already in use in kernel '{kernel}'")
            }
            DirectiveConfigError::DuplicateKernelName { name } => {
                write!(f, "A kernel named '{name}' is already registered")
            }
            DirectiveConfigError::UnknownDefaultKernel { name } => {
                write!(f, "Default kernel '{name}' is not registered")
            }
            DirectiveConfigError::InvalidParameterName { directive, name } => {
                write!(f, "Invalid parameter name '{name}' for directive '{directive}'")
            }
        }
    }
}

impl std::error::Error for DirectiveConfigError {}
