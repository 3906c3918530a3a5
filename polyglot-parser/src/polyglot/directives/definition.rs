//! Directive, parameter and kernel declarations

use super::error::DirectiveConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

fn default_max_occurrences() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectiveParameter {
    /// Canonical name including its dashes, `--name`
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_max_occurrences")]
    pub max_occurrences: usize,
    /// A bare value with no preceding name binds to this parameter
    #[serde(default)]
    pub allow_implicit_name: bool,
    /// Takes no value; presence means `true`
    #[serde(default)]
    pub flag: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl DirectiveParameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            required: false,
            max_occurrences: default_max_occurrences(),
            allow_implicit_name: false,
            flag: false,
            description: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn implicit(mut self) -> Self {
        self.allow_implicit_name = true;
        self
    }

    pub fn flag(mut self) -> Self {
        self.flag = true;
        self
    }

    pub fn max_occurrences(mut self, max: usize) -> Self {
        self.max_occurrences = max;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether `text` as written names this parameter. `/name` is accepted for `--name`.
    pub fn matches_name(&self, text: &str) -> bool {
        if text == self.name || self.aliases.iter().any(|alias| alias == text) {
            return true;
        }
        match (text.strip_prefix('/'), self.name.strip_prefix("--")) {
            (Some(slash), Some(long)) => !slash.is_empty() && slash == long,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirectiveKind {
    #[default]
    Action,
    KernelSelector,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectiveDefinition {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<DirectiveParameter>,
    #[serde(default)]
    pub subcommands: Vec<DirectiveDefinition>,
    #[serde(default)]
    pub kind: DirectiveKind,
    #[serde(default)]
    pub description: Option<String>,
}

impl DirectiveDefinition {
    pub fn action(name: impl Into<String>) -> Self {
        Self::with_kind(name, DirectiveKind::Action)
    }

    pub fn kernel_selector(name: impl Into<String>) -> Self {
        Self::with_kind(name, DirectiveKind::KernelSelector)
    }

    /// A subcommand such as `jupyter` in `#!connect jupyter`.
    pub fn subcommand_named(name: impl Into<String>) -> Self {
        Self::with_kind(name, DirectiveKind::Action)
    }

    fn with_kind(name: impl Into<String>, kind: DirectiveKind) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            parameters: Vec::new(),
            subcommands: Vec::new(),
            kind,
            description: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn parameter(mut self, parameter: DirectiveParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn subcommand(mut self, subcommand: DirectiveDefinition) -> Self {
        self.subcommands.push(subcommand);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_kernel_selector(&self) -> bool {
        self.kind == DirectiveKind::KernelSelector
    }

    /// The name followed by every alias.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn has_name(&self, text: &str) -> bool {
        self.names().any(|name| name == text)
    }

    pub fn find_parameter(&self, text: &str) -> Option<&DirectiveParameter> {
        self.parameters.iter().find(|p| p.matches_name(text))
    }

    pub fn implicit_parameter(&self) -> Option<&DirectiveParameter> {
        self.parameters.iter().find(|p| p.allow_implicit_name)
    }

    pub fn find_subcommand(&self, word: &str) -> Option<&DirectiveDefinition> {
        self.subcommands.iter().find(|s| s.has_name(word))
    }

    fn validate(&self, is_subcommand: bool) -> Result<(), DirectiveConfigError> {
        if !is_subcommand && (!self.name.starts_with('#') || self.name.len() < 2) {
            return Err(DirectiveConfigError::InvalidDirectiveName {
                name: self.name.clone(),
            });
        }
        if is_subcommand && self.name.trim().is_empty() {
            return Err(DirectiveConfigError::InvalidDirectiveName {
                name: self.name.clone(),
            });
        }
        for alias in &self.aliases {
            let valid = if is_subcommand {
                !alias.trim().is_empty()
            } else {
                alias.starts_with('#') && alias.len() > 1
            };
            if !valid {
                return Err(DirectiveConfigError::InvalidAlias {
                    directive: self.name.clone(),
                    alias: alias.clone(),
                });
            }
        }
        for parameter in &self.parameters {
            let names = std::iter::once(&parameter.name).chain(parameter.aliases.iter());
            for name in names {
                if !name.starts_with('-') || name.trim_start_matches('-').is_empty() {
                    return Err(DirectiveConfigError::InvalidParameterName {
                        directive: self.name.clone(),
                        name: name.clone(),
                    });
                }
            }
        }
        self.subcommands
            .iter()
            .try_for_each(|subcommand| subcommand.validate(true))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KernelInfo {
    pub name: String,
    pub aliases: Vec<String>,
    directives: Vec<DirectiveDefinition>,
    pub is_composite: bool,
    pub is_proxy: bool,
    pub language_name: Option<String>,
}

impl KernelInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            directives: Vec::new(),
            is_composite: false,
            is_proxy: false,
            language_name: None,
        }
    }

    pub fn composite(name: impl Into<String>) -> Self {
        Self {
            is_composite: true,
            ..Self::new(name)
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn proxy(mut self) -> Self {
        self.is_proxy = true;
        self
    }

    pub fn language(mut self, language_name: impl Into<String>) -> Self {
        self.language_name = Some(language_name.into());
        self
    }

    pub fn directives(&self) -> &[DirectiveDefinition] {
        &self.directives
    }

    /// Declare a directive, rejecting malformed names and names that collide with a directive
    /// this kernel already declares.
    pub fn add_directive(&mut self, directive: DirectiveDefinition) -> Result<(), DirectiveConfigError> {
        directive.validate(false)?;

        let mut taken: HashSet<&str> = self.directives.iter().flat_map(|d| d.names()).collect();
        for name in directive.names() {
            if !taken.insert(name) {
                return Err(DirectiveConfigError::DuplicateAlias {
                    alias: name.to_string(),
                    kernel: self.name.clone(),
                });
            }
        }

        self.directives.push(directive);
        Ok(())
    }

    pub fn with_directive(mut self, directive: DirectiveDefinition) -> Result<Self, DirectiveConfigError> {
        self.add_directive(directive)?;
        Ok(self)
    }

    pub fn find_directive(&self, name: &str) -> Option<&DirectiveDefinition> {
        self.directives
            .iter()
            .find(|d| !d.is_kernel_selector() && d.has_name(name))
    }

    /// The selector that switches to this kernel: a declared one if present, otherwise
    /// `#!name` with an alias per kernel alias.
    pub fn selector(&self) -> DirectiveDefinition {
        if let Some(declared) = self.directives.iter().find(|d| d.is_kernel_selector()) {
            return declared.clone();
        }
        self.aliases.iter().fold(
            DirectiveDefinition::kernel_selector(format!("#!{}", self.name)),
            |selector, alias| selector.alias(format!("#!{alias}")),
        )
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|alias| alias == name)
    }
}
