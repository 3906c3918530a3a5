//! Shared configuration loader for the polyglot toolchain.
//!
//! `defaults/polyglot.default.toml` is embedded into every binary and declares the
//! built-in kernel set: a `.NET` composite root with its magic commands and the
//! `csharp`, `fsharp`, `pwsh` and `javascript` sub-kernels. Applications layer
//! user files on top of those defaults via [`Loader`], deserialize into
//! [`PolyglotConfig`] and turn that into the [`DirectiveConfiguration`] the parser
//! reads.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use polyglot_parser::polyglot::{
    DirectiveConfigError, DirectiveConfiguration, DirectiveDefinition, KernelInfo,
};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/polyglot.default.toml");

/// Top-level configuration consumed by polyglot applications.
#[derive(Debug, Clone, Deserialize)]
pub struct PolyglotConfig {
    /// Kernel for code before any selector. Falls back to the root kernel when unset.
    #[serde(default)]
    pub default_kernel: Option<String>,
    #[serde(default)]
    pub expression_types: Vec<String>,
    pub root: KernelConfig,
    #[serde(default)]
    pub kernels: Vec<KernelConfig>,
}

/// One kernel and the directives it declares.
#[derive(Debug, Clone, Deserialize)]
pub struct KernelConfig {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
    /// Forwards to a kernel somewhere else
    #[serde(default)]
    pub proxy: bool,
    #[serde(default)]
    pub directives: Vec<DirectiveDefinition>,
}

impl KernelConfig {
    fn kernel_info(&self, composite: bool) -> Result<KernelInfo, DirectiveConfigError> {
        let mut info = if composite {
            KernelInfo::composite(&self.name)
        } else {
            KernelInfo::new(&self.name)
        };
        info.aliases = self.aliases.clone();
        info.language_name = self.language.clone();
        info.is_proxy = self.proxy;
        for directive in &self.directives {
            info.add_directive(directive.clone())?;
        }
        Ok(info)
    }
}

impl PolyglotConfig {
    /// Validate the declared kernels and assemble the registry the parser consults.
    pub fn directive_configuration(&self) -> Result<DirectiveConfiguration, DirectiveConfigError> {
        let mut builder = DirectiveConfiguration::builder(self.root.kernel_info(true)?);
        for kernel in &self.kernels {
            builder = builder.kernel(kernel.kernel_info(false)?);
        }
        for expression_type in &self.expression_types {
            builder = builder.expression_type(expression_type.clone());
        }
        if let Some(default_kernel) = &self.default_kernel {
            builder = builder.default_kernel(default_kernel.clone());
        }
        builder.build()
    }
}

/// Loading failed, or the loaded kernels do not form a valid registry.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error(transparent)]
    Load(#[from] ConfigError),
    #[error("invalid kernel configuration: {0}")]
    Registry(#[from] DirectiveConfigError),
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<PolyglotConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }

    /// Build and validate in one step.
    pub fn load(self) -> Result<DirectiveConfiguration, ConfigurationError> {
        Ok(self.build()?.directive_configuration()?)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<PolyglotConfig, ConfigError> {
    Loader::new().build()
}
