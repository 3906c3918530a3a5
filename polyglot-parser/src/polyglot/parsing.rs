//! Parsing submissions into syntax trees
//!
//!     [`parse`] lexes a submission and builds its tree against a directive configuration.
//!     [`PolyglotParser`] bundles a shared configuration for callers that parse repeatedly.
//!
//!     - [builder]: submission level tree building
//!     - [arguments]: splitting directive argument text
//!     - [binding]: attaching arguments to declared parameters and subcommands
//!     - [validation]: required and repeated parameter checks
//!     - [references]: `#r "nuget:..."` package references

pub mod arguments;
pub(crate) mod binding;
pub(crate) mod builder;
pub mod references;
pub(crate) mod validation;

pub use references::PackageReference;

use crate::polyglot::ast::SyntaxTree;
use crate::polyglot::directives::DirectiveConfiguration;
use crate::polyglot::lexing::lex;
use builder::TreeBuilder;
use std::sync::Arc;

/// Parse `code`, attributing code before the first kernel selector to `language` (a kernel
/// name or alias) or, when absent, to the configuration's default kernel.
pub fn parse(
    code: &str,
    language: Option<&str>,
    configuration: &DirectiveConfiguration,
) -> SyntaxTree {
    let default_kernel = match language {
        Some(language) => configuration
            .kernel(language)
            .map_or(language, |kernel| kernel.name.as_str()),
        None => configuration.default_kernel_name(),
    }
    .to_string();

    TreeBuilder::new(code, configuration, default_kernel).build(lex(code))
}

#[derive(Debug, Clone)]
pub struct PolyglotParser {
    configuration: Arc<DirectiveConfiguration>,
}

impl PolyglotParser {
    pub fn new(configuration: Arc<DirectiveConfiguration>) -> Self {
        Self { configuration }
    }

    pub fn configuration(&self) -> &Arc<DirectiveConfiguration> {
        &self.configuration
    }

    pub fn parse(&self, code: &str, language: Option<&str>) -> SyntaxTree {
        parse(code, language, &self.configuration)
    }
}

impl Default for PolyglotParser {
    fn default() -> Self {
        Self::new(Arc::new(DirectiveConfiguration::default()))
    }
}
