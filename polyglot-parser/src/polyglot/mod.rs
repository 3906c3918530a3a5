//! Main module for the polyglot submission parser
//!
//! The Pipeline
//!
//!     Parsing runs in three stages:
//!         1. Lexing. See [lexing]. A logos tokenizer produces raw tokens which a directive
//!            detection pass turns into Trivia, Language, Directive and DirectiveArgs tokens.
//!         2. Tree building. See [parsing]. Tokens are grouped into language nodes (one per
//!            contiguous run of a kernel's code) and directive nodes. Kernel selectors change
//!            the kernel that following code is attributed to.
//!         3. Directive argument parsing. The raw argument text of each directive is split into
//!            parameter names, values, JSON literals and `{{type:args}}` expressions, then
//!            validated against the directive's declaration in the [directives] configuration.
//!
//! Directive Configuration
//!
//!     Which directives exist, their aliases, parameters and subcommands, and which kernel
//!     declares them is all data. See [directives::DirectiveConfiguration].
//!
//! Output
//!
//!     The result is an immutable [ast::SyntaxTree]. [formats] renders it for humans (treeviz)
//!     or machines (serde snapshot).

pub mod ast;
pub mod directives;
pub mod formats;
pub mod lexing;
pub mod parsing;
pub mod testing;
pub mod token;

pub use ast::{
    Diagnostic, DiagnosticCode, DiagnosticSeverity, DirectiveNode, DirectiveNodeKind,
    LanguageNode, NodeId, NodeKind, ParameterValue, SyntaxNode, SyntaxTree,
};
pub use directives::{
    DirectiveConfigError, DirectiveConfiguration, DirectiveDefinition, DirectiveKind,
    DirectiveParameter, KernelInfo,
};
pub use parsing::{parse, PackageReference, PolyglotParser};
