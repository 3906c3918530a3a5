//! Directive configuration
//!
//!     Directives are declared per kernel. A [`KernelInfo`] names a kernel, its aliases and the
//!     action directives it understands. A [`DirectiveConfiguration`] collects the root
//!     (composite) kernel and its sub-kernels, derives a kernel selector for each sub-kernel
//!     (`#!csharp`, `#!C#`), and answers the lookups the parser needs.
//!
//!     Configurations are immutable once built. Adding a kernel means building a new one.

pub mod configuration;
pub mod definition;
pub mod error;

pub use configuration::{DirectiveConfiguration, DirectiveConfigurationBuilder, SelectorLookup};
pub use definition::{DirectiveDefinition, DirectiveKind, DirectiveParameter, KernelInfo};
pub use error::DirectiveConfigError;
