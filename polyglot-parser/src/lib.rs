//! Polyglot submission parser
//!
//!     A polyglot submission is the text of a single notebook cell. It interleaves source code
//!     for several kernels with magic-command lines (directives) that either switch the active
//!     kernel (`#!fsharp`) or invoke an action (`#!set --name x --value 1`).
//!
//!     The parser turns such a submission into a lossless syntax tree: concatenating the text
//!     of every token in the tree reproduces the input exactly, whatever errors were found.
//!     Problems are reported as diagnostics attached to the offending nodes instead of aborting
//!     the parse.
//!
//!     See [polyglot] for the pipeline and the module layout.

pub mod polyglot;
