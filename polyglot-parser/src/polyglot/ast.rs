//! Syntax tree for polyglot submissions
//!
//!     - [range]: positions, ranges and byte offset conversion
//!     - [diagnostics]: diagnostics and their stable codes
//!     - [tree]: the arena tree and the [`SyntaxNode`] handle
//!     - [elements]: typed views for language, directive and parameter nodes
//!     - [snapshot]: a serializable copy of a tree for formatters
//!
//!     A tree is lossless: `tree.to_string() == tree.text()` for every input.

pub mod diagnostics;
pub mod elements;
pub mod range;
pub mod snapshot;
pub mod tree;

pub use diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSeverity};
pub use elements::{
    camel_case_parameter_name, DirectiveNode, LanguageNode, ParameterNode, ParameterValue,
};
pub use range::{Position, Range, SourceLocation};
pub use snapshot::{snapshot_from_node, snapshot_from_tree, TreeSnapshot};
pub use tree::{
    DirectiveNodeKind, NodeId, NodeKind, SyntaxElement, SyntaxElementRef, SyntaxNode, SyntaxTree,
};

impl SyntaxTree {
    pub fn directive_nodes(&self) -> Vec<DirectiveNode<'_>> {
        self.root().child_nodes().filter_map(DirectiveNode::cast).collect()
    }

    pub fn language_nodes(&self) -> Vec<LanguageNode<'_>> {
        self.root().child_nodes().filter_map(LanguageNode::cast).collect()
    }

    /// The kernel whose code or directive covers `offset`.
    ///
    /// Inside a kernel selector this is the kernel being selected, inside an action directive
    /// the kernel in scope where it appears. Offsets beyond the end of the text resolve to
    /// `None`; the end of the text itself belongs to the last node.
    pub fn language_at_position(&self, offset: usize) -> Option<&str> {
        if offset > self.text().len() {
            return None;
        }
        let top_level = self
            .root()
            .child_nodes()
            .find(|node| self.span_contains_offset(&node.full_span(), offset))?;
        match top_level.kind() {
            NodeKind::Directive(DirectiveNodeKind::KernelSelector) => {
                top_level.target_kernel_name()
            }
            _ => top_level.kernel_name(),
        }
    }
}
