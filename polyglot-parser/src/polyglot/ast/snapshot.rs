//! Tree snapshot, a normalized serializable form of a syntax tree
//!
//! The snapshot captures node types, the significant text of each node, kernel attributes,
//! diagnostics and children. Serializers (treeviz, JSON) consume [`snapshot_from_tree`]
//! instead of walking the arena themselves.

use super::diagnostics::Diagnostic;
use super::tree::{NodeKind, SyntaxNode, SyntaxTree};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    /// The type of node (e.g., "Language", "KernelSelector", "DirectiveParameter")
    pub node_type: String,
    /// The node's significant text
    pub label: String,
    pub span: Range<usize>,
    pub full_span: Range<usize>,
    /// `kernel`, `target` and `binding` when the node has them
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<TreeSnapshot>,
}

impl TreeSnapshot {
    pub fn new(node_type: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            label: label.into(),
            span: 0..0,
            full_span: 0..0,
            attributes: BTreeMap::new(),
            diagnostics: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: TreeSnapshot) -> Self {
        self.children.push(child);
        self
    }
}

pub fn snapshot_from_node(node: SyntaxNode<'_>) -> TreeSnapshot {
    let label = match node.kind() {
        NodeKind::Submission => String::new(),
        _ => node.text().to_string(),
    };
    let mut snapshot = TreeSnapshot::new(node.kind().to_string(), label);
    snapshot.span = node.span();
    snapshot.full_span = node.full_span();
    if let Some(kernel) = node.kernel_name() {
        snapshot = snapshot.with_attribute("kernel", kernel);
    }
    if let Some(target) = node.target_kernel_name() {
        snapshot = snapshot.with_attribute("target", target);
    }
    if let Some(binding) = node.binding() {
        snapshot = snapshot.with_attribute("binding", binding);
    }
    snapshot.diagnostics = node.diagnostics().to_vec();
    snapshot.children = node.child_nodes().map(snapshot_from_node).collect();
    snapshot
}

pub fn snapshot_from_tree(tree: &SyntaxTree) -> TreeSnapshot {
    snapshot_from_node(tree.root())
}
