//! Arena-backed syntax tree
//!
//!     The tree owns the submission text and a flat arena of nodes addressed by [`NodeId`].
//!     Each node holds an ordered list of children, which are either other nodes or tokens, and
//!     a back reference to its parent. Spans are not stored: a node's full span is derived from
//!     the first and last token beneath it, so it always equals the union of its children.
//!
//!     Trees are only mutated while the parser builds them. Once returned they are read through
//!     [`SyntaxNode`], a cheap `Copy` handle pairing the tree with a node id.
//!
//!     Attaching a node that already has a parent, or attaching a node to itself, is a bug in
//!     the builder and panics.

use super::diagnostics::{Diagnostic, DiagnosticCode};
use super::range::{Range, SourceLocation};
use crate::polyglot::token::Token;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range as ByteRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DirectiveNodeKind {
    KernelSelector,
    Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Submission,
    Language,
    Directive(DirectiveNodeKind),
    DirectiveName,
    DirectiveSubcommand,
    DirectiveParameter,
    ParameterName,
    ParameterValue,
    Expression,
    ExpressionType,
    ExpressionArguments,
}

impl NodeKind {
    pub fn is_directive(self) -> bool {
        matches!(self, NodeKind::Directive(_))
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Directive(DirectiveNodeKind::KernelSelector) => write!(f, "KernelSelector"),
            NodeKind::Directive(DirectiveNodeKind::Action) => write!(f, "Action"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxElement {
    Node(NodeId),
    Token(Token),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<SyntaxElement>,
    kernel_name: Option<String>,
    target_kernel_name: Option<String>,
    binding: Option<String>,
    diagnostics: Vec<Diagnostic>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            kernel_name: None,
            target_kernel_name: None,
            binding: None,
            diagnostics: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntaxTree {
    text: String,
    nodes: Vec<NodeData>,
    location: SourceLocation,
}

impl SyntaxTree {
    /// An empty tree whose root Submission node has no children yet.
    pub(crate) fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            nodes: vec![NodeData::new(NodeKind::Submission)],
            location: SourceLocation::new(text),
        }
    }

    pub(crate) fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    pub(crate) fn add_node(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(NodeData::new(kind));
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        assert!(parent != child, "cannot attach node {child:?} to itself");
        assert!(child != self.root_id(), "cannot attach the submission root");
        assert!(
            self.nodes[child.0].parent.is_none(),
            "node {child:?} already has a parent"
        );
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(SyntaxElement::Node(child));
    }

    pub(crate) fn push_token(&mut self, parent: NodeId, token: Token) {
        self.nodes[parent.0].children.push(SyntaxElement::Token(token));
    }

    pub(crate) fn set_kernel_names(
        &mut self,
        id: NodeId,
        kernel_name: Option<String>,
        target_kernel_name: Option<String>,
    ) {
        let data = &mut self.nodes[id.0];
        data.kernel_name = kernel_name;
        data.target_kernel_name = target_kernel_name;
    }

    pub(crate) fn set_binding(&mut self, id: NodeId, binding: impl Into<String>) {
        self.nodes[id.0].binding = Some(binding.into());
    }

    /// Record a diagnostic on `id`, located at the node's significant span.
    pub(crate) fn report(&mut self, id: NodeId, code: DiagnosticCode, message: impl Into<String>) {
        let range = self.node(id).range();
        let diagnostic = Diagnostic::new(range, code.default_severity(), code, message);
        self.nodes[id.0].diagnostics.push(diagnostic);
    }

    pub(crate) fn last_child_node(&self, parent: NodeId) -> Option<NodeId> {
        match self.nodes[parent.0].children.last() {
            Some(SyntaxElement::Node(id)) => Some(*id),
            _ => None,
        }
    }

    /// The submission text this tree was parsed from.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> SyntaxNode<'_> {
        self.node(self.root_id())
    }

    pub fn node(&self, id: NodeId) -> SyntaxNode<'_> {
        SyntaxNode { tree: self, id }
    }

    /// All diagnostics in the tree, in document order.
    pub fn diagnostics(&self) -> Vec<&Diagnostic> {
        let root = self.root();
        std::iter::once(root)
            .chain(root.descendants())
            .flat_map(|node| node.diagnostics().iter())
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics().iter().any(|d| d.is_error())
    }

    /// The smallest node whose full span contains `offset`.
    pub fn find_node(&self, offset: usize) -> Option<SyntaxNode<'_>> {
        let root = self.root();
        if !self.span_contains_offset(&root.full_span(), offset) {
            return None;
        }
        let mut current = root;
        'descend: loop {
            for child in current.child_nodes() {
                if self.span_contains_offset(&child.full_span(), offset) {
                    current = child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }

    /// The smallest node whose full span contains all of `span`.
    pub fn find_node_by_span(&self, span: ByteRange<usize>) -> Option<SyntaxNode<'_>> {
        let covers = |outer: &ByteRange<usize>| outer.start <= span.start && span.end <= outer.end;
        let root = self.root();
        if !covers(&root.full_span()) {
            return None;
        }
        let mut current = root;
        'descend: loop {
            for child in current.child_nodes() {
                if covers(&child.full_span()) {
                    current = child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }

    /// Spans are half open, except that the end of the submission belongs to the node that
    /// reaches it.
    pub(crate) fn span_contains_offset(&self, span: &ByteRange<usize>, offset: usize) -> bool {
        span.start <= offset
            && (offset < span.end || (offset == span.end && offset == self.text.len()))
    }
}

impl fmt::Display for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in self.root().tokens() {
            write!(f, "{}", token.text)?;
        }
        Ok(())
    }
}

/// A child of a node, borrowed from the tree.
#[derive(Debug, Clone, Copy)]
pub enum SyntaxElementRef<'a> {
    Node(SyntaxNode<'a>),
    Token(&'a Token),
}

#[derive(Clone, Copy)]
pub struct SyntaxNode<'a> {
    tree: &'a SyntaxTree,
    id: NodeId,
}

impl<'a> SyntaxNode<'a> {
    fn data(&self) -> &'a NodeData {
        &self.tree.nodes[self.id.0]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'a SyntaxTree {
        self.tree
    }

    pub fn kind(&self) -> NodeKind {
        self.data().kind
    }

    pub fn parent(&self) -> Option<SyntaxNode<'a>> {
        self.data().parent.map(|id| self.tree.node(id))
    }

    pub fn children(&self) -> impl Iterator<Item = SyntaxElementRef<'a>> + 'a {
        let tree = self.tree;
        self.data().children.iter().map(move |child| match child {
            SyntaxElement::Node(id) => SyntaxElementRef::Node(tree.node(*id)),
            SyntaxElement::Token(token) => SyntaxElementRef::Token(token),
        })
    }

    pub fn child_nodes(&self) -> impl Iterator<Item = SyntaxNode<'a>> + 'a {
        self.children().filter_map(|child| match child {
            SyntaxElementRef::Node(node) => Some(node),
            SyntaxElementRef::Token(_) => None,
        })
    }

    pub fn child_of_kind(&self, kind: NodeKind) -> Option<SyntaxNode<'a>> {
        self.child_nodes().find(|child| child.kind() == kind)
    }

    /// All nodes below this one in pre-order, excluding itself.
    pub fn descendants(&self) -> Vec<SyntaxNode<'a>> {
        let mut out = Vec::new();
        let mut stack: Vec<SyntaxNode<'a>> = self.child_nodes().collect();
        stack.reverse();
        while let Some(node) = stack.pop() {
            out.push(node);
            let mut children: Vec<_> = node.child_nodes().collect();
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Tokens beneath this node in document order.
    pub fn tokens(&self) -> Vec<&'a Token> {
        let mut out = Vec::new();
        collect_tokens(*self, &mut out);
        out
    }

    /// The span of every token beneath this node, trivia included.
    pub fn full_span(&self) -> ByteRange<usize> {
        let tokens = self.tokens();
        match (tokens.first(), tokens.last()) {
            (Some(first), Some(last)) => first.span.start..last.span.end,
            _ => 0..0,
        }
    }

    /// The span from the first to the last significant token. For a node with no significant
    /// tokens this is the empty range at the start of its full span.
    pub fn span(&self) -> ByteRange<usize> {
        let tokens = self.tokens();
        let mut significant = tokens.iter().filter(|t| t.is_significant());
        match significant.next() {
            Some(first) => {
                let end = significant.last().map_or(first.span.end, |t| t.span.end);
                first.span.start..end
            }
            None => {
                let start = self.full_span().start;
                start..start
            }
        }
    }

    pub fn text(&self) -> &'a str {
        &self.tree.text[self.span()]
    }

    pub fn full_text(&self) -> &'a str {
        &self.tree.text[self.full_span()]
    }

    /// Line/column range of the significant span.
    pub fn range(&self) -> Range {
        self.tree.location.byte_range_to_range(&self.span())
    }

    pub fn is_significant(&self) -> bool {
        self.tokens().iter().any(|t| t.is_significant())
    }

    pub fn kernel_name(&self) -> Option<&'a str> {
        self.data().kernel_name.as_deref()
    }

    pub fn target_kernel_name(&self) -> Option<&'a str> {
        self.data().target_kernel_name.as_deref()
    }

    /// The declared name this node was matched to: a parameter's canonical name or a
    /// subcommand's name.
    pub fn binding(&self) -> Option<&'a str> {
        self.data().binding.as_deref()
    }

    pub fn diagnostics(&self) -> &'a [Diagnostic] {
        &self.data().diagnostics
    }

    /// Diagnostics on this node and every node below it.
    pub fn all_diagnostics(&self) -> Vec<&'a Diagnostic> {
        std::iter::once(*self)
            .chain(self.descendants())
            .flat_map(|node| node.diagnostics().iter())
            .collect()
    }
}

fn collect_tokens<'a>(node: SyntaxNode<'a>, out: &mut Vec<&'a Token>) {
    for child in node.children() {
        match child {
            SyntaxElementRef::Node(inner) => collect_tokens(inner, out),
            SyntaxElementRef::Token(token) => out.push(token),
        }
    }
}

impl fmt::Debug for SyntaxNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxNode")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("full_span", &self.full_span())
            .finish()
    }
}

impl fmt::Display for SyntaxNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_text())
    }
}

impl PartialEq for SyntaxNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for SyntaxNode<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyglot::token::TokenKind;

    fn small_tree() -> (SyntaxTree, NodeId, NodeId) {
        let mut tree = SyntaxTree::new("ab c");
        let root = tree.root_id();
        let first = tree.add_node(NodeKind::Language);
        tree.push_token(first, Token::new(TokenKind::Language, 0..2, "ab"));
        tree.push_token(first, Token::new(TokenKind::Trivia, 2..3, " "));
        tree.attach(root, first);
        let second = tree.add_node(NodeKind::Language);
        tree.push_token(second, Token::new(TokenKind::Language, 3..4, "c"));
        tree.attach(root, second);
        (tree, first, second)
    }

    #[test]
    fn test_spans_are_derived_from_tokens() {
        let (tree, first, _) = small_tree();
        let node = tree.node(first);
        assert_eq!(node.full_span(), 0..3);
        assert_eq!(node.span(), 0..2);
        assert_eq!(node.text(), "ab");
        assert_eq!(node.full_text(), "ab ");
        assert_eq!(tree.root().full_span(), 0..4);
    }

    #[test]
    fn test_display_round_trips() {
        let (tree, _, _) = small_tree();
        assert_eq!(tree.to_string(), "ab c");
    }

    #[test]
    fn test_find_node_uses_half_open_spans() {
        let (tree, first, second) = small_tree();
        assert_eq!(tree.find_node(2).map(|n| n.id()), Some(first));
        assert_eq!(tree.find_node(3).map(|n| n.id()), Some(second));
        assert_eq!(tree.find_node(4).map(|n| n.id()), Some(second));
        assert!(tree.find_node(5).is_none());
    }

    #[test]
    fn test_find_node_by_span() {
        let (tree, first, _) = small_tree();
        assert_eq!(tree.find_node_by_span(0..2).map(|n| n.id()), Some(first));
        assert_eq!(
            tree.find_node_by_span(1..4).map(|n| n.kind()),
            Some(NodeKind::Submission)
        );
    }

    #[test]
    fn test_parent_links() {
        let (tree, first, _) = small_tree();
        assert_eq!(
            tree.node(first).parent().map(|p| p.kind()),
            Some(NodeKind::Submission)
        );
        assert!(tree.root().parent().is_none());
    }

    #[test]
    #[should_panic(expected = "already has a parent")]
    fn test_reparenting_panics() {
        let (mut tree, first, second) = small_tree();
        tree.attach(second, first);
    }

    #[test]
    #[should_panic(expected = "to itself")]
    fn test_self_attach_panics() {
        let (mut tree, first, _) = small_tree();
        tree.attach(first, first);
    }

    #[test]
    fn test_whitespace_only_node_is_not_significant() {
        let mut tree = SyntaxTree::new("  ");
        let node = tree.add_node(NodeKind::Language);
        tree.push_token(node, Token::new(TokenKind::Trivia, 0..2, "  "));
        let root = tree.root_id();
        tree.attach(root, node);
        let node = tree.node(node);
        assert!(!node.is_significant());
        assert_eq!(node.span(), 0..0);
        assert_eq!(node.text(), "");
    }
}
