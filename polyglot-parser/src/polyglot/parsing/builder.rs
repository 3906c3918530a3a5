//! Tree building
//!
//!     Tokens from the lexer are appended to the submission root one at a time.
//!
//!     Language and Trivia tokens extend the last child when it is a language node for the
//!     current kernel, otherwise they start a new language node. A directive token collects the
//!     Trivia and DirectiveArgs tokens after it and becomes a directive node. Kernel selectors
//!     change the current kernel for everything that follows.
//!
//!     `#r` pointing at a file (anything but `nuget:`) is code for the current kernel, so it is
//!     folded into the language node instead of becoming a directive.

use super::arguments::split_arguments;
use super::binding::ArgumentBinder;
use super::references::is_package_argument;
use super::validation::validate_scope;
use crate::polyglot::ast::{DiagnosticCode, DirectiveNodeKind, NodeKind, SyntaxTree};
use crate::polyglot::directives::{
    DirectiveConfiguration, DirectiveDefinition, KernelInfo, SelectorLookup,
};
use crate::polyglot::token::{Token, TokenKind};

enum Resolution<'c> {
    Selector {
        kernel: &'c KernelInfo,
        definition: &'c DirectiveDefinition,
    },
    Ambiguous(Vec<&'c str>),
    Action {
        owner: &'c KernelInfo,
        definition: &'c DirectiveDefinition,
    },
    Unknown,
}

pub(crate) struct TreeBuilder<'c> {
    tree: SyntaxTree,
    configuration: &'c DirectiveConfiguration,
    current_kernel: String,
}

impl<'c> TreeBuilder<'c> {
    pub(crate) fn new(
        text: &str,
        configuration: &'c DirectiveConfiguration,
        default_kernel: String,
    ) -> Self {
        Self {
            tree: SyntaxTree::new(text),
            configuration,
            current_kernel: default_kernel,
        }
    }

    pub(crate) fn build(mut self, tokens: Vec<Token>) -> SyntaxTree {
        let mut tokens = tokens.into_iter().peekable();
        while let Some(token) = tokens.next() {
            if token.kind != TokenKind::Directive {
                self.append_language(token);
                continue;
            }
            let mut trailing = Vec::new();
            while let Some(next) = tokens.next_if(|t| {
                matches!(t.kind, TokenKind::Trivia | TokenKind::DirectiveArgs)
            }) {
                trailing.push(next);
            }
            self.append_directive(token, trailing);
        }
        self.tree
    }

    fn append_language(&mut self, token: Token) {
        let root = self.tree.root_id();
        if let Some(last) = self.tree.last_child_node(root) {
            let node = self.tree.node(last);
            if node.kind() == NodeKind::Language
                && node.kernel_name() == Some(self.current_kernel.as_str())
            {
                self.tree.push_token(last, token);
                return;
            }
        }
        let node = self.tree.add_node(NodeKind::Language);
        self.tree
            .set_kernel_names(node, Some(self.current_kernel.clone()), None);
        self.tree.push_token(node, token);
        self.tree.attach(root, node);
    }

    fn is_file_reference(name: &Token, trailing: &[Token]) -> bool {
        name.text == "#r"
            && trailing
                .iter()
                .find(|t| t.kind == TokenKind::DirectiveArgs)
                .is_some_and(|args| !is_package_argument(&args.text))
    }

    fn resolve(&self, name: &str) -> Resolution<'c> {
        let configuration = self.configuration;
        match configuration.kernel_selector(name) {
            SelectorLookup::Kernel { kernel, definition } => {
                return Resolution::Selector { kernel, definition }
            }
            SelectorLookup::Ambiguous(kernels) => return Resolution::Ambiguous(kernels),
            SelectorLookup::NotFound => {}
        }
        match configuration.find_directive(&self.current_kernel, name) {
            Some((definition, owner)) => Resolution::Action { owner, definition },
            None => Resolution::Unknown,
        }
    }

    fn append_directive(&mut self, name: Token, trailing: Vec<Token>) {
        if Self::is_file_reference(&name, &trailing) {
            self.append_language(name.with_kind(TokenKind::Language));
            for token in trailing {
                let kind = match token.kind {
                    TokenKind::DirectiveArgs => TokenKind::Language,
                    other => other,
                };
                self.append_language(token.with_kind(kind));
            }
            return;
        }

        let scope = self.current_kernel.clone();
        let resolution = self.resolve(&name.text);
        let (kind, target, declaration) = match &resolution {
            Resolution::Selector { kernel, definition } => (
                DirectiveNodeKind::KernelSelector,
                Some(kernel.name.clone()),
                Some(*definition),
            ),
            Resolution::Ambiguous(_) => (DirectiveNodeKind::KernelSelector, None, None),
            Resolution::Action { owner, definition } => (
                DirectiveNodeKind::Action,
                Some(owner.name.clone()),
                Some(*definition),
            ),
            Resolution::Unknown => (DirectiveNodeKind::Action, Some(scope.clone()), None),
        };

        let root = self.tree.root_id();
        let directive = self.tree.add_node(NodeKind::Directive(kind));
        self.tree
            .set_kernel_names(directive, Some(scope), target.clone());
        let name_node = self.tree.add_node(NodeKind::DirectiveName);
        let name_text = name.text.clone();
        self.tree.push_token(name_node, name);
        self.tree.attach(directive, name_node);
        self.tree.attach(root, directive);

        match &resolution {
            Resolution::Unknown => self.tree.report(
                name_node,
                DiagnosticCode::UnknownDirective,
                format!("Unrecognized magic command '{name_text}'"),
            ),
            Resolution::Ambiguous(kernels) => self.tree.report(
                name_node,
                DiagnosticCode::AmbiguousKernelName,
                format!(
                    "'{name_text}' is ambiguous between kernels: {}",
                    kernels.join(", ")
                ),
            ),
            _ => {}
        }

        let mut binder =
            ArgumentBinder::new(&mut self.tree, self.configuration, directive, declaration);
        let mut scopes = Vec::new();
        for token in trailing {
            match token.kind {
                TokenKind::DirectiveArgs => scopes.extend(binder.bind(split_arguments(&token))),
                _ => binder.trivia(token),
            }
        }
        for (scope, declaration) in scopes {
            validate_scope(&mut self.tree, scope, declaration);
        }

        if kind == DirectiveNodeKind::KernelSelector {
            if let Some(target) = target {
                self.current_kernel = target;
            }
        }
    }
}
