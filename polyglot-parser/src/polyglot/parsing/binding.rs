//! Binding argument pieces to a directive's parameters
//!
//!     Pieces are attached under the directive node as they are read:
//!         - A word that names a parameter (`--name`, a declared `-n` alias, or `/name` for a
//!           declared `--name`) opens a DirectiveParameter node. Unless the parameter is a flag,
//!           the next value is attached to it.
//!         - A word naming a subcommand of the directive opens a DirectiveSubcommand node, and
//!           following parameters are attached under it.
//!         - Any other value becomes a positional parameter, bound to the declaration's
//!           implicit parameter if it has one.
//!
//!     Trivia goes to the parameter waiting for a value, otherwise to the current scope, so
//!     the children of every node stay in document order.

use super::arguments::ArgumentPiece;
use crate::polyglot::ast::{DiagnosticCode, NodeId, NodeKind, SyntaxTree};
use crate::polyglot::directives::{DirectiveConfiguration, DirectiveDefinition};
use crate::polyglot::token::{Token, TokenKind};

pub(crate) struct ArgumentBinder<'t, 'c> {
    tree: &'t mut SyntaxTree,
    configuration: &'c DirectiveConfiguration,
    directive: NodeId,
    scope: NodeId,
    declaration: Option<&'c DirectiveDefinition>,
    /// A named parameter still waiting for its value
    pending: Option<NodeId>,
    seen_parameter: bool,
    scopes: Vec<(NodeId, &'c DirectiveDefinition)>,
}

impl<'t, 'c> ArgumentBinder<'t, 'c> {
    pub(crate) fn new(
        tree: &'t mut SyntaxTree,
        configuration: &'c DirectiveConfiguration,
        directive: NodeId,
        declaration: Option<&'c DirectiveDefinition>,
    ) -> Self {
        Self {
            tree,
            configuration,
            directive,
            scope: directive,
            declaration,
            pending: None,
            seen_parameter: false,
            scopes: declaration.map(|d| (directive, d)).into_iter().collect(),
        }
    }

    /// Attach trailing trivia that follows the argument text.
    pub(crate) fn trivia(&mut self, token: Token) {
        self.tree.push_token(self.directive, token);
    }

    /// Bind the pieces of one argument string. Returns each scope node with the declaration
    /// it must be validated against.
    pub(crate) fn bind(
        &mut self,
        pieces: Vec<ArgumentPiece>,
    ) -> Vec<(NodeId, &'c DirectiveDefinition)> {
        for piece in pieces {
            match piece {
                ArgumentPiece::Trivia(token) => {
                    let target = self.pending.unwrap_or(self.scope);
                    self.tree.push_token(target, token);
                }
                ArgumentPiece::Value(token) if token.kind == TokenKind::Word => self.word(token),
                other => self.value(other),
            }
        }
        self.pending = None;
        std::mem::take(&mut self.scopes)
    }

    fn is_parameter_name(&self, text: &str) -> bool {
        if text.starts_with("--") && text.len() > 2 {
            return true;
        }
        (text.starts_with('-') || text.starts_with('/'))
            && self
                .declaration
                .is_some_and(|d| d.find_parameter(text).is_some())
    }

    fn word(&mut self, token: Token) {
        if self.is_parameter_name(&token.text) {
            self.named_parameter(token);
            return;
        }
        if self.pending.is_none() && self.scope == self.directive {
            let subcommand = self.declaration.and_then(|d| d.find_subcommand(&token.text));
            if let Some(subcommand) = subcommand {
                self.subcommand(token, subcommand);
                return;
            }
        }
        self.value(ArgumentPiece::Value(token))
    }

    fn named_parameter(&mut self, token: Token) {
        let text = token.text.clone();
        let parameter = self.tree.add_node(NodeKind::DirectiveParameter);
        let name = self.tree.add_node(NodeKind::ParameterName);
        self.tree.push_token(name, token);
        self.tree.attach(parameter, name);
        self.tree.attach(self.scope, parameter);
        self.seen_parameter = true;
        self.pending = Some(parameter);

        let Some(declaration) = self.declaration else {
            return;
        };
        match declaration.find_parameter(&text) {
            Some(declared) => {
                self.tree.set_binding(parameter, declared.name.clone());
                if declared.flag {
                    self.pending = None;
                }
            }
            None => self.tree.report(
                name,
                DiagnosticCode::UnknownParameterName,
                format!("Unrecognized parameter name '{text}'"),
            ),
        }
    }

    fn subcommand(&mut self, token: Token, declaration: &'c DirectiveDefinition) {
        let node = self.tree.add_node(NodeKind::DirectiveSubcommand);
        self.tree.push_token(node, token);
        self.tree.set_binding(node, declaration.name.clone());
        self.tree.attach(self.directive, node);
        if self.seen_parameter {
            self.tree.report(
                node,
                DiagnosticCode::ParametersMustAppearAfterSubcommands,
                "Parameters must appear after subcommands.",
            );
        }
        self.scope = node;
        self.declaration = Some(declaration);
        self.scopes.push((node, declaration));
    }

    fn value(&mut self, piece: ArgumentPiece) {
        let (parameter, positional) = match self.pending.take() {
            Some(parameter) => (parameter, false),
            None => {
                let parameter = self.tree.add_node(NodeKind::DirectiveParameter);
                self.tree.attach(self.scope, parameter);
                (parameter, true)
            }
        };

        let value = match piece {
            ArgumentPiece::Expression(tokens) => self.expression(tokens),
            ArgumentPiece::Value(token) | ArgumentPiece::Trivia(token) => {
                let is_json = token.kind == TokenKind::Json;
                let node = self.tree.add_node(NodeKind::ParameterValue);
                let text = token.text.clone();
                self.tree.push_token(node, token);
                if is_json {
                    if let Err(error) = serde_json::from_str::<serde_json::Value>(&text) {
                        self.tree.report(
                            node,
                            DiagnosticCode::InvalidJsonInParameterValue,
                            format!("Invalid JSON: {error}"),
                        );
                    }
                }
                node
            }
        };
        self.tree.attach(parameter, value);

        if !positional {
            return;
        }
        self.seen_parameter = true;
        let Some(declaration) = self.declaration else {
            return;
        };
        match declaration.implicit_parameter() {
            Some(implicit) => self.tree.set_binding(parameter, implicit.name.clone()),
            None => {
                let text = self.tree.node(value).text().to_string();
                self.tree.report(
                    parameter,
                    DiagnosticCode::UnexpectedArgument,
                    format!("Unexpected argument '{text}'"),
                );
            }
        }
    }

    fn expression(&mut self, tokens: Vec<Token>) -> NodeId {
        let expression = self.tree.add_node(NodeKind::Expression);
        let mut expression_type = String::new();
        for token in tokens {
            let wrapper = match token.kind {
                TokenKind::Word => {
                    expression_type = token.text.clone();
                    Some(NodeKind::ExpressionType)
                }
                TokenKind::ExpressionText => Some(NodeKind::ExpressionArguments),
                _ => None,
            };
            match wrapper {
                Some(kind) => {
                    let node = self.tree.add_node(kind);
                    self.tree.push_token(node, token);
                    self.tree.attach(expression, node);
                }
                None => self.tree.push_token(expression, token),
            }
        }
        if !self.configuration.is_expression_type(&expression_type) {
            self.tree.report(
                expression,
                DiagnosticCode::UnknownExpressionType,
                format!("Unknown expression type '{expression_type}'"),
            );
        }
        expression
    }
}
