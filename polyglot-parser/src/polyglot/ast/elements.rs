//! Typed views over syntax nodes
//!
//!     [`SyntaxNode`] is untyped. The wrappers here give directive, language and parameter
//!     nodes an API in terms of what they mean, for example a directive's name, its subcommand,
//!     and the values bound to its declared parameters.

use super::tree::{DirectiveNodeKind, NodeKind, SyntaxElementRef, SyntaxNode};
use crate::polyglot::directives::{DirectiveConfiguration, DirectiveDefinition};
use crate::polyglot::parsing::PackageReference;
use crate::polyglot::token::TokenKind;
use serde::{Deserialize, Serialize};

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum ParameterValue {
    Literal(String),
    Flag(bool),
    Json(serde_json::Value),
    /// A `{{type:arguments}}` placeholder, resolved by a value binder before dispatch.
    Expression {
        expression_type: String,
        arguments: String,
    },
}

impl ParameterValue {
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            ParameterValue::Literal(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_expression(&self) -> bool {
        matches!(self, ParameterValue::Expression { .. })
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ParameterValue::Literal(text) => serde_json::Value::String(text.clone()),
            ParameterValue::Flag(flag) => serde_json::Value::Bool(*flag),
            ParameterValue::Json(value) => value.clone(),
            ParameterValue::Expression {
                expression_type,
                arguments,
            } => serde_json::Value::String(format!("{{{{{expression_type}:{arguments}}}}}")),
        }
    }
}

/// `--from-file` becomes `fromFile`.
pub fn camel_case_parameter_name(name: &str) -> String {
    let trimmed = name.trim_start_matches(['-', '/']);
    let mut output = String::with_capacity(trimmed.len());
    let mut upper_next = false;
    for ch in trimmed.chars() {
        if ch == '-' {
            upper_next = true;
        } else if upper_next {
            output.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            output.push(ch);
        }
    }
    output
}

fn unquote(text: &str) -> &str {
    let text = text.strip_prefix('"').unwrap_or(text);
    text.strip_suffix('"').unwrap_or(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageNode<'a>(SyntaxNode<'a>);

impl<'a> LanguageNode<'a> {
    pub fn cast(node: SyntaxNode<'a>) -> Option<Self> {
        (node.kind() == NodeKind::Language).then_some(Self(node))
    }

    pub fn syntax(&self) -> SyntaxNode<'a> {
        self.0
    }

    pub fn kernel_name(&self) -> Option<&'a str> {
        self.0.kernel_name()
    }

    /// The code with its surrounding trivia.
    pub fn code(&self) -> &'a str {
        self.0.full_text()
    }

    pub fn is_whitespace_only(&self) -> bool {
        !self.0.is_significant()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectiveNode<'a>(SyntaxNode<'a>);

impl<'a> DirectiveNode<'a> {
    pub fn cast(node: SyntaxNode<'a>) -> Option<Self> {
        match node.kind() {
            NodeKind::Directive(_) => Some(Self(node)),
            _ => None,
        }
    }

    pub fn syntax(&self) -> SyntaxNode<'a> {
        self.0
    }

    pub fn kind(&self) -> DirectiveNodeKind {
        match self.0.kind() {
            NodeKind::Directive(kind) => kind,
            _ => DirectiveNodeKind::Action,
        }
    }

    pub fn is_kernel_selector(&self) -> bool {
        self.kind() == DirectiveNodeKind::KernelSelector
    }

    pub fn name_node(&self) -> Option<SyntaxNode<'a>> {
        self.0.child_of_kind(NodeKind::DirectiveName)
    }

    pub fn name(&self) -> &'a str {
        self.name_node().map_or("", |node| node.text())
    }

    /// The kernel in scope where the directive appears.
    pub fn kernel_name(&self) -> Option<&'a str> {
        self.0.kernel_name()
    }

    /// For a selector the kernel it switches to, for an action the kernel that declares it.
    pub fn target_kernel_name(&self) -> Option<&'a str> {
        self.0.target_kernel_name()
    }

    pub fn subcommand_node(&self) -> Option<SyntaxNode<'a>> {
        self.0.child_of_kind(NodeKind::DirectiveSubcommand)
    }

    pub fn subcommand_name(&self) -> Option<&'a str> {
        self.subcommand_node().and_then(|node| node.binding())
    }

    /// The directive name followed by the subcommand, if any: `#!connect jupyter`.
    pub fn invoked_directive(&self) -> String {
        match self.subcommand_name() {
            Some(subcommand) => format!("{} {}", self.name(), subcommand),
            None => self.name().to_string(),
        }
    }

    /// Parameter nodes of the directive and of its subcommand, in document order.
    pub fn parameters(&self) -> Vec<ParameterNode<'a>> {
        self.0
            .descendants()
            .into_iter()
            .filter_map(ParameterNode::cast)
            .collect()
    }

    pub fn definition<'c>(
        &self,
        configuration: &'c DirectiveConfiguration,
    ) -> Option<&'c DirectiveDefinition> {
        match self.kind() {
            DirectiveNodeKind::KernelSelector => {
                configuration.selector_definition(self.target_kernel_name()?)
            }
            DirectiveNodeKind::Action => configuration
                .find_directive(self.kernel_name().unwrap_or_default(), self.name())
                .map(|(definition, _)| definition),
        }
    }

    /// Values bound to the declared parameters, in declaration order.
    ///
    /// Flags that were not given appear as `Flag(false)`. Other parameters that were not given
    /// are omitted. Parameters the declaration does not know are skipped.
    pub fn parameter_values(
        &self,
        configuration: &DirectiveConfiguration,
    ) -> Vec<(String, ParameterValue)> {
        let Some(definition) = self.definition(configuration) else {
            return Vec::new();
        };

        let mut scopes = vec![(self.0, definition)];
        if let Some(subcommand) = self.subcommand_node() {
            if let Some(declared) = subcommand
                .binding()
                .and_then(|name| definition.find_subcommand(name))
            {
                scopes.push((subcommand, declared));
            }
        }

        let mut values = Vec::new();
        for (scope, declaration) in scopes {
            let nodes: Vec<_> = scope.child_nodes().filter_map(ParameterNode::cast).collect();
            for parameter in &declaration.parameters {
                let bound: Vec<_> = nodes
                    .iter()
                    .filter(|node| node.binding() == Some(parameter.name.as_str()))
                    .collect();
                if bound.is_empty() && parameter.flag {
                    values.push((parameter.name.clone(), ParameterValue::Flag(false)));
                }
                for node in bound {
                    if parameter.flag {
                        values.push((parameter.name.clone(), ParameterValue::Flag(true)));
                    } else if let Some(value) = node.value() {
                        values.push((parameter.name.clone(), value));
                    }
                }
            }
        }
        values
    }

    /// Parameter values keyed by camel-cased name, the shape directive commands are
    /// serialized with.
    pub fn parameters_as_json(
        &self,
        configuration: &DirectiveConfiguration,
    ) -> serde_json::Map<String, serde_json::Value> {
        self.parameter_values(configuration)
            .into_iter()
            .map(|(name, value)| (camel_case_parameter_name(&name), value.to_json()))
            .collect()
    }

    /// `#r "nuget:Name, Version"` as a package reference.
    pub fn package_reference(&self) -> Option<PackageReference> {
        if self.name() != "#r" {
            return None;
        }
        let value = self.parameters().first()?.value()?;
        PackageReference::parse(value.as_literal()?)
    }

    pub fn has_errors(&self) -> bool {
        self.0.all_diagnostics().iter().any(|d| d.is_error())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterNode<'a>(SyntaxNode<'a>);

impl<'a> ParameterNode<'a> {
    pub fn cast(node: SyntaxNode<'a>) -> Option<Self> {
        (node.kind() == NodeKind::DirectiveParameter).then_some(Self(node))
    }

    pub fn syntax(&self) -> SyntaxNode<'a> {
        self.0
    }

    pub fn name_node(&self) -> Option<SyntaxNode<'a>> {
        self.0.child_of_kind(NodeKind::ParameterName)
    }

    /// The name as written, `None` for a positional value.
    pub fn name(&self) -> Option<&'a str> {
        self.name_node().map(|node| node.text())
    }

    /// The declared parameter this node was bound to.
    pub fn binding(&self) -> Option<&'a str> {
        self.0.binding()
    }

    pub fn value_node(&self) -> Option<SyntaxNode<'a>> {
        self.0
            .child_nodes()
            .find(|n| matches!(n.kind(), NodeKind::ParameterValue | NodeKind::Expression))
    }

    pub fn value(&self) -> Option<ParameterValue> {
        let node = self.value_node()?;
        if node.kind() == NodeKind::Expression {
            let expression_type = node
                .child_of_kind(NodeKind::ExpressionType)
                .map_or("", |n| n.text());
            let arguments = node
                .child_of_kind(NodeKind::ExpressionArguments)
                .map_or("", |n| n.text());
            return Some(ParameterValue::Expression {
                expression_type: expression_type.to_string(),
                arguments: arguments.to_string(),
            });
        }

        let token = node.children().find_map(|child| match child {
            SyntaxElementRef::Token(token) if token.is_significant() => Some(token),
            _ => None,
        })?;
        let value = match token.kind {
            TokenKind::Quoted => ParameterValue::Literal(unquote(&token.text).to_string()),
            TokenKind::Json => match serde_json::from_str(&token.text) {
                Ok(json) => ParameterValue::Json(json),
                Err(_) => ParameterValue::Literal(token.text.clone()),
            },
            _ => ParameterValue::Literal(token.text.clone()),
        };
        Some(value)
    }
}
