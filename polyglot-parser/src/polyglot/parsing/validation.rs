//! Checks that need a directive's complete argument list: required parameters and the number
//! of times each parameter may appear.

use crate::polyglot::ast::{DiagnosticCode, NodeId, ParameterNode, SyntaxTree};
use crate::polyglot::directives::DirectiveDefinition;

struct BoundParameter {
    node: NodeId,
    binding: Option<String>,
    has_value: bool,
}

pub(crate) fn validate_scope(tree: &mut SyntaxTree, scope: NodeId, declaration: &DirectiveDefinition) {
    let bound: Vec<BoundParameter> = tree
        .node(scope)
        .child_nodes()
        .filter_map(ParameterNode::cast)
        .map(|parameter| BoundParameter {
            node: parameter.syntax().id(),
            binding: parameter.binding().map(str::to_string),
            has_value: parameter.value_node().is_some(),
        })
        .collect();

    for declared in &declaration.parameters {
        let occurrences: Vec<&BoundParameter> = bound
            .iter()
            .filter(|p| p.binding.as_deref() == Some(declared.name.as_str()))
            .collect();

        if declared.max_occurrences > 0 {
            for extra in occurrences.iter().skip(declared.max_occurrences) {
                tree.report(
                    extra.node,
                    DiagnosticCode::TooManyOccurrencesOfParameter,
                    format!(
                        "Parameter '{}' may only be specified {} time(s)",
                        declared.name, declared.max_occurrences
                    ),
                );
            }
        }

        if !declared.required {
            continue;
        }
        if occurrences.is_empty() {
            tree.report(
                scope,
                DiagnosticCode::MissingRequiredParameter,
                format!("Missing required parameter '{}'", declared.name),
            );
        } else if !declared.flag && occurrences.iter().all(|p| !p.has_value) {
            tree.report(
                scope,
                DiagnosticCode::MissingRequiredParameter,
                format!("Missing value for required parameter '{}'", declared.name),
            );
        }
    }
}
