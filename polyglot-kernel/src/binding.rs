//! Resolving `{{type:arguments}}` placeholders
//!
//!     A directive parameter written as `{{input:Enter a URL}}` or `{{csharp:x}}` has no value
//!     until something supplies one: a prompt for `input` and `password`, another kernel's
//!     variable for a kernel name. The dispatcher asks a [`ValueBinder`] for each placeholder
//!     before the directive runs. With no binder installed, a directive that contains
//!     placeholders fails with a `DNI301` diagnostic.

use crate::commands::DirectiveCommand;
use crate::error::KernelError;
use crate::invocation::KernelInvocationContext;
use async_trait::async_trait;
use polyglot_parser::polyglot::ast::{Position, Range};
use polyglot_parser::polyglot::{Diagnostic, DiagnosticCode, DiagnosticSeverity, ParameterValue};

#[async_trait]
pub trait ValueBinder: Send + Sync {
    /// Produce the value for a placeholder of `expression_type` with `arguments` (the text
    /// after the colon, trimmed).
    async fn bind(
        &self,
        expression_type: &str,
        arguments: &str,
        context: &KernelInvocationContext,
    ) -> Result<ParameterValue, KernelError>;
}

/// A copy of `directive` with every placeholder replaced by its bound value.
pub async fn bind_directive(
    directive: &DirectiveCommand,
    binder: Option<&dyn ValueBinder>,
    context: &KernelInvocationContext,
) -> Result<DirectiveCommand, Diagnostic> {
    let mut bound = directive.clone();
    for (name, value) in bound.parameters.iter_mut() {
        let ParameterValue::Expression {
            expression_type,
            arguments,
        } = &*value
        else {
            continue;
        };
        let Some(binder) = binder else {
            return Err(missing_binder(directive, name, expression_type));
        };
        let resolved = binder
            .bind(expression_type, arguments.trim(), context)
            .await
            .map_err(|error| {
                Diagnostic::new(
                    directive_range(directive),
                    DiagnosticSeverity::Error,
                    DiagnosticCode::MissingBindingDelegate,
                    format!("Could not bind {name}: {error}"),
                )
                .with_source("polyglot-kernel")
            })?;
        *value = resolved;
    }
    Ok(bound)
}

fn missing_binder(directive: &DirectiveCommand, name: &str, expression_type: &str) -> Diagnostic {
    Diagnostic::new(
        directive_range(directive),
        DiagnosticSeverity::Error,
        DiagnosticCode::MissingBindingDelegate,
        format!(
            "No binding delegate is registered to resolve '{expression_type}' for parameter {name} of {}",
            directive.invoked_directive
        ),
    )
    .with_source("polyglot-kernel")
}

fn directive_range(directive: &DirectiveCommand) -> Range {
    directive
        .range
        .clone()
        .unwrap_or_else(|| Range::new(0..0, Position::default(), Position::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::KernelCommand;
    use std::sync::Arc;

    struct Answers;

    #[async_trait]
    impl ValueBinder for Answers {
        async fn bind(
            &self,
            expression_type: &str,
            arguments: &str,
            _context: &KernelInvocationContext,
        ) -> Result<ParameterValue, KernelError> {
            match expression_type {
                "input" => Ok(ParameterValue::Literal(format!("answer to {arguments}"))),
                other => Err(KernelError::Binding(format!("cannot bind {other}"))),
            }
        }
    }

    fn directive(expression_type: &str) -> DirectiveCommand {
        DirectiveCommand::new("#!set")
            .with_parameter("--name", ParameterValue::Literal("url".to_string()))
            .with_parameter(
                "--value",
                ParameterValue::Expression {
                    expression_type: expression_type.to_string(),
                    arguments: " Enter a URL".to_string(),
                },
            )
    }

    fn context() -> KernelInvocationContext {
        KernelInvocationContext::root(Arc::new(KernelCommand::submit_code("")))
    }

    #[tokio::test]
    async fn test_placeholders_are_replaced() {
        let bound = bind_directive(&directive("input"), Some(&Answers), &context())
            .await
            .unwrap();
        assert_eq!(
            bound.parameter("--value"),
            Some(&ParameterValue::Literal("answer to Enter a URL".to_string()))
        );
        assert!(!bound.has_expressions());
    }

    #[tokio::test]
    async fn test_missing_binder_reports_dni301() {
        let error = bind_directive(&directive("input"), None, &context())
            .await
            .unwrap_err();
        assert_eq!(error.code, DiagnosticCode::MissingBindingDelegate);
        assert_eq!(error.source, "polyglot-kernel");
        assert!(error.message.contains("--value"));
    }

    #[tokio::test]
    async fn test_binder_errors_become_diagnostics() {
        let error = bind_directive(&directive("password"), Some(&Answers), &context())
            .await
            .unwrap_err();
        assert!(error.message.contains("cannot bind password"));
    }

    #[tokio::test]
    async fn test_directives_without_placeholders_need_no_binder() {
        let plain = DirectiveCommand::new("#!time");
        let bound = bind_directive(&plain, None, &context()).await.unwrap();
        assert_eq!(bound, plain);
    }
}
