//! Splitting a submission into per-kernel commands
//!
//!     A submission is parsed and each top-level node becomes at most one command:
//!
//!         - a language node becomes `SubmitCode` for the kernel it belongs to, unless it is
//!           only whitespace
//!         - a kernel selector becomes nothing, it only changes which kernel later code goes to
//!         - an action directive becomes a `DirectiveCommand` for the kernel that declares it
//!
//!     Package directives are hoisted: every `#r "nuget:..."` and `#i` command runs before
//!     anything else, followed by one `#!nuget-restore` for each kernel that received a
//!     package reference, in the order those kernels were first referenced. All other commands
//!     keep their document order.
//!
//!     If the submission has any error diagnostic, the result is a single `ParseFailure`
//!     command and nothing else. If splitting would produce nothing, or only an identical copy
//!     of the original submission, the original command is returned as is, so splitting a
//!     command twice is a no-op.

use crate::commands::{CommandPayload, DirectiveCommand, KernelCommand};
use polyglot_parser::polyglot::{parse, DirectiveConfiguration, DirectiveNode, LanguageNode};
use std::sync::Arc;

const PACKAGE_DIRECTIVE: &str = "#r";
const SOURCE_DIRECTIVE: &str = "#i";
pub const RESTORE_DIRECTIVE: &str = "#!nuget-restore";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Submit,
    Diagnose,
}

/// Split `command` into the commands that run it.
///
/// Commands other than `SubmitCode` and `RequestDiagnostics` are returned unchanged.
pub fn split_submission(
    command: &Arc<KernelCommand>,
    configuration: &DirectiveConfiguration,
) -> Vec<Arc<KernelCommand>> {
    let (code, mode) = match &command.payload {
        CommandPayload::SubmitCode { code } => (code.as_str(), Mode::Submit),
        CommandPayload::RequestDiagnostics { code } => (code.as_str(), Mode::Diagnose),
        _ => return vec![Arc::clone(command)],
    };

    let tree = parse(code, command.target_kernel_name.as_deref(), configuration);

    let errors: Vec<_> = tree
        .diagnostics()
        .into_iter()
        .filter(|d| d.is_error())
        .cloned()
        .collect();
    if !errors.is_empty() && mode == Mode::Submit {
        let message = errors
            .iter()
            .map(|d| d.message.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let mut failure = KernelCommand::child_of(
            command,
            CommandPayload::ParseFailure {
                message,
                diagnostics: errors,
            },
        );
        failure.target_kernel_name = command.target_kernel_name.clone();
        return vec![Arc::new(failure)];
    }

    let mut hoisted = Vec::new();
    let mut restore_kernels: Vec<String> = Vec::new();
    let mut rest = Vec::new();

    for node in tree.root().child_nodes() {
        if let Some(language) = LanguageNode::cast(node) {
            if language.is_whitespace_only() {
                continue;
            }
            let code = language.code().to_string();
            let payload = match mode {
                Mode::Submit => CommandPayload::SubmitCode { code },
                Mode::Diagnose => CommandPayload::RequestDiagnostics { code },
            };
            rest.push(child(command, payload, language.kernel_name()));
            continue;
        }

        let Some(directive) = DirectiveNode::cast(node) else {
            continue;
        };
        if directive.is_kernel_selector() || mode == Mode::Diagnose {
            continue;
        }

        let target = directive.target_kernel_name().or(directive.kernel_name());
        match directive.name() {
            PACKAGE_DIRECTIVE if directive.package_reference().is_some() => {
                if let Some(kernel) = target {
                    if !restore_kernels.iter().any(|k| k == kernel) {
                        restore_kernels.push(kernel.to_string());
                    }
                }
                hoisted.push(directive_command(command, &directive, configuration, target));
            }
            SOURCE_DIRECTIVE => {
                hoisted.push(directive_command(command, &directive, configuration, target));
            }
            RESTORE_DIRECTIVE => {
                if let Some(kernel) = directive.kernel_name() {
                    if !restore_kernels.iter().any(|k| k == kernel) {
                        restore_kernels.push(kernel.to_string());
                    }
                }
            }
            _ => rest.push(directive_command(command, &directive, configuration, target)),
        }
    }

    let mut commands = hoisted;
    for kernel in &restore_kernels {
        let payload = CommandPayload::Directive(DirectiveCommand::new(RESTORE_DIRECTIVE));
        commands.push(child(command, payload, Some(kernel)));
    }
    commands.extend(rest);

    if commands.is_empty() || is_identity(command, &commands) {
        return vec![Arc::clone(command)];
    }
    commands
}

fn child(
    parent: &Arc<KernelCommand>,
    payload: CommandPayload,
    target: Option<&str>,
) -> Arc<KernelCommand> {
    let mut command = KernelCommand::child_of(parent, payload);
    command.target_kernel_name = target.map(str::to_string);
    Arc::new(command)
}

fn directive_command(
    parent: &Arc<KernelCommand>,
    directive: &DirectiveNode<'_>,
    configuration: &DirectiveConfiguration,
    target: Option<&str>,
) -> Arc<KernelCommand> {
    let syntax = directive.syntax();
    let payload = CommandPayload::Directive(DirectiveCommand {
        name: directive.name().to_string(),
        invoked_directive: directive.invoked_directive(),
        raw: syntax.text().to_string(),
        parameters: directive.parameter_values(configuration),
        package: directive.package_reference(),
        range: Some(syntax.range()),
    });
    child(parent, payload, target)
}

/// A single piece with the original text for the kernel the original already targets.
fn is_identity(original: &KernelCommand, commands: &[Arc<KernelCommand>]) -> bool {
    let [only] = commands else {
        return false;
    };
    let same_code = only.payload.code().is_some() && only.payload.code() == original.payload.code();
    let same_target = match &original.target_kernel_name {
        Some(target) => only.target_kernel_name.as_deref() == Some(target.as_str()),
        None => true,
    };
    same_code && same_target && only.command_type() == original.command_type()
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyglot_parser::polyglot::testing::{samples, sample_configuration};
    use polyglot_parser::polyglot::{DiagnosticCode, PackageReference};

    fn split(code: &str) -> (Arc<KernelCommand>, Vec<Arc<KernelCommand>>) {
        let command = Arc::new(KernelCommand::submit_code(code));
        let commands = split_submission(&command, &sample_configuration());
        (command, commands)
    }

    fn summary(commands: &[Arc<KernelCommand>]) -> Vec<(String, String)> {
        commands
            .iter()
            .map(|command| {
                let what = match &command.payload {
                    CommandPayload::SubmitCode { code } => code.clone(),
                    CommandPayload::RequestDiagnostics { code } => format!("?{code}"),
                    CommandPayload::Directive(directive) => directive.invoked_directive.clone(),
                    CommandPayload::ParseFailure { message, .. } => format!("!{message}"),
                };
                (
                    command.target_kernel_name.clone().unwrap_or_default(),
                    what,
                )
            })
            .collect()
    }

    fn pair(kernel: &str, what: &str) -> (String, String) {
        (kernel.to_string(), what.to_string())
    }

    #[test]
    fn test_plain_code_returns_original() {
        let (command, commands) = split("var x = 1;");
        assert_eq!(commands.len(), 1);
        assert!(Arc::ptr_eq(&commands[0], &command));
    }

    #[test]
    fn test_empty_submission_returns_original() {
        let (command, commands) = split("");
        assert_eq!(commands.len(), 1);
        assert!(Arc::ptr_eq(&commands[0], &command));
    }

    #[test]
    fn test_two_kernels() {
        let (command, commands) = split(samples::TWO_KERNELS);
        assert_eq!(
            summary(&commands),
            vec![pair("csharp", "var x = 1;\n"), pair("fsharp", "let y = 2\n")]
        );
        assert!(commands.iter().all(|c| c.parent().is_some()));
        assert_eq!(commands[0].token, format!("{}.1", command.token));
        assert_eq!(commands[1].token, format!("{}.2", command.token));
    }

    #[test]
    fn test_split_is_idempotent() {
        let (_, commands) = split(samples::TWO_KERNELS);
        for piece in &commands {
            let again = split_submission(piece, &sample_configuration());
            assert_eq!(again.len(), 1);
            assert!(Arc::ptr_eq(&again[0], piece));
        }
    }

    #[test]
    fn test_packages_are_hoisted_with_one_restore_per_kernel() {
        let code = "#!csharp\nx\n#r \"nuget:Foo,1.0\"\ny";
        let (_, commands) = split(code);
        assert_eq!(
            summary(&commands),
            vec![
                pair("csharp", "#r"),
                pair("csharp", RESTORE_DIRECTIVE),
                pair("csharp", "x\n"),
                pair("csharp", "y"),
            ]
        );
        let CommandPayload::Directive(directive) = &commands[0].payload else {
            panic!("expected a directive command");
        };
        assert_eq!(
            directive.package,
            Some(PackageReference::new("Foo", Some("1.0".to_string())))
        );
    }

    #[test]
    fn test_restores_follow_first_reference_order() {
        let code = "#!fsharp\n#r \"nuget:A\"\n#!csharp\n#r \"nuget:B\"\n#!fsharp\n#r \"nuget:C\"\n";
        let (_, commands) = split(code);
        assert_eq!(
            summary(&commands),
            vec![
                pair("fsharp", "#r"),
                pair("csharp", "#r"),
                pair("fsharp", "#r"),
                pair("fsharp", RESTORE_DIRECTIVE),
                pair("csharp", RESTORE_DIRECTIVE),
            ]
        );
    }

    #[test]
    fn test_source_directive_is_hoisted_without_restore() {
        let code = "var a = 1;\n#i \"nuget:https://example.org/feed\"\n";
        let (_, commands) = split(code);
        assert_eq!(
            summary(&commands),
            vec![pair("csharp", "#i"), pair("csharp", "var a = 1;\n")]
        );
    }

    #[test]
    fn test_action_directive_targets_declaring_kernel() {
        let (_, commands) = split("#!fsharp\nlet a = 1\n#!set --name x --value 1\n");
        assert_eq!(
            summary(&commands),
            vec![pair("fsharp", "let a = 1\n"), pair(".NET", "#!set")]
        );
    }

    #[test]
    fn test_first_line_indentation_is_kept() {
        let (_, commands) = split("#!csharp\nvar x = 1;\n#!fsharp\n    let y = 2\n");
        assert_eq!(
            summary(&commands),
            vec![pair("csharp", "var x = 1;\n"), pair("fsharp", "    let y = 2\n")]
        );
    }

    #[test]
    fn test_whitespace_only_pieces_are_skipped() {
        let (_, commands) = split("#!csharp\n\n   \n#!fsharp\nlet y = 2");
        assert_eq!(summary(&commands), vec![pair("fsharp", "let y = 2")]);
    }

    #[test]
    fn test_error_diagnostics_produce_single_parse_failure() {
        let (command, commands) = split(samples::UNKNOWN_DIRECTIVE);
        assert_eq!(commands.len(), 1);
        let CommandPayload::ParseFailure {
            diagnostics,
            message,
        } = &commands[0].payload
        else {
            panic!("expected a parse failure, got {:?}", commands[0].payload);
        };
        assert!(!message.is_empty());
        assert!(diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::UnknownDirective));
        assert!(commands[0].is_self_or_descendant_of(&command));
    }

    #[test]
    fn test_request_diagnostics_keeps_language_pieces_only() {
        let command = Arc::new(KernelCommand::request_diagnostics(
            "#!set --name x --value 1\n#!fsharp\nlet y = 2",
        ));
        let commands = split_submission(&command, &sample_configuration());
        assert_eq!(summary(&commands), vec![pair("fsharp", "?let y = 2")]);
    }

    #[test]
    fn test_other_commands_pass_through() {
        let command = Arc::new(KernelCommand::directive(DirectiveCommand::new("#!time")));
        let commands = split_submission(&command, &sample_configuration());
        assert!(Arc::ptr_eq(&commands[0], &command));
    }
}
