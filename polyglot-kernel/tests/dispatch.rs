//! Dispatching submissions through a composite kernel

use parking_lot::Mutex;
use polyglot_kernel::{
    CommandPayload, CompositeKernel, ContextState, DirectiveCommand, EventPayload, FnKernel,
    Kernel, KernelCommand, KernelError, KernelEvent, KernelInvocationContext, ValueBinder,
};
use polyglot_parser::polyglot::testing::{sample_configuration, samples};
use polyglot_parser::polyglot::{DiagnosticCode, KernelInfo, ParameterValue};
use rstest::rstest;
use std::sync::Arc;
use tokio::sync::{Barrier, Notify};

type Log = Arc<Mutex<Vec<String>>>;

/// A kernel that echoes submitted code to standard output and records every command it runs
/// as `kernel:code` or `kernel:#!directive`. Code containing `boom` fails.
fn recording_kernel(info: KernelInfo, log: &Log) -> Arc<dyn Kernel> {
    let log = Arc::clone(log);
    let name = info.name.clone();
    Arc::new(FnKernel::new(info, move |command, context| {
        match &command.payload {
            CommandPayload::SubmitCode { code } => {
                log.lock().push(format!("{name}:{code}"));
                if code.contains("boom") {
                    return Err(KernelError::handler(format!("{name} exploded")));
                }
                context.publish(KernelEvent::standard_output(Arc::clone(command), code.clone()));
            }
            CommandPayload::Directive(directive) => {
                log.lock().push(format!("{name}:{}", directive.invoked_directive));
            }
            other => log.lock().push(format!("{name}:{}", other.command_type())),
        }
        Ok(())
    }))
}

fn sample_composite(log: &Log) -> CompositeKernel {
    let configuration = sample_configuration();
    let composite = CompositeKernel::with_info(configuration.root().clone());
    for info in configuration.kernels() {
        composite
            .add_kernel(recording_kernel(info.clone(), log))
            .unwrap();
    }
    composite.set_default_kernel("csharp").unwrap();
    composite
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().clone()
}

#[tokio::test]
async fn test_two_kernels_run_in_order() {
    let log = Log::default();
    let composite = sample_composite(&log);

    let result = composite.submit_code(samples::TWO_KERNELS).await;

    assert!(result.succeeded(), "{:?}", result.state);
    assert_eq!(
        entries(&log),
        vec!["csharp:var x = 1;\n", "fsharp:let y = 2\n"]
    );
    assert_eq!(result.standard_output(), "var x = 1;\nlet y = 2\n");
}

#[tokio::test]
async fn test_submission_reports_one_terminal_event_for_itself() {
    let log = Log::default();
    let composite = sample_composite(&log);

    let result = composite.submit_code(samples::TWO_KERNELS).await;

    let terminal: Vec<_> = result.events.iter().filter(|e| e.is_terminal()).collect();
    assert_eq!(terminal.len(), 1, "{terminal:?}");
    assert!(terminal[0].is_terminal_for(&result.command));
}

#[tokio::test]
async fn test_packages_are_restored_before_code() {
    let log = Log::default();
    let composite = sample_composite(&log);

    let result = composite
        .submit_code("#!csharp\nx\n#r \"nuget:Foo,1.0\"\ny")
        .await;

    assert!(result.succeeded());
    assert_eq!(
        entries(&log),
        vec![
            "csharp:#r",
            "csharp:#!nuget-restore",
            "csharp:x\n",
            "csharp:y"
        ]
    );
}

#[rstest]
#[case("#!F#\nlet z = 3", "fsharp:let z = 3")]
#[case("#!powershell\nGet-Date", "pwsh:Get-Date")]
#[case("#!js\nconsole.log(1)", "javascript:console.log(1)")]
#[tokio::test]
async fn test_selector_aliases_route_to_kernel(#[case] code: &str, #[case] expected: &str) {
    let log = Log::default();
    let composite = sample_composite(&log);

    let result = composite.submit_code(code).await;

    assert!(result.succeeded());
    assert_eq!(entries(&log), vec![expected.to_string()]);
}

#[tokio::test]
async fn test_unknown_target_kernel_fails() {
    let log = Log::default();
    let composite = sample_composite(&log);

    let result = composite
        .send(Arc::new(KernelCommand::submit_code("puts 1").target("ruby")))
        .await;

    assert_eq!(
        result.failure_message(),
        Some("No kernel found with name 'ruby'")
    );
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn test_parse_errors_fail_without_running_anything() {
    let log = Log::default();
    let composite = sample_composite(&log);

    let result = composite.submit_code(samples::UNKNOWN_DIRECTIVE).await;

    assert!(!result.succeeded());
    assert!(entries(&log).is_empty());
    let diagnostics = result
        .payloads()
        .find_map(|payload| match payload {
            EventPayload::DiagnosticsProduced { diagnostics } => Some(diagnostics.clone()),
            _ => None,
        })
        .expect("diagnostics event");
    assert_eq!(diagnostics[0].code, DiagnosticCode::UnknownDirective);
}

#[tokio::test]
async fn test_failure_discards_remaining_commands() {
    let log = Log::default();
    let composite = sample_composite(&log);

    let result = composite
        .submit_code("#!csharp\nboom\n#!fsharp\nlet y = 2\n")
        .await;

    assert_eq!(entries(&log), vec!["csharp:boom\n"]);
    assert_eq!(result.failure_message(), Some("csharp exploded"));

    let failures: Vec<_> = result
        .events
        .iter()
        .filter(|e| matches!(e.payload, EventPayload::CommandFailed { .. }))
        .collect();
    assert_eq!(failures.len(), 2, "child failure plus the submission's own");
    assert!(failures[0].command.is_self_or_descendant_of(&result.command));
    assert!(failures[1].is_terminal_for(&result.command));
}

/// A csharp kernel that fails its own context on `fail-me` and still returns `Ok`.
fn self_failing_composite(log: &Log) -> CompositeKernel {
    let configuration = sample_configuration();
    let composite = CompositeKernel::with_info(configuration.root().clone());
    let csharp = configuration.kernel("csharp").unwrap().clone();
    let recorded = Arc::clone(log);
    composite
        .add_kernel(Arc::new(FnKernel::new(csharp, move |command, context| {
            if let CommandPayload::SubmitCode { code } = &command.payload {
                recorded.lock().push(format!("csharp:{code}"));
                if code.contains("fail-me") {
                    context.fail("boom");
                }
            }
            Ok(())
        })))
        .unwrap();
    let fsharp = configuration.kernel("fsharp").unwrap().clone();
    composite
        .add_kernel(recording_kernel(fsharp, log))
        .unwrap();
    composite.set_default_kernel("csharp").unwrap();
    composite
}

#[tokio::test]
async fn test_kernel_failing_its_own_context_fails_the_submission() {
    let log = Log::default();
    let composite = self_failing_composite(&log);

    let result = composite
        .submit_code("#!csharp\nfail-me\n#!fsharp\nlet y = 2")
        .await;

    assert_eq!(result.failure_message(), Some("boom"));
    assert_eq!(entries(&log), vec!["csharp:fail-me\n"]);
    assert!(!result
        .payloads()
        .any(|payload| matches!(payload, EventPayload::CommandSucceeded { .. })));
}

#[tokio::test]
async fn test_single_command_failed_by_its_kernel_stays_failed() {
    let log = Log::default();
    let composite = self_failing_composite(&log);

    let result = composite.submit_code("fail-me").await;

    assert_eq!(result.failure_message(), Some("boom"));
    let terminal: Vec<_> = result
        .events
        .iter()
        .filter(|e| e.is_terminal_for(&result.command))
        .collect();
    assert_eq!(terminal.len(), 1);
    assert!(matches!(
        terminal[0].payload,
        EventPayload::CommandFailed { .. }
    ));
}

#[tokio::test]
async fn test_root_directive_runs_registered_handler() {
    let log = Log::default();
    let composite = sample_composite(&log);
    let seen: Arc<Mutex<Vec<DirectiveCommand>>> = Arc::default();
    let recorded = Arc::clone(&seen);
    composite.handle_directive(
        "#!set",
        Arc::new(
            move |directive: &DirectiveCommand,
                  _context: &KernelInvocationContext|
                  -> Result<(), KernelError> {
                recorded.lock().push(directive.clone());
                Ok(())
            },
        ),
    );

    let result = composite.submit_code(samples::SET_VALUE).await;

    assert!(result.succeeded(), "{:?}", result.state);
    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(
        seen[0].parameter("--name"),
        Some(&ParameterValue::Literal("x".to_string()))
    );
    assert_eq!(
        seen[0].parameter("--value"),
        Some(&ParameterValue::Literal("1".to_string()))
    );
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn test_root_directive_without_handler_fails() {
    let log = Log::default();
    let composite = sample_composite(&log);

    let result = composite.submit_code("#!time\n").await;

    assert_eq!(
        result.failure_message(),
        Some("No handler registered for directive '#!time'")
    );
}

struct Prompt;

#[async_trait::async_trait]
impl ValueBinder for Prompt {
    async fn bind(
        &self,
        _expression_type: &str,
        arguments: &str,
        _context: &KernelInvocationContext,
    ) -> Result<ParameterValue, KernelError> {
        Ok(ParameterValue::Literal(format!("<{arguments}>")))
    }
}

#[tokio::test]
async fn test_placeholder_without_binder_fails_with_dni301() {
    let log = Log::default();
    let composite = sample_composite(&log);
    composite.handle_directive(
        "#!set",
        Arc::new(
            |_: &DirectiveCommand, _: &KernelInvocationContext| -> Result<(), KernelError> {
                Ok(())
            },
        ),
    );

    let result = composite.submit_code(samples::INPUT_EXPRESSION).await;

    assert!(!result.succeeded());
    let codes: Vec<_> = result
        .payloads()
        .filter_map(|payload| match payload {
            EventPayload::DiagnosticsProduced { diagnostics } => Some(diagnostics[0].code),
            _ => None,
        })
        .collect();
    assert_eq!(codes, vec![DiagnosticCode::MissingBindingDelegate]);
}

#[tokio::test]
async fn test_placeholder_is_bound_before_handler_runs() {
    let log = Log::default();
    let composite = sample_composite(&log);
    composite.set_binder(Arc::new(Prompt));
    let seen: Arc<Mutex<Option<ParameterValue>>> = Arc::default();
    let recorded = Arc::clone(&seen);
    composite.handle_directive(
        "#!set",
        Arc::new(
            move |directive: &DirectiveCommand,
                  _context: &KernelInvocationContext|
                  -> Result<(), KernelError> {
                *recorded.lock() = directive.parameter("--value").cloned();
                Ok(())
            },
        ),
    );

    let result = composite.submit_code(samples::INPUT_EXPRESSION).await;

    assert!(result.succeeded(), "{:?}", result.state);
    assert_eq!(
        *seen.lock(),
        Some(ParameterValue::Literal("<Enter a URL>".to_string()))
    );
}

#[tokio::test]
async fn test_duplicate_kernel_is_rejected() {
    let log = Log::default();
    let composite = sample_composite(&log);

    let error = composite
        .add_kernel(recording_kernel(KernelInfo::new("fsharp"), &log))
        .unwrap_err();

    assert!(matches!(error, KernelError::Configuration(_)));
    assert_eq!(composite.kernels().len(), 4);
}

#[tokio::test]
async fn test_added_kernel_becomes_selectable() {
    let log = Log::default();
    let composite = sample_composite(&log);
    composite
        .add_kernel(recording_kernel(KernelInfo::new("python").alias("py"), &log))
        .unwrap();

    let result = composite.submit_code("#!py\nprint(1)").await;

    assert!(result.succeeded(), "{:?}", result.state);
    assert_eq!(entries(&log), vec!["python:print(1)"]);
}

/// Signals when it starts, then never finishes on its own.
struct Stuck {
    started: Arc<Notify>,
}

#[async_trait::async_trait]
impl Kernel for Stuck {
    fn info(&self) -> KernelInfo {
        KernelInfo::new("stuck")
    }

    async fn handle(
        &self,
        _command: Arc<KernelCommand>,
        _context: KernelInvocationContext,
    ) -> Result<(), KernelError> {
        self.started.notify_one();
        std::future::pending::<()>().await;
        Ok(())
    }
}

#[tokio::test]
async fn test_cancelling_a_submission() {
    let started = Arc::new(Notify::new());
    let composite = Arc::new(CompositeKernel::new(".NET"));
    composite
        .add_kernel(Arc::new(Stuck {
            started: Arc::clone(&started),
        }))
        .unwrap();

    let command = Arc::new(KernelCommand::submit_code("#!stuck\nwait"));
    let context = KernelInvocationContext::root(Arc::clone(&command));
    let running = {
        let composite = Arc::clone(&composite);
        let context = context.clone();
        tokio::spawn(async move { composite.run(command, context).await })
    };

    started.notified().await;
    context.cancel();
    running.await.unwrap();

    assert_eq!(
        context.state(),
        ContextState::Failed {
            message: "Command cancelled.".to_string()
        }
    );
}

/// Waits until every submission sharing the barrier is inside a kernel, then reports
/// whether the ambient context is the one it was handed.
struct Rendezvous {
    name: &'static str,
    barrier: Arc<Barrier>,
    mismatches: Log,
}

#[async_trait::async_trait]
impl Kernel for Rendezvous {
    fn info(&self) -> KernelInfo {
        KernelInfo::new(self.name)
    }

    async fn handle(
        &self,
        command: Arc<KernelCommand>,
        context: KernelInvocationContext,
    ) -> Result<(), KernelError> {
        self.barrier.wait().await;
        let current = KernelInvocationContext::current();
        if !current.is_some_and(|current| current.ptr_eq(&context)) {
            self.mismatches.lock().push(self.name.to_string());
        }
        if let CommandPayload::SubmitCode { code } = &command.payload {
            context.publish(KernelEvent::standard_output(Arc::clone(&command), code.clone()));
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_concurrent_submissions_keep_their_own_context() {
    let barrier = Arc::new(Barrier::new(2));
    let mismatches = Log::default();
    let composite = CompositeKernel::new(".NET");
    for name in ["alpha", "beta"] {
        composite
            .add_kernel(Arc::new(Rendezvous {
                name,
                barrier: Arc::clone(&barrier),
                mismatches: Arc::clone(&mismatches),
            }))
            .unwrap();
    }

    let first = Arc::new(KernelCommand::submit_code("first").target("alpha"));
    let second = Arc::new(KernelCommand::submit_code("second").target("beta"));
    let (first_result, second_result) = tokio::join!(
        composite.send(Arc::clone(&first)),
        composite.send(Arc::clone(&second))
    );

    assert!(entries(&mismatches).is_empty(), "{:?}", entries(&mismatches));
    for (result, command, output) in [
        (&first_result, &first, "first"),
        (&second_result, &second, "second"),
    ] {
        assert!(result.succeeded(), "{:?}", result.state);
        assert!(Arc::ptr_eq(&result.command, command));
        assert_eq!(result.standard_output(), output);
        assert!(result
            .events
            .iter()
            .all(|event| event.command.is_self_or_descendant_of(command)));
    }
}
