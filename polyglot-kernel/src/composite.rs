//! The composite kernel
//!
//!     A [`CompositeKernel`] owns a set of sub-kernels and the directive configuration derived
//!     from them. Sending it a submission:
//!
//!         1. establishes a context for the submission
//!         2. splits it into per-kernel commands against the current configuration
//!         3. runs those commands one at a time, each in a child context, on the kernel it
//!            targets (directives declared by the composite itself go to a [`DirectiveHandler`])
//!         4. completes the submission, or fails it with the message of the first command that
//!            failed, skipping whatever was left
//!
//!     Adding a kernel or a directive builds a fresh configuration and swaps it in; a
//!     submission already being dispatched keeps the configuration it started with.

use crate::binding::{bind_directive, ValueBinder};
use crate::commands::{CommandPayload, DirectiveCommand, KernelCommand};
use crate::error::KernelError;
use crate::events::KernelEvent;
use crate::invocation::{KernelCommandResult, KernelInvocationContext};
use crate::kernel::Kernel;
use crate::splitting::split_submission;
use async_trait::async_trait;
use parking_lot::RwLock;
use polyglot_parser::polyglot::{
    DirectiveConfigError, DirectiveConfiguration, DirectiveDefinition, KernelInfo,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Runs a directive declared on the composite kernel itself, such as `#!set` or `#!time`.
#[async_trait]
pub trait DirectiveHandler: Send + Sync {
    async fn handle(
        &self,
        directive: &DirectiveCommand,
        context: &KernelInvocationContext,
    ) -> Result<(), KernelError>;
}

#[async_trait]
impl<F> DirectiveHandler for F
where
    F: Fn(&DirectiveCommand, &KernelInvocationContext) -> Result<(), KernelError> + Send + Sync,
{
    async fn handle(
        &self,
        directive: &DirectiveCommand,
        context: &KernelInvocationContext,
    ) -> Result<(), KernelError> {
        (self)(directive, context)
    }
}

pub struct CompositeKernel {
    registry: RwLock<Registry>,
}

struct Registry {
    info: KernelInfo,
    kernels: Vec<Arc<dyn Kernel>>,
    default_kernel: Option<String>,
    configuration: Arc<DirectiveConfiguration>,
    handlers: HashMap<String, Arc<dyn DirectiveHandler>>,
    binder: Option<Arc<dyn ValueBinder>>,
}

fn build_configuration(
    info: &KernelInfo,
    kernels: &[Arc<dyn Kernel>],
    default_kernel: Option<&str>,
) -> Result<DirectiveConfiguration, DirectiveConfigError> {
    let mut builder = DirectiveConfiguration::builder(info.clone());
    for kernel in kernels {
        builder = builder.kernel(kernel.info());
    }
    let default_kernel = default_kernel
        .map(str::to_string)
        .or_else(|| kernels.first().map(|kernel| kernel.name()));
    if let Some(default_kernel) = default_kernel {
        builder = builder.default_kernel(default_kernel);
    }
    builder.build()
}

impl CompositeKernel {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_info(KernelInfo::composite(name))
    }

    /// A composite kernel declaring the directives in `info`. Those directives still need a
    /// handler ([`CompositeKernel::handle_directive`]) to do anything.
    pub fn with_info(info: KernelInfo) -> Self {
        // A root kernel with no sub-kernels always validates.
        let configuration = DirectiveConfiguration::builder(info.clone())
            .build()
            .unwrap_or_default();
        Self {
            registry: RwLock::new(Registry {
                info,
                kernels: Vec::new(),
                default_kernel: None,
                configuration: Arc::new(configuration),
                handlers: HashMap::new(),
                binder: None,
            }),
        }
    }

    pub fn name(&self) -> String {
        self.registry.read().info.name.clone()
    }

    pub fn info(&self) -> KernelInfo {
        self.registry.read().info.clone()
    }

    /// The configuration submissions are currently parsed with.
    pub fn configuration(&self) -> Arc<DirectiveConfiguration> {
        Arc::clone(&self.registry.read().configuration)
    }

    pub fn kernels(&self) -> Vec<Arc<dyn Kernel>> {
        self.registry.read().kernels.clone()
    }

    /// Register a sub-kernel. Fails, leaving the composite unchanged, when the kernel's name,
    /// aliases or directives clash with what is already registered.
    pub fn add_kernel(&self, kernel: Arc<dyn Kernel>) -> Result<(), KernelError> {
        let mut registry = self.registry.write();
        let mut kernels = registry.kernels.clone();
        kernels.push(Arc::clone(&kernel));
        let configuration =
            build_configuration(&registry.info, &kernels, registry.default_kernel.as_deref())?;
        registry.kernels = kernels;
        registry.configuration = Arc::new(configuration);
        tracing::info!(kernel = %kernel.name(), "kernel added");
        Ok(())
    }

    /// Kernel for code that comes before any kernel selector. Defaults to the first kernel
    /// added.
    pub fn set_default_kernel(&self, name: impl Into<String>) -> Result<(), KernelError> {
        let name = name.into();
        let mut registry = self.registry.write();
        let configuration = build_configuration(&registry.info, &registry.kernels, Some(&name))?;
        registry.default_kernel = Some(name);
        registry.configuration = Arc::new(configuration);
        Ok(())
    }

    /// Declare a directive on the composite kernel and register what runs it.
    pub fn add_directive(
        &self,
        definition: DirectiveDefinition,
        handler: Arc<dyn DirectiveHandler>,
    ) -> Result<(), KernelError> {
        let mut registry = self.registry.write();
        let name = definition.name.clone();
        let mut info = registry.info.clone();
        info.add_directive(definition)?;
        let configuration =
            build_configuration(&info, &registry.kernels, registry.default_kernel.as_deref())?;
        registry.info = info;
        registry.configuration = Arc::new(configuration);
        registry.handlers.insert(name, handler);
        Ok(())
    }

    /// Register what runs a directive already declared on the composite kernel.
    pub fn handle_directive(&self, name: impl Into<String>, handler: Arc<dyn DirectiveHandler>) {
        self.registry.write().handlers.insert(name.into(), handler);
    }

    pub fn set_binder(&self, binder: Arc<dyn ValueBinder>) {
        self.registry.write().binder = Some(binder);
    }

    /// Sub-kernel by name or alias.
    pub fn find_kernel(&self, name: &str) -> Option<Arc<dyn Kernel>> {
        let registry = self.registry.read();
        let name = registry
            .configuration
            .kernel(name)
            .map_or(name, |info| info.name.as_str());
        registry
            .kernels
            .iter()
            .find(|kernel| kernel.name() == name)
            .cloned()
    }

    /// Run `command` to completion and collect what it produced.
    pub async fn send(&self, command: Arc<KernelCommand>) -> KernelCommandResult {
        let context = KernelInvocationContext::establish(Arc::clone(&command));
        context
            .scope(self.run(Arc::clone(&command), context.clone()))
            .await;
        context.result()
    }

    pub async fn submit_code(&self, code: impl Into<String>) -> KernelCommandResult {
        self.send(Arc::new(KernelCommand::submit_code(code))).await
    }

    /// Dispatch `command` in an existing context and settle that context.
    pub async fn run(&self, command: Arc<KernelCommand>, context: KernelInvocationContext) {
        let configuration = self.configuration();
        let commands = split_submission(&command, &configuration);
        let cancellation = context.cancellation_token();
        tracing::info!(
            token = %command.token,
            command_type = command.command_type(),
            commands = commands.len(),
            "dispatching"
        );

        if let [only] = commands.as_slice() {
            if Arc::ptr_eq(only, &command) {
                let outcome = tokio::select! {
                    biased;
                    _ = cancellation.cancelled() => Err(KernelError::Cancelled),
                    outcome = self.route(&command, &context) => outcome,
                };
                match outcome {
                    // A kernel may have failed the context itself before returning.
                    Ok(()) if context.state().is_terminal() => {}
                    Ok(()) => context.complete(&command),
                    Err(error) => context.fail(error.to_string()),
                }
                return;
            }
        }

        for (index, child) in commands.iter().enumerate() {
            if cancellation.is_cancelled() {
                context.cancel();
                return;
            }
            let child_context = context.child(Arc::clone(child));
            let outcome = tokio::select! {
                biased;
                _ = cancellation.cancelled() => Err(KernelError::Cancelled),
                outcome = child_context.scope(self.route(child, &child_context)) => outcome,
            };
            let outcome = match outcome {
                Ok(()) => match child_context.state().failure_message() {
                    Some(message) => Err(message.to_string()),
                    None => {
                        child_context.complete(child);
                        Ok(())
                    }
                },
                Err(error) => Err(error.to_string()),
            };
            if let Err(message) = outcome {
                tracing::warn!(
                    token = %child.token,
                    %message,
                    skipped = commands.len() - index - 1,
                    "command failed"
                );
                child_context.fail(message.clone());
                context.fail(message);
                return;
            }
        }
        context.complete(&command);
    }

    async fn route(
        &self,
        command: &Arc<KernelCommand>,
        context: &KernelInvocationContext,
    ) -> Result<(), KernelError> {
        match &command.payload {
            CommandPayload::ParseFailure {
                message,
                diagnostics,
            } => {
                context.publish(KernelEvent::diagnostics(
                    Arc::clone(command),
                    diagnostics.clone(),
                ));
                Err(KernelError::ParseFailure(message.clone()))
            }
            CommandPayload::Directive(directive) if directive.has_expressions() => {
                let binder = self.registry.read().binder.clone();
                let bound = match bind_directive(directive, binder.as_deref(), context).await {
                    Ok(bound) => bound,
                    Err(diagnostic) => {
                        let message = diagnostic.message.clone();
                        context.publish(KernelEvent::diagnostics(
                            Arc::clone(command),
                            vec![diagnostic],
                        ));
                        return Err(KernelError::Binding(message));
                    }
                };
                let bound = Arc::new(command.with_payload(CommandPayload::Directive(bound)));
                self.deliver(bound, context).await
            }
            _ => self.deliver(Arc::clone(command), context).await,
        }
    }

    async fn deliver(
        &self,
        command: Arc<KernelCommand>,
        context: &KernelInvocationContext,
    ) -> Result<(), KernelError> {
        let (root_name, target) = {
            let registry = self.registry.read();
            let target = command
                .target_kernel_name
                .clone()
                .unwrap_or_else(|| registry.configuration.default_kernel_name().to_string());
            (registry.info.name.clone(), target)
        };

        if target == root_name {
            return self.handle_own(&command, context).await;
        }

        let kernel = self
            .find_kernel(&target)
            .ok_or_else(|| KernelError::NoSuchKernel(target.clone()))?;
        tracing::debug!(token = %command.token, kernel = %target, "routing command");
        kernel.handle(command, context.clone()).await
    }

    async fn handle_own(
        &self,
        command: &Arc<KernelCommand>,
        context: &KernelInvocationContext,
    ) -> Result<(), KernelError> {
        let CommandPayload::Directive(directive) = &command.payload else {
            return Err(KernelError::UnsupportedCommand {
                kernel: self.name(),
                command_type: command.command_type().to_string(),
            });
        };
        let handler = self.registry.read().handlers.get(&directive.name).cloned();
        match handler {
            Some(handler) => handler.handle(directive, context).await,
            None => Err(KernelError::UnhandledDirective(directive.name.clone())),
        }
    }
}

impl Default for CompositeKernel {
    fn default() -> Self {
        Self::new(".NET")
    }
}

impl std::fmt::Debug for CompositeKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry.read();
        f.debug_struct("CompositeKernel")
            .field("name", &registry.info.name)
            .field(
                "kernels",
                &registry.kernels.iter().map(|k| k.name()).collect::<Vec<_>>(),
            )
            .field("default_kernel", &registry.configuration.default_kernel_name())
            .finish_non_exhaustive()
    }
}
