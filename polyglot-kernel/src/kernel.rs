//! The kernel abstraction

use crate::commands::KernelCommand;
use crate::error::KernelError;
use crate::invocation::KernelInvocationContext;
use async_trait::async_trait;
use polyglot_parser::polyglot::KernelInfo;
use std::sync::Arc;

/// Something that runs commands.
///
/// `handle` publishes whatever the command produces on `context` and returns once the command
/// is done. The dispatcher turns `Ok(())` into `CommandSucceeded` and an error into
/// `CommandFailed` carrying the error's message; kernels do not complete their own context.
#[async_trait]
pub trait Kernel: Send + Sync {
    /// Name, aliases and directives, used to build the directive configuration.
    fn info(&self) -> KernelInfo;

    fn name(&self) -> String {
        self.info().name
    }

    async fn handle(
        &self,
        command: Arc<KernelCommand>,
        context: KernelInvocationContext,
    ) -> Result<(), KernelError>;
}

type Handler = dyn Fn(&Arc<KernelCommand>, &KernelInvocationContext) -> Result<(), KernelError>
    + Send
    + Sync;

/// A kernel whose behavior is a closure.
pub struct FnKernel {
    info: KernelInfo,
    handler: Box<Handler>,
}

impl FnKernel {
    pub fn new<F>(info: KernelInfo, handler: F) -> Self
    where
        F: Fn(&Arc<KernelCommand>, &KernelInvocationContext) -> Result<(), KernelError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            info,
            handler: Box::new(handler),
        }
    }
}

#[async_trait]
impl Kernel for FnKernel {
    fn info(&self) -> KernelInfo {
        self.info.clone()
    }

    async fn handle(
        &self,
        command: Arc<KernelCommand>,
        context: KernelInvocationContext,
    ) -> Result<(), KernelError> {
        (self.handler)(&command, &context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::KernelEvent;

    #[tokio::test]
    async fn test_fn_kernel_publishes_through_context() {
        let kernel = FnKernel::new(KernelInfo::new("echo"), |command, context| {
            let code = command.payload.code().unwrap_or_default().to_string();
            context.publish(KernelEvent::standard_output(Arc::clone(command), code));
            Ok(())
        });
        let command = Arc::new(KernelCommand::submit_code("hi"));
        let context = KernelInvocationContext::root(Arc::clone(&command));

        kernel.handle(command, context.clone()).await.unwrap();

        assert_eq!(kernel.name(), "echo");
        assert_eq!(context.result().standard_output(), "hi");
    }
}
