//! Proxy kernels
//!
//!     A [`ProxyKernel`] stands in for a kernel that lives somewhere else. Commands sent to it
//!     are serialized into envelopes, handed to a [`KernelTransport`], and the events coming
//!     back are published on the local context as if the proxy had produced them.
//!
//!     Events are matched to local commands by token. The proxied command keeps its token on
//!     the remote side, so its own events map back to it directly. When the remote kernel
//!     splits the command further, events arrive for tokens this side never saw (`abc.1`,
//!     `abc.2`); each such token gets one local command, parented to the proxied command and
//!     marked with the proxy's origin uri, and every later event for that token reuses it.

use crate::composite::CompositeKernel;
use crate::commands::KernelCommand;
use crate::envelope::{KernelCommandEnvelope, KernelEventEnvelope};
use crate::error::{KernelError, TransportError};
use crate::events::{EventPayload, KernelEvent};
use crate::invocation::KernelInvocationContext;
use crate::kernel::Kernel;
use async_trait::async_trait;
use polyglot_parser::polyglot::KernelInfo;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Carries command envelopes to a remote kernel and its event envelopes back.
#[async_trait]
pub trait KernelTransport: Send + Sync {
    /// Send one command. The returned receiver yields the events the remote side produces
    /// for it and its descendants, ending after the command's terminal event or when the
    /// connection goes away.
    async fn send(
        &self,
        envelope: KernelCommandEnvelope,
    ) -> Result<mpsc::UnboundedReceiver<KernelEventEnvelope>, TransportError>;
}

pub struct ProxyKernel {
    info: KernelInfo,
    remote_name: String,
    uri: String,
    transport: Arc<dyn KernelTransport>,
}

impl ProxyKernel {
    /// A local kernel `name` forwarding to the kernel `remote_name` behind `transport`.
    pub fn new(
        name: impl Into<String>,
        remote_name: impl Into<String>,
        transport: Arc<dyn KernelTransport>,
    ) -> Self {
        let info = KernelInfo::new(name).proxy();
        let remote_name = remote_name.into();
        let uri = format!("kernel://proxy/{}/{}", info.name, remote_name);
        Self {
            info,
            remote_name,
            uri,
            transport,
        }
    }

    /// Replace the advertised aliases and directives. The kernel stays marked as a proxy.
    pub fn with_info(mut self, info: KernelInfo) -> Self {
        self.info = info.proxy();
        self
    }

    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    fn envelope_for(&self, command: &KernelCommand) -> Result<KernelCommandEnvelope, KernelError> {
        let mut envelope = KernelCommandEnvelope::from_command(command)?;
        if let Value::Object(fields) = &mut envelope.command {
            fields.insert(
                "targetKernelName".to_string(),
                Value::String(self.remote_name.clone()),
            );
        }
        envelope.origin_uri = Some(self.uri.clone());
        Ok(envelope)
    }

    fn correlate(
        &self,
        envelope: KernelEventEnvelope,
        command: &Arc<KernelCommand>,
        correlated: &mut HashMap<String, Arc<KernelCommand>>,
    ) -> Result<KernelEvent, TransportError> {
        let token = envelope.command.token.clone();
        let local = if token == command.token {
            Arc::clone(command)
        } else if let Some(known) = correlated.get(&token) {
            Arc::clone(known)
        } else {
            let payload = envelope.command.payload()?;
            let mut local = KernelCommand::correlated(command, token.clone(), payload);
            local.target_kernel_name = envelope.command.target_kernel_name().map(str::to_string);
            local.origin_uri = Some(self.uri.clone());
            tracing::debug!(
                proxy = %self.info.name,
                parent = %command.token,
                %token,
                "correlated remote command"
            );
            let local = Arc::new(local);
            correlated.insert(token, Arc::clone(&local));
            local
        };
        Ok(envelope.into_event(local)?)
    }
}

#[async_trait]
impl Kernel for ProxyKernel {
    fn info(&self) -> KernelInfo {
        self.info.clone()
    }

    async fn handle(
        &self,
        command: Arc<KernelCommand>,
        context: KernelInvocationContext,
    ) -> Result<(), KernelError> {
        let envelope = self.envelope_for(&command)?;
        let cancellation = context.cancellation_token();
        tracing::debug!(
            proxy = %self.info.name,
            remote = %self.remote_name,
            token = %command.token,
            "forwarding command"
        );
        let mut events = self.transport.send(envelope).await?;
        let mut correlated = HashMap::new();

        loop {
            let envelope = tokio::select! {
                biased;
                _ = cancellation.cancelled() => return Err(KernelError::Cancelled),
                next = events.recv() => next.ok_or(TransportError::Closed)?,
            };
            let event = self.correlate(envelope, &command, &mut correlated)?;
            if event.command.is_same_as(&command) {
                match &event.payload {
                    EventPayload::CommandSucceeded {} => return Ok(()),
                    EventPayload::CommandFailed { message } => {
                        return Err(KernelError::Remote(message.clone()))
                    }
                    _ => {}
                }
            }
            context.publish(event);
        }
    }
}

/// Hosts a remote [`CompositeKernel`] in-process. Envelopes are serialized to JSON text and
/// parsed back in both directions, so only what a real connection would carry gets through.
pub struct LoopbackTransport {
    remote: Arc<CompositeKernel>,
}

impl LoopbackTransport {
    pub fn new(remote: Arc<CompositeKernel>) -> Self {
        Self { remote }
    }
}

#[async_trait]
impl KernelTransport for LoopbackTransport {
    async fn send(
        &self,
        envelope: KernelCommandEnvelope,
    ) -> Result<mpsc::UnboundedReceiver<KernelEventEnvelope>, TransportError> {
        let wire = envelope.serialize()?;
        let command = Arc::new(KernelCommandEnvelope::deserialize(&wire)?.into_command()?);
        let context = KernelInvocationContext::root(Arc::clone(&command));
        let mut events = context.subscribe();
        let (sender, receiver) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match over_the_wire(&event) {
                    Ok(envelope) => {
                        if sender.send(envelope).is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%error, event = event.event_type(), "dropping event")
                    }
                }
            }
        });

        let remote = Arc::clone(&self.remote);
        tokio::spawn(async move {
            context.scope(remote.run(command, context.clone())).await;
        });

        Ok(receiver)
    }
}

fn over_the_wire(event: &KernelEvent) -> Result<KernelEventEnvelope, serde_json::Error> {
    let wire = KernelEventEnvelope::from_event(event)?.serialize()?;
    KernelEventEnvelope::deserialize(&wire)
}

impl std::fmt::Debug for ProxyKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyKernel")
            .field("name", &self.info.name)
            .field("remote_name", &self.remote_name)
            .field("uri", &self.uri)
            .finish_non_exhaustive()
    }
}
