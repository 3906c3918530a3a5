//! Invocation contexts
//!
//!     Every command that runs gets a [`KernelInvocationContext`]. The context is where the
//!     command's events are published and where its outcome is decided:
//!
//!         Running ──complete──▶ Succeeded
//!            │
//!            ├──fail──────────▶ Failed(message)
//!            └──cancel────────▶ Failed("Command cancelled.")
//!
//!     Both terminal states are final. A context emits exactly one terminal event for its own
//!     command and ignores every later `complete`, `fail` or `publish`.
//!
//! Nesting
//!
//!     Commands split from a submission run in child contexts of the submission's context.
//!     Events published on a child reach the child's subscribers and then every running
//!     ancestor's, so whoever sent the submission sees everything it caused. Two exceptions:
//!
//!         - a child's `CommandSucceeded` stays on the child, unless the child command carries
//!           an origin uri (it ran on behalf of a proxy, and its sender wants to hear about it)
//!         - a child's `CommandFailed` goes to the nearest running ancestor only
//!
//!     Completing a context that still has running children is deferred: it succeeds as soon
//!     as the last of them reaches a terminal state. Once a context is terminal its descendants
//!     are inert and anything they publish is dropped. Children are tracked weakly, so a child
//!     context that was dropped without ever finishing does not hold its parent open.
//!
//! Ambient context
//!
//!     [`KernelInvocationContext::scope`] makes a context current for the duration of a future
//!     (a tokio task-local slot). [`KernelInvocationContext::establish`] nests a new context
//!     under whichever one is current, or starts a root when there is none. Contexts are also
//!     passed explicitly to kernels, so nothing depends on the ambient slot being set.

use crate::commands::KernelCommand;
use crate::error::KernelError;
use crate::events::{EventPayload, KernelEvent};
use parking_lot::Mutex;
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

tokio::task_local! {
    static CURRENT: RefCell<Option<KernelInvocationContext>>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ContextState {
    #[default]
    Running,
    Succeeded,
    Failed {
        message: String,
    },
}

impl ContextState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ContextState::Running)
    }

    pub fn failure_message(&self) -> Option<&str> {
        match self {
            ContextState::Failed { message } => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextState::Running => write!(f, "running"),
            ContextState::Succeeded => write!(f, "succeeded"),
            ContextState::Failed { message } => write!(f, "failed: {message}"),
        }
    }
}

/// Everything delivered to a context, plus its state at the time of the snapshot.
#[derive(Debug, Clone)]
pub struct KernelCommandResult {
    pub command: Arc<KernelCommand>,
    pub events: Vec<KernelEvent>,
    pub state: ContextState,
}

impl KernelCommandResult {
    pub fn succeeded(&self) -> bool {
        self.state == ContextState::Succeeded
    }

    pub fn failure_message(&self) -> Option<&str> {
        self.state.failure_message()
    }

    pub fn payloads(&self) -> impl Iterator<Item = &EventPayload> {
        self.events.iter().map(|event| &event.payload)
    }

    /// Concatenated standard output of every command the submission ran.
    pub fn standard_output(&self) -> String {
        self.payloads()
            .filter_map(|payload| match payload {
                EventPayload::StandardOutputValueProduced { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct KernelInvocationContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    command: Arc<KernelCommand>,
    parent: Option<KernelInvocationContext>,
    cancellation: CancellationToken,
    terminal: watch::Sender<ContextState>,
    shared: Mutex<Shared>,
}

#[derive(Default)]
struct Shared {
    state: ContextState,
    children: Vec<Weak<ContextInner>>,
    subscribers: Vec<mpsc::UnboundedSender<KernelEvent>>,
    events: Vec<KernelEvent>,
    completion_requested: bool,
}

impl Shared {
    fn deliver(&mut self, event: &KernelEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
        self.events.push(event.clone());
    }

    fn has_running_children(&self) -> bool {
        self.children
            .iter()
            .filter_map(Weak::upgrade)
            .any(|child| !child.shared.lock().state.is_terminal())
    }

    /// Deliver the terminal event and enter `state`. Subscribers are released so their
    /// receivers end once drained.
    fn finish(&mut self, event: &KernelEvent, state: ContextState) {
        self.deliver(event);
        self.state = state;
        self.subscribers.clear();
    }
}

impl KernelInvocationContext {
    /// A context with no parent.
    pub fn root(command: Arc<KernelCommand>) -> Self {
        Self::create(command, None)
    }

    fn create(command: Arc<KernelCommand>, parent: Option<KernelInvocationContext>) -> Self {
        let cancellation = parent
            .as_ref()
            .map_or_else(CancellationToken::new, |p| p.inner.cancellation.child_token());
        let (terminal, _) = watch::channel(ContextState::Running);
        Self {
            inner: Arc::new(ContextInner {
                command,
                parent,
                cancellation,
                terminal,
                shared: Mutex::new(Shared::default()),
            }),
        }
    }

    /// A context for `command` nested under this one.
    pub fn child(&self, command: Arc<KernelCommand>) -> Self {
        let child = Self::create(command, Some(self.clone()));
        let mut shared = self.inner.shared.lock();
        shared.children.retain(|c| c.strong_count() > 0);
        shared.children.push(Arc::downgrade(&child.inner));
        child
    }

    /// The current context when it runs `command` already, a child of the current context
    /// otherwise, or a new root when no context is current.
    pub fn establish(command: Arc<KernelCommand>) -> Self {
        match Self::current() {
            Some(current) if current.command().is_same_as(&command) => current,
            Some(current) => current.child(command),
            None => Self::root(command),
        }
    }

    pub fn current() -> Option<Self> {
        CURRENT.try_with(|current| current.borrow().clone()).ok().flatten()
    }

    /// Run `future` with this context as the current one.
    pub async fn scope<F: Future>(&self, future: F) -> F::Output {
        CURRENT.scope(RefCell::new(Some(self.clone())), future).await
    }

    pub fn command(&self) -> &Arc<KernelCommand> {
        &self.inner.command
    }

    pub fn parent(&self) -> Option<&KernelInvocationContext> {
        self.inner.parent.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.inner.parent.is_none()
    }

    pub fn state(&self) -> ContextState {
        self.inner.shared.lock().state.clone()
    }

    pub fn is_complete(&self) -> bool {
        self.state().is_terminal()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancellation.clone()
    }

    pub fn ptr_eq(&self, other: &KernelInvocationContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Receive every event delivered to this context from now on. The receiver ends when
    /// the context reaches a terminal state.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<KernelEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut shared = self.inner.shared.lock();
        if !shared.state.is_terminal() {
            shared.subscribers.push(sender);
        }
        receiver
    }

    pub fn result(&self) -> KernelCommandResult {
        let shared = self.inner.shared.lock();
        KernelCommandResult {
            command: Arc::clone(&self.inner.command),
            events: shared.events.clone(),
            state: shared.state.clone(),
        }
    }

    /// Resolves once the context is terminal.
    pub async fn wait(&self) -> ContextState {
        let mut receiver = self.inner.terminal.subscribe();
        let state = match receiver.wait_for(ContextState::is_terminal).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        state
    }

    /// Publish an event caused by this context's command. Dropped when this context or any
    /// of its ancestors is terminal.
    pub fn publish(&self, event: KernelEvent) {
        if self.is_inert() {
            tracing::debug!(
                token = %self.inner.command.token,
                event = event.event_type(),
                "dropping event published on a finished context"
            );
            return;
        }
        self.propagate(&event);
    }

    /// Complete `command`: this context's own command, or one run by a descendant context.
    pub fn complete(&self, command: &KernelCommand) {
        if command.is_same_as(&self.inner.command) {
            self.try_succeed();
            return;
        }
        match self.find_descendant(command) {
            Some(context) => context.try_succeed(),
            None => tracing::debug!(
                token = %command.token,
                "complete called for a command with no context"
            ),
        }
    }

    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        let event = KernelEvent::failed(Arc::clone(&self.inner.command), message.clone());
        {
            let mut shared = self.inner.shared.lock();
            if shared.state.is_terminal() {
                return;
            }
            shared.finish(&event, ContextState::Failed { message: message.clone() });
        }
        self.inner
            .terminal
            .send_replace(ContextState::Failed { message: message.clone() });
        self.inner.cancellation.cancel();
        tracing::debug!(token = %self.inner.command.token, %message, "command failed");

        let mut ancestor = self.inner.parent.clone();
        while let Some(context) = ancestor {
            if !context.is_complete() {
                context.propagate(&event);
                break;
            }
            ancestor = context.inner.parent.clone();
        }
        self.notify_parent();
    }

    /// Fail with the cancellation message. Descendants' cancellation tokens are cancelled too.
    pub fn cancel(&self) {
        self.fail(KernelError::Cancelled.to_string());
    }

    /// Release the context: it stops being current on this task and, if it is still running,
    /// it completes.
    pub fn dispose(&self) {
        // Outside a scope there is no slot to clear.
        let _ = CURRENT.try_with(|current| {
            let mut current = current.borrow_mut();
            if current.as_ref().is_some_and(|c| c.ptr_eq(self)) {
                *current = None;
            }
        });
        self.try_succeed();
    }

    fn try_succeed(&self) {
        let event = KernelEvent::succeeded(Arc::clone(&self.inner.command));
        {
            let mut shared = self.inner.shared.lock();
            if shared.state.is_terminal() {
                return;
            }
            if shared.has_running_children() {
                shared.completion_requested = true;
                return;
            }
            shared.finish(&event, ContextState::Succeeded);
        }
        self.inner.terminal.send_replace(ContextState::Succeeded);
        tracing::debug!(token = %self.inner.command.token, "command succeeded");

        if self.inner.command.origin_uri.is_some() {
            if let Some(parent) = &self.inner.parent {
                parent.publish(event);
            }
        }
        self.notify_parent();
    }

    fn notify_parent(&self) {
        if let Some(parent) = &self.inner.parent {
            let pending = {
                let shared = parent.inner.shared.lock();
                shared.completion_requested && !shared.state.is_terminal()
            };
            if pending {
                parent.try_succeed();
            }
        }
    }

    fn is_inert(&self) -> bool {
        let mut context = Some(self);
        while let Some(current) = context {
            if current.is_complete() {
                return true;
            }
            context = current.parent();
        }
        false
    }

    /// Deliver here and upward. A terminal event only crosses into a parent when its command
    /// carries an origin uri.
    fn propagate(&self, event: &KernelEvent) {
        let mut context = self.clone();
        loop {
            {
                let mut shared = context.inner.shared.lock();
                if shared.state.is_terminal() {
                    return;
                }
                shared.deliver(event);
            }
            if event.is_terminal() && event.command.origin_uri.is_none() {
                return;
            }
            match context.inner.parent.clone() {
                Some(parent) => context = parent,
                None => return,
            }
        }
    }

    fn find_descendant(&self, command: &KernelCommand) -> Option<KernelInvocationContext> {
        let children: Vec<_> = self
            .inner
            .shared
            .lock()
            .children
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        children.into_iter().find_map(|inner| {
            let child = KernelInvocationContext { inner };
            if child.inner.command.is_same_as(command) {
                Some(child)
            } else {
                child.find_descendant(command)
            }
        })
    }
}

impl fmt::Debug for KernelInvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelInvocationContext")
            .field("command", &self.inner.command.token)
            .field("state", &self.state())
            .field("is_root", &self.is_root())
            .finish_non_exhaustive()
    }
}
