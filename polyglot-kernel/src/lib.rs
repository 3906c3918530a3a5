//! Polyglot kernel runtime
//!
//!     Executes parsed submissions. A submission sent to a [`CompositeKernel`] is split into
//!     one command per kernel-specific piece, the pieces run one after another on the kernels
//!     they target, and every event they produce is delivered through a
//!     [`KernelInvocationContext`] to whoever sent the submission.
//!
//!     - [commands]: commands, tokens and payloads
//!     - [events]: events published while a command runs
//!     - [envelope]: JSON envelopes for commands and events crossing a transport
//!     - [splitting]: turning one submission into per-kernel commands
//!     - [invocation]: the per-command state machine and event routing
//!     - [kernel]: the [`Kernel`] trait and a closure backed kernel
//!     - [binding]: resolving `{{type:arguments}}` placeholders before dispatch
//!     - [composite]: the dispatcher
//!     - [proxy]: kernels that forward commands to a remote kernel over a transport

pub mod binding;
pub mod commands;
pub mod composite;
pub mod envelope;
pub mod error;
pub mod events;
pub mod invocation;
pub mod kernel;
pub mod proxy;
pub mod splitting;

pub use binding::ValueBinder;
pub use commands::{CommandPayload, DirectiveCommand, KernelCommand};
pub use composite::{CompositeKernel, DirectiveHandler};
pub use envelope::{KernelCommandEnvelope, KernelEventEnvelope};
pub use error::{KernelError, TransportError};
pub use events::{EventPayload, KernelEvent};
pub use invocation::{ContextState, KernelCommandResult, KernelInvocationContext};
pub use kernel::{FnKernel, Kernel};
pub use proxy::{KernelTransport, LoopbackTransport, ProxyKernel};
pub use splitting::split_submission;
