//! Tiny actor runtime for the booking workers.
//!
//! Every worker owns its state inside an actor whose mailbox is drained by a single
//! tokio task, so state is never touched by two threads at once. Workers talk to each
//! other with `tell` (fire-and-forget) and `ask_forwarding` (reply delivered to a
//! [`Forward`] callback on the replying actor's context). Named notifications fan out
//! through an [`EventEmitter`] owned by the publishing actor.

mod actor;
mod event;
mod system;

pub use actor::{
    Actor, ActorContext, ActorError, ActorPath, ActorRef, ActorResult, Forward, Handler, Message,
    Recipient,
};

pub use actor::supervision::{
    ExponentialBackoffStrategy, FixedIntervalStrategy, NoIntervalStrategy, RetryStrategy,
    SupervisionStrategy,
};

pub use event::{EventEmitter, EventId, EventListener, EventNotice, Subscribe, Subscribed};
pub use system::ActorSystem;

pub use async_trait::async_trait;
