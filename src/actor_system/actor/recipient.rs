//! Type-erased actor references accepting a single message type.

use std::sync::Arc;

use super::{Actor, ActorPath, ActorRef, ActorResult, Forward, Handler, Message};

trait MessageSink<M: Message>: Send + Sync {
    fn tell(&self, msg: M) -> ActorResult<()>;
    fn ask_forwarding(&self, msg: M, forward: Forward<M::Response>);
    fn path(&self) -> &ActorPath;
}

impl<M, A> MessageSink<M> for ActorRef<A>
where
    M: Message,
    A: Actor + Handler<M>,
{
    fn tell(&self, msg: M) -> ActorResult<()> {
        ActorRef::tell(self, msg)
    }

    fn ask_forwarding(&self, msg: M, forward: Forward<M::Response>) {
        ActorRef::ask_forwarding(self, msg, forward)
    }

    fn path(&self) -> &ActorPath {
        ActorRef::path(self)
    }
}

/// Any actor able to handle `M`, whatever its concrete type.
pub struct Recipient<M: Message> {
    inner: Arc<dyn MessageSink<M>>,
}

impl<M: Message> Recipient<M> {
    pub(crate) fn new<A>(actor: ActorRef<A>) -> Self
    where
        A: Handler<M>,
    {
        Recipient {
            inner: Arc::new(actor),
        }
    }

    pub fn tell(&self, msg: M) -> ActorResult<()> {
        self.inner.tell(msg)
    }

    pub fn ask_forwarding(&self, msg: M, forward: Forward<M::Response>) {
        self.inner.ask_forwarding(msg, forward)
    }

    pub fn path(&self) -> &ActorPath {
        self.inner.path()
    }
}

impl<M: Message> Clone for Recipient<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<M: Message> std::fmt::Debug for Recipient<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Recipient({})", self.path())
    }
}
