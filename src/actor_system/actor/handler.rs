//! Actor message envelopes and mailbox plumbing.

use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};

use super::{Actor, ActorContext, ActorError, ActorResult, Forward, Handler, Message};

#[async_trait]
pub(crate) trait MessageHandler<A: Actor>: Send {
    async fn handle(self: Box<Self>, actor: &mut A, ctx: &mut ActorContext);
}

/// Where the outcome of a message goes.
pub(crate) enum Reply<R> {
    Ask(oneshot::Sender<ActorResult<R>>),
    Forward(Forward<R>),
}

pub(crate) struct ActorMessage<M, A>
where
    M: Message,
    A: Handler<M>,
{
    payload: M,
    reply: Option<Reply<M::Response>>,
    _phantom_actor: PhantomData<fn(A)>,
}

#[async_trait]
impl<M, A> MessageHandler<A> for ActorMessage<M, A>
where
    M: Message,
    A: Handler<M>,
{
    async fn handle(self: Box<Self>, actor: &mut A, ctx: &mut ActorContext) {
        let ActorMessage { payload, reply, .. } = *self;

        let result = AssertUnwindSafe(actor.handle(payload, ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ActorError::from_panic(panic)));

        // Forward callbacks run here, on this actor's task.
        let path = &ctx.path;
        let dispatched = catch_unwind(AssertUnwindSafe(|| match reply {
            Some(Reply::Ask(rsvp)) => rsvp.send(result).unwrap_or_else(|_failed| {
                log::error!("Failed to send back response!");
            }),
            Some(Reply::Forward(forward)) => forward.settle(result),
            None => {
                if let Err(error) = result {
                    log::error!("Actor '{}' failed to handle message: {}", path, error);
                }
            }
        }));
        if let Err(panic) = dispatched {
            log::error!(
                "Actor '{}' reply callback failed: {}",
                path,
                ActorError::from_panic(panic)
            );
        }
    }
}

impl<M, A> ActorMessage<M, A>
where
    M: Message,
    A: Handler<M>,
{
    pub fn new(msg: M, reply: Option<Reply<M::Response>>) -> Self {
        ActorMessage {
            payload: msg,
            reply,
            _phantom_actor: PhantomData,
        }
    }
}

pub(crate) type BoxedMessageHandler<A> = Box<dyn MessageHandler<A>>;

/// Mailbox entry: either a message or a request to stop after the queue ahead of it.
pub(crate) enum Envelope<A: Actor> {
    Message(BoxedMessageHandler<A>),
    Stop(oneshot::Sender<()>),
}

pub(crate) type MailboxReceiver<A> = mpsc::UnboundedReceiver<Envelope<A>>;
pub(crate) type MailboxSender<A> = mpsc::UnboundedSender<Envelope<A>>;

pub(crate) fn mailbox<A: Actor>() -> (MailboxSender<A>, MailboxReceiver<A>) {
    mpsc::unbounded_channel()
}
