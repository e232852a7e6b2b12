//! Actor module - core actor types and traits.

pub(crate) mod forward;
pub(crate) mod handler;
pub(crate) mod recipient;
pub(crate) mod runner;
pub(crate) mod supervision;

use async_trait::async_trait;
use thiserror::Error;

use tokio::sync::{mpsc, oneshot};

mod path;
pub use forward::Forward;
pub use path::ActorPath;
pub use recipient::Recipient;

use handler::{ActorMessage, Envelope, Reply};
use supervision::SupervisionStrategy;

use crate::actor_system::system::ActorSystem;

pub type ActorResult<T> = Result<T, ActorError>;

/// The actor context gives a running actor access to its path and the system.
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub path: ActorPath,
    pub system: ActorSystem,
}

impl ActorContext {
    /// Reference to the actor this context belongs to.
    pub async fn myself<A: Actor>(&self) -> Option<ActorRef<A>> {
        self.system.get_actor(&self.path).await
    }

    /// Create a child actor under this actor.
    pub async fn create_child<A: Actor>(&self, name: &str, actor: A) -> ActorResult<ActorRef<A>> {
        let path = self.path.clone() / name;
        self.system.create_actor_path(path, actor).await
    }

    /// Retrieve a child actor running under this actor.
    pub async fn get_child<A: Actor>(&self, name: &str) -> Option<ActorRef<A>> {
        let path = self.path.clone() / name;
        self.system.get_actor(&path).await
    }

    /// Stops the child actor and waits until its queued messages are drained.
    pub async fn stop_child(&self, name: &str) {
        let path = self.path.clone() / name;
        self.system.stop_actor(&path).await;
    }

    pub(crate) async fn restart<A>(
        &mut self,
        actor: &mut A,
        error: Option<&ActorError>,
    ) -> ActorResult<()>
    where
        A: Actor,
    {
        actor.pre_restart(self, error).await
    }
}

/// Defines what an actor will receive as its message, and with what it should respond.
///
/// Messages are moved into the target mailbox; the sender keeps nothing that the
/// handler could mutate.
pub trait Message: Send + 'static {
    /// Response an actor should give when it receives this message.
    type Response: Send + 'static;
}

/// Basic trait for actors.
#[async_trait]
pub trait Actor: Send + 'static {
    /// Defines the supervision strategy to use when `pre_start` fails.
    fn supervision_strategy() -> SupervisionStrategy {
        SupervisionStrategy::Stop
    }

    /// Override this function to perform initialization of the actor.
    async fn pre_start(&mut self, _ctx: &mut ActorContext) -> ActorResult<()> {
        Ok(())
    }

    /// Override this function to define what should happen on restart.
    async fn pre_restart(
        &mut self,
        ctx: &mut ActorContext,
        _error: Option<&ActorError>,
    ) -> ActorResult<()> {
        self.pre_start(ctx).await
    }

    /// Override this function to release resources when the actor is stopped.
    async fn post_stop(&mut self, _ctx: &mut ActorContext) {}
}

/// Defines what the actor does with a message.
///
/// An `Err` (or a panic) is a handler fault: it goes to the caller's failure path
/// and the actor keeps processing its mailbox.
#[async_trait]
pub trait Handler<M: Message>: Actor {
    async fn handle(&mut self, msg: M, ctx: &mut ActorContext) -> ActorResult<M::Response>;
}

/// A clonable actor reference.
pub struct ActorRef<A: Actor> {
    path: ActorPath,
    sender: mpsc::UnboundedSender<Envelope<A>>,
}

impl<A: Actor> Clone for ActorRef<A> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            sender: self.sender.clone(),
        }
    }
}

impl<A: Actor> ActorRef<A> {
    /// Get the path of this actor.
    pub fn path(&self) -> &ActorPath {
        &self.path
    }

    /// Fire and forget sending of messages to this actor.
    ///
    /// Handler faults for told messages are only logged.
    pub fn tell<M>(&self, msg: M) -> ActorResult<()>
    where
        M: Message,
        A: Handler<M>,
    {
        let message = ActorMessage::<M, A>::new(msg, None);
        if let Err(error) = self.sender.send(Envelope::Message(Box::new(message))) {
            log::error!("Failed to tell message to '{}'! {}", self.path, error);
            Err(ActorError::SendError(error.to_string()))
        } else {
            Ok(())
        }
    }

    /// Send a message and route the outcome to `forward` once the actor has handled it.
    ///
    /// Never waits. If the mailbox is closed the message is dropped, which rejects the
    /// forward with [`ActorError::Abandoned`].
    pub fn ask_forwarding<M>(&self, msg: M, forward: Forward<M::Response>)
    where
        M: Message,
        A: Handler<M>,
    {
        let message = ActorMessage::<M, A>::new(msg, Some(Reply::Forward(forward)));
        if self.sender.send(Envelope::Message(Box::new(message))).is_err() {
            log::warn!("Mailbox of '{}' is closed, forward abandoned", self.path);
        }
    }

    /// Send a message to an actor and wait for the response.
    pub async fn ask<M>(&self, msg: M) -> ActorResult<M::Response>
    where
        M: Message,
        A: Handler<M>,
    {
        let (response_sender, response_receiver) = oneshot::channel();
        let message = ActorMessage::<M, A>::new(msg, Some(Reply::Ask(response_sender)));
        if let Err(error) = self.sender.send(Envelope::Message(Box::new(message))) {
            log::error!("Failed to ask message to '{}'! {}", self.path, error);
            return Err(ActorError::SendError(error.to_string()));
        }
        response_receiver
            .await
            .map_err(|_| ActorError::Abandoned)?
    }

    /// Type-erased handle accepting only `M`.
    pub fn recipient<M>(&self) -> Recipient<M>
    where
        M: Message,
        A: Handler<M>,
    {
        Recipient::new(self.clone())
    }

    /// Ask the actor to stop and wait until it has.
    ///
    /// Messages queued before the stop request are still handled; anything sent
    /// afterwards is rejected. Stopping a stopped actor returns immediately.
    /// Must not be awaited from the actor's own handler.
    pub async fn stop(&self) {
        let (ack_sender, ack_receiver) = oneshot::channel();
        if self.sender.send(Envelope::Stop(ack_sender)).is_ok() {
            let _ = ack_receiver.await;
        }
    }

    /// Checks if the actor mailbox is still open.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub(crate) fn new(path: ActorPath, sender: handler::MailboxSender<A>) -> Self {
        ActorRef { path, sender }
    }
}

impl<A: Actor> std::fmt::Debug for ActorRef<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}

#[derive(Error, Debug)]
pub enum ActorError {
    #[error("Actor exists: {0}")]
    Exists(ActorPath),

    #[error("Actor creation failed: {0}")]
    CreateError(String),

    #[error("Sending message failed: {0}")]
    SendError(String),

    #[error("Message was dropped before it was handled")]
    Abandoned,

    #[error("Handler panicked: {0}")]
    Panicked(String),

    #[error("Actor runtime error: {0:#}")]
    RuntimeError(#[from] anyhow::Error),
}

impl ActorError {
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::RuntimeError(anyhow::Error::new(error))
    }

    pub(crate) fn from_panic(panic: Box<dyn std::any::Any + Send>) -> Self {
        let reason = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self::Panicked(reason)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<u32>,
        stopped: Option<Arc<Mutex<bool>>>,
    }

    struct Record(u32);

    impl Message for Record {
        type Response = usize;
    }

    struct Fail;

    impl Message for Fail {
        type Response = ();
    }

    struct Explode;

    impl Message for Explode {
        type Response = ();
    }

    struct Seen;

    impl Message for Seen {
        type Response = Vec<u32>;
    }

    /// Reads state shared with a forward callback.
    struct Peek(Arc<Mutex<Vec<usize>>>);

    impl Message for Peek {
        type Response = Vec<usize>;
    }

    #[async_trait]
    impl Actor for Recorder {
        async fn post_stop(&mut self, _ctx: &mut ActorContext) {
            if let Some(flag) = &self.stopped {
                *flag.lock().unwrap() = true;
            }
        }
    }

    #[async_trait]
    impl Handler<Record> for Recorder {
        async fn handle(&mut self, msg: Record, _ctx: &mut ActorContext) -> ActorResult<usize> {
            self.seen.push(msg.0);
            Ok(self.seen.len())
        }
    }

    #[async_trait]
    impl Handler<Fail> for Recorder {
        async fn handle(&mut self, _msg: Fail, _ctx: &mut ActorContext) -> ActorResult<()> {
            Err(anyhow::anyhow!("refused").into())
        }
    }

    #[async_trait]
    impl Handler<Explode> for Recorder {
        async fn handle(&mut self, _msg: Explode, _ctx: &mut ActorContext) -> ActorResult<()> {
            panic!("boom");
        }
    }

    #[async_trait]
    impl Handler<Seen> for Recorder {
        async fn handle(&mut self, _msg: Seen, _ctx: &mut ActorContext) -> ActorResult<Vec<u32>> {
            Ok(self.seen.clone())
        }
    }

    #[async_trait]
    impl Handler<Peek> for Recorder {
        async fn handle(&mut self, msg: Peek, _ctx: &mut ActorContext) -> ActorResult<Vec<usize>> {
            Ok(msg.0.lock().unwrap().clone())
        }
    }

    #[tokio::test]
    async fn test_tell_is_fifo() {
        let system = ActorSystem::new("test");
        let actor = system
            .create_actor("recorder", Recorder::default())
            .await
            .unwrap();

        for i in 0..100 {
            actor.tell(Record(i)).unwrap();
        }

        let seen = actor.ask(Seen).await.unwrap();
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_ask_forwarding_resolves_once() {
        let system = ActorSystem::new("test");
        let actor = system
            .create_actor("recorder", Recorder::default())
            .await
            .unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        for i in 0..3 {
            let tx = tx.clone();
            actor.ask_forwarding(
                Record(i),
                Forward::new().then(move |count| {
                    let _ = tx.send(count);
                }),
            );
        }
        drop(tx);

        let mut counts = Vec::new();
        while let Some(count) = rx.recv().await {
            counts.push(count);
        }
        assert_eq!(counts, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_handler_fault_goes_to_failure_path() {
        let system = ActorSystem::new("test");
        let actor = system
            .create_actor("recorder", Recorder::default())
            .await
            .unwrap();

        let (tx, rx) = oneshot::channel();
        actor.ask_forwarding(
            Fail,
            Forward::new()
                .then(|_| panic!("must not succeed"))
                .on_error(move |error| {
                    let _ = tx.send(error.to_string());
                }),
        );
        assert!(rx.await.unwrap().contains("refused"));

        // Actor keeps working after the fault.
        assert_eq!(actor.ask(Record(7)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_panicking_handler_does_not_kill_actor() {
        let system = ActorSystem::new("test");
        let actor = system
            .create_actor("recorder", Recorder::default())
            .await
            .unwrap();

        let error = actor.ask(Explode).await.unwrap_err();
        assert!(matches!(error, ActorError::Panicked(reason) if reason == "boom"));

        actor.tell(Explode).unwrap();
        assert_eq!(actor.ask(Record(1)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_panicking_callback_does_not_kill_actor() {
        let system = ActorSystem::new("test");
        let actor = system
            .create_actor("recorder", Recorder::default())
            .await
            .unwrap();

        actor.ask_forwarding(Record(1), Forward::new().then(|_| panic!("callback fault")));

        assert_eq!(actor.ask(Record(2)).await.unwrap(), 2);
        assert!(!actor.is_closed());
        assert!(system.get_actor::<Recorder>(actor.path()).await.is_some());
    }

    #[tokio::test]
    async fn test_callback_runs_before_next_message() {
        let system = ActorSystem::new("test");
        let actor = system
            .create_actor("recorder", Recorder::default())
            .await
            .unwrap();

        let marks = Arc::new(Mutex::new(Vec::new()));
        let recorded = marks.clone();
        actor.ask_forwarding(
            Record(5),
            Forward::new().then(move |count| recorded.lock().unwrap().push(count)),
        );

        // Queued right behind, so it only runs once the callback above returned.
        assert_eq!(actor.ask(Peek(marks)).await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_stop_drains_queue_then_rejects() {
        let system = ActorSystem::new("test");
        let stopped = Arc::new(Mutex::new(false));
        let actor = system
            .create_actor(
                "recorder",
                Recorder {
                    seen: Vec::new(),
                    stopped: Some(stopped.clone()),
                },
            )
            .await
            .unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        for i in 0..10 {
            let tx = tx.clone();
            actor.ask_forwarding(
                Record(i),
                Forward::new().then(move |n| {
                    let _ = tx.send(n);
                }),
            );
        }
        drop(tx);

        actor.stop().await;
        assert!(*stopped.lock().unwrap());
        assert!(actor.is_closed());

        let mut handled = 0;
        while rx.recv().await.is_some() {
            handled += 1;
        }
        assert_eq!(handled, 10);

        // Stop is idempotent and later sends are rejected.
        actor.stop().await;
        assert!(actor.tell(Record(99)).is_err());

        let (tx, rx) = oneshot::channel();
        actor.ask_forwarding(
            Record(100),
            Forward::new().on_error(move |error| {
                let _ = tx.send(error);
            }),
        );
        let error = tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(error, ActorError::Abandoned));
        assert!(system.get_actor::<Recorder>(actor.path()).await.is_none());
    }
}
