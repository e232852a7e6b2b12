//! Forwarding futures - reply callbacks instead of waiting.

use super::{ActorError, ActorResult};

type Then<T> = Box<dyn FnOnce(T) + Send>;
type OnError = Box<dyn FnOnce(ActorError) + Send>;

/// A one-shot completion handle that hands the outcome of a message to callbacks.
///
/// The callbacks run synchronously on whatever settles the forward; for
/// [`ActorRef::ask_forwarding`](super::ActorRef::ask_forwarding) that is the target
/// actor's runner, right after its handler returned. Settling consumes the forward,
/// so a forward settles at most once. A forward dropped unsettled, for example
/// because the target mailbox was closed, rejects itself with
/// [`ActorError::Abandoned`], so it settles exactly once.
///
/// Without an `on_error` callback a rejection is logged.
#[must_use = "a forward only settles once handed to a send"]
pub struct Forward<T> {
    then: Option<Then<T>>,
    on_error: Option<OnError>,
    settled: bool,
}

impl<T> Default for Forward<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Forward<T> {
    pub fn new() -> Self {
        Forward {
            then: None,
            on_error: None,
            settled: false,
        }
    }

    /// Callback invoked with the response.
    pub fn then<F>(mut self, then: F) -> Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.then = Some(Box::new(then));
        self
    }

    /// Callback invoked with the handler fault.
    pub fn on_error<F>(mut self, on_error: F) -> Self
    where
        F: FnOnce(ActorError) + Send + 'static,
    {
        self.on_error = Some(Box::new(on_error));
        self
    }

    pub fn resolve(mut self, value: T) {
        self.settled = true;
        if let Some(then) = self.then.take() {
            then(value);
        }
    }

    pub fn reject(mut self, error: ActorError) {
        self.settled = true;
        match self.on_error.take() {
            Some(on_error) => on_error(error),
            None => log::error!("Error while forwarding! {error}"),
        }
    }

    pub fn settle(self, result: ActorResult<T>) {
        match result {
            Ok(value) => self.resolve(value),
            Err(error) => self.reject(error),
        }
    }
}

impl<T> Drop for Forward<T> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.settled = true;
        match self.on_error.take() {
            Some(on_error) => on_error(ActorError::Abandoned),
            None => log::warn!("Forward dropped before the message was handled"),
        }
    }
}
