//! Named multi-subscriber notifications between actors.
//!
//! The publishing actor keeps an [`EventEmitter`] in its state and exposes it through
//! a `Handler<Subscribe<P>>`. Subscribers are other actors, reached through a
//! [`Recipient<EventNotice<P>>`]; on their side an [`EventListener`] maps the
//! [`EventId`] carried by each notice to a local route.
//!
//! There is no unsubscribe. Subscribing twice delivers every notice twice.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use super::actor::{Forward, Message, Recipient};

/// Opaque token naming one event channel of one emitter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EventId(Uuid);

impl EventId {
    fn new() -> Self {
        EventId(Uuid::new_v4())
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "event-{}", self.0.simple())
    }
}

/// A notification delivered to a subscriber.
#[derive(Clone, Debug)]
pub struct EventNotice<P> {
    pub id: EventId,
    pub payload: P,
}

impl<P: Send + 'static> Message for EventNotice<P> {
    type Response = ();
}

/// Ask an emitter actor to add `subscriber` to the `event` channel.
pub struct Subscribe<P: Send + 'static> {
    pub event: String,
    pub subscriber: Recipient<EventNotice<P>>,
}

impl<P: Send + 'static> Message for Subscribe<P> {
    type Response = EventId;
}

/// Tells a listener actor that a subscription went through, and how to route it.
#[derive(Clone, Debug)]
pub struct Subscribed<K> {
    pub id: EventId,
    pub route: K,
}

impl<K: Send + 'static> Message for Subscribed<K> {
    type Response = ();
}

struct Registration<P: Send + 'static> {
    id: EventId,
    subscribers: Vec<Recipient<EventNotice<P>>>,
}

/// Event channels owned by a publishing actor.
pub struct EventEmitter<P: Send + 'static> {
    registrations: HashMap<String, Registration<P>>,
}

impl<P: Send + 'static> Default for EventEmitter<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Send + 'static> EventEmitter<P> {
    pub fn new() -> Self {
        EventEmitter {
            registrations: HashMap::new(),
        }
    }

    pub fn has_listeners(&self, event: &str) -> bool {
        self.registrations
            .get(event)
            .is_some_and(|registration| !registration.subscribers.is_empty())
    }

    pub fn event_id(&self, event: &str) -> Option<EventId> {
        self.registrations.get(event).map(|registration| registration.id)
    }

    /// Add a subscriber; the channel is created on first use.
    pub fn subscribe(&mut self, event: &str, subscriber: Recipient<EventNotice<P>>) -> EventId {
        let registration = self
            .registrations
            .entry(event.to_string())
            .or_insert_with(|| Registration {
                id: EventId::new(),
                subscribers: Vec::new(),
            });
        log::debug!(
            "'{}' subscribed to '{}' ({})",
            subscriber.path(),
            event,
            registration.id
        );
        registration.subscribers.push(subscriber);
        registration.id
    }
}

impl<P: Clone + Send + 'static> EventEmitter<P> {
    /// Notify every subscriber without waiting for acknowledgment.
    ///
    /// Returns how many subscribers were notified.
    pub fn emit(&self, event: &str, payload: P) -> usize {
        let Some(registration) = self.registrations.get(event) else {
            return 0;
        };

        for subscriber in &registration.subscribers {
            let notice = EventNotice {
                id: registration.id,
                payload: payload.clone(),
            };
            if let Err(error) = subscriber.tell(notice) {
                log::warn!(
                    "Failed to notify '{}' of '{}': {}",
                    subscriber.path(),
                    event,
                    error
                );
            }
        }
        registration.subscribers.len()
    }

    /// Notify every subscriber and run `then` once all of them have handled the
    /// notice, successfully or not.
    ///
    /// `then` runs on the context of whichever subscriber finishes last, or right
    /// away when nobody is subscribed.
    pub fn emit_then<F>(&self, event: &str, payload: P, then: F) -> usize
    where
        F: FnOnce() + Send + 'static,
    {
        let subscribers = self
            .registrations
            .get(event)
            .map(|registration| (registration.id, registration.subscribers.as_slice()));

        let Some((id, subscribers)) = subscribers else {
            Countdown::new(0, then);
            return 0;
        };

        let countdown = Countdown::new(subscribers.len(), then);
        for subscriber in subscribers {
            let on_done = countdown.clone();
            let on_failed = countdown.clone();
            let path = subscriber.path().clone();
            let name = event.to_string();
            subscriber.ask_forwarding(
                EventNotice {
                    id,
                    payload: payload.clone(),
                },
                Forward::new()
                    .then(move |()| on_done.tick())
                    .on_error(move |error| {
                        log::warn!("'{}' failed to handle '{}': {}", path, name, error);
                        on_failed.tick();
                    }),
            );
        }
        subscribers.len()
    }
}

type Completion = Box<dyn FnOnce() + Send>;

/// Runs a completion once `count` ticks have been observed.
#[derive(Clone)]
struct Countdown(Arc<CountdownInner>);

struct CountdownInner {
    remaining: AtomicUsize,
    then: Mutex<Option<Completion>>,
}

impl Countdown {
    fn new<F>(count: usize, then: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let countdown = Countdown(Arc::new(CountdownInner {
            remaining: AtomicUsize::new(count),
            then: Mutex::new(Some(Box::new(then))),
        }));
        if count == 0 {
            countdown.fire();
        }
        countdown
    }

    fn tick(&self) {
        if self.0.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.fire();
        }
    }

    fn fire(&self) {
        let then = self.0.then.lock().ok().and_then(|mut slot| slot.take());
        if let Some(then) = then {
            then();
        }
    }
}

/// Routes incoming notices of a listener actor.
#[derive(Debug)]
pub struct EventListener<K> {
    routes: HashMap<EventId, K>,
}

impl<K> Default for EventListener<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> EventListener<K> {
    pub fn new() -> Self {
        EventListener {
            routes: HashMap::new(),
        }
    }

    pub fn register(&mut self, id: EventId, route: K) {
        self.routes.insert(id, route);
    }

    /// Route for a notice, `None` for ids this listener never registered.
    pub fn route(&self, id: &EventId) -> Option<&K> {
        self.routes.get(id)
    }
}
