use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::{Datelike, Local};
use thiserror::Error;

use crate::actor_system::{
    Actor, ActorContext, ActorError, ActorRef, ActorResult, EventEmitter, EventId, Forward,
    Handler, Message, Recipient, Subscribe, async_trait,
};
use crate::booker::messages::{Book, BookUsers, OnBooked, OnLinks};
use crate::browser::ProcessBookings;
use crate::timetable::ResolveLinks;
use crate::types::{BOOKED_EVENT, Booked};
use crate::userdb::GetBookableUsers;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BookerError {
    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    #[error("booker is not running")]
    NotRunning,
}

/// Drives the nightly booking pass and publishes [`BOOKED_EVENT`] per user.
pub struct BookActor {
    events: EventEmitter<Booked>,
    userdb: Recipient<GetBookableUsers>,
    timetable: Recipient<ResolveLinks>,
    browser: Recipient<ProcessBookings>,
    myself: Option<ActorRef<BookActor>>,
}

impl BookActor {
    pub fn new(
        userdb: Recipient<GetBookableUsers>,
        timetable: Recipient<ResolveLinks>,
        browser: Recipient<ProcessBookings>,
    ) -> Self {
        BookActor {
            events: EventEmitter::new(),
            userdb,
            timetable,
            browser,
            myself: None,
        }
    }

    fn myself(&self) -> ActorResult<ActorRef<BookActor>> {
        self.myself
            .clone()
            .ok_or_else(|| ActorError::new(BookerError::NotRunning))
    }
}

/// Forward whose response is told back to `target` as a new message.
fn tell_back<T, M, F>(target: ActorRef<BookActor>, wrap: F) -> Forward<T>
where
    T: Send + 'static,
    M: Message,
    BookActor: Handler<M>,
    F: FnOnce(T) -> M + Send + 'static,
{
    Forward::new().then(move |response| {
        let _ = target.tell(wrap(response));
    })
}

fn remove_receipts(receipts: Vec<PathBuf>) {
    for receipt in receipts {
        match std::fs::remove_file(&receipt) {
            Ok(()) => log::debug!("Removed receipt {}", receipt.display()),
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => log::warn!("Cannot remove receipt {}: {}", receipt.display(), error),
        }
    }
}

#[async_trait]
impl Actor for BookActor {
    async fn pre_start(&mut self, ctx: &mut ActorContext) -> ActorResult<()> {
        self.myself = ctx.myself().await;
        if self.myself.is_none() {
            return Err(ActorError::new(BookerError::NotRunning));
        }
        Ok(())
    }
}

#[async_trait]
impl Handler<Subscribe<Booked>> for BookActor {
    async fn handle(
        &mut self,
        msg: Subscribe<Booked>,
        _ctx: &mut ActorContext,
    ) -> ActorResult<EventId> {
        if msg.event != BOOKED_EVENT {
            return Err(ActorError::new(BookerError::UnknownEvent(msg.event)));
        }
        Ok(self.events.subscribe(&msg.event, msg.subscriber))
    }
}

#[async_trait]
impl Handler<Book> for BookActor {
    async fn handle(&mut self, _msg: Book, _ctx: &mut ActorContext) -> ActorResult<()> {
        log::info!("Booking started...");
        let myself = self.myself()?;
        self.userdb.ask_forwarding(
            GetBookableUsers,
            tell_back(myself, |users| BookUsers { users }).on_error(|error| {
                log::error!("Cannot list bookable users: {}", error);
            }),
        );
        Ok(())
    }
}

#[async_trait]
impl Handler<BookUsers> for BookActor {
    async fn handle(&mut self, msg: BookUsers, _ctx: &mut ActorContext) -> ActorResult<()> {
        log::info!("Booking {} users", msg.users.len());
        let myself = self.myself()?;
        let day = Local::now().weekday();

        for user in msg.users {
            let lectures = user.subjects.clone();
            let tid = user.tid;
            self.timetable.ask_forwarding(
                ResolveLinks { lectures, day },
                tell_back(myself.clone(), move |turns| OnLinks { user, turns }).on_error(
                    move |error| log::error!("Cannot resolve links for user {}: {}", tid, error),
                ),
            );
        }
        Ok(())
    }
}

#[async_trait]
impl Handler<OnLinks> for BookActor {
    async fn handle(&mut self, msg: OnLinks, _ctx: &mut ActorContext) -> ActorResult<()> {
        let OnLinks { user, turns } = msg;
        let username = user.username.clone().unwrap_or_default();
        if turns.is_empty() {
            log::info!("Nothing to book today for {}", username);
            return Ok(());
        }

        let listing: Vec<String> = turns
            .iter()
            .map(|turn| format!("{} ({})", turn.room, turn.trange))
            .collect();
        log::info!("Booking: {} for {}", listing.join(", "), username);

        let password = user.password.clone().unwrap_or_default();
        let tid = user.tid;
        self.browser.ask_forwarding(
            ProcessBookings {
                username,
                password,
                turns,
            },
            tell_back(self.myself()?, move |result| OnBooked { user, result }).on_error(
                move |error| log::error!("Booking failed for user {}: {}", tid, error),
            ),
        );
        Ok(())
    }
}

#[async_trait]
impl Handler<OnBooked> for BookActor {
    async fn handle(&mut self, msg: OnBooked, _ctx: &mut ActorContext) -> ActorResult<()> {
        log::info!(
            "Booking result for {}: {} ({} booked, {} remaining)",
            msg.user.tid,
            msg.result.kind,
            msg.result.booked.len(),
            msg.result.remaining.len()
        );

        let receipts: Vec<PathBuf> = msg.result.receipts().cloned().collect();
        let payload = Booked {
            user: msg.user,
            result: msg.result,
        };
        self.events
            .emit_then(BOOKED_EVENT, payload, move || remove_receipts(receipts));
        Ok(())
    }
}
