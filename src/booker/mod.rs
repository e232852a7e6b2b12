//! Nightly booking pass.
//!
//! `Book` walks userdb, timetable and browser through forwarded replies, so the
//! booker never waits on another actor. Each user's result is published as
//! [`BOOKED_EVENT`](crate::types::BOOKED_EVENT); receipts are removed once every
//! subscriber handled it.

mod actor;
mod messages;

use crate::actor_system::{ActorRef, Recipient};
use crate::config::PoubConfig;
use crate::timetable::UpdateTimetable;
use crate::waiter::{TaskHandle, Waiter, WaiterError};

pub use actor::{BookActor, BookerError};
pub use messages::Book;

/// Daily jobs of the booker.
#[derive(Clone, Copy, Debug)]
pub struct BookerJobs {
    pub book: TaskHandle,
    pub refresh: TaskHandle,
}

/// Register the booking pass and the timetable pre-refresh with `waiter`.
pub fn schedule(
    waiter: &mut Waiter,
    booker: &ActorRef<BookActor>,
    timetable: Recipient<UpdateTimetable>,
    config: &PoubConfig,
) -> Result<BookerJobs, WaiterError> {
    let booker = booker.clone();
    let book = waiter.add(config.book_at, move || {
        booker.tell(Book)?;
        Ok(())
    })?;

    // Warm the timetable before midnight so the pass resolves links quickly.
    let refresh = waiter.add(config.refresh_at, move || {
        timetable.tell(UpdateTimetable)?;
        Ok(())
    })?;

    Ok(BookerJobs { book, refresh })
}
