//! Booking executor: books resolved turns for one user and reports what happened.
//!
//! The reservation site itself sits behind [`BookingDriver`].

mod actor;
mod driver;

use std::collections::BTreeSet;

use crate::actor_system::Message;
use crate::types::{BookResult, BuildingTurn};

pub use actor::BrowserActor;
pub use driver::{BookingDriver, DriverError, ReceiptDriver};

/// Book every turn for the user, stopping at the first unrecoverable error.
#[derive(Clone, Debug)]
pub struct ProcessBookings {
    pub username: String,
    pub password: String,
    pub turns: BTreeSet<BuildingTurn>,
}

impl Message for ProcessBookings {
    type Response = BookResult;
}
