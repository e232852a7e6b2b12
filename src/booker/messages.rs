use std::collections::BTreeSet;

use crate::actor_system::Message;
use crate::types::{BookResult, BuildingTurn, User};

/// Run the booking pass for every bookable user.
#[derive(Clone, Debug)]
pub struct Book;

impl Message for Book {
    type Response = ();
}

#[derive(Clone, Debug)]
pub struct BookUsers {
    pub users: Vec<User>,
}

impl Message for BookUsers {
    type Response = ();
}

#[derive(Clone, Debug)]
pub struct OnLinks {
    pub user: User,
    pub turns: BTreeSet<BuildingTurn>,
}

impl Message for OnLinks {
    type Response = ();
}

#[derive(Clone, Debug)]
pub struct OnBooked {
    pub user: User,
    pub result: BookResult,
}

impl Message for OnBooked {
    type Response = ();
}
