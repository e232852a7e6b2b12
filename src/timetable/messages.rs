use std::collections::BTreeSet;

use chrono::Weekday;

use crate::actor_system::Message;
use crate::types::{BuildingTurn, Subject};

/// Fetch the published timetable if it changed.
#[derive(Clone, Debug)]
pub struct UpdateTimetable;

impl Message for UpdateTimetable {
    type Response = ();
}

/// Bookable turns of `lectures` on `day`.
#[derive(Clone, Debug)]
pub struct ResolveLinks {
    pub lectures: Vec<Subject>,
    pub day: Weekday,
}

impl Message for ResolveLinks {
    type Response = BTreeSet<BuildingTurn>;
}

#[derive(Clone, Debug)]
pub struct GetTeachers;

impl Message for GetTeachers {
    type Response = BTreeSet<String>;
}

#[derive(Clone, Debug)]
pub struct GetTeacherSubjects {
    pub teacher: String,
}

impl Message for GetTeacherSubjects {
    type Response = BTreeSet<String>;
}
