//! Timetable resolution: which rooms and slots a user's subjects map to today.
//!
//! Fetching and scraping the published timetable is behind [`TimetableSource`].

mod actor;
mod messages;
mod source;
mod table;

pub use actor::{TimetableActor, TimetableError};
pub use messages::{GetTeacherSubjects, GetTeachers, ResolveLinks, UpdateTimetable};
pub use source::{StaticSource, TimetableSource};
pub use table::{Lecture, Timetable};
