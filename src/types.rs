use std::path::PathBuf;

use crate::timeutils::TimeRange;

/// Event the booker emits after each user's booking pass.
pub const BOOKED_EVENT: &str = "booked";

/// A followed course: (teacher, subject name).
pub type Subject = (String, String);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    /// Chat id, also the user key.
    pub tid: i64,
    pub username: Option<String>,
    pub password: Option<String>,
    pub subjects: Vec<Subject>,
}

impl User {
    pub fn new(tid: i64) -> Self {
        Self {
            tid,
            username: None,
            password: None,
            subjects: Vec::new(),
        }
    }

    pub fn is_bookable(&self) -> bool {
        self.username.is_some() && !self.subjects.is_empty()
    }
}

/// A lecture slot that can be booked in a given room.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuildingTurn {
    pub room: String,
    pub trange: TimeRange,
    pub book_link: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Booked; the receipt lives at this path until every listener saw it.
    Booked(PathBuf),
    AlreadyBooked,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookedTurn {
    pub turn: BuildingTurn,
    pub outcome: TurnOutcome,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BookResultKind {
    Ok,
    LoginFailed,
    Timeout,
    UnknownError,
}

impl std::fmt::Display for BookResultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BookResultKind::Ok => "ok",
            BookResultKind::LoginFailed => "Login failed",
            BookResultKind::Timeout => "Timeout",
            BookResultKind::UnknownError => "Unknown",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookResult {
    pub booked: Vec<BookedTurn>,
    /// Turns not attempted because the pass stopped early.
    pub remaining: Vec<BuildingTurn>,
    pub kind: BookResultKind,
}

impl BookResult {
    pub fn receipts(&self) -> impl Iterator<Item = &PathBuf> {
        self.booked.iter().filter_map(|booked| match &booked.outcome {
            TurnOutcome::Booked(path) => Some(path),
            TurnOutcome::AlreadyBooked => None,
        })
    }
}

/// Payload of [`BOOKED_EVENT`].
#[derive(Clone, Debug)]
pub struct Booked {
    pub user: User,
    pub result: BookResult,
}

/// Teacher names are compared as sorted lowercase words, so "Rossi Mario"
/// matches "mario rossi".
pub fn normalize_teacher_name(name: &str) -> String {
    let mut words: Vec<String> = name.split_whitespace().map(str::to_lowercase).collect();
    words.sort();
    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_teacher_name() {
        assert_eq!(normalize_teacher_name("Rossi  Mario"), "mario rossi");
        assert_eq!(normalize_teacher_name("mario ROSSI"), "mario rossi");
    }

    #[test]
    fn test_bookable() {
        let mut user = User::new(1);
        assert!(!user.is_bookable());
        user.username = Some("123".into());
        assert!(!user.is_bookable());
        user.subjects.push(("rossi".into(), "analisi".into()));
        assert!(user.is_bookable());
    }
}
