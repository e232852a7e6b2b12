use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::timetable::Timetable;

/// Where published timetables come from.
#[async_trait]
pub trait TimetableSource: Send + 'static {
    /// The published timetable, or `None` when it is not newer than `since`.
    async fn fetch(&mut self, since: Option<NaiveDateTime>) -> anyhow::Result<Option<Timetable>>;
}

/// Serves a fixed timetable; stands in for the scraper.
#[derive(Debug)]
pub struct StaticSource {
    timetable: Timetable,
}

impl StaticSource {
    pub fn new(timetable: Timetable) -> Self {
        StaticSource { timetable }
    }
}

#[async_trait]
impl TimetableSource for StaticSource {
    async fn fetch(&mut self, since: Option<NaiveDateTime>) -> anyhow::Result<Option<Timetable>> {
        match since {
            Some(since) if self.timetable.date <= since => Ok(None),
            _ => Ok(Some(self.timetable.clone())),
        }
    }
}
