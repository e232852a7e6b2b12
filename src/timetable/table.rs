use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{NaiveDateTime, Weekday};

use crate::timeutils::TimeRange;
use crate::types::{BuildingTurn, Subject, normalize_teacher_name};

/// One cell of the published timetable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lecture {
    pub trange: TimeRange,
    pub name: String,
    pub teacher: String,
    pub room: String,
    /// Booking page of the room for this slot, empty when unknown.
    pub book_link: String,
}

impl Lecture {
    pub fn turn(&self) -> Option<BuildingTurn> {
        if self.book_link.is_empty() {
            return None;
        }
        Some(BuildingTurn {
            room: self.room.clone(),
            trange: self.trange,
            book_link: self.book_link.clone(),
        })
    }

    fn continues(&self, next: &Lecture) -> bool {
        self.name == next.name
            && self.room == next.room
            && self.teacher == next.teacher
            && self.trange.adjoins(&next.trange)
    }
}

/// Lectures per (normalized teacher, weekday), as published at `date`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Timetable {
    pub date: NaiveDateTime,
    data: HashMap<(String, Weekday), Vec<Lecture>>,
}

impl Timetable {
    pub fn new(date: NaiveDateTime) -> Self {
        Timetable {
            date,
            data: HashMap::new(),
        }
    }

    /// Append a lecture, merging it into the previous one when it directly continues it
    /// (same subject, room and teacher). Lectures must be pushed in time order.
    pub fn push(&mut self, day: Weekday, mut lecture: Lecture) {
        lecture.teacher = normalize_teacher_name(&lecture.teacher);
        let cells = self
            .data
            .entry((lecture.teacher.clone(), day))
            .or_default();
        match cells.last_mut() {
            Some(last) if last.continues(&lecture) => last.trange.end = lecture.trange.end,
            _ => cells.push(lecture),
        }
    }

    pub fn lectures(&self, teacher: &str, day: Weekday) -> &[Lecture] {
        self.data
            .get(&(normalize_teacher_name(teacher), day))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Lectures of the followed subjects held on `day`. Subject names match case-insensitively.
    pub fn get_lectures(&self, day: Weekday, subjects: &[Subject]) -> Vec<&Lecture> {
        subjects
            .iter()
            .flat_map(|(teacher, name)| {
                let name = name.to_lowercase();
                self.lectures(teacher, day)
                    .iter()
                    .filter(move |lecture| lecture.name.to_lowercase() == name)
            })
            .collect()
    }

    /// Subjects taught by every teacher.
    pub fn teacher_subjects(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut index: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for ((teacher, _), lectures) in &self.data {
            index
                .entry(teacher.clone())
                .or_default()
                .extend(lectures.iter().map(|lecture| lecture.name.clone()));
        }
        index
    }
}
