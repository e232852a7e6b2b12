use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::actor_system::{
    Actor, ActorContext, ActorError, ActorResult, FixedIntervalStrategy, Handler,
    SupervisionStrategy, async_trait,
};
use crate::timetable::messages::{GetTeacherSubjects, GetTeachers, ResolveLinks, UpdateTimetable};
use crate::timetable::{Timetable, TimetableSource};
use crate::types::{BuildingTurn, normalize_teacher_name};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimetableError {
    #[error("no timetable loaded yet")]
    NotLoaded,

    #[error("unknown teacher '{0}'")]
    UnknownTeacher(String),
}

/// Keeps the latest published timetable and resolves subjects to bookable turns.
pub struct TimetableActor<S: TimetableSource> {
    source: S,
    timetable: Option<Timetable>,
    teacher_subjects: BTreeMap<String, BTreeSet<String>>,
    last_update: Option<Instant>,
    stale_after: Duration,
}

impl<S: TimetableSource> TimetableActor<S> {
    pub fn new(source: S, stale_after: Duration) -> Self {
        TimetableActor {
            source,
            timetable: None,
            teacher_subjects: BTreeMap::new(),
            last_update: None,
            stale_after,
        }
    }

    async fn refresh(&mut self) -> anyhow::Result<()> {
        let since = self.timetable.as_ref().map(|timetable| timetable.date);
        let fetched = self.source.fetch(since).await?;
        self.last_update = Some(Instant::now());

        if let Some(timetable) = fetched {
            log::info!("Loaded timetable published at {}", timetable.date);
            self.teacher_subjects = timetable.teacher_subjects();
            self.timetable = Some(timetable);
        } else {
            log::debug!("Timetable unchanged");
        }
        Ok(())
    }

    fn is_stale(&self) -> bool {
        self.last_update
            .is_none_or(|updated| updated.elapsed() >= self.stale_after)
    }

    fn loaded(&self) -> ActorResult<&Timetable> {
        self.timetable
            .as_ref()
            .ok_or_else(|| ActorError::new(TimetableError::NotLoaded))
    }
}

#[async_trait]
impl<S: TimetableSource> Actor for TimetableActor<S> {
    fn supervision_strategy() -> SupervisionStrategy {
        SupervisionStrategy::Retry(Box::new(FixedIntervalStrategy::new(
            5,
            Duration::from_secs(10),
        )))
    }

    async fn pre_start(&mut self, _ctx: &mut ActorContext) -> ActorResult<()> {
        self.refresh().await?;
        Ok(())
    }
}

#[async_trait]
impl<S: TimetableSource> Handler<UpdateTimetable> for TimetableActor<S> {
    async fn handle(&mut self, _msg: UpdateTimetable, _ctx: &mut ActorContext) -> ActorResult<()> {
        self.refresh().await?;
        Ok(())
    }
}

#[async_trait]
impl<S: TimetableSource> Handler<ResolveLinks> for TimetableActor<S> {
    async fn handle(
        &mut self,
        msg: ResolveLinks,
        _ctx: &mut ActorContext,
    ) -> ActorResult<BTreeSet<BuildingTurn>> {
        if self.is_stale() {
            if let Err(error) = self.refresh().await {
                log::warn!("Timetable refresh failed, using the last one: {error:#}");
            }
        }

        let timetable = self.loaded()?;
        let mut turns = BTreeSet::new();
        for lecture in timetable.get_lectures(msg.day, &msg.lectures) {
            match lecture.turn() {
                Some(turn) => {
                    turns.insert(turn);
                }
                None => log::error!(
                    "No booking link for '{}' in {} at {}",
                    lecture.name,
                    lecture.room,
                    lecture.trange
                ),
            }
        }
        Ok(turns)
    }
}

#[async_trait]
impl<S: TimetableSource> Handler<GetTeachers> for TimetableActor<S> {
    async fn handle(
        &mut self,
        _msg: GetTeachers,
        _ctx: &mut ActorContext,
    ) -> ActorResult<BTreeSet<String>> {
        Ok(self.teacher_subjects.keys().cloned().collect())
    }
}

#[async_trait]
impl<S: TimetableSource> Handler<GetTeacherSubjects> for TimetableActor<S> {
    async fn handle(
        &mut self,
        msg: GetTeacherSubjects,
        _ctx: &mut ActorContext,
    ) -> ActorResult<BTreeSet<String>> {
        self.teacher_subjects
            .get(&normalize_teacher_name(&msg.teacher))
            .cloned()
            .ok_or_else(|| ActorError::new(TimetableError::UnknownTeacher(msg.teacher)))
    }
}
