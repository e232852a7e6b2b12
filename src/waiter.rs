//! Cyclic daily scheduler.
//!
//! Tasks are registered with a time of day while the waiter is open. Locking computes
//! each task's next fire time, sorts them, and from then on the set is fixed: the run
//! loop fires whatever is due, reschedules it for its next occurrence and sleeps until
//! the next entry, never longer than `max_wait` so wall clock jumps are noticed.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime, TimeDelta};
use thiserror::Error;

/// Default cap on a single sleep of the run loop.
pub const MAX_WAIT: Duration = Duration::from_secs(10 * 60);

type Task = Box<dyn FnMut() -> anyhow::Result<()> + Send>;

/// Identifies a task registered with [`Waiter::add`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WaiterError {
    #[error("Cannot add tasks after the waiter is locked")]
    AddAfterLock,

    #[error("Cannot remove tasks after the waiter is locked")]
    RemoveAfterLock,

    #[error("Cannot find task {0:?}")]
    NotFound(TaskHandle),

    #[error("Waiter is already locked")]
    AlreadyLocked,
}

struct Entry {
    handle: TaskHandle,
    time: NaiveTime,
    next: NaiveDateTime,
    task: Task,
}

pub struct Waiter {
    entries: Vec<Entry>,
    /// `None` while open; once locked, index of the next entry due.
    cursor: Option<usize>,
    next_handle: u64,
    max_wait: Duration,
}

impl Default for Waiter {
    fn default() -> Self {
        Self::new()
    }
}

impl Waiter {
    pub fn new() -> Self {
        Self::with_max_wait(MAX_WAIT)
    }

    pub fn with_max_wait(max_wait: Duration) -> Self {
        Waiter {
            entries: Vec::new(),
            cursor: None,
            next_handle: 0,
            max_wait,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register `task` to run every day at `time`.
    pub fn add<F>(&mut self, time: NaiveTime, task: F) -> Result<TaskHandle, WaiterError>
    where
        F: FnMut() -> anyhow::Result<()> + Send + 'static,
    {
        if self.is_locked() {
            return Err(WaiterError::AddAfterLock);
        }

        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;
        self.entries.push(Entry {
            handle,
            time,
            next: NaiveDateTime::MIN,
            task: Box::new(task),
        });
        log::debug!("Task {:?} registered for {}", handle, time);
        Ok(handle)
    }

    pub fn remove(&mut self, handle: TaskHandle) -> Result<(), WaiterError> {
        if self.is_locked() {
            return Err(WaiterError::RemoveAfterLock);
        }

        let index = self
            .entries
            .iter()
            .position(|entry| entry.handle == handle)
            .ok_or(WaiterError::NotFound(handle))?;
        self.entries.remove(index);
        Ok(())
    }

    /// Next fire time of a task, known once the waiter is locked.
    pub fn next_fire(&self, handle: TaskHandle) -> Option<NaiveDateTime> {
        self.cursor?;
        self.entries
            .iter()
            .find(|entry| entry.handle == handle)
            .map(|entry| entry.next)
    }

    /// Tasks in firing order, starting at the next one due.
    pub fn upcoming(&self) -> Vec<(TaskHandle, NaiveDateTime)> {
        let Some(cursor) = self.cursor else {
            return Vec::new();
        };
        let (head, tail) = self.entries.split_at(cursor);
        tail.iter()
            .chain(head)
            .map(|entry| (entry.handle, entry.next))
            .collect()
    }

    pub fn lock(&mut self) -> Result<(), WaiterError> {
        self.lock_at(now())
    }

    /// Close the task set and schedule every task relative to `now`.
    ///
    /// A time of day already past today is scheduled for tomorrow.
    pub fn lock_at(&mut self, now: NaiveDateTime) -> Result<(), WaiterError> {
        if self.is_locked() {
            return Err(WaiterError::AlreadyLocked);
        }

        for entry in &mut self.entries {
            entry.next = occurrence(entry.time, now, false);
        }
        self.entries.sort_by_key(|entry| entry.next);
        self.cursor = Some(0);

        if self.entries.is_empty() {
            log::warn!("Waiter locked without any task");
        }
        for (handle, next) in self.upcoming() {
            log::info!("Task {:?} next run at {}", handle, next);
        }
        Ok(())
    }

    /// Fire every entry due at `now` and return how long to sleep afterwards.
    pub fn run_pending_at(&mut self, now: NaiveDateTime) -> Duration {
        self.fire_due(now);
        self.wait_from(now)
    }

    /// Like [`run_pending_at`](Self::run_pending_at) with the local wall clock,
    /// re-reading it until a pass fires nothing.
    pub fn run_pending(&mut self) -> Duration {
        loop {
            let now = now();
            if self.fire_due(now) == 0 {
                return self.wait_from(now);
            }
        }
    }

    /// Lock, then run the daily cycle forever.
    pub async fn lock_and_run(&mut self) -> Result<(), WaiterError> {
        self.lock()?;
        loop {
            let wait = self.run_pending();
            log::debug!("Waiter sleeping for {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }

    fn fire_due(&mut self, now: NaiveDateTime) -> usize {
        let Some(mut cursor) = self.cursor else {
            return 0;
        };

        let len = self.entries.len();
        let mut fired = 0;
        while fired < len && self.entries[cursor].next <= now {
            let entry = &mut self.entries[cursor];
            log::info!("Executing task {:?} due at {}", entry.handle, entry.next);

            match catch_unwind(AssertUnwindSafe(|| (entry.task)())) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    log::error!("Error executing task {:?}: {:#}", entry.handle, error)
                }
                Err(_) => log::error!("Task {:?} panicked", entry.handle),
            }

            entry.next = occurrence(entry.time, now, true);
            cursor = (cursor + 1) % len;
            fired += 1;
        }
        self.cursor = Some(cursor);

        if fired > 0 {
            self.realign();
        }
        fired
    }

    /// Restore "cursor points at the earliest entry" after a wall clock jump.
    fn realign(&mut self) {
        let Some(cursor) = self.cursor else {
            return;
        };
        let in_order = self
            .upcoming()
            .windows(2)
            .all(|pair| pair[0].1 <= pair[1].1);
        if !in_order {
            log::warn!("Schedule out of order, clock probably jumped; resorting");
            self.entries.rotate_left(cursor);
            self.entries.sort_by_key(|entry| entry.next);
            self.cursor = Some(0);
        }
    }

    fn wait_from(&self, now: NaiveDateTime) -> Duration {
        let Some(entry) = self.cursor.and_then(|cursor| self.entries.get(cursor)) else {
            return self.max_wait;
        };
        (entry.next - now)
            .to_std()
            .unwrap_or(Duration::ZERO)
            .min(self.max_wait)
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Today's `time` if it is still ahead of `now` (or equal, unless `strict`),
/// otherwise tomorrow's.
fn occurrence(time: NaiveTime, now: NaiveDateTime, strict: bool) -> NaiveDateTime {
    let today = now.date().and_time(time);
    let passed = if strict { today <= now } else { today < now };
    if passed {
        today + TimeDelta::days(1)
    } else {
        today
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::NaiveDate;

    use super::*;

    fn at(day: u32, h: u32, m: u32, s: u32, micro: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_micro_opt(h, m, s, micro)
            .unwrap()
    }

    fn time(h: u32, m: u32, s: u32, micro: u32) -> NaiveTime {
        NaiveTime::from_hms_micro_opt(h, m, s, micro).unwrap()
    }

    fn recorder(
        log: &Arc<Mutex<Vec<&'static str>>>,
        name: &'static str,
    ) -> impl FnMut() -> anyhow::Result<()> + Send + 'static {
        let log = log.clone();
        move || {
            log.lock().unwrap().push(name);
            Ok(())
        }
    }

    #[test]
    fn test_lock_orders_by_next_fire() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut waiter = Waiter::new();
        let refresh = waiter.add(time(23, 50, 0, 0), recorder(&log, "refresh")).unwrap();
        let book = waiter.add(time(0, 0, 0, 10), recorder(&log, "book")).unwrap();

        waiter.lock_at(at(10, 23, 51, 0, 0)).unwrap();

        assert_eq!(
            waiter.upcoming(),
            vec![(book, at(11, 0, 0, 0, 10)), (refresh, at(11, 23, 50, 0, 0))]
        );
    }

    #[test]
    fn test_lock_before_midnight_keeps_today() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut waiter = Waiter::new();
        let refresh = waiter.add(time(23, 50, 0, 0), recorder(&log, "refresh")).unwrap();
        let book = waiter.add(time(0, 0, 0, 10), recorder(&log, "book")).unwrap();

        waiter.lock_at(at(10, 12, 0, 0, 0)).unwrap();

        assert_eq!(waiter.next_fire(refresh), Some(at(10, 23, 50, 0, 0)));
        assert_eq!(waiter.next_fire(book), Some(at(11, 0, 0, 0, 10)));
        assert_eq!(waiter.upcoming()[0].0, refresh);
    }

    #[test]
    fn test_fires_and_reschedules_daily() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut waiter = Waiter::new();
        let refresh = waiter.add(time(23, 50, 0, 0), recorder(&log, "refresh")).unwrap();
        let book = waiter.add(time(0, 0, 0, 10), recorder(&log, "book")).unwrap();
        waiter.lock_at(at(10, 23, 0, 0, 0)).unwrap();

        let wait = waiter.run_pending_at(at(10, 23, 0, 0, 0));
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(wait, MAX_WAIT);

        let wait = waiter.run_pending_at(at(10, 23, 50, 0, 0));
        assert_eq!(*log.lock().unwrap(), vec!["refresh"]);
        assert_eq!(wait, Duration::from_secs(600));
        assert_eq!(waiter.next_fire(refresh), Some(at(11, 23, 50, 0, 0)));

        let wait = waiter.run_pending_at(at(10, 23, 59, 59, 0));
        assert_eq!(wait, Duration::from_micros(1_000_010));

        waiter.run_pending_at(at(11, 0, 0, 0, 10));
        assert_eq!(*log.lock().unwrap(), vec!["refresh", "book"]);
        assert_eq!(waiter.next_fire(book), Some(at(12, 0, 0, 0, 10)));

        // Nothing more until tonight.
        waiter.run_pending_at(at(11, 12, 0, 0, 0));
        assert_eq!(log.lock().unwrap().len(), 2);
        waiter.run_pending_at(at(11, 23, 50, 0, 1));
        assert_eq!(*log.lock().unwrap(), vec!["refresh", "book", "refresh"]);
    }

    #[test]
    fn test_failing_task_still_reschedules_and_others_fire() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut waiter = Waiter::new();
        let failing = waiter
            .add(time(8, 0, 0, 0), || Err(anyhow::anyhow!("scraper down")))
            .unwrap();
        let panicking = waiter
            .add(time(8, 0, 0, 1), || panic!("bad task"))
            .unwrap();
        waiter.add(time(8, 0, 0, 2), recorder(&log, "after")).unwrap();
        waiter.lock_at(at(10, 7, 0, 0, 0)).unwrap();

        waiter.run_pending_at(at(10, 8, 0, 1, 0));

        assert_eq!(*log.lock().unwrap(), vec!["after"]);
        assert_eq!(waiter.next_fire(failing), Some(at(11, 8, 0, 0, 0)));
        assert_eq!(waiter.next_fire(panicking), Some(at(11, 8, 0, 0, 1)));
    }

    #[test]
    fn test_remove_before_lock_keeps_other_entries() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut waiter = Waiter::new();
        let first = waiter.add(time(1, 0, 0, 0), recorder(&log, "first")).unwrap();
        let second = waiter.add(time(2, 0, 0, 0), recorder(&log, "second")).unwrap();
        let third = waiter.add(time(3, 0, 0, 0), recorder(&log, "third")).unwrap();

        waiter.remove(first).unwrap();
        assert_eq!(waiter.remove(first), Err(WaiterError::NotFound(first)));
        waiter.lock_at(at(10, 0, 30, 0, 0)).unwrap();

        assert_eq!(
            waiter.upcoming(),
            vec![(second, at(10, 2, 0, 0, 0)), (third, at(10, 3, 0, 0, 0))]
        );
    }

    #[test]
    fn test_add_and_remove_after_lock_fail() {
        let mut waiter = Waiter::new();
        let handle = waiter.add(time(1, 0, 0, 0), || Ok(())).unwrap();
        waiter.lock_at(at(10, 0, 0, 0, 0)).unwrap();

        assert_eq!(waiter.remove(handle), Err(WaiterError::RemoveAfterLock));
        assert_eq!(
            waiter.add(time(2, 0, 0, 0), || Ok(())),
            Err(WaiterError::AddAfterLock)
        );
        assert_eq!(
            waiter.lock_at(at(10, 0, 0, 0, 0)),
            Err(WaiterError::AlreadyLocked)
        );
    }

    #[test]
    fn test_clock_jump_realigns_cursor() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut waiter = Waiter::new();
        waiter.add(time(1, 0, 0, 0), recorder(&log, "a")).unwrap();
        waiter.add(time(5, 0, 0, 0), recorder(&log, "b")).unwrap();
        let c = waiter.add(time(10, 0, 0, 0), recorder(&log, "c")).unwrap();
        waiter.lock_at(at(10, 0, 0, 0, 0)).unwrap();

        // Clock jumps three days ahead to 06:00.
        waiter.run_pending_at(at(13, 6, 0, 0, 0));
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);

        assert_eq!(waiter.upcoming()[0], (c, at(13, 10, 0, 0, 0)));
        waiter.run_pending_at(at(13, 10, 0, 0, 0));
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c", "c"]);
    }

    #[test]
    fn test_empty_waiter_sleeps_max() {
        let mut waiter = Waiter::with_max_wait(Duration::from_secs(5));
        waiter.lock_at(at(10, 0, 0, 0, 0)).unwrap();
        assert_eq!(waiter.run_pending_at(at(10, 0, 0, 0, 0)), Duration::from_secs(5));
    }
}
