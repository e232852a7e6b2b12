use std::time::Duration;

use crate::actor_system::{
    Actor, ActorContext, ActorResult, ExponentialBackoffStrategy, Handler, RetryStrategy,
    async_trait,
};
use crate::browser::ProcessBookings;
use crate::browser::driver::{BookingDriver, DriverError};
use crate::types::{BookResult, BookResultKind, BookedTurn, BuildingTurn, TurnOutcome};

/// Books turns one after the other through a [`BookingDriver`].
pub struct BrowserActor<D: BookingDriver> {
    driver: D,
    attempts: usize,
    retry_interval: Duration,
}

impl<D: BookingDriver> BrowserActor<D> {
    /// `attempts` bounds the tries per turn when the site times out.
    pub fn new(driver: D, attempts: usize) -> Self {
        BrowserActor {
            driver,
            attempts: attempts.max(1),
            retry_interval: Duration::from_secs(1),
        }
    }

    async fn book_turn(
        &mut self,
        username: &str,
        password: &str,
        turn: &BuildingTurn,
    ) -> Result<TurnOutcome, DriverError> {
        let mut retry = ExponentialBackoffStrategy::with_initial_interval(
            self.attempts - 1,
            self.retry_interval,
        );
        let mut retries = 0;
        loop {
            match self.driver.book_one(username, password, turn).await {
                Ok(receipt) => return Ok(TurnOutcome::Booked(receipt)),
                Err(DriverError::AlreadyBooked) => return Ok(TurnOutcome::AlreadyBooked),
                Err(DriverError::Timeout) if retries < retry.max_retries() => {
                    retries += 1;
                    log::warn!(
                        "Timeout booking {} {}, retries left: {}",
                        turn.room,
                        turn.trange,
                        retry.max_retries() - retries
                    );
                    if let Some(wait) = retry.next_backoff() {
                        tokio::time::sleep(wait).await;
                    }
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[async_trait]
impl<D: BookingDriver> Actor for BrowserActor<D> {
    async fn post_stop(&mut self, _ctx: &mut ActorContext) {
        self.driver.close().await;
    }
}

#[async_trait]
impl<D: BookingDriver> Handler<ProcessBookings> for BrowserActor<D> {
    async fn handle(
        &mut self,
        msg: ProcessBookings,
        _ctx: &mut ActorContext,
    ) -> ActorResult<BookResult> {
        let turns: Vec<BuildingTurn> = msg.turns.into_iter().collect();
        let total = turns.len();
        let mut booked = Vec::new();

        for (i, turn) in turns.iter().enumerate() {
            log::info!("Booking {}: {} {} {}", i, turn.room, turn.trange, turn.book_link);

            let kind = match self.book_turn(&msg.username, &msg.password, turn).await {
                Ok(outcome) => {
                    if outcome == TurnOutcome::AlreadyBooked {
                        log::warn!("Already booked ({}/{})", i, total);
                    }
                    booked.push(BookedTurn {
                        turn: turn.clone(),
                        outcome,
                    });
                    continue;
                }
                Err(DriverError::Login(username)) => {
                    log::error!("Wrong login for user {}", username);
                    BookResultKind::LoginFailed
                }
                Err(DriverError::Timeout) => {
                    log::error!("Timeout ({}/{})", i, total);
                    BookResultKind::Timeout
                }
                Err(error) => {
                    log::error!("Unknown error ({}/{}): {:#}", i, total, error);
                    BookResultKind::UnknownError
                }
            };

            return Ok(BookResult {
                booked,
                remaining: turns[i..].to_vec(),
                kind,
            });
        }

        Ok(BookResult {
            booked,
            remaining: Vec::new(),
            kind: BookResultKind::Ok,
        })
    }
}
