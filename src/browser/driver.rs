use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::types::BuildingTurn;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("login failed for '{0}'")]
    Login(String),

    #[error("booking page timed out")]
    Timeout,

    #[error("turn already booked")]
    AlreadyBooked,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Books single turns on the room reservation site.
#[async_trait]
pub trait BookingDriver: Send + 'static {
    /// Book `turn` for the user and return the path of the saved receipt.
    async fn book_one(
        &mut self,
        username: &str,
        password: &str,
        turn: &BuildingTurn,
    ) -> Result<PathBuf, DriverError>;

    /// Release the driver session.
    async fn close(&mut self) {}
}

/// Local driver writing one receipt file per booked turn into `dir`.
#[derive(Debug)]
pub struct ReceiptDriver {
    dir: PathBuf,
    booked: HashSet<(String, String)>,
}

impl ReceiptDriver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ReceiptDriver {
            dir: dir.into(),
            booked: HashSet::new(),
        }
    }
}

#[async_trait]
impl BookingDriver for ReceiptDriver {
    async fn book_one(
        &mut self,
        username: &str,
        password: &str,
        turn: &BuildingTurn,
    ) -> Result<PathBuf, DriverError> {
        if username.is_empty() || password.is_empty() {
            return Err(DriverError::Login(username.to_string()));
        }

        let key = (username.to_string(), turn.book_link.clone());
        if self.booked.contains(&key) {
            return Err(DriverError::AlreadyBooked);
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(anyhow::Error::from)?;
        let receipt = self.dir.join(format!("{}.txt", Uuid::new_v4().simple()));
        let body = format!(
            "user: {}\nroom: {}\ntime: {}\nlink: {}\n",
            username, turn.room, turn.trange, turn.book_link
        );
        tokio::fs::write(&receipt, body)
            .await
            .map_err(anyhow::Error::from)?;

        self.booked.insert(key);
        Ok(receipt)
    }

    async fn close(&mut self) {
        log::debug!("Forgetting {} booked turn(s)", self.booked.len());
        self.booked.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn() -> BuildingTurn {
        BuildingTurn {
            room: "A1".into(),
            trange: "09:00-11:00".parse().unwrap(),
            book_link: "https://rooms/a1".into(),
        }
    }

    #[tokio::test]
    async fn test_receipt_driver() {
        let dir = std::env::temp_dir().join(format!("poub-driver-{}", Uuid::new_v4().simple()));
        let mut driver = ReceiptDriver::new(&dir);

        assert!(matches!(
            driver.book_one("123", "", &turn()).await,
            Err(DriverError::Login(_))
        ));

        let receipt = driver.book_one("123", "secret", &turn()).await.unwrap();
        let body = tokio::fs::read_to_string(&receipt).await.unwrap();
        assert!(body.contains("room: A1"));
        assert!(body.contains("time: 09:00-11:00"));

        assert!(matches!(
            driver.book_one("123", "secret", &turn()).await,
            Err(DriverError::AlreadyBooked)
        ));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
