//! Tells users what the nightly pass did for them.
//!
//! Notifications are queued on an outbox channel; whoever drains it delivers them
//! (the binary just logs them).

use std::path::Path;

use tokio::sync::mpsc;

use crate::actor_system::{
    Actor, ActorContext, ActorError, ActorResult, EventListener, EventNotice, Forward, Handler,
    Recipient, Subscribe, Subscribed, async_trait,
};
use crate::types::{BOOKED_EVENT, BookResult, BookResultKind, Booked, TurnOutcome};

/// A receipt copied out of the booker's scratch file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub tid: i64,
    pub text: String,
    pub attachment: Option<Attachment>,
}

impl Notification {
    fn plain(tid: i64, text: String) -> Self {
        Notification {
            tid,
            text,
            attachment: None,
        }
    }
}

/// Events the notifier listens to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifierRoute {
    Booked,
}

pub struct NotifierActor {
    booker: Recipient<Subscribe<Booked>>,
    events: EventListener<NotifierRoute>,
    outbox: mpsc::UnboundedSender<Notification>,
}

impl NotifierActor {
    pub fn new(
        booker: Recipient<Subscribe<Booked>>,
        outbox: mpsc::UnboundedSender<Notification>,
    ) -> Self {
        NotifierActor {
            booker,
            events: EventListener::new(),
            outbox,
        }
    }

    fn send(&self, notification: Notification) {
        if self.outbox.send(notification).is_err() {
            log::warn!("Notification outbox closed, dropping notification");
        }
    }

    async fn on_booked(&self, booked: Booked) {
        let Booked { user, result } = booked;

        for (index, turn) in result.booked.iter().enumerate() {
            let caption = format!("{} {}", turn.turn.room, turn.turn.trange);
            match &turn.outcome {
                TurnOutcome::Booked(receipt) => {
                    let attachment = match read_receipt(receipt, index).await {
                        Ok(attachment) => Some(attachment),
                        Err(error) => {
                            log::error!("Cannot read receipt {}: {}", receipt.display(), error);
                            None
                        }
                    };
                    self.send(Notification {
                        tid: user.tid,
                        text: caption,
                        attachment,
                    });
                }
                TurnOutcome::AlreadyBooked => {
                    self.send(Notification::plain(user.tid, format!("{caption} Already booked")))
                }
            }
        }

        if result.kind != BookResultKind::Ok {
            self.send(Notification::plain(user.tid, failure_text(&result)));
        }
    }
}

fn failure_text(result: &BookResult) -> String {
    let remaining: Vec<String> = result
        .remaining
        .iter()
        .map(|turn| format!("- {} {} {}", turn.room, turn.trange, turn.book_link))
        .collect();
    format!(
        "Error while booking: {}\n Failed to book:\n{}",
        result.kind,
        remaining.join("\n")
    )
}

async fn read_receipt(receipt: &Path, index: usize) -> std::io::Result<Attachment> {
    let content = tokio::fs::read(receipt).await?;
    let extension = receipt
        .extension()
        .and_then(|extension| extension.to_str())
        .unwrap_or("txt");
    Ok(Attachment {
        filename: format!("receipt{}.{}", index + 1, extension),
        content,
    })
}

#[async_trait]
impl Actor for NotifierActor {
    async fn pre_start(&mut self, ctx: &mut ActorContext) -> ActorResult<()> {
        let myself = ctx
            .myself::<NotifierActor>()
            .await
            .ok_or_else(|| ActorError::CreateError(format!("'{}' is not registered", ctx.path)))?;

        let subscribed = myself.clone();
        self.booker.ask_forwarding(
            Subscribe {
                event: BOOKED_EVENT.to_string(),
                subscriber: myself.recipient(),
            },
            Forward::new()
                .then(move |id| {
                    let _ = subscribed.tell(Subscribed {
                        id,
                        route: NotifierRoute::Booked,
                    });
                })
                .on_error(|error| log::error!("Cannot subscribe to booking results: {}", error)),
        );
        Ok(())
    }
}

#[async_trait]
impl Handler<Subscribed<NotifierRoute>> for NotifierActor {
    async fn handle(
        &mut self,
        msg: Subscribed<NotifierRoute>,
        _ctx: &mut ActorContext,
    ) -> ActorResult<()> {
        log::debug!("Subscribed to {:?} as {}", msg.route, msg.id);
        self.events.register(msg.id, msg.route);
        Ok(())
    }
}

#[async_trait]
impl Handler<EventNotice<Booked>> for NotifierActor {
    async fn handle(
        &mut self,
        msg: EventNotice<Booked>,
        ctx: &mut ActorContext,
    ) -> ActorResult<()> {
        match self.events.route(&msg.id) {
            Some(NotifierRoute::Booked) => self.on_booked(msg.payload).await,
            None => log::warn!("'{}' got a notice for unknown event {}", ctx.path, msg.id),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::actor_system::{ActorSystem, EventEmitter, EventId};
    use crate::types::{BookedTurn, BuildingTurn, User};

    /// Publishes whatever payload it is told to.
    struct Publisher {
        events: EventEmitter<Booked>,
    }

    struct Publish(Booked);

    impl crate::actor_system::Message for Publish {
        type Response = usize;
    }

    impl Actor for Publisher {}

    #[async_trait]
    impl Handler<Subscribe<Booked>> for Publisher {
        async fn handle(
            &mut self,
            msg: Subscribe<Booked>,
            _ctx: &mut ActorContext,
        ) -> ActorResult<EventId> {
            Ok(self.events.subscribe(&msg.event, msg.subscriber))
        }
    }

    #[async_trait]
    impl Handler<Publish> for Publisher {
        async fn handle(&mut self, msg: Publish, _ctx: &mut ActorContext) -> ActorResult<usize> {
            Ok(self.events.emit(BOOKED_EVENT, msg.0))
        }
    }

    fn turn(room: &str) -> BuildingTurn {
        BuildingTurn {
            room: room.into(),
            trange: "09:00-11:00".parse().unwrap(),
            book_link: format!("https://rooms/{room}"),
        }
    }

    async fn publisher_with_listener(
        system: &ActorSystem,
    ) -> (
        crate::actor_system::ActorRef<Publisher>,
        mpsc::UnboundedReceiver<Notification>,
    ) {
        let publisher = system
            .create_actor(
                "publisher",
                Publisher {
                    events: EventEmitter::new(),
                },
            )
            .await
            .unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        system
            .create_actor("notifier", NotifierActor::new(publisher.recipient(), tx))
            .await
            .unwrap();
        (publisher, rx)
    }

    /// Publish once the notifier's subscription went through.
    async fn publish(publisher: &crate::actor_system::ActorRef<Publisher>, booked: Booked) {
        for _ in 0..100 {
            if publisher.ask(Publish(booked.clone())).await.unwrap() > 0 {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("notifier never subscribed");
    }

    #[tokio::test]
    async fn test_booked_turns_are_reported() {
        let system = ActorSystem::new("test");
        let (publisher, mut rx) = publisher_with_listener(&system).await;

        let receipt =
            std::env::temp_dir().join(format!("poub-notifier-{}.txt", uuid::Uuid::new_v4()));
        tokio::fs::write(&receipt, b"room: A1").await.unwrap();

        let booked = Booked {
            user: User::new(9),
            result: BookResult {
                booked: vec![
                    BookedTurn {
                        turn: turn("A1"),
                        outcome: TurnOutcome::Booked(receipt.clone()),
                    },
                    BookedTurn {
                        turn: turn("B2"),
                        outcome: TurnOutcome::AlreadyBooked,
                    },
                ],
                remaining: Vec::new(),
                kind: BookResultKind::Ok,
            },
        };
        publish(&publisher, booked).await;

        let first = rx.recv().await.unwrap();
        assert_eq!(first.tid, 9);
        assert_eq!(first.text, "A1 09:00-11:00");
        let attachment = first.attachment.unwrap();
        assert_eq!(attachment.filename, "receipt1.txt");
        assert_eq!(attachment.content, b"room: A1");

        let second = rx.recv().await.unwrap();
        assert_eq!(second.text, "B2 09:00-11:00 Already booked");
        assert!(second.attachment.is_none());

        tokio::fs::remove_file(&receipt).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_pass_lists_remaining_turns() {
        let system = ActorSystem::new("test");
        let (publisher, mut rx) = publisher_with_listener(&system).await;

        let booked = Booked {
            user: User::new(4),
            result: BookResult {
                booked: Vec::new(),
                remaining: vec![turn("A1"), turn("C3")],
                kind: BookResultKind::Timeout,
            },
        };
        publish(&publisher, booked).await;

        let notification = rx.recv().await.unwrap();
        assert_eq!(
            notification.text,
            "Error while booking: Timeout\n Failed to book:\n\
             - A1 09:00-11:00 https://rooms/A1\n\
             - C3 09:00-11:00 https://rooms/C3"
        );
    }

    #[tokio::test]
    async fn test_missing_receipt_still_notifies() {
        let system = ActorSystem::new("test");
        let (publisher, mut rx) = publisher_with_listener(&system).await;

        let booked = Booked {
            user: User::new(5),
            result: BookResult {
                booked: vec![BookedTurn {
                    turn: turn("A1"),
                    outcome: TurnOutcome::Booked(PathBuf::from("/nonexistent/receipt.txt")),
                }],
                remaining: Vec::new(),
                kind: BookResultKind::Ok,
            },
        };
        publish(&publisher, booked).await;

        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.text, "A1 09:00-11:00");
        assert!(notification.attachment.is_none());
    }
}
