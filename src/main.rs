use chrono::Local;
use tokio::sync::mpsc;

use poub::actor_system::ActorSystem;
use poub::booker::{self, BookActor};
use poub::browser::{BrowserActor, ReceiptDriver};
use poub::config::PoubConfig;
use poub::notifier::{Notification, NotifierActor};
use poub::timetable::{StaticSource, Timetable, TimetableActor};
use poub::userdb::UserDbActor;
use poub::waiter::Waiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = PoubConfig::from_env();
    log::info!(
        "Booking at {}, timetable refresh at {}, receipts in {}",
        config.book_at,
        config.refresh_at,
        config.receipt_dir.display()
    );

    let system = ActorSystem::new("poub");

    let userdb = system.create_actor("userdb", UserDbActor::new()).await?;
    let source = StaticSource::new(Timetable::new(Local::now().naive_local()));
    let timetable = system
        .create_actor(
            "timetable",
            TimetableActor::new(source, config.timetable_stale_after),
        )
        .await?;
    let browser = system
        .create_actor(
            "browser",
            BrowserActor::new(
                ReceiptDriver::new(config.receipt_dir.clone()),
                config.book_retries,
            ),
        )
        .await?;
    let booker = system
        .create_actor(
            "booker",
            BookActor::new(
                userdb.recipient(),
                timetable.recipient(),
                browser.recipient(),
            ),
        )
        .await?;

    let (outbox, mut notifications) = mpsc::unbounded_channel::<Notification>();
    system
        .create_actor("notifier", NotifierActor::new(booker.recipient(), outbox))
        .await?;
    tokio::spawn(async move {
        while let Some(notification) = notifications.recv().await {
            let attachment = notification
                .attachment
                .as_ref()
                .map(|attachment| format!(" [{}]", attachment.filename))
                .unwrap_or_default();
            log::info!("To {}: {}{}", notification.tid, notification.text, attachment);
        }
    });

    let mut waiter = Waiter::with_max_wait(config.max_wait);
    booker::schedule(&mut waiter, &booker, timetable.recipient(), &config)?;

    tokio::select! {
        result = waiter.lock_and_run() => result?,
        _ = tokio::signal::ctrl_c() => log::info!("Interrupted, stopping..."),
    }

    system.shutdown().await;
    Ok(())
}
