//! Actor runner - owns the actor state and drains its mailbox.

use crate::actor_system::system::ActorSystem;

use super::{
    Actor, ActorContext, ActorPath, ActorRef, SupervisionStrategy,
    handler::{Envelope, MailboxReceiver, mailbox},
};

pub(crate) struct ActorRunner<A: Actor> {
    path: ActorPath,
    actor: A,
    receiver: MailboxReceiver<A>,
}

impl<A: Actor> ActorRunner<A> {
    pub fn create(path: ActorPath, actor: A) -> (Self, ActorRef<A>) {
        let (sender, receiver) = mailbox();
        let actor_ref = ActorRef::new(path.clone(), sender);
        let runner = ActorRunner {
            path,
            actor,
            receiver,
        };
        (runner, actor_ref)
    }

    pub async fn start(mut self, system: ActorSystem) {
        log::debug!("Starting actor '{}'...", &self.path);

        let mut ctx = ActorContext {
            path: self.path.clone(),
            system: system.clone(),
        };

        let mut start_error = self.actor.pre_start(&mut ctx).await.err();

        if let Some(error) = &start_error {
            log::warn!("Actor '{}' failed to start: {}", &self.path, error);
            match A::supervision_strategy() {
                SupervisionStrategy::Stop => {}
                SupervisionStrategy::Retry(mut retry_strategy) => {
                    log::debug!(
                        "Restarting actor with retry strategy: {:?}",
                        &retry_strategy
                    );
                    let mut retries = 0;
                    while retries < retry_strategy.max_retries() && start_error.is_some() {
                        if let Some(duration) = retry_strategy.next_backoff() {
                            log::debug!("Backoff for {:?}", &duration);
                            tokio::time::sleep(duration).await;
                        }
                        retries += 1;
                        start_error = ctx
                            .restart(&mut self.actor, start_error.as_ref())
                            .await
                            .err();
                    }
                }
            }
        }

        let mut stop_acks = Vec::new();

        if start_error.is_none() {
            log::debug!("Actor '{}' has started successfully.", &self.path);

            // One message at a time; this is what keeps the actor state single-threaded.
            while let Some(envelope) = self.receiver.recv().await {
                match envelope {
                    Envelope::Message(msg) => msg.handle(&mut self.actor, &mut ctx).await,
                    Envelope::Stop(ack) => {
                        stop_acks.push(ack);
                        break;
                    }
                }
            }
        } else {
            log::error!("Actor '{}' failed to start!", &self.path);
        }

        self.receiver.close();

        let mut discarded = 0;
        while let Ok(envelope) = self.receiver.try_recv() {
            match envelope {
                Envelope::Message(_) => discarded += 1,
                Envelope::Stop(ack) => stop_acks.push(ack),
            }
        }
        if discarded > 0 {
            log::debug!(
                "Actor '{}' discarded {} message(s) sent after stop.",
                &self.path,
                discarded
            );
        }

        if start_error.is_none() {
            self.actor.post_stop(&mut ctx).await;
        }
        system.deregister(&self.path).await;

        log::debug!("Actor '{}' stopped.", &self.path);

        for ack in stop_acks {
            let _ = ack.send(());
        }
    }
}
