//! Actor system - registry of the running actors.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::RwLock;

use super::actor::runner::ActorRunner;
use super::actor::{Actor, ActorError, ActorPath, ActorRef, ActorResult};

/// Type-erased view of a registered actor, enough to look it up and stop it.
trait RunningActor: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn stop(&self) -> BoxFuture<'static, ()>;
}

impl<A: Actor> RunningActor for ActorRef<A> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn stop(&self) -> BoxFuture<'static, ()> {
        let actor = self.clone();
        async move { actor.stop().await }.boxed()
    }
}

/// Creates, finds and stops actors. Cheap to clone.
#[derive(Clone)]
pub struct ActorSystem {
    name: String,
    actors: Arc<RwLock<HashMap<ActorPath, Arc<dyn RunningActor>>>>,
}

impl ActorSystem {
    pub fn new(name: &str) -> Self {
        ActorSystem {
            name: name.to_string(),
            actors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create a top level actor under `/user`.
    pub async fn create_actor<A: Actor>(&self, name: &str, actor: A) -> ActorResult<ActorRef<A>> {
        let path = ActorPath::from("/user") / name;
        self.create_actor_path(path, actor).await
    }

    pub(crate) async fn create_actor_path<A: Actor>(
        &self,
        path: ActorPath,
        actor: A,
    ) -> ActorResult<ActorRef<A>> {
        log::debug!("Creating actor '{}' on system '{}'...", &path, &self.name);

        let mut actors = self.actors.write().await;
        if actors.contains_key(&path) {
            return Err(ActorError::Exists(path));
        }

        let (runner, actor_ref) = ActorRunner::create(path.clone(), actor);
        actors.insert(path, Arc::new(actor_ref.clone()));
        drop(actors);

        let system = self.clone();
        tokio::spawn(runner.start(system));

        Ok(actor_ref)
    }

    /// Retrieve a running actor by path, if its type matches.
    pub async fn get_actor<A: Actor>(&self, path: &ActorPath) -> Option<ActorRef<A>> {
        let actors = self.actors.read().await;
        actors
            .get(path)
            .and_then(|running| running.as_any().downcast_ref::<ActorRef<A>>())
            .cloned()
    }

    /// Stop an actor and all of its descendants, deepest first.
    pub async fn stop_actor(&self, path: &ActorPath) {
        let mut targets: Vec<(ActorPath, Arc<dyn RunningActor>)> = {
            let actors = self.actors.read().await;
            actors
                .iter()
                .filter(|(candidate, _)| *candidate == path || path.is_ancestor_of(candidate))
                .map(|(candidate, running)| (candidate.clone(), running.clone()))
                .collect()
        };
        targets.sort_by_key(|(candidate, _)| std::cmp::Reverse(candidate.level()));

        for (candidate, running) in targets {
            log::debug!("Stopping actor '{}'...", &candidate);
            running.stop().await;
        }
    }

    /// Stop every actor, children before parents.
    pub async fn shutdown(&self) {
        log::info!("Shutting down actor system '{}'...", &self.name);
        self.stop_actor(&ActorPath::from("/")).await;
    }

    pub(crate) async fn deregister(&self, path: &ActorPath) {
        self.actors.write().await.remove(path);
    }
}

impl std::fmt::Debug for ActorSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ActorSystem({})", self.name)
    }
}
