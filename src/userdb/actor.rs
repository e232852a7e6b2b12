use std::collections::BTreeMap;

use thiserror::Error;

use crate::actor_system::{Actor, ActorContext, ActorError, ActorResult, Handler, async_trait};
use crate::types::User;
use crate::userdb::messages::{
    CreateUser, DeleteUser, GetBookableUsers, GetUser, UserAddSubject, UserLogin,
    UserRemoveSubject,
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UserDbError {
    #[error("user {0} not found")]
    NotFound(i64),
}

/// Owns every registered user, keyed by chat id.
#[derive(Default)]
pub struct UserDbActor {
    users: BTreeMap<i64, User>,
}

impl UserDbActor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a known set of users.
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            users: users.into_iter().map(|user| (user.tid, user)).collect(),
        }
    }

    fn find_user(&mut self, tid: i64) -> ActorResult<&mut User> {
        self.users
            .get_mut(&tid)
            .ok_or_else(|| ActorError::new(UserDbError::NotFound(tid)))
    }
}

#[async_trait]
impl Actor for UserDbActor {
    async fn pre_start(&mut self, _ctx: &mut ActorContext) -> ActorResult<()> {
        log::info!("User database ready with {} user(s)", self.users.len());
        Ok(())
    }
}

#[async_trait]
impl Handler<GetUser> for UserDbActor {
    async fn handle(&mut self, msg: GetUser, _ctx: &mut ActorContext) -> ActorResult<User> {
        self.find_user(msg.tid).cloned()
    }
}

#[async_trait]
impl Handler<CreateUser> for UserDbActor {
    async fn handle(&mut self, msg: CreateUser, _ctx: &mut ActorContext) -> ActorResult<User> {
        let user = self.users.entry(msg.tid).or_insert_with(|| {
            log::info!("Created user {}", msg.tid);
            User::new(msg.tid)
        });
        Ok(user.clone())
    }
}

#[async_trait]
impl Handler<DeleteUser> for UserDbActor {
    async fn handle(&mut self, msg: DeleteUser, _ctx: &mut ActorContext) -> ActorResult<()> {
        if self.users.remove(&msg.tid).is_some() {
            log::info!("Deleted user {}", msg.tid);
        }
        Ok(())
    }
}

#[async_trait]
impl Handler<GetBookableUsers> for UserDbActor {
    async fn handle(
        &mut self,
        _msg: GetBookableUsers,
        _ctx: &mut ActorContext,
    ) -> ActorResult<Vec<User>> {
        Ok(self
            .users
            .values()
            .filter(|user| user.is_bookable())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl Handler<UserLogin> for UserDbActor {
    async fn handle(&mut self, msg: UserLogin, _ctx: &mut ActorContext) -> ActorResult<User> {
        let user = self.find_user(msg.tid)?;
        user.username = msg.username;
        user.password = msg.password;
        Ok(user.clone())
    }
}

#[async_trait]
impl Handler<UserAddSubject> for UserDbActor {
    async fn handle(&mut self, msg: UserAddSubject, _ctx: &mut ActorContext) -> ActorResult<User> {
        let user = self.find_user(msg.tid)?;
        if !user.subjects.contains(&msg.subject) {
            user.subjects.push(msg.subject);
        }
        Ok(user.clone())
    }
}

#[async_trait]
impl Handler<UserRemoveSubject> for UserDbActor {
    async fn handle(
        &mut self,
        msg: UserRemoveSubject,
        _ctx: &mut ActorContext,
    ) -> ActorResult<User> {
        let user = self.find_user(msg.tid)?;
        user.subjects.retain(|subject| *subject != msg.subject);
        Ok(user.clone())
    }
}
