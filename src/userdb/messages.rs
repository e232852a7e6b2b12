use crate::actor_system::Message;
use crate::types::{Subject, User};

#[derive(Clone, Debug)]
pub struct GetUser {
    pub tid: i64,
}

impl Message for GetUser {
    type Response = User;
}

/// Get the user, creating an empty one if unknown.
#[derive(Clone, Debug)]
pub struct CreateUser {
    pub tid: i64,
}

impl Message for CreateUser {
    type Response = User;
}

#[derive(Clone, Debug)]
pub struct DeleteUser {
    pub tid: i64,
}

impl Message for DeleteUser {
    type Response = ();
}

#[derive(Clone, Debug)]
pub struct GetBookableUsers;

impl Message for GetBookableUsers {
    type Response = Vec<User>;
}

/// Store credentials; `None` logs the user out.
#[derive(Clone, Debug)]
pub struct UserLogin {
    pub tid: i64,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Message for UserLogin {
    type Response = User;
}

#[derive(Clone, Debug)]
pub struct UserAddSubject {
    pub tid: i64,
    pub subject: Subject,
}

impl Message for UserAddSubject {
    type Response = User;
}

#[derive(Clone, Debug)]
pub struct UserRemoveSubject {
    pub tid: i64,
    pub subject: Subject,
}

impl Message for UserRemoveSubject {
    type Response = User;
}
