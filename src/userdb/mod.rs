mod actor;
mod messages;

pub use actor::{UserDbActor, UserDbError};
pub use messages::{
    CreateUser, DeleteUser, GetBookableUsers, GetUser, UserAddSubject, UserLogin,
    UserRemoveSubject,
};
