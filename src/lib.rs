pub mod actor_system;
pub mod booker;
pub mod browser;
pub mod config;
pub mod notifier;
pub mod timetable;
pub mod timeutils;
pub mod types;
pub mod userdb;
pub mod waiter;
