pub mod auth;
pub mod guard;
pub mod health;
pub mod plan;
pub mod watch;
