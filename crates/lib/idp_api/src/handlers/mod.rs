//! Request handlers.

pub mod admin;
pub mod applications;
pub mod health;
pub mod tokens;
pub mod users;
