//! Long-running and cross-repository services

pub mod invites;
pub mod maintenance;

pub use invites::{InviteMailer, InviteService, LogMailer};
pub use maintenance::NotificationExpiryJob;
