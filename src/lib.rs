//! School administration core: validated CRUD repositories over SQLite,
//! a look-aside notification cache, invite issuance, and scheduled
//! notification expiry.

pub mod config;
pub mod entities;
pub mod error;
pub mod logging;
pub mod repositories;
pub mod services;
pub mod storage;

pub use config::AppConfig;
pub use error::{AppError, Result};
