//! Shared error taxonomy and configuration model for the ttlgate crates.

pub mod config;
pub mod error;

pub use config::*;
pub use error::*;
