//! # FDP Common
//!
//! Shared building blocks for the Fleet Data Platform: the common error
//! type, logging setup, and the domain types every component agrees on.

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod types;

pub use error::{FdpError, Result};
