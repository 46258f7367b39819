//! Shared model, error type and configuration for the obslog summariser.
//!
//! Everything here is free of I/O apart from [`settings::Settings::resolve`],
//! which reads the home directory and login name once at start-up.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{ErrorKind, ObslogError, Result};
