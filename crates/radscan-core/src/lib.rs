//! Core library for radscan: credential loading, the analysis agent, image
//! preprocessing, and the error taxonomy shared with the CLI.

pub mod agent;
pub mod env;
pub mod error;
pub mod imaging;
pub mod logging;
pub mod prompt;
pub mod session;

pub use error::{Error, Result};
