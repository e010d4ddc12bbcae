//! DocSage Core — error taxonomy and environment-derived configuration.

pub mod config;
pub mod error;

pub use config::{DocSageConfig, TextlessPagePolicy};
pub use error::{Error, Result};
