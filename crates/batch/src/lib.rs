#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod runner;

pub use config::ProjectConfig;
pub use error::BatchError;
pub use runner::{BatchReport, BatchRunner, TaskFailure, TaskOutcome};
