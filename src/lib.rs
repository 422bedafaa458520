pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod parse;
pub mod schedule;
pub mod transfer;
pub mod util;

pub use controller::{JobController, JobState};
pub use error::JobError;
pub use error::TransferError;
