pub mod config;
pub mod error;
pub mod publisher;
pub mod queue;
pub mod report;
pub mod runner;
pub mod test_utils;
