pub mod config;
pub mod error;
pub mod retriever;
pub mod runner;
pub mod store;
pub mod test_utils;
