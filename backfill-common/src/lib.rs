pub mod config;
pub mod envelope;
pub mod locale;
pub mod logging;
pub mod metrics;
pub mod staging;
pub mod time;
pub mod value;
