pub mod database;
pub mod metrics;
