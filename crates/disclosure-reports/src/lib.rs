pub mod config;
pub mod disclosure;
pub mod error;
pub mod markup;
pub mod reports;
pub mod telemetry;
