pub mod config;
pub mod error;
pub mod report;

pub use config::VantageConfig;
pub use error::ReportError;
