pub mod error;
pub mod response;
pub mod shutdown;
pub mod telemetry;
