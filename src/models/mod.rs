//! Data models

pub mod telemetry;
pub mod rules;
pub mod assignment;
pub mod device_data;

pub use telemetry::*;
pub use rules::*;
pub use assignment::*;
pub use device_data::*;
