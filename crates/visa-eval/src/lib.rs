//! Visa eligibility evaluation core plus the configuration, telemetry, and error plumbing
//! the api binary builds on.

pub mod config;
pub mod eligibility;
pub mod error;
pub mod telemetry;
