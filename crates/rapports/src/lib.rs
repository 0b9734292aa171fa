//! Citation recording against a fine schedule, with recidivism-aware penalty computation.

pub mod citations;
pub mod config;
pub mod error;
pub mod telemetry;
