//! Runtime glue: configuration, the stage contract shared by the three sync
//! steps, telemetry, and the signal-aware runner.

pub mod config;
pub mod runner;
pub mod stage;
pub mod telemetry;
