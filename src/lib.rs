//! Core library for the `vuramp` CLI.
//!
//! A staged virtual-user HTTP load driver: VUs follow a ramp profile, run a
//! scenario of grouped requests with per-response checks, and record tagged
//! samples into a metrics registry that thresholds are evaluated against.
//! The primary user-facing interface is the `vuramp` command-line
//! application.
pub mod app;
pub mod args;
pub mod config;
pub mod entry;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod metrics;
pub mod scenario;
pub mod scheduler;
pub mod shutdown;
pub mod shutdown_handlers;
mod system;
pub mod thresholds;
