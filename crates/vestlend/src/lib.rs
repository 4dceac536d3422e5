//! Equity vesting and stock-backed loan origination engine.
//!
//! The `workflows` tree holds the domain: `equity` covers grants, vesting
//! math, and eligibility policy; `lending` covers share reservation, loan
//! quoting, the application state machine, and the self-service dashboard.
//! `config`, `error`, and `telemetry` are shared by the service binary.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
