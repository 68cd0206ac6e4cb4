//! # Control Plane Subsystem
//!
//! **Subsystem ID:** 4
//!
//! ## Purpose
//!
//! Operator surface over the account ledger and the privacy mapper: account
//! administration, privacy map inspection, version and shutdown. Messages
//! are plain serde structs; the transport is up to the host.
//!
//! ## Conventions
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `account_balance` | satoshis |
//! | `expiration_date` | unix seconds, `0` = never expires |
//! | `-1` in an update | leave the field unchanged |
//! | `id` / `label` | `id` wins when both are set |
//!
//! Errors carry a stable code per error kind, see [`domain::codes`].

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::*;
pub use ports::ControlPlaneApi;
pub use service::ControlPlaneService;
