//! Ports for the control plane.

pub mod inbound;

pub use inbound::ControlPlaneApi;
