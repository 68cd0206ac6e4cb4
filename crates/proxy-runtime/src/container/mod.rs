//! # Service Container
//!
//! Configuration loading and dependency injection for the proxy.

pub mod config;
pub mod services;

pub use config::{ConfigError, LogLevel, ProxyConfig, StorageBackend, StorageConfig};
pub use services::{ContainerError, ProxyServices};
