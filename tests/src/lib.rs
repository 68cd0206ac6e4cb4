//! # Session Proxy Test Suite
//!
//! Cross-subsystem scenarios: the interceptor pipeline, the ledger, the
//! privacy mapper and the control plane wired together over one store.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs        # Proxy harness with a scripted node
//!     ├── payment_flows.rs   # reservations, settlement, compensation
//!     ├── privacy_flows.rs   # session isolation, revocation, numeric ids
//!     └── invoice_flows.rs   # invoice association and crediting
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p lp-tests
//! cargo test -p lp-tests integration::payment_flows
//! ```

pub mod integration;
