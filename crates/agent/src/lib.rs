//! Certpilot
//!
//! A certificate acquisition sidecar for CFSSL-compatible signing
//! endpoints. Certpilot generates a key pair and certificate signing
//! request once at start-up, exchanges the CSR with the CA on a fixed
//! rotation schedule, persists the signed material to disk, and drives an
//! optional reload hook so the workload next to it never runs with an
//! expired certificate.
//!
//! # Architecture
//!
//! - [`CertificateRequest`] - key material and the encoded CSR, built once
//! - [`SigningClient`] - the JSON-over-HTTPS exchange with the CA
//! - [`CertificateStore`] - response validation and persistence
//! - [`RotationScheduler`] - the acquisition loop with fixed-delay retry
//! - [`Watchdog`] - operational deadline on the first acquisition
//! - [`Controller`] - wires the above and runs the service

// ============================================================================
// Module Declarations
// ============================================================================

pub mod client;
pub mod controller;
pub mod csr;
pub mod error;
pub mod reload;
pub mod scheduler;
pub mod storage;
pub mod watchdog;

// ============================================================================
// Public API Re-exports
// ============================================================================

// Error handling
pub use error::Error;

// Signing exchange
pub use client::{Signer, SigningClient, SigningRequest, SigningResponse};

// Request builder
pub use csr::CertificateRequest;

// Persistence
pub use storage::CertificateStore;

// Rotation loop
pub use scheduler::{RotationScheduler, RETRY_DELAY};

// Operational deadline
pub use watchdog::{ReadySignal, Watchdog};

// Service controller
pub use controller::Controller;
