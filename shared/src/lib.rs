//! Shared types and models for the Farm Operations Platform
//!
//! This crate contains the business rules shared between the backend, the
//! browser client (via WASM), and other components of the system. Nothing in
//! here performs I/O.

pub mod format;
pub mod models;
pub mod types;
pub mod validation;

pub use format::*;
pub use models::*;
pub use types::*;
pub use validation::*;
