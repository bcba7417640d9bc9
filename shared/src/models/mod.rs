//! Domain models for the Farm Operations Platform

mod allocation;
mod fattening;
mod milk;

pub use allocation::*;
pub use fattening::*;
pub use milk::*;
