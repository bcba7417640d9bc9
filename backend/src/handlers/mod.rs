//! HTTP handlers for the Farm Operations Platform

mod events;
mod fattening;
mod health;
mod milk;

pub use events::*;
pub use fattening::*;
pub use health::*;
pub use milk::*;
