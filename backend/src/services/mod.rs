//! Business logic services for the Farm Operations Platform

pub mod change_feed;
pub mod fattening;
pub mod milk;

pub use change_feed::{ChangeEvent, ChangeFeed, ChangeSubscription, ChangeTable};
pub use fattening::FatteningService;
pub use milk::MilkReceptionService;
