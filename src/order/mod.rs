//! Order ledger
//!
//! Orders are created atomically with their items and then move forward
//! exactly once: pending → paid or pending → failed.

mod model;
mod service;

pub use model::*;
pub use service::OrderService;
