//! Payment gateway adapter
//!
//! Hosted checkout with the provider, redirect and webhook handling, and
//! reconciliation of orders left pending.

pub mod gateway;
mod model;
mod service;
pub mod webhook;

pub use gateway::{PaymentGateway, YocoGateway};
pub use model::*;
pub use service::PaymentService;
