//! Admin back-office: user management, content moderation, dashboard

mod model;
mod service;

pub use model::*;
pub use service::AdminService;
