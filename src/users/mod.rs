//! User accounts and seller statistics

mod model;
mod service;

pub use model::*;
pub use service::UserService;
pub(crate) use service::delete_user;
