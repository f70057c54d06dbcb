//! Ratings between the parties of a paid order, rolled up into trust scores

mod model;
mod service;

pub use model::*;
pub use service::RatingService;
