//! Request planning: data resolution and body encoding

pub mod multipart;
pub mod planner;

pub use planner::{parse_url, RequestPlanner};
