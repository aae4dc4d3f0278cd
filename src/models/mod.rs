pub mod api_responses;
pub mod precipitation;
pub mod wind;

pub use precipitation::*;
pub use wind::*;
