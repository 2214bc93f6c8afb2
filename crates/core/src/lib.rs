pub mod error;
pub mod ids;
pub mod record;

pub use error::CoreError;
pub use ids::*;
pub use record::{AnimalRecord, Measurements};
