pub mod conflicts;
pub mod models;
