pub mod analytics;
pub mod domain;

pub use domain::LoadReading;
