pub mod config;
pub mod csv_layout;
pub mod observability;
pub mod pipeline;
pub mod report;
pub mod sinks;
pub mod sources;
pub mod transform;
pub mod window_report;

pub use pipeline::{Pipeline, PipelineError};
