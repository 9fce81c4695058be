pub mod modules;
pub mod pipeline;
mod schema;
pub mod shared;

pub use pipeline::{merged_tally, Pipeline, Stage, StageOptions};
pub use shared::{AppError, AppResult, PipelineConfig};
