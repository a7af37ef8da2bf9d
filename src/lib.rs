pub mod cli;
pub mod compare;
pub mod config;
pub mod graph;
pub mod model;
pub mod report;
pub mod resolver;
pub mod scanner;

mod api;

pub use api::{AnalysisOptions, ReleaseDiff, ReleaseDiffBuilder};
