use std::path::PathBuf;

use thiserror::Error;

pub mod release;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error reading configuration: {0}")]
    IO(#[from] std::io::Error),
    #[error("Configuration file {0} not found")]
    ConfigNotFound(PathBuf),
    #[error("Malformed configuration at line {line}: {reason}")]
    MalformedConfig { line: usize, reason: String },
    #[error("Path {0} does not follow the <module>/<version>/configure/<file> layout")]
    UnexpectedLayout(PathBuf),
    #[error("Invalid module listing at line {line}: `{content}`")]
    InvalidListing { line: usize, content: String },
}
