mod directory;

use std::path::PathBuf;

use thiserror::Error;

pub use directory::DirectoryReleaseResolver;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Release {release_id} not found at {}", path.display())]
    ReleaseRootNotFound { release_id: String, path: PathBuf },
    #[error("Release {0} cannot be located: no EPICS top directory configured")]
    NoEpicsTop(String),
}

/// Maps a release identifier onto the directory holding its modules.
pub trait ReleaseResolver {
    fn resolve_release_path(&self, release_id: &str) -> Result<PathBuf, ResolveError>;
}
