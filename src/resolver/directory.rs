use std::path::{Path, PathBuf};

use log::debug;

use super::{ReleaseResolver, ResolveError};

const MODULES_DIRECTORY_NAME: &str = "modules";

/// Resolves `<release_id>` to `<epics_top>/<release_id>/modules`.
///
/// A release id that names an existing directory is used as the module root
/// directly, so trees outside the EPICS top can be analysed too.
#[derive(Debug, Clone, Default)]
pub struct DirectoryReleaseResolver {
    epics_top: Option<PathBuf>,
}

impl DirectoryReleaseResolver {
    pub fn new(epics_top: Option<PathBuf>) -> Self {
        Self { epics_top }
    }

    pub fn epics_top(&self) -> Option<&Path> {
        self.epics_top.as_deref()
    }
}

impl ReleaseResolver for DirectoryReleaseResolver {
    fn resolve_release_path(&self, release_id: &str) -> Result<PathBuf, ResolveError> {
        let as_path = Path::new(release_id);
        if as_path.components().count() > 1 && as_path.is_dir() {
            debug!("Using {} as module root", as_path.display());
            return Ok(as_path.to_path_buf());
        }

        let epics_top = self
            .epics_top
            .as_ref()
            .ok_or_else(|| ResolveError::NoEpicsTop(release_id.to_string()))?;
        let path = epics_top.join(release_id).join(MODULES_DIRECTORY_NAME);
        if path.is_dir() {
            debug!("Release {} resolved to {}", release_id, path.display());
            Ok(path)
        } else {
            Err(ResolveError::ReleaseRootNotFound {
                release_id: release_id.to_string(),
                path,
            })
        }
    }
}
