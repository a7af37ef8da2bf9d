use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use glob::Pattern;
use log::{debug, info, trace};
use thiserror::Error;

use crate::model::release::{
    compare_versions, diagnostic::Diagnostic, snapshot::ReleaseSnapshot, ModuleDescriptor,
    ModuleName,
};

/// Configuration files looked up relative to each module version directory:
/// module dependencies in `RELEASE*`, package dependencies in `CONFIG_SITE*`.
pub const DEFAULT_RELEASE_FILE_PATTERNS: [&str; 2] =
    ["configure/RELEASE*", "configure/CONFIG_SITE*"];

pub fn default_release_file_patterns() -> Vec<String> {
    DEFAULT_RELEASE_FILE_PATTERNS
        .iter()
        .map(|pattern| pattern.to_string())
        .collect()
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Release root {0} not found")]
    ReleaseRootNotFound(PathBuf),
    #[error("Invalid release file pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub release_file_patterns: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            release_file_patterns: default_release_file_patterns(),
        }
    }
}

struct Candidate {
    version: String,
    location: PathBuf,
    files: Vec<PathBuf>,
}

/// Walks `<root>/<module>/<version>/` and builds the module inventory of a release.
///
/// A module qualifies when one of its version directories holds a release file.
/// When several versions qualify the greatest one is kept and the others are
/// reported as [`Diagnostic::ShadowedVersion`]. Modules whose release files
/// cannot be parsed are kept without dependencies.
pub fn scan_release(
    release_id: &str,
    root: &Path,
    options: &ScanOptions,
) -> Result<ReleaseSnapshot, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::ReleaseRootNotFound(root.to_path_buf()));
    }
    info!("Scanning release {} at {}", release_id, root.display());

    let mut snapshot = ReleaseSnapshot::new(release_id, root);
    for module_dir in subdirectories(root)? {
        let Some(name) = dir_name(&module_dir) else {
            continue;
        };
        let name = ModuleName::from(name);

        let mut candidates = match module_candidates(&module_dir, options) {
            Ok(candidates) => candidates,
            Err(ScanError::IO(err)) => {
                skip_unreadable_module(&mut snapshot, name, &module_dir, &err);
                continue;
            }
            Err(err) => return Err(err),
        };
        candidates.sort_by(|a, b| compare_versions(&a.version, &b.version));

        let Some(selected) = candidates.pop() else {
            trace!("{} has no release file, not a module", module_dir.display());
            continue;
        };
        for shadowed in candidates {
            snapshot.push_diagnostic(Diagnostic::ShadowedVersion {
                module: name.clone(),
                kept: selected.version.clone(),
                shadowed: shadowed.version,
            });
        }

        let Candidate {
            version,
            location,
            files,
        } = selected;
        match ModuleDescriptor::from_files(name.clone(), version.clone(), &location, &files) {
            Ok(descriptor) => {
                debug!(
                    "Found {}|{} with {} dependencies",
                    descriptor.name,
                    descriptor.version,
                    descriptor.dependencies.len()
                );
                snapshot.insert(descriptor);
            }
            Err(err) => {
                snapshot.push_diagnostic(Diagnostic::from_parse_error(name.clone(), &err));
                snapshot.insert(ModuleDescriptor::new(name, version, location, vec![]));
            }
        }
    }

    info!(
        "Release {} contains {} modules",
        release_id,
        snapshot.len()
    );
    Ok(snapshot)
}

fn skip_unreadable_module(
    snapshot: &mut ReleaseSnapshot,
    module: ModuleName,
    module_dir: &Path,
    err: &std::io::Error,
) {
    debug!("Skipping unreadable module directory {}", module_dir.display());
    snapshot.push_diagnostic(Diagnostic::UnreadableModule {
        module,
        path: module_dir.to_path_buf(),
        reason: err.to_string(),
    });
}

fn module_candidates(
    module_dir: &Path,
    options: &ScanOptions,
) -> Result<Vec<Candidate>, ScanError> {
    let mut candidates = Vec::new();
    for version_dir in subdirectories(module_dir)? {
        let Some(version) = dir_name(&version_dir) else {
            continue;
        };
        let files = release_files(&version_dir, options)?;
        if !files.is_empty() {
            candidates.push(Candidate {
                version: version.to_string(),
                location: version_dir.clone(),
                files,
            });
        }
    }
    Ok(candidates)
}

/// Release files of one version directory in lexicographic order, editor
/// backups (`RELEASE~`) excluded.
fn release_files(version_dir: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>, ScanError> {
    let base = Pattern::escape(&version_dir.to_string_lossy());
    let mut files = BTreeSet::new();
    for pattern in &options.release_file_patterns {
        for entry in glob::glob(&format!("{base}/{pattern}"))? {
            let path = entry.map_err(glob::GlobError::into_error)?;
            let is_backup = path
                .file_name()
                .is_some_and(|name| name.to_string_lossy().contains('~'));
            if path.is_file() && !is_backup {
                files.insert(path);
            }
        }
    }
    Ok(files.into_iter().collect())
}

fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut dirs = Vec::new();
    for entry in dir.read_dir()? {
        let path = entry?.path();
        let hidden = dir_name(&path).map_or(true, |name| name.starts_with('.'));
        if path.is_dir() && !hidden {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}
