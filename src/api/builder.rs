use std::{env, error::Error, path::PathBuf};

use crate::{
    resolver::DirectoryReleaseResolver,
    scanner::{default_release_file_patterns, ScanOptions},
    ReleaseDiff,
};

#[derive(Default)]
pub struct ReleaseDiffBuilder {
    epics_top: Option<PathBuf>,
    output_directory: Option<PathBuf>,
    release_file_patterns: Option<Vec<String>>,
}

impl ReleaseDiffBuilder {
    /// Directory holding one directory per release id.
    ///
    /// Without it, releases can only be given as paths.
    pub fn epics_top(mut self, path: impl Into<PathBuf>) -> Self {
        self.epics_top = Some(path.into());
        self
    }

    /// Directory the reports are written to.
    ///
    /// Defaults to `output` in the current directory.
    pub fn output_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_directory = Some(path.into());
        self
    }

    /// Glob patterns, relative to a module version directory, of the
    /// configuration files that declare dependencies.
    ///
    /// Defaults to `configure/RELEASE*` and `configure/CONFIG_SITE*`.
    pub fn release_file_patterns(mut self, patterns: Vec<String>) -> Self {
        self.release_file_patterns = Some(patterns);
        self
    }

    pub fn try_build(self) -> Result<ReleaseDiff, Box<dyn Error>> {
        let Self {
            epics_top,
            output_directory,
            release_file_patterns,
        } = self;

        let output_directory = match output_directory {
            Some(output_directory) => output_directory,
            None => env::current_dir()?.join("output"),
        };

        let release_file_patterns = release_file_patterns
            .filter(|patterns| !patterns.is_empty())
            .unwrap_or_else(default_release_file_patterns);
        for pattern in &release_file_patterns {
            glob::Pattern::new(pattern)
                .map_err(|err| format!("Invalid release file pattern {pattern}: {err}"))?;
        }

        Ok(ReleaseDiff {
            resolver: DirectoryReleaseResolver::new(epics_top),
            scan_options: ScanOptions {
                release_file_patterns,
            },
            output_directory,
        })
    }
}
