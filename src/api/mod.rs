use std::{
    error::Error,
    path::{Path, PathBuf},
};

use crate::{
    cli::command_handlers::{do_analyze, do_compare, do_graph, do_scan},
    compare::ComparisonResult,
    graph::DependencyGraph,
    model::release::snapshot::ReleaseSnapshot,
    resolver::DirectoryReleaseResolver,
    scanner::ScanOptions,
};

mod builder;

pub use builder::ReleaseDiffBuilder;

pub struct ReleaseDiff {
    resolver: DirectoryReleaseResolver,
    scan_options: ScanOptions,
    output_directory: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Compare the module lists of the first two releases.
    pub compare: bool,
    /// Write one dependency graph per module besides the release graph.
    pub complete_graph: bool,
    /// Compare captured listings from this directory instead of scanned trees.
    pub listing_directory: Option<PathBuf>,
}

impl ReleaseDiff {
    pub fn builder() -> ReleaseDiffBuilder {
        ReleaseDiffBuilder::default()
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Scans one release into its module inventory
    pub fn snapshot(&self, release_id: &str) -> Result<ReleaseSnapshot, Box<dyn Error>> {
        do_scan(&self.resolver, &self.scan_options, release_id)
    }

    /// Builds the dependency graph of a scanned release and writes its reports
    pub fn graph(
        &self,
        snapshot: &ReleaseSnapshot,
        complete_graph: bool,
    ) -> Result<DependencyGraph, Box<dyn Error>> {
        do_graph(snapshot, &self.output_directory, complete_graph)
    }

    /// Writes the modules of `first` that are not part of `second`
    pub fn compare(
        &self,
        first: &ReleaseSnapshot,
        second: &ReleaseSnapshot,
    ) -> Result<ComparisonResult, Box<dyn Error>> {
        do_compare(first, second, &self.output_directory)
    }

    /// Scans, graphs and optionally compares the given releases
    pub fn analyze(
        &self,
        release_ids: &[String],
        options: &AnalysisOptions,
    ) -> Result<(), Box<dyn Error>> {
        do_analyze(
            &self.resolver,
            &self.scan_options,
            &self.output_directory,
            release_ids,
            options,
        )
    }
}
