use std::path::PathBuf;

use clap::Parser;

/// Module inventory, release comparison and dependency graphs for EPICS release trees.
#[derive(Debug, Parser)]
#[command(version)]
pub struct CliArgs {
    /// Release to analyse, either a release id under the EPICS top directory or a path
    pub release: String,
    /// Second release to analyse and compare against
    pub another_release: Option<String>,
    /// Write the modules of the first release that are not part of the second one
    #[arg(long, requires = "another_release")]
    pub compare_file_lists: bool,
    /// Also write one dependency graph per module
    #[arg(long)]
    pub complete_dep_graph: bool,
    /// Directory holding one directory per release id
    #[arg(long)]
    pub epics_top: Option<PathBuf>,
    /// Directory the reports are written to [default: output]
    #[arg(short, long)]
    pub output_directory: Option<PathBuf>,
    /// Compare captured module listings `<DIR>/<release>.txt` instead of scanned trees
    #[arg(long, requires = "compare_file_lists")]
    pub listing_dir: Option<PathBuf>,
}

impl CliArgs {
    pub fn release_ids(&self) -> Vec<String> {
        std::iter::once(self.release.clone())
            .chain(self.another_release.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_single_release() {
        let args = CliArgs::try_parse_from(["releasediff", "R7.0.3.1-1.0"]).unwrap();
        assert_eq!(args.release_ids(), vec!["R7.0.3.1-1.0".to_string()]);
        assert!(!args.compare_file_lists);
        assert!(!args.complete_dep_graph);
    }

    #[test]
    fn parse_comparison() {
        let args = CliArgs::try_parse_from([
            "releasediff",
            "R7.0.3.1-1.0",
            "R7.0.3.1-1.1",
            "--compare-file-lists",
            "--complete-dep-graph",
            "-o",
            "reports",
        ])
        .unwrap();
        assert_eq!(args.release_ids().len(), 2);
        assert!(args.compare_file_lists && args.complete_dep_graph);
        assert_eq!(args.output_directory, Some(PathBuf::from("reports")));
    }

    #[test]
    fn comparison_requires_second_release() {
        assert!(
            CliArgs::try_parse_from(["releasediff", "R7.0.3.1-1.0", "--compare-file-lists"])
                .is_err()
        );
    }
}
