use log::{error, info, warn};

use crate::{
    api::AnalysisOptions,
    compare::{compare_listings, compare_snapshots, ComparisonResult},
    graph::DependencyGraph,
    model::release::{
        diagnostic::Diagnostic, listing::ModuleListing, snapshot::ReleaseSnapshot,
    },
    report,
    resolver::ReleaseResolver,
    scanner::{scan_release, ScanOptions},
};
use std::{error::Error, path::Path};

const LISTING_FILE_EXTENSION: &str = "txt";

/// Handler to scan one release
/// Resolves the release id to its module root and builds the module inventory
pub fn do_scan(
    resolver: &dyn ReleaseResolver,
    scan_options: &ScanOptions,
    release_id: &str,
) -> Result<ReleaseSnapshot, Box<dyn Error>> {
    let root = resolver.resolve_release_path(release_id)?;
    let snapshot = scan_release(release_id, &root, scan_options)?;
    report_diagnostics(snapshot.diagnostics());
    Ok(snapshot)
}

/// Handler to build and write the dependency graph of a scanned release
pub fn do_graph(
    snapshot: &ReleaseSnapshot,
    output_directory: &Path,
    complete_graph: bool,
) -> Result<DependencyGraph, Box<dyn Error>> {
    let graph = DependencyGraph::build(snapshot);
    report_diagnostics(graph.diagnostics());
    for cycle in graph.find_cycles() {
        warn!("{}", Diagnostic::DependencyCycle { cycle });
    }

    report::write_dependency_listing(output_directory, &graph, snapshot)?;
    report::write_dot(output_directory, &graph, snapshot)?;
    report::write_graph_export(output_directory, &graph)?;
    if complete_graph {
        let written = report::write_projections(output_directory, &graph, snapshot)?;
        info!(
            "Wrote {} module graphs of {}",
            written.len(),
            graph.release_id()
        );
    }

    info!(
        "Release {}: {} modules, {} dependencies, {} warnings",
        graph.release_id(),
        graph.nodes().len(),
        graph.edge_count(),
        snapshot.diagnostics().len() + graph.diagnostics().len()
    );
    Ok(graph)
}

/// Handler to compare the module lists of two scanned releases
pub fn do_compare(
    first: &ReleaseSnapshot,
    second: &ReleaseSnapshot,
    output_directory: &Path,
) -> Result<ComparisonResult, Box<dyn Error>> {
    let result = compare_snapshots(first, second);
    report::write_comparison(output_directory, &result)?;
    report::write_inventory(output_directory, second.release_id(), second.entries())?;
    Ok(result)
}

/// Handler to compare two module listings captured in `<listing_directory>/<release_id>.txt`
pub fn do_compare_listings(
    listing_directory: &Path,
    first_release_id: &str,
    second_release_id: &str,
    output_directory: &Path,
) -> Result<ComparisonResult, Box<dyn Error>> {
    let load = |release_id: &str| {
        ModuleListing::from_file(
            &listing_directory.join(format!("{release_id}.{LISTING_FILE_EXTENSION}")),
        )
    };
    let first = load(first_release_id)?;
    let second = load(second_release_id)?;

    let result = compare_listings(first_release_id, &first, second_release_id, &second);
    report::write_comparison(output_directory, &result)?;
    report::write_inventory(output_directory, second_release_id, second.entries())?;
    Ok(result)
}

/// Handler to the whole analysis
/// 1 - Scans every release and writes its dependency graph
/// 2 - Compares the first release against the second one when requested
///
/// A release that cannot be scanned does not stop the others; the
/// failure is reported once everything else is done.
pub fn do_analyze(
    resolver: &dyn ReleaseResolver,
    scan_options: &ScanOptions,
    output_directory: &Path,
    release_ids: &[String],
    options: &AnalysisOptions,
) -> Result<(), Box<dyn Error>> {
    if options.compare && release_ids.len() < 2 {
        return Err("Comparing module lists requires two releases".into());
    }

    let mut failed = Vec::new();
    let mut snapshots = Vec::new();
    for release_id in release_ids {
        let analysed = do_scan(resolver, scan_options, release_id).and_then(|snapshot| {
            do_graph(&snapshot, output_directory, options.complete_graph)?;
            Ok(snapshot)
        });
        match analysed {
            Ok(snapshot) => snapshots.push(Some(snapshot)),
            Err(err) => {
                error!("Could not analyse release {release_id}: {err}");
                failed.push(release_id.as_str());
                snapshots.push(None);
            }
        }
    }

    if options.compare {
        match (&options.listing_directory, &snapshots[0], &snapshots[1]) {
            (Some(listing_directory), _, _) => {
                do_compare_listings(
                    listing_directory,
                    &release_ids[0],
                    &release_ids[1],
                    output_directory,
                )?;
            }
            (None, Some(first), Some(second)) => {
                do_compare(first, second, output_directory)?;
            }
            (None, _, _) => warn!(
                "Skipping comparison of {} and {}: both releases must be scanned",
                release_ids[0], release_ids[1]
            ),
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(format!("Could not analyse release(s): {}", failed.join(", ")).into())
    }
}

fn report_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        warn!("{diagnostic}");
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::{model::release::ModuleName, resolver::DirectoryReleaseResolver};
    use pretty_assertions::assert_eq;

    fn resources() -> PathBuf {
        project_root::get_project_root().unwrap().join("resources")
    }

    fn resolver() -> DirectoryReleaseResolver {
        DirectoryReleaseResolver::new(Some(resources().join("releases")))
    }

    fn releases(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn graph_of_fixture_release() {
        let snapshot = do_scan(&resolver(), &ScanOptions::default(), "R7.0.3.1-1.0").unwrap();
        let output = tempfile::tempdir().unwrap();

        let graph = do_graph(&snapshot, output.path(), false).unwrap();

        let streamdevice = ModuleName::from("streamdevice");
        let asyn = graph.edge(&streamdevice, &ModuleName::from("asyn")).unwrap();
        assert!(asyn.resolved && asyn.version_conflict);
        assert!(!graph.edge(&streamdevice, &ModuleName::from("calc")).unwrap().resolved);
        assert!(graph.find_cycles().is_empty());
        assert!(output.path().join("graph_R7.0.3.1-1.0.dot").is_file());
        assert!(output.path().join("graph_R7.0.3.1-1.0.toml").is_file());
        assert!(output
            .path()
            .join("module_dependencies_R7.0.3.1-1.0.txt")
            .is_file());
    }

    #[test]
    fn analyze_and_compare_fixture_releases() {
        let output = tempfile::tempdir().unwrap();
        let options = AnalysisOptions {
            compare: true,
            complete_graph: true,
            listing_directory: None,
        };

        do_analyze(
            &resolver(),
            &ScanOptions::default(),
            output.path(),
            &releases(&["R7.0.3.1-1.0", "R7.0.3.1-1.1"]),
            &options,
        )
        .unwrap();

        assert_eq!(
            std::fs::read_to_string(output.path().join("diff_R7.0.3.1-1.0_from_R7.0.3.1-1.1.txt"))
                .unwrap(),
            "autosave\nstreamdevice\n"
        );
        assert_eq!(
            std::fs::read_to_string(output.path().join("filtered_R7.0.3.1-1.1.txt")).unwrap(),
            "asyn/R4.39-1.0.1\ncalc/R3.7-1.0.1\nmotor/R6.9-1.1.0\nseq/R2.2.4-1.2\n"
        );
        assert!(output
            .path()
            .join("graphs_R7.0.3.1-1.1")
            .join("motor.dot")
            .is_file());
    }

    #[test]
    fn compare_captured_listings() {
        let output = tempfile::tempdir().unwrap();

        let result = do_compare_listings(
            &resources().join("listings"),
            "R7.0.3.1-1.1",
            "R7.0.3.1-1.0",
            output.path(),
        )
        .unwrap();

        assert_eq!(
            result.only_in_first.into_iter().collect::<Vec<_>>(),
            vec![ModuleName::from("calc")]
        );
        assert_eq!(
            std::fs::read_to_string(output.path().join("filtered_R7.0.3.1-1.0.txt")).unwrap(),
            "asyn/R4.39-1.0.0\nautosave/R5.10-2.1.0\nmotor/R6.9-1.1.0\nseq/R2.2.4-1.2\nstreamdevice/R2.8.9-1.0\n"
        );
    }

    #[test]
    fn listing_path_keeps_dotted_release_id() {
        let listings = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        std::fs::write(listings.path().join("R7.0.3.1-1.0.txt"), "asyn R4.39-1.0.0\n").unwrap();
        std::fs::write(listings.path().join("R7.0.3.1-1.1.txt"), "seq R2.2.4-1.2\n").unwrap();

        let result = do_compare_listings(
            listings.path(),
            "R7.0.3.1-1.0",
            "R7.0.3.1-1.1",
            output.path(),
        )
        .unwrap();

        assert_eq!(
            result.only_in_first.into_iter().collect::<Vec<_>>(),
            vec![ModuleName::from("asyn")]
        );
    }

    #[test]
    fn missing_release_does_not_stop_the_others() {
        let output = tempfile::tempdir().unwrap();
        let options = AnalysisOptions::default();

        let err = do_analyze(
            &resolver(),
            &ScanOptions::default(),
            output.path(),
            &releases(&["R0.0-missing", "R7.0.3.1-1.1"]),
            &options,
        )
        .unwrap_err();

        assert!(err.to_string().contains("R0.0-missing"));
        assert!(output.path().join("graph_R7.0.3.1-1.1.dot").is_file());
    }

    #[test]
    fn compare_requires_two_releases() {
        let output = tempfile::tempdir().unwrap();
        let options = AnalysisOptions {
            compare: true,
            ..AnalysisOptions::default()
        };
        assert!(do_analyze(
            &resolver(),
            &ScanOptions::default(),
            output.path(),
            &releases(&["R7.0.3.1-1.0"]),
            &options,
        )
        .is_err());
    }
}
