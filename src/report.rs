use std::{
    collections::HashSet,
    fmt::Write,
    path::{Path, PathBuf},
};

use log::{info, warn};
use thiserror::Error;

use crate::{
    compare::ComparisonResult,
    graph::DependencyGraph,
    model::release::{is_release_tag, snapshot::ReleaseSnapshot, ModuleName},
};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error writing report: {0}")]
    IO(#[from] std::io::Error),
    #[error("Error while serializing graph export: {0}")]
    Toml(#[from] toml::ser::Error),
}

fn is_unsafe_in_file_name(c: char) -> bool {
    c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
}

/// Release ids may be paths; keep them usable as part of a file name.
fn file_label(name: &str) -> String {
    let label: String = name
        .chars()
        .map(|c| if is_unsafe_in_file_name(c) { '_' } else { c })
        .collect();
    match label.trim_matches(|c: char| c == '_' || c == '.') {
        "" => "_".to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// `label`, or `label-<n>` when an earlier file of the same batch took it.
fn unique_label(used: &mut HashSet<String>, label: String) -> String {
    if used.insert(label.clone()) {
        return label;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{label}-{n}");
        if used.insert(candidate.clone()) {
            warn!("File name {label} is already used, writing {candidate} instead");
            return candidate;
        }
        n += 1;
    }
}

fn write_report(path: &Path, contents: &str) -> Result<PathBuf, ReportError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    info!("Wrote {}", path.display());
    Ok(path.to_path_buf())
}

/// One module name per line, sorted.
pub fn format_comparison(result: &ComparisonResult) -> String {
    result
        .only_in_first
        .iter()
        .fold(String::new(), |mut out, name| {
            let _ = writeln!(out, "{name}");
            out
        })
}

pub fn write_comparison(
    output_directory: &Path,
    result: &ComparisonResult,
) -> Result<PathBuf, ReportError> {
    if result.is_empty() {
        info!(
            "No difference: every module of {} is also part of {}",
            result.release_a, result.release_b
        );
    } else {
        info!(
            "{} modules of {} are not part of {}",
            result.len(),
            result.release_a,
            result.release_b
        );
    }
    let path = output_directory.join(format!(
        "diff_{}_from_{}.txt",
        file_label(&result.release_a),
        file_label(&result.release_b)
    ));
    write_report(&path, &format_comparison(result))
}

/// `name/version` per module; versions that are not release tags are flagged.
pub fn format_inventory<'a>(
    entries: impl IntoIterator<Item = (&'a ModuleName, &'a str)>,
) -> String {
    let mut out = String::new();
    for (name, version) in entries {
        let entry = format!("{name}/{version}");
        if is_release_tag(version) {
            let _ = writeln!(out, "{entry}");
        } else {
            let _ = writeln!(out, ">>> INVALID MODULE NAME: {entry} <<<");
        }
    }
    out
}

pub fn write_inventory<'a>(
    output_directory: &Path,
    release_id: &str,
    entries: impl IntoIterator<Item = (&'a ModuleName, &'a str)>,
) -> Result<PathBuf, ReportError> {
    let path = output_directory.join(format!("filtered_{}.txt", file_label(release_id)));
    write_report(&path, &format_inventory(entries))
}

pub fn format_dependency_listing(graph: &DependencyGraph, snapshot: &ReleaseSnapshot) -> String {
    let mut out = String::new();
    for module in snapshot.modules().values() {
        let _ = writeln!(out, "{}|{}:", module.name, module.version);
        let mut edges = graph.dependencies_of(&module.name).peekable();
        if edges.peek().is_none() {
            let _ = writeln!(out, "\tNo dependencies found.");
        }
        for edge in edges {
            let version = edge.requested_version.as_deref().unwrap_or("*");
            let _ = write!(out, "\t{}|{}", edge.to, version);
            if !edge.resolved {
                let _ = write!(out, " (missing)");
            } else if edge.version_conflict {
                if let Some(target) = snapshot.get(&edge.to) {
                    let _ = write!(out, " (conflict: actual {})", target.version);
                }
            }
            let _ = writeln!(out);
        }
        let _ = writeln!(out);
    }
    out
}

pub fn write_dependency_listing(
    output_directory: &Path,
    graph: &DependencyGraph,
    snapshot: &ReleaseSnapshot,
) -> Result<PathBuf, ReportError> {
    let path = output_directory.join(format!(
        "module_dependencies_{}.txt",
        file_label(graph.release_id())
    ));
    write_report(&path, &format_dependency_listing(graph, snapshot))
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Graphviz description. Modules of the release are filled green, missing
/// targets white; unresolved edges are dashed and conflicting edges red.
pub fn format_dot(graph: &DependencyGraph, snapshot: &ReleaseSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph {} {{", quote(graph.release_id()));
    for node in graph.nodes() {
        let label = match snapshot.get(node) {
            Some(module) => format!("{} {}", module.name, module.version),
            None => node.to_string(),
        };
        let _ = writeln!(
            out,
            "    {} [label={}, style=filled, fillcolor=green];",
            quote(node.as_str()),
            quote(&label)
        );
    }

    let mut missing: Vec<_> = graph
        .edges()
        .filter(|edge| !edge.resolved)
        .map(|edge| &edge.to)
        .collect();
    missing.sort();
    missing.dedup();
    for node in missing {
        let _ = writeln!(
            out,
            "    {} [label={}, style=filled, fillcolor=white];",
            quote(node.as_str()),
            quote(node.as_str())
        );
    }

    for edge in graph.edges() {
        let attributes = if !edge.resolved {
            " [style=dashed]".to_string()
        } else if edge.version_conflict {
            format!(
                " [color=red, label={}]",
                quote(edge.requested_version.as_deref().unwrap_or("*"))
            )
        } else {
            String::new()
        };
        let _ = writeln!(
            out,
            "    {} -> {}{};",
            quote(edge.from.as_str()),
            quote(edge.to.as_str()),
            attributes
        );
    }
    let _ = writeln!(out, "}}");
    out
}

pub fn write_dot(
    output_directory: &Path,
    graph: &DependencyGraph,
    snapshot: &ReleaseSnapshot,
) -> Result<PathBuf, ReportError> {
    let path = output_directory.join(format!("graph_{}.dot", file_label(graph.release_id())));
    write_report(&path, &format_dot(graph, snapshot))
}

pub fn write_graph_export(
    output_directory: &Path,
    graph: &DependencyGraph,
) -> Result<PathBuf, ReportError> {
    let path = output_directory.join(format!("graph_{}.toml", file_label(graph.release_id())));
    let value = toml::Value::try_from(graph.export())?;
    write_report(&path, &toml::to_string_pretty(&value)?)
}

/// One DOT file per module under `graphs_<release>/`.
pub fn write_projections(
    output_directory: &Path,
    graph: &DependencyGraph,
    snapshot: &ReleaseSnapshot,
) -> Result<Vec<PathBuf>, ReportError> {
    let directory = output_directory.join(format!("graphs_{}", file_label(graph.release_id())));
    let mut used = HashSet::new();
    graph
        .projections()
        .into_iter()
        .map(|(name, projection)| {
            let label = unique_label(&mut used, file_label(name.as_str()));
            let path = directory.join(format!("{label}.dot"));
            write_report(&path, &format_dot(&projection, snapshot))
        })
        .collect()
}
