//! Dependency graph of the modules of one release.
//!
//! Building the graph is a flat pass over every declared dependency, so cycles
//! never affect termination. Cycle reporting and per-module projections are
//! separate read-only passes over the finished graph.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use log::debug;
use serde::Serialize;

use crate::model::release::{diagnostic::Diagnostic, snapshot::ReleaseSnapshot, ModuleName};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: ModuleName,
    pub to: ModuleName,
    pub requested_version: Option<String>,
    /// The target is part of the release.
    pub resolved: bool,
    /// Resolved, but the release contains another version than requested.
    pub version_conflict: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    release_id: String,
    nodes: BTreeSet<ModuleName>,
    edges: BTreeMap<(ModuleName, ModuleName), Edge>,
    diagnostics: Vec<Diagnostic>,
}

impl DependencyGraph {
    pub fn build(snapshot: &ReleaseSnapshot) -> DependencyGraph {
        let mut graph = DependencyGraph {
            release_id: snapshot.release_id().to_string(),
            nodes: snapshot.names().cloned().collect(),
            edges: BTreeMap::new(),
            diagnostics: Vec::new(),
        };

        for module in snapshot.modules().values() {
            for dependency in &module.dependencies {
                let mut edge = Edge {
                    from: module.name.clone(),
                    to: dependency.name.clone(),
                    requested_version: dependency.requested_version.clone(),
                    resolved: false,
                    version_conflict: false,
                };

                match snapshot.get(&dependency.name) {
                    Some(target) => {
                        edge.resolved = true;
                        if let Some(requested) = &dependency.requested_version {
                            if requested != &target.version {
                                edge.version_conflict = true;
                                graph.diagnostics.push(Diagnostic::VersionConflict {
                                    from: module.name.clone(),
                                    to: dependency.name.clone(),
                                    requested: requested.clone(),
                                    actual: target.version.clone(),
                                });
                            }
                        }
                    }
                    None => {
                        graph.diagnostics.push(Diagnostic::MissingDependency {
                            from: module.name.clone(),
                            to: dependency.name.clone(),
                            requested_version: dependency.requested_version.clone(),
                        });
                    }
                }

                graph.add_edge(edge);
            }
        }

        debug!(
            "Built graph of {} with {} nodes and {} edges",
            graph.release_id,
            graph.nodes.len(),
            graph.edges.len()
        );
        graph
    }

    /// Inserts an edge; an existing edge between the same nodes is replaced.
    fn add_edge(&mut self, edge: Edge) {
        self.edges.insert((edge.from.clone(), edge.to.clone()), edge);
    }

    pub fn release_id(&self) -> &str {
        &self.release_id
    }

    pub fn nodes(&self) -> &BTreeSet<ModuleName> {
        &self.nodes
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edge(&self, from: &ModuleName, to: &ModuleName) -> Option<&Edge> {
        self.edges.get(&(from.clone(), to.clone()))
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn dependencies_of<'a>(&'a self, name: &'a ModuleName) -> impl Iterator<Item = &'a Edge> {
        self.edges
            .range((name.clone(), ModuleName::from(""))..)
            .take_while(move |((from, _), _)| from == name)
            .map(|(_, edge)| edge)
    }

    /// Names reachable from `name` (itself included), following unresolved
    /// edges to their target but not beyond.
    pub fn reachable_from(&self, name: &ModuleName) -> BTreeSet<ModuleName> {
        let mut reached = BTreeSet::new();
        let mut queue = VecDeque::from([name.clone()]);
        while let Some(current) = queue.pop_front() {
            if !reached.insert(current.clone()) {
                continue;
            }
            for edge in self.dependencies_of(&current) {
                if !reached.contains(&edge.to) {
                    queue.push_back(edge.to.clone());
                }
            }
        }
        reached
    }

    /// The module and its dependency closure as a view on this graph.
    /// Returns `None` for names that are not nodes.
    pub fn projection(&self, name: &ModuleName) -> Option<DependencyGraph> {
        if !self.nodes.contains(name) {
            return None;
        }
        let reachable = self.reachable_from(name);

        let edges: BTreeMap<_, _> = self
            .edges
            .iter()
            .filter(|((from, _), _)| reachable.contains(from))
            .map(|(key, edge)| (key.clone(), edge.clone()))
            .collect();
        let diagnostics = self
            .diagnostics
            .iter()
            .filter(|diagnostic| {
                edges
                    .keys()
                    .any(|(from, to)| diagnostic.concerns_edge(from, to))
            })
            .cloned()
            .collect();

        Some(DependencyGraph {
            release_id: self.release_id.clone(),
            nodes: reachable
                .into_iter()
                .filter(|node| self.nodes.contains(node))
                .collect(),
            edges,
            diagnostics,
        })
    }

    /// One projection per module, all taken from this graph.
    pub fn projections(&self) -> BTreeMap<ModuleName, DependencyGraph> {
        self.nodes
            .iter()
            .filter_map(|name| self.projection(name).map(|graph| (name.clone(), graph)))
            .collect()
    }

    /// Reports every cycle closed by a back edge of a depth-first traversal.
    pub fn find_cycles(&self) -> Vec<Vec<ModuleName>> {
        let mut visited = HashSet::new();
        let mut on_path = HashSet::new();
        let mut path = Vec::new();
        let mut cycles = Vec::new();

        for node in &self.nodes {
            if !visited.contains(node) {
                self.visit(node, &mut visited, &mut on_path, &mut path, &mut cycles);
            }
        }
        cycles
    }

    fn visit(
        &self,
        node: &ModuleName,
        visited: &mut HashSet<ModuleName>,
        on_path: &mut HashSet<ModuleName>,
        path: &mut Vec<ModuleName>,
        cycles: &mut Vec<Vec<ModuleName>>,
    ) {
        visited.insert(node.clone());
        on_path.insert(node.clone());
        path.push(node.clone());

        for edge in self.dependencies_of(node) {
            if !edge.resolved {
                continue;
            }
            if on_path.contains(&edge.to) {
                if let Some(start) = path.iter().position(|n| n == &edge.to) {
                    cycles.push(path[start..].to_vec());
                }
            } else if !visited.contains(&edge.to) {
                self.visit(&edge.to, visited, on_path, path, cycles);
            }
        }

        on_path.remove(node);
        path.pop();
    }

    pub fn export(&self) -> GraphExport {
        GraphExport {
            release: self.release_id.clone(),
            nodes: self.nodes.iter().map(|node| node.to_string()).collect(),
            edges: self
                .edges
                .values()
                .map(|edge| EdgeExport {
                    from: edge.from.to_string(),
                    to: edge.to.to_string(),
                    requested_version: edge.requested_version.clone(),
                    resolved: edge.resolved,
                    version_conflict: edge.version_conflict,
                })
                .collect(),
        }
    }
}

/// Plain data view of a graph for renderers and other consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphExport {
    pub release: String,
    pub nodes: Vec<String>,
    pub edges: Vec<EdgeExport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeExport {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_version: Option<String>,
    pub resolved: bool,
    pub version_conflict: bool,
}
