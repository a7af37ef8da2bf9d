use std::{fmt::Display, path::PathBuf};

use crate::model::ParseError;

use super::ModuleName;

/// Non-fatal finding attached to a snapshot or a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    ConfigNotFound {
        module: ModuleName,
        path: PathBuf,
    },
    MalformedConfig {
        module: ModuleName,
        reason: String,
    },
    /// The module directory could not be read; the module is not part of the snapshot.
    UnreadableModule {
        module: ModuleName,
        path: PathBuf,
        reason: String,
    },
    /// Another version of the module was found and not kept in the snapshot.
    ShadowedVersion {
        module: ModuleName,
        kept: String,
        shadowed: String,
    },
    MissingDependency {
        from: ModuleName,
        to: ModuleName,
        requested_version: Option<String>,
    },
    VersionConflict {
        from: ModuleName,
        to: ModuleName,
        requested: String,
        actual: String,
    },
    DependencyCycle {
        cycle: Vec<ModuleName>,
    },
}

impl Diagnostic {
    pub fn from_parse_error(module: ModuleName, error: &ParseError) -> Diagnostic {
        match error {
            ParseError::ConfigNotFound(path) => Diagnostic::ConfigNotFound {
                module,
                path: path.clone(),
            },
            other => Diagnostic::MalformedConfig {
                module,
                reason: other.to_string(),
            },
        }
    }

    /// Whether this diagnostic is about the edge `from -> to`.
    pub fn concerns_edge(&self, edge_from: &ModuleName, edge_to: &ModuleName) -> bool {
        match self {
            Diagnostic::MissingDependency { from, to, .. }
            | Diagnostic::VersionConflict { from, to, .. } => from == edge_from && to == edge_to,
            _ => false,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::ConfigNotFound { module, path } => write!(
                f,
                "{module}: configuration file {} not found, recorded without dependencies",
                path.display()
            ),
            Diagnostic::MalformedConfig { module, reason } => write!(
                f,
                "{module}: malformed configuration, recorded without dependencies: {reason}"
            ),
            Diagnostic::UnreadableModule {
                module,
                path,
                reason,
            } => write!(
                f,
                "{module}: directory {} could not be read, module skipped: {reason}",
                path.display()
            ),
            Diagnostic::ShadowedVersion {
                module,
                kept,
                shadowed,
            } => write!(f, "{module}: version {shadowed} ignored in favour of {kept}"),
            Diagnostic::MissingDependency {
                from,
                to,
                requested_version,
            } => write!(
                f,
                "{from}: dependency {to}@{} is not part of the release",
                requested_version.as_deref().unwrap_or("*")
            ),
            Diagnostic::VersionConflict {
                from,
                to,
                requested,
                actual,
            } => write!(
                f,
                "{from}: requires {to}@{requested} but the release contains {to}@{actual}"
            ),
            Diagnostic::DependencyCycle { cycle } => {
                f.write_str("dependency cycle: ")?;
                for name in cycle {
                    write!(f, "{name} -> ")?;
                }
                match cycle.first() {
                    Some(first) => write!(f, "{first}"),
                    None => Ok(()),
                }
            }
        }
    }
}
