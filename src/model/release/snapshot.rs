use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use super::{diagnostic::Diagnostic, ModuleDescriptor, ModuleName};

/// Module inventory of one release tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSnapshot {
    release_id: String,
    root: PathBuf,
    modules: BTreeMap<ModuleName, ModuleDescriptor>,
    diagnostics: Vec<Diagnostic>,
}

impl ReleaseSnapshot {
    pub fn new(release_id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        ReleaseSnapshot {
            release_id: release_id.into(),
            root: root.into(),
            modules: BTreeMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Builds a snapshot from descriptors that are already known. A later
    /// descriptor with the same name replaces an earlier one.
    pub fn from_modules(
        release_id: impl Into<String>,
        modules: impl IntoIterator<Item = ModuleDescriptor>,
    ) -> Self {
        let mut snapshot = ReleaseSnapshot::new(release_id, PathBuf::new());
        for module in modules {
            snapshot.insert(module);
        }
        snapshot
    }

    pub(crate) fn insert(&mut self, module: ModuleDescriptor) {
        self.modules.insert(module.name.clone(), module);
    }

    pub(crate) fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn release_id(&self) -> &str {
        &self.release_id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn modules(&self) -> &BTreeMap<ModuleName, ModuleDescriptor> {
        &self.modules
    }

    pub fn names(&self) -> impl Iterator<Item = &ModuleName> {
        self.modules.keys()
    }

    /// `(name, version)` of every module, ordered by name.
    pub fn entries(&self) -> impl Iterator<Item = (&ModuleName, &str)> {
        self.modules
            .values()
            .map(|module| (&module.name, module.version.as_str()))
    }

    pub fn get(&self, name: &ModuleName) -> Option<&ModuleDescriptor> {
        self.modules.get(name)
    }

    pub fn contains(&self, name: &ModuleName) -> bool {
        self.modules.contains_key(name)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
