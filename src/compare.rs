use std::collections::BTreeSet;

use crate::model::release::{listing::ModuleListing, snapshot::ReleaseSnapshot, ModuleName};

/// Modules present in `release_a` and absent from `release_b`.
///
/// The comparison is directional and by name only; a module present in both
/// releases with different versions is not part of the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonResult {
    pub release_a: String,
    pub release_b: String,
    pub only_in_first: BTreeSet<ModuleName>,
}

impl ComparisonResult {
    pub fn is_empty(&self) -> bool {
        self.only_in_first.is_empty()
    }

    pub fn len(&self) -> usize {
        self.only_in_first.len()
    }
}

pub fn compare_names<'a, 'b>(
    release_a: &str,
    names_a: impl IntoIterator<Item = &'a ModuleName>,
    release_b: &str,
    names_b: impl IntoIterator<Item = &'b ModuleName>,
) -> ComparisonResult {
    let names_b: BTreeSet<&ModuleName> = names_b.into_iter().collect();
    ComparisonResult {
        release_a: release_a.to_string(),
        release_b: release_b.to_string(),
        only_in_first: names_a
            .into_iter()
            .filter(|name| !names_b.contains(name))
            .cloned()
            .collect(),
    }
}

pub fn compare_snapshots(a: &ReleaseSnapshot, b: &ReleaseSnapshot) -> ComparisonResult {
    compare_names(a.release_id(), a.names(), b.release_id(), b.names())
}

pub fn compare_listings(
    release_a: &str,
    a: &ModuleListing,
    release_b: &str,
    b: &ModuleListing,
) -> ComparisonResult {
    compare_names(release_a, a.names(), release_b, b.names())
}
