use std::{collections::BTreeMap, path::Path};

use log::debug;

use crate::model::ParseError;

use super::ModuleName;

/// Module listing captured from the site's version-query utility,
/// one `name version` pair per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleListing {
    entries: BTreeMap<ModuleName, String>,
}

impl ModuleListing {
    pub fn from_file(path: &Path) -> Result<ModuleListing, ParseError> {
        debug!("Reading module listing {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ParseError::ConfigNotFound(path.to_path_buf()),
            _ => ParseError::IO(err),
        })?;
        ModuleListing::from_listing_str(&contents)
    }

    pub fn from_listing_str(data: &str) -> Result<ModuleListing, ParseError> {
        let mut entries = BTreeMap::new();
        for (index, line) in data.lines().enumerate() {
            let mut tokens = line.split_whitespace();
            match (tokens.next(), tokens.next()) {
                (None, _) => continue,
                (Some(name), Some(version)) => {
                    entries.insert(ModuleName::from(name), version.to_string());
                }
                (Some(_), None) => {
                    return Err(ParseError::InvalidListing {
                        line: index + 1,
                        content: line.to_string(),
                    })
                }
            }
        }
        Ok(ModuleListing { entries })
    }

    pub fn names(&self) -> impl Iterator<Item = &ModuleName> {
        self.entries.keys()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&ModuleName, &str)> {
        self.entries
            .iter()
            .map(|(name, version)| (name, version.as_str()))
    }

    pub fn version_of(&self, name: &ModuleName) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
