pub mod diagnostic;
pub mod listing;
pub mod snapshot;

use log::{debug, error};
use regex_lite::Regex;
use serde::Serialize;
use std::{
    cmp::Ordering,
    collections::HashMap,
    fmt::Display,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use crate::model::ParseError;

#[derive(Clone, Hash, Serialize, Debug, PartialEq, Eq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct ModuleName(String);

impl ModuleName {
    pub fn new(s: String) -> Self {
        ModuleName(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ModuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ModuleName {
    fn from(s: String) -> Self {
        ModuleName(s)
    }
}

impl From<&str> for ModuleName {
    fn from(s: &str) -> Self {
        ModuleName(s.to_string())
    }
}

/// A dependency declared by a module. A missing version accepts any version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DependencyRef {
    pub name: ModuleName,
    pub requested_version: Option<String>,
}

impl DependencyRef {
    pub fn any(name: impl Into<ModuleName>) -> Self {
        DependencyRef {
            name: name.into(),
            requested_version: None,
        }
    }

    pub fn pinned(name: impl Into<ModuleName>, version: impl Into<String>) -> Self {
        DependencyRef {
            name: name.into(),
            requested_version: Some(version.into()),
        }
    }
}

impl Display for DependencyRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.requested_version {
            Some(version) => write!(f, "{}@{}", self.name, version),
            None => write!(f, "{}@*", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub name: ModuleName,
    pub version: String,
    pub location: PathBuf,
    pub dependencies: Vec<DependencyRef>,
}

impl ModuleDescriptor {
    pub fn new(
        name: impl Into<ModuleName>,
        version: impl Into<String>,
        location: impl Into<PathBuf>,
        dependencies: Vec<DependencyRef>,
    ) -> Self {
        ModuleDescriptor {
            name: name.into(),
            version: version.into(),
            location: location.into(),
            dependencies,
        }
    }

    /// Parses a single release file laid out as `<module>/<version>/configure/<file>`.
    /// Module name and version are taken from the directory names.
    pub fn from_file(path: &Path) -> Result<ModuleDescriptor, ParseError> {
        let (name, version, location) = module_layout(path)?;
        Self::from_files(name, version, location, &[path.to_path_buf()])
    }

    /// Layers several release files of one module, in the given order.
    pub fn from_files(
        name: ModuleName,
        version: impl Into<String>,
        location: impl Into<PathBuf>,
        files: &[PathBuf],
    ) -> Result<ModuleDescriptor, ParseError> {
        let mut declarations = Declarations::default();
        for file in files {
            debug!("Reading release file {} for {}", file.display(), name);
            if let Err(err) = declarations.absorb_file(file) {
                error!("Could not read dependencies of {name} from {}: {err}", file.display());
                return Err(err);
            }
        }

        Ok(ModuleDescriptor {
            name,
            version: version.into(),
            location: location.into(),
            dependencies: declarations.into_dependencies(),
        })
    }

    pub fn from_release_str(
        name: impl Into<ModuleName>,
        version: impl Into<String>,
        location: impl Into<PathBuf>,
        data: &str,
    ) -> Result<ModuleDescriptor, ParseError> {
        let mut declarations = Declarations::default();
        declarations.absorb_str(data)?;
        Ok(ModuleDescriptor::new(
            name,
            version,
            location,
            declarations.into_dependencies(),
        ))
    }
}

fn module_layout(path: &Path) -> Result<(ModuleName, String, PathBuf), ParseError> {
    let version_dir = path.parent().and_then(Path::parent);
    let module_dir = version_dir.and_then(Path::parent);
    match (
        version_dir,
        version_dir.and_then(Path::file_name),
        module_dir.and_then(Path::file_name),
    ) {
        (Some(location), Some(version), Some(name)) => Ok((
            ModuleName::from(name.to_string_lossy().as_ref()),
            version.to_string_lossy().into_owned(),
            location.to_path_buf(),
        )),
        _ => Err(ParseError::UnexpectedLayout(path.to_path_buf())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum VersionSpec {
    Macro(String),
    Literal(String),
}

/// Accumulates declarations across the release files of one module.
/// Macros and dependencies are both last-wins; a dependency keeps the
/// position of its first declaration.
#[derive(Debug, Default)]
struct Declarations {
    macros: HashMap<String, String>,
    order: Vec<ModuleName>,
    versions: HashMap<ModuleName, VersionSpec>,
}

impl Declarations {
    fn absorb_file(&mut self, path: &Path) -> Result<(), ParseError> {
        let bytes = std::fs::read(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ParseError::ConfigNotFound(path.to_path_buf()),
            _ => ParseError::IO(err),
        })?;
        let data = std::str::from_utf8(&bytes).map_err(|err| ParseError::MalformedConfig {
            line: bytes[..err.valid_up_to()]
                .iter()
                .filter(|b| **b == b'\n')
                .count()
                + 1,
            reason: "invalid UTF-8".to_string(),
        })?;
        self.absorb_str(data)
    }

    fn absorb_str(&mut self, data: &str) -> Result<(), ParseError> {
        for (index, raw) in data.lines().enumerate() {
            let line: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            // `:=` and `?=` assign like `=`
            let key = key.trim_end_matches([':', '?']);
            if !identifier_regex().is_match(key) {
                continue;
            }
            check_balanced(value).map_err(|reason| ParseError::MalformedConfig {
                line: index + 1,
                reason,
            })?;

            if key.ends_with("_VERSION") {
                self.macros.insert(key.to_string(), value.to_string());
            } else if let Some((name, version)) = parse_declaration(value) {
                self.declare(name, version);
            }
        }
        Ok(())
    }

    fn declare(&mut self, name: ModuleName, version: VersionSpec) {
        if self.versions.insert(name.clone(), version).is_none() {
            self.order.push(name);
        }
    }

    fn into_dependencies(mut self) -> Vec<DependencyRef> {
        self.order
            .into_iter()
            .map(|name| {
                let requested_version = match self.versions.remove(&name) {
                    Some(VersionSpec::Literal(version)) => Some(version),
                    Some(VersionSpec::Macro(variable)) => match self.macros.get(&variable) {
                        Some(version) if !version.is_empty() && !version.contains("$(") => {
                            Some(version.clone())
                        }
                        _ => {
                            debug!("Version macro {variable} of {name} is not defined locally");
                            None
                        }
                    },
                    None => None,
                };
                DependencyRef {
                    name,
                    requested_version,
                }
            })
            .collect()
    }
}

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap())
}

fn declaration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^.*/(?P<module>[^/$()]+)/(?:\$\((?P<macro>[A-Za-z0-9_]+)\)|(?P<literal>[^/$()]+))/?$",
        )
        .unwrap()
    })
}

fn parse_declaration(value: &str) -> Option<(ModuleName, VersionSpec)> {
    let captures = declaration_regex().captures(value)?;
    let module = ModuleName::from(captures.name("module")?.as_str());
    if let Some(variable) = captures.name("macro") {
        let variable = variable.as_str();
        variable
            .contains("_VERSION")
            .then(|| (module, VersionSpec::Macro(variable.to_string())))
    } else {
        let literal = captures.name("literal")?.as_str();
        is_release_tag(literal).then(|| (module, VersionSpec::Literal(literal.to_string())))
    }
}

fn check_balanced(value: &str) -> Result<(), String> {
    let mut depth: usize = 0;
    for c in value.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| format!("unexpected `)` in `{value}`"))?
            }
            _ => {}
        }
    }
    if depth == 0 {
        Ok(())
    } else {
        Err(format!("unterminated macro reference in `{value}`"))
    }
}

/// `R` followed by `-`-separated groups of dot-separated numbers, e.g. `R4.39-1.0.0`.
pub fn is_release_tag(version: &str) -> bool {
    match version.strip_prefix('R') {
        Some(rest) if rest.contains('.') => rest.split('-').all(|part| {
            part.split('.')
                .all(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        }),
        _ => false,
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum VersionChunk<'a> {
    Number(u128),
    Text(&'a str),
}

fn version_chunks(version: &str) -> Vec<VersionChunk<'_>> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let bytes = version.as_bytes();
    while start < bytes.len() {
        let numeric = bytes[start].is_ascii_digit();
        let end = bytes[start..]
            .iter()
            .position(|b| b.is_ascii_digit() != numeric)
            .map_or(bytes.len(), |offset| start + offset);
        let chunk = &version[start..end];
        chunks.push(if numeric {
            VersionChunk::Number(chunk.parse().unwrap_or(u128::MAX))
        } else {
            VersionChunk::Text(chunk)
        });
        start = end;
    }
    chunks
}

/// Natural ordering of version strings: digit runs compare numerically,
/// so `R1.10` sorts after `R1.9`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    version_chunks(a)
        .cmp(&version_chunks(b))
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(data: &str) -> Vec<DependencyRef> {
        ModuleDescriptor::from_release_str("test", "R1.0", "/tmp/test/R1.0", data)
            .unwrap()
            .dependencies
    }

    #[test]
    fn load_release_file_with_macros() {
        let str = r#"
            # RELEASE - Location of external support modules
            TEMPLATE_TOP=$(EPICS_BASE)/templates/makeBaseApp/top

            ASYN_MODULE_VERSION = R4.39-1.0.0
            AUTOSAVE_MODULE_VERSION=R5.10

            ASYN = $(EPICS_MODULES)/asyn/$(ASYN_MODULE_VERSION)
            AUTOSAVE=$(EPICS_MODULES)/autosave/$(AUTOSAVE_MODULE_VERSION)
            EPICS_BASE=$(EPICS_SITE_TOP)/base/$(BASE_MODULE_VERSION)
        "#;
        assert_eq!(
            parse(str),
            vec![
                DependencyRef::pinned("asyn", "R4.39-1.0.0"),
                DependencyRef::pinned("autosave", "R5.10"),
                DependencyRef::any("base"),
            ]
        );
    }

    #[test]
    fn last_declaration_wins() {
        let str = r#"
            ASYN=$(EPICS_MODULES)/asyn/R4.30
            CALC=$(EPICS_MODULES)/calc/R3.7
            ASYN_LOCAL=/usr/local/epics/asyn/R4.39
        "#;
        assert_eq!(
            parse(str),
            vec![
                DependencyRef::pinned("asyn", "R4.39"),
                DependencyRef::pinned("calc", "R3.7"),
            ]
        );
    }

    #[test]
    fn last_macro_definition_wins() {
        let str = r#"
            SEQ_MODULE_VERSION=R2.2.4
            SNCSEQ=$(EPICS_MODULES)/seq/$(SEQ_MODULE_VERSION)
            SEQ_MODULE_VERSION:=R2.2.9
        "#;
        assert_eq!(parse(str), vec![DependencyRef::pinned("seq", "R2.2.9")]);
    }

    #[test]
    fn ignore_unrelated_lines() {
        let str = r#"
            include $(TOP)/configure/RELEASE_SITE
            -include $(TOP)/../RELEASE.local
            CHECK_RELEASE = YES
            ifdef T_A
            TOP=..
            #ASYN=$(EPICS_MODULES)/asyn/$(ASYN_MODULE_VERSION)
            EPICS_MODULES=$(EPICS_SITE_TOP)/$(BASE_MODULE_VERSION)/modules
            IOCADMIN=$(EPICS_MODULES)/iocAdmin/$(IOCADMIN_DIR)
            endif
        "#;
        assert_eq!(parse(str), vec![]);
    }

    #[test]
    fn load_empty_release_file() {
        assert_eq!(parse(""), vec![]);
    }

    #[test]
    fn unbalanced_macro_is_malformed() {
        let str = r#"
            ASYN_MODULE_VERSION=R4.39
            ASYN=$(EPICS_MODULES/asyn/$(ASYN_MODULE_VERSION)
        "#;
        let err = ModuleDescriptor::from_release_str("test", "R1.0", "/tmp", str).unwrap_err();
        assert!(matches!(err, ParseError::MalformedConfig { line: 3, .. }));
    }

    #[test]
    fn missing_file_is_config_not_found() {
        let err = ModuleDescriptor::from_file(Path::new("/nonexistent/mod/R1.0/configure/RELEASE"))
            .unwrap_err();
        assert!(matches!(err, ParseError::ConfigNotFound(_)));
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let configure = dir.path().join("motor").join("R6.9").join("configure");
        std::fs::create_dir_all(&configure).unwrap();
        let file = configure.join("RELEASE");
        std::fs::write(&file, b"A=1\nB=\xff\xfe\n").unwrap();

        let err = ModuleDescriptor::from_file(&file).unwrap_err();
        assert!(matches!(err, ParseError::MalformedConfig { line: 2, .. }));
    }

    #[test]
    fn descriptor_from_file_uses_layout() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().join("motor").join("R6.9");
        std::fs::create_dir_all(location.join("configure")).unwrap();
        let file = location.join("configure").join("RELEASE");
        std::fs::write(&file, "ASYN=$(EPICS_MODULES)/asyn/R4.39\n").unwrap();

        let expected = ModuleDescriptor::new(
            "motor",
            "R6.9",
            location,
            vec![DependencyRef::pinned("asyn", "R4.39")],
        );
        assert_eq!(ModuleDescriptor::from_file(&file).unwrap(), expected);
    }

    #[test]
    fn layered_files_override_earlier_layers() {
        let dir = tempfile::tempdir().unwrap();
        let configure = dir.path().join("configure");
        std::fs::create_dir_all(&configure).unwrap();
        let release = configure.join("RELEASE");
        let local = configure.join("RELEASE.local");
        std::fs::write(
            &release,
            "ASYN_MODULE_VERSION=R4.30\nASYN=$(EPICS_MODULES)/asyn/$(ASYN_MODULE_VERSION)\nCALC=$(M)/calc/R3.7\n",
        )
        .unwrap();
        std::fs::write(&local, "ASYN_MODULE_VERSION=R4.39\n").unwrap();

        let descriptor = ModuleDescriptor::from_files(
            ModuleName::from("motor"),
            "R6.9",
            dir.path(),
            &[release, local],
        )
        .unwrap();
        assert_eq!(
            descriptor.dependencies,
            vec![
                DependencyRef::pinned("asyn", "R4.39"),
                DependencyRef::pinned("calc", "R3.7"),
            ]
        );
    }

    #[test]
    fn validate_release_tags() {
        assert!(is_release_tag("R4.39"));
        assert!(is_release_tag("R4.39-1.0.0"));
        assert!(!is_release_tag("R4"));
        assert!(!is_release_tag("4.39"));
        assert!(!is_release_tag("R4.39-"));
        assert!(!is_release_tag("R4.39-beta"));
        assert!(!is_release_tag("main"));
    }

    #[test]
    fn natural_version_ordering() {
        assert_eq!(compare_versions("R1.9", "R1.10"), Ordering::Less);
        assert_eq!(compare_versions("R4.39-1.0.1", "R4.39-1.0.0"), Ordering::Greater);
        assert_eq!(compare_versions("R1.2", "R1.2.1"), Ordering::Less);
        assert_eq!(compare_versions("R2.0", "R2.0"), Ordering::Equal);
    }
}
