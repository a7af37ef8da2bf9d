use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use config::{Config, ConfigError, Environment, File, FileFormat};
use home::home_dir;
use serde::Deserialize;

const CONFIG_FILE_NAME: &str = ".releasediff.toml";

pub struct ReleaseDiffConfig {
    pub epics_top: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub release_file_patterns: Option<Vec<String>>,
}

impl ReleaseDiffConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config_file = home_dir().map(|home| home.join(CONFIG_FILE_NAME));
        let raw_config = RawConfig::load(config_file.as_deref(), None)?;

        Ok(Self {
            epics_top: raw_config.epics.top,
            output_dir: raw_config.output.dir,
            release_file_patterns: raw_config.scan.patterns,
        })
    }
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct RawConfig {
    #[serde(default)]
    epics: EpicsConfig,
    #[serde(default)]
    output: OutputConfig,
    #[serde(default)]
    scan: ScanConfig,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct EpicsConfig {
    top: Option<PathBuf>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct OutputConfig {
    dir: Option<PathBuf>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct ScanConfig {
    patterns: Option<Vec<String>>,
}

impl RawConfig {
    fn load(
        config_file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(config_file) = config_file {
            builder = builder.add_source(
                File::from(config_file)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }
        builder
            .add_source(
                Environment::with_prefix("RELEASEDIFF")
                    .separator("_")
                    .list_separator(",")
                    .with_list_parse_key("scan.patterns")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }
}
