use libbiji::{
    location::Coordinate,
    map::{DEFAULT_CENTER, DEFAULT_STYLE_URL, DEFAULT_ZOOM, MapOptions},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;

pub(crate) const ENV_BACKEND_URL: &str = "BIJI_BACKEND_URL";
pub(crate) const ENV_BACKEND_PRINCIPAL: &str = "BIJI_BACKEND_PRINCIPAL";
pub(crate) const ENV_MAP_TOKEN: &str = "BIJI_MAP_TOKEN";

const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(thiserror::Error, Debug)]
pub(crate) enum ConfigError {
    #[error("No value for '{key}': set it in the config file or in the {env} environment variable")]
    Missing {
        key: &'static str,
        env: &'static str,
    },
    #[error("Cannot find default project config directory")]
    NoConfigDir,
    #[error("Couldn't read config file '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Couldn't parse config file '{}'", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Invalid map center")]
    InvalidCenter(#[source] libbiji::Error),
}

#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct BackendSection {
    pub(crate) url: Option<String>,
    pub(crate) principal: Option<String>,
    pub(crate) poll_interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct MapSection {
    pub(crate) access_token: Option<SecretString>,
    pub(crate) style_url: Option<String>,
    /// `[longitude, latitude]`
    pub(crate) center: Option<[f64; 2]>,
    pub(crate) zoom: Option<f64>,
}

/// The contents of the config file. Every value is optional here; required
/// values may also come from the environment.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct FileConfig {
    #[serde(default)]
    pub(crate) backend: BackendSection,
    #[serde(default)]
    pub(crate) map: MapSection,
}

impl FileConfig {
    pub(crate) fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }
}

/// The configuration after merging the file and the environment
#[derive(Debug)]
pub(crate) struct Config {
    pub(crate) path: PathBuf,
    pub(crate) backend_url: String,
    pub(crate) principal: String,
    pub(crate) poll_interval: Duration,
    pub(crate) map: MapOptions,
}

/// The default location of the config file
pub(crate) fn config_file() -> Result<PathBuf, ConfigError> {
    let project_dirs = directories::ProjectDirs::from("org", "biji", "mapbiji")
        .ok_or(ConfigError::NoConfigDir)?;
    Ok(project_dirs.config_dir().join("config.yaml"))
}

fn required(
    value: Option<String>,
    key: &'static str,
    env: &'static str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    lookup(env)
        .or(value)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing { key, env })
}

impl Config {
    /// Load the config file at `path`, or at the default location if no path
    /// is given, and apply the environment. A missing file at the default
    /// location is treated as an empty file.
    pub(crate) async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (config_file()?, false),
        };
        debug!(?path, "Trying to load config");
        let file = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => FileConfig::parse(&contents).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config file, using the environment only");
                FileConfig::default()
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        Self::resolve(path, file, |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with the values returned by `lookup`. The
    /// environment takes priority over the file.
    pub(crate) fn resolve(
        path: PathBuf,
        file: FileConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let FileConfig { backend, map } = file;
        let backend_url = required(backend.url, "backend.url", ENV_BACKEND_URL, &lookup)?;
        let principal = required(
            backend.principal,
            "backend.principal",
            ENV_BACKEND_PRINCIPAL,
            &lookup,
        )?;
        let token = required(
            map.access_token.map(|t| t.expose_secret().to_string()),
            "map.access_token",
            ENV_MAP_TOKEN,
            &lookup,
        )?;

        let center = map.center.map(Coordinate::from).unwrap_or(DEFAULT_CENTER);
        center.validate().map_err(ConfigError::InvalidCenter)?;
        let mut options = MapOptions::new(SecretString::from(token));
        options.center = center;
        options.zoom = map.zoom.unwrap_or(DEFAULT_ZOOM);
        options.style_url = map
            .style_url
            .unwrap_or_else(|| DEFAULT_STYLE_URL.to_string());

        Ok(Self {
            path,
            backend_url,
            principal,
            poll_interval: Duration::from_millis(
                backend.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            map: options,
        })
    }
}
