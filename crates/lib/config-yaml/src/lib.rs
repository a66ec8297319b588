//! YAML configuration loading for imaplar.

use std::path::{Path, PathBuf};

use config_core::Config;

/// Errors returned while loading YAML configuration.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// None of the candidate files exists.
    #[error("no config file found in paths: {paths:?}")]
    NotFound {
        /// The paths that were tried.
        paths: Vec<PathBuf>,
    },

    /// Failed to read the YAML file from disk.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the YAML contents.
    #[error("failed to parse YAML config {path}: {source}")]
    Parse {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying YAML parse error.
        #[source]
        source: serde_yaml_bw::Error,
    },
}

/// A loaded configuration and where it came from.
#[derive(Debug)]
pub struct Loaded {
    /// The configuration.
    pub config: Config,

    /// The file it was read from.
    pub path: PathBuf,
}

/// Load configuration from a YAML file on disk.
pub async fn load_from_path<P>(path: P) -> Result<Config, LoadError>
where
    P: AsRef<Path>,
{
    let path_ref = path.as_ref();
    let contents = tokio::fs::read_to_string(path_ref)
        .await
        .map_err(|source| LoadError::Read {
            path: path_ref.to_path_buf(),
            source,
        })?;

    parse_contents(path_ref, &contents)
}

/// Load configuration from the first of `paths` that exists.
///
/// Paths are tried in order; a missing file moves on to the next, any other
/// read error stops the search.
pub async fn load_first<P>(paths: &[P]) -> Result<Loaded, LoadError>
where
    P: AsRef<Path>,
{
    for path in paths {
        let path_ref = path.as_ref();
        match tokio::fs::read_to_string(path_ref).await {
            Ok(contents) => {
                return Ok(Loaded {
                    config: parse_contents(path_ref, &contents)?,
                    path: path_ref.to_path_buf(),
                });
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => continue,
            Err(source) => {
                return Err(LoadError::Read {
                    path: path_ref.to_path_buf(),
                    source,
                });
            }
        }
    }

    Err(LoadError::NotFound {
        paths: paths.iter().map(|p| p.as_ref().to_path_buf()).collect(),
    })
}

fn parse_contents(path: &Path, contents: &str) -> Result<Config, LoadError> {
    parse_yaml_str(contents).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse configuration directly from a YAML string.
pub fn parse_yaml_str(contents: &str) -> Result<Config, serde_yaml_bw::Error> {
    serde_yaml_bw::from_str(contents)
}
