#![forbid(unsafe_code)]

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config: {0}")]
    Figment(#[from] figment::Error),

    #[error("failed to parse TOML: {0}")]
    TomlDe(#[from] toml_edit::de::Error),

    #[error("failed to serialize TOML: {0}")]
    TomlSer(#[from] toml_edit::ser::Error),

    #[error("invalid path: {0}")]
    InvalidPath(PathBuf),

    #[error("ticker `{name}` has a non-positive period")]
    InvalidPeriod { name: String },

    #[error("name `{0}` is used by more than one timer or ticker")]
    DuplicateName(String),
}
