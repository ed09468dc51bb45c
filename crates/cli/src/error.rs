use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to load scenario: {0}")]
    Config(#[from] config::Error),

    #[error("Failed to write report: {0}")]
    Output(#[source] io::Error),
}
