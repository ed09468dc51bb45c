use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// clockwork-sim: replay timer scenarios on a virtual clock
///
/// Registers the timers and tickers of a scenario on a fake clock, advances
/// it step by step and prints every expiration in firing order.
#[derive(Debug, Parser, Clone)]
#[command(about, long_about, version)]
pub struct Cli {
    /// Path to the scenario file.
    ///
    /// Without it the scenario is empty unless steps are given with
    /// `--advance`.
    #[arg(short, long, value_parser = validate_file)]
    pub conffile: Option<PathBuf>,

    /// Extra step in milliseconds, appended after the scenario's steps.
    ///
    /// May be repeated.
    #[arg(short, long = "advance", value_parser = parse_millis)]
    pub advance: Vec<Duration>,

    /// Print the effective scenario as TOML and exit.
    #[arg(long)]
    pub dump_config: bool,

    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,
}

/// Check if the file exists.
#[inline(always)]
fn validate_file(file: &str) -> Result<PathBuf, String> {
    let path = Path::new(file);
    if path.exists() {
        Ok(path.to_owned())
    } else {
        Err(format!("File not found: {:?}", path))
    }
}

/// Parse a non-negative number of milliseconds.
#[inline(always)]
fn parse_millis(millis: &str) -> Result<Duration, String> {
    millis
        .parse()
        .map(Duration::from_millis)
        .map_err(|_| format!("`{millis}` is not a valid number of milliseconds"))
}
