use clap::Parser;
use clockwork_sim::{cli::Cli, runner};
use config::Config;
use std::io::{self, Write};
use tracing::debug;
use tracing_log::AsTrace;

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity.log_level_filter().as_trace())
        .with_writer(io::stderr)
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    debug!(config = ?cli);

    let config = match &cli.conffile {
        Some(path) => Config::load(path)?,
        _ => Config::new(),
    };

    let mut stdout = io::stdout().lock();
    if cli.dump_config {
        stdout.write_all(config.to_toml()?.as_bytes())?;
        return Ok(());
    }

    let report = runner::run(&config, &cli.advance);
    debug!(
        firings = report.firings.len(),
        pending = report.pending,
        "scenario finished"
    );
    report.write_to(&mut stdout)?;
    Ok(())
}
