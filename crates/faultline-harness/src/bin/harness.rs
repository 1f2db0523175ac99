//! CLI entrypoint for the faultline scenario harness.

use clap::Parser;
use faultline_harness::Scenario;
use faultline_harness::scenario;

/// Runs one fault scenario in this process.
#[derive(Debug, Parser)]
#[command(name = "faultline-harness")]
#[command(about = "Drive faultline's abort paths in a disposable process")]
struct Cli {
    /// Identifier prefixed to report lines.
    #[arg(long)]
    identifier: Option<u32>,
    /// Leave the core-size limit alone (by default no core file is written).
    #[arg(long)]
    keep_core: bool,
    #[command(subcommand)]
    scenario: Scenario,
}

fn main() {
    let cli = Cli::parse();
    if !cli.keep_core {
        disable_core_dumps();
    }
    scenario::run(cli.identifier, &cli.scenario);
}

fn disable_core_dumps() {
    let limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: setrlimit only reads `limit`.
    unsafe { libc::setrlimit(libc::RLIMIT_CORE, &limit) };
}
