use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "bioethicare",
    version,
    about = "BioEthiCare 360 clinical bioethics deliberation service"
)]
struct Cli {
    #[arg(
        long,
        env = "BIOETHICARE_CONFIG",
        help = "Config file (default: ./bioethicare.toml, then the user config dir)"
    )]
    config: Option<PathBuf>,
    #[arg(
        long,
        env = "BIOETHICARE_BIND",
        help = "Listen address, overrides [server] bind"
    )]
    bind: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let options = bioethicare_lib::RunOptions {
        config_path: cli.config,
        bind: cli.bind,
    };
    match bioethicare_lib::run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("bioethicare: {e}");
            ExitCode::FAILURE
        }
    }
}
