use clap::Parser;
use tradedesk::cli::{Cli, run};
use tradedesk::logging::init_logging;

fn main() -> std::process::ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli)
}
