use clap::Parser;

use book_digest::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    run(cli)
}
