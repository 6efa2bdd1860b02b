use clap::Parser;
use connectly::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve(Default::default())) {
        Command::Serve(args) => cli::serve::run(args).await,
    }
}
