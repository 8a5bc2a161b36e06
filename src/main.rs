use clap::Parser;
use stackdiff_cli::cli::output::Output;
use stackdiff_cli::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = cli.run().await {
        Output::error(&err);
        std::process::exit(err.exit_code());
    }
}
