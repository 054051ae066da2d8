use clap::Parser;
use tracing_subscriber::EnvFilter;

use hal_column::cli;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("hal_column=debug,info")
    } else {
        EnvFilter::new("hal_column=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        cli::Commands::Columns(args) => {
            cli::columns::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Blocks(args) => {
            cli::blocks::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Map(args) => {
            cli::map::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
