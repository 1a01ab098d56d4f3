use anyhow::Result;
use clap::Parser;
use rent_widget::cli;

/// Log to stderr; stdout carries the report and host messages.
fn init_tracing(quiet: bool) {
    let default_filter = if quiet { "rent_widget=warn" } else { "rent_widget=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_tracing(args.quiet || args.json);

    match cli::run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!("{e:#}");
            std::process::exit(1);
        }
    }
}
