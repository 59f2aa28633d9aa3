use clap::Parser;
use rlt_flow::cli::{self, Cli, ExitCode};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    match cli::run(cli).await {
        ExitCode::Success => std::process::ExitCode::from(0),
        ExitCode::ThresholdFailure => std::process::ExitCode::from(1),
        ExitCode::ConfigError => std::process::ExitCode::from(2),
    }
}
