use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    sitepdf::logging::init().context("init logging")?;

    let cli = sitepdf::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        sitepdf::cli::Command::Build(args) => {
            sitepdf::build::run(args).await.context("build")?;
        }
        sitepdf::cli::Command::Chapters(args) => {
            sitepdf::build::chapters(args).await.context("chapters")?;
        }
        sitepdf::cli::Command::Profiles(args) => {
            sitepdf::profile::run(args).context("profiles")?;
        }
    }

    Ok(())
}
