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
    thilo_site::logging::init().context("init logging")?;

    let cli = thilo_site::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        thilo_site::cli::Command::Build(args) => {
            thilo_site::build::run(args).await.context("build")?;
        }
        thilo_site::cli::Command::Mappings(args) => {
            thilo_site::mapping::run(args).context("mappings")?;
        }
        thilo_site::cli::Command::Render(args) => {
            thilo_site::page::run(args).await.context("render")?;
        }
        thilo_site::cli::Command::Palette(args) => {
            thilo_site::palette::run(args).context("palette")?;
        }
        thilo_site::cli::Command::Resolve(args) => {
            thilo_site::mapping::resolve(args).context("resolve")?;
        }
    }

    Ok(())
}
