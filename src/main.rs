//! Media Auditor command-line entry point

use std::io::IsTerminal;

use clap::Parser;
use serde::Serialize;

use media_auditor::audit::{self, FixedDelay};
use media_auditor::cli::{Cli, Command};
use media_auditor::config::Config;
use media_auditor::services::{PlexClient, TmdbClient};
use media_auditor::{logging, report};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.log_format, cli.log_stream());

    let config = Config::from_env()?;
    let settings = config.audit_settings();
    let styled = !cli.no_color && std::io::stdout().is_terminal();

    tracing::debug!(
        plex_url = %config.plex.url,
        exclusions = settings.exclusions.len(),
        thresholds = settings.thresholds.len(),
        "Configuration loaded"
    );

    match &cli.command {
        Command::Seasons => {
            // Fail on a missing token before touching the network.
            let token = config.require_tmdb_token()?.to_string();
            let catalog = PlexClient::new(&config.plex)?;
            let reference = TmdbClient::with_base_url(token, &config.tmdb_url)?;
            let pacer = FixedDelay::new(settings.lookup_delay);

            let result = audit::audit_seasons(&catalog, &reference, &pacer, &settings).await?;
            emit(cli.json, &result, || report::season_report(&result, styled))?;
        }
        Command::Bitrates { .. } => {
            let catalog = PlexClient::new(&config.plex)?;
            let scope = cli.command.scope();
            let result = audit::audit_bitrates(&catalog, &settings, scope).await?;
            emit(cli.json, &result, || report::bitrate_report(&result, scope, styled))?;
        }
        Command::Duplicates => {
            let catalog = PlexClient::new(&config.plex)?;
            let result = audit::audit_duplicates(&catalog).await?;
            emit(cli.json, &result, || report::duplicate_report(&result, styled))?;
        }
    }

    Ok(())
}

fn emit<T: Serialize>(
    json: bool,
    value: &T,
    render: impl FnOnce() -> Vec<String>,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        for line in render() {
            println!("{line}");
        }
    }
    Ok(())
}
