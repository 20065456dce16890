//! Command-line interface: one subcommand per audit.

use clap::{Parser, Subcommand, ValueEnum};

use crate::audit::AuditScope;
use crate::logging::LogStream;

#[derive(Debug, Parser)]
#[command(
    name = "media-auditor",
    version,
    about = "Audit a Plex library for new seasons, low bitrates and duplicate files"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Print results as JSON instead of a text report
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored report output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[arg(long, global = true, value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compare season and episode counts against TMDB
    Seasons,
    /// List movies and episodes encoded below their resolution's bitrate
    Bitrates {
        #[arg(long, conflicts_with = "shows_only")]
        movies_only: bool,
        #[arg(long)]
        shows_only: bool,
    },
    /// List movies and episodes backed by more than one media version
    Duplicates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Cli {
    /// JSON results own stdout, so diagnostics move to stderr
    pub fn log_stream(&self) -> LogStream {
        if self.json {
            LogStream::Stderr
        } else {
            LogStream::Stdout
        }
    }
}

impl Command {
    pub fn scope(&self) -> AuditScope {
        match self {
            Command::Bitrates {
                movies_only: true, ..
            } => AuditScope::MoviesOnly,
            Command::Bitrates {
                shows_only: true, ..
            } => AuditScope::ShowsOnly,
            _ => AuditScope::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_parse_bitrates_scope() {
        let cli = Cli::try_parse_from(["media-auditor", "bitrates", "--shows-only"]).unwrap();
        assert_eq!(cli.command.scope(), AuditScope::ShowsOnly);
        assert_eq!(cli.log_format, LogFormat::Text);
        assert!(!cli.json);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["media-auditor", "seasons", "--json", "--log-format", "json"])
                .unwrap();
        assert_matches!(cli.command, Command::Seasons);
        assert!(cli.json);
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn test_json_output_moves_logs_to_stderr() {
        let cli = Cli::try_parse_from(["media-auditor", "duplicates", "--json"]).unwrap();
        assert_eq!(cli.log_stream(), LogStream::Stderr);

        let cli = Cli::try_parse_from(["media-auditor", "duplicates"]).unwrap();
        assert_eq!(cli.log_stream(), LogStream::Stdout);
    }

    #[test]
    fn test_scope_flags_conflict() {
        assert!(
            Cli::try_parse_from(["media-auditor", "bitrates", "--movies-only", "--shows-only"])
                .is_err()
        );
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["media-auditor"]).is_err());
    }
}
