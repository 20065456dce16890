//! The three audits, wired from catalog to grouped results
//!
//! - Seasons: walk every show through the reference database and keep the
//!   ones whose counts disagree.
//! - Bitrates: flag single-version movies and episodes encoded below their
//!   resolution's threshold.
//! - Duplicates: list movies and episodes backed by more than one version.
//!
//! Catalog failures abort an audit. Reference failures only skip a show.

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::audit::grouping::NestedGroup;
use crate::audit::policy::{
    ThresholdTable, bitrate_candidate, classify_bitrate, is_count_mismatch, is_duplicate,
};
use crate::audit::source::{CatalogSource, ReferenceSource};
use crate::audit::types::{
    CatalogEpisode, CatalogMovie, DuplicateEntry, EnrichedShow, FlaggedMedia, MediaItem,
};
use crate::audit::walker::{Pacer, ShowWalker, SkipReason};
use crate::error::Result;

/// Everything the pipeline needs that used to come from the environment
#[derive(Debug, Clone)]
pub struct AuditSettings {
    /// Show titles the season audit never looks up
    pub exclusions: HashSet<String>,
    /// Minimum pause before each reference lookup
    pub lookup_delay: Duration,
    pub thresholds: ThresholdTable,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            exclusions: HashSet::new(),
            lookup_delay: Duration::from_millis(1000),
            thresholds: ThresholdTable::default(),
        }
    }
}

/// Which half of the library the bitrate audit covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuditScope {
    #[default]
    All,
    MoviesOnly,
    ShowsOnly,
}

impl AuditScope {
    pub fn includes_movies(self) -> bool {
        matches!(self, AuditScope::All | AuditScope::MoviesOnly)
    }

    pub fn includes_shows(self) -> bool {
        matches!(self, AuditScope::All | AuditScope::ShowsOnly)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeasonAudit {
    /// Shows whose counts disagree with the reference, in catalog order
    pub mismatched: Vec<EnrichedShow>,
    /// Shows that were looked up and compared
    pub checked: usize,
    /// Titles that were excluded or could not be resolved
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BitrateAudit {
    /// Sorted ascending by bitrate
    pub movies: Vec<FlaggedMedia>,
    pub episodes: NestedGroup<FlaggedMedia>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DuplicateAudit {
    pub movies: Vec<DuplicateEntry>,
    pub episodes: NestedGroup<DuplicateEntry>,
}

/// Compare every catalog show against the reference database
pub async fn audit_seasons(
    catalog: &dyn CatalogSource,
    reference: &dyn ReferenceSource,
    pacer: &dyn Pacer,
    settings: &AuditSettings,
) -> Result<SeasonAudit> {
    info!("Auditing new seasons...");
    let shows = catalog.list_shows().await?;
    info!(count = shows.len(), "Loaded shows from catalog");

    let walker = ShowWalker::new(reference, pacer, &settings.exclusions);
    let report = walker.walk(shows).await;

    let skipped = report
        .skipped()
        .map(|(show, reason)| {
            if *reason != SkipReason::Excluded {
                debug!(show = %show.title, reason = ?reason, "Show not compared");
            }
            show.title.clone()
        })
        .collect();

    let enriched = report.into_enriched();
    let checked = enriched.len();
    let mismatched = enriched.into_iter().filter(is_count_mismatch).collect();

    Ok(SeasonAudit {
        mismatched,
        checked,
        skipped,
    })
}

/// Flag movies below their bitrate threshold, lowest bitrate first
pub fn flag_movie_bitrates(movies: &[CatalogMovie], table: &ThresholdTable) -> Vec<FlaggedMedia> {
    let mut flagged: Vec<FlaggedMedia> = movies
        .iter()
        .filter_map(|movie| flag_item(movie, table))
        .collect();
    // Stable: equal bitrates keep catalog order.
    flagged.sort_by_key(|m| m.bitrate);
    flagged
}

/// Flag episodes below their bitrate threshold, grouped by show and season
pub fn flag_episode_bitrates(
    episodes: &[CatalogEpisode],
    table: &ThresholdTable,
) -> NestedGroup<FlaggedMedia> {
    episodes
        .iter()
        .filter_map(|ep| {
            flag_item(ep, table).map(|flagged| (&ep.show_title, &ep.season_title, flagged))
        })
        .collect()
}

fn flag_item<I: MediaItem>(item: &I, table: &ThresholdTable) -> Option<FlaggedMedia> {
    let Some(media) = bitrate_candidate(item.media()) else {
        debug!(
            title = %item.title(),
            versions = item.media().len(),
            "Skipping bitrate check, item does not have exactly one media version"
        );
        return None;
    };

    let verdict = classify_bitrate(media, table);
    verdict.is_flagged().then(|| FlaggedMedia {
        title: item.title().to_string(),
        bitrate: media.bitrate,
        resolution: media.resolution.clone(),
        bitrate_threshold: verdict.threshold(),
    })
}

pub fn find_duplicate_movies(movies: &[CatalogMovie]) -> Vec<DuplicateEntry> {
    movies.iter().filter_map(duplicate_entry).collect()
}

/// Group episodes with more than one media version by show and season
pub fn find_duplicate_episodes(episodes: &[CatalogEpisode]) -> NestedGroup<DuplicateEntry> {
    episodes
        .iter()
        .filter_map(|ep| duplicate_entry(ep).map(|entry| (&ep.show_title, &ep.season_title, entry)))
        .collect()
}

fn duplicate_entry<I: MediaItem>(item: &I) -> Option<DuplicateEntry> {
    is_duplicate(item.media()).then(|| DuplicateEntry {
        title: item.title().to_string(),
        copies: item.media().len(),
    })
}

/// Every episode in the TV library, show by show in catalog order
pub async fn collect_episodes(catalog: &dyn CatalogSource) -> Result<Vec<CatalogEpisode>> {
    let shows = catalog.list_shows().await?;
    let mut episodes = Vec::new();
    for show in &shows {
        let mut show_episodes = catalog.list_episodes(show).await?;
        debug!(show = %show.title, count = show_episodes.len(), "Loaded episodes");
        episodes.append(&mut show_episodes);
    }
    Ok(episodes)
}

pub async fn audit_bitrates(
    catalog: &dyn CatalogSource,
    settings: &AuditSettings,
    scope: AuditScope,
) -> Result<BitrateAudit> {
    info!("Auditing file bitrates...");
    let mut audit = BitrateAudit::default();

    if scope.includes_movies() {
        let movies = catalog.list_movies().await?;
        audit.movies = flag_movie_bitrates(&movies, &settings.thresholds);
        info!(
            checked = movies.len(),
            flagged = audit.movies.len(),
            "Movie bitrate audit complete"
        );
    }

    if scope.includes_shows() {
        let episodes = collect_episodes(catalog).await?;
        audit.episodes = flag_episode_bitrates(&episodes, &settings.thresholds);
        info!(
            checked = episodes.len(),
            flagged = audit.episodes.item_count(),
            "Episode bitrate audit complete"
        );
    }

    Ok(audit)
}

pub async fn audit_duplicates(catalog: &dyn CatalogSource) -> Result<DuplicateAudit> {
    info!("Auditing duplicate files...");
    let movies = catalog.list_movies().await?;
    let episodes = collect_episodes(catalog).await?;

    let audit = DuplicateAudit {
        movies: find_duplicate_movies(&movies),
        episodes: find_duplicate_episodes(&episodes),
    };
    info!(
        movies = audit.movies.len(),
        episodes = audit.episodes.item_count(),
        "Duplicate audit complete"
    );
    Ok(audit)
}
