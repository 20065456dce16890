//! Rate-limited sequential walker
//!
//! Enriches catalog shows with reference records one show at a time. Every
//! show that is not excluded costs exactly one pause, taken before its first
//! lookup, so a walk over N shows never takes less than `N * delay` and never
//! hits the reference API faster than one show per delay. A failed lookup
//! skips that show only; the walk always runs to the end of its input.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::audit::source::ReferenceSource;
use crate::audit::types::{CatalogShow, EnrichedShow};

/// Suspends the walker between shows
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self);
}

/// Sleeps a fixed delay on every pause
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl Pacer for FixedDelay {
    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Why a show produced no enriched record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Listed in the exclusion set; never looked up
    Excluded,
    /// The reference search returned no candidate
    NoMatch,
    /// A candidate was found but its details were unusable
    MalformedDetails { external_id: u64 },
    /// The reference API could not be reached or answered with an error
    LookupFailed(String),
}

/// Exactly one of these is produced per input show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkOutcome {
    Enriched(EnrichedShow),
    Skipped { show: CatalogShow, reason: SkipReason },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkReport {
    pub outcomes: Vec<WalkOutcome>,
}

impl WalkReport {
    pub fn enriched(&self) -> impl Iterator<Item = &EnrichedShow> {
        self.outcomes.iter().filter_map(|o| match o {
            WalkOutcome::Enriched(e) => Some(e),
            WalkOutcome::Skipped { .. } => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&CatalogShow, &SkipReason)> {
        self.outcomes.iter().filter_map(|o| match o {
            WalkOutcome::Skipped { show, reason } => Some((show, reason)),
            WalkOutcome::Enriched(_) => None,
        })
    }

    pub fn into_enriched(self) -> Vec<EnrichedShow> {
        self.outcomes
            .into_iter()
            .filter_map(|o| match o {
                WalkOutcome::Enriched(e) => Some(e),
                WalkOutcome::Skipped { .. } => None,
            })
            .collect()
    }
}

pub struct ShowWalker<'a> {
    reference: &'a dyn ReferenceSource,
    pacer: &'a dyn Pacer,
    exclusions: &'a HashSet<String>,
}

impl<'a> ShowWalker<'a> {
    pub fn new(
        reference: &'a dyn ReferenceSource,
        pacer: &'a dyn Pacer,
        exclusions: &'a HashSet<String>,
    ) -> Self {
        Self {
            reference,
            pacer,
            exclusions,
        }
    }

    /// Walk `shows` in order, enriching each one that resolves
    pub async fn walk(&self, shows: Vec<CatalogShow>) -> WalkReport {
        let mut outcomes = Vec::with_capacity(shows.len());

        for show in shows {
            if self.exclusions.contains(&show.title) {
                debug!(show = %show.title, "Skipping excluded show");
                outcomes.push(WalkOutcome::Skipped {
                    show,
                    reason: SkipReason::Excluded,
                });
                continue;
            }

            // Pause first so a failed lookup still pays its delay.
            self.pacer.pause().await;
            info!("Processing: {}...", show.title);

            outcomes.push(self.enrich(show).await);
        }

        WalkReport { outcomes }
    }

    async fn enrich(&self, show: CatalogShow) -> WalkOutcome {
        let external_id = match self.reference.find_id(&show.title, show.year).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                warn!(show = %show.title, year = ?show.year, "Failed to find a reference match");
                return WalkOutcome::Skipped {
                    show,
                    reason: SkipReason::NoMatch,
                };
            }
            Err(e) => {
                warn!(show = %show.title, year = ?show.year, error = %e, "Reference search failed");
                return WalkOutcome::Skipped {
                    show,
                    reason: SkipReason::LookupFailed(e.to_string()),
                };
            }
        };

        match self.reference.get_details(external_id).await {
            Ok(Some(reference)) => {
                debug!(
                    show = %show.title,
                    external_id,
                    seasons = reference.season_count,
                    episodes = reference.episode_count,
                    "Enriched show"
                );
                WalkOutcome::Enriched(EnrichedShow { show, reference })
            }
            Ok(None) => {
                warn!(show = %show.title, external_id, "Reference details were unusable");
                WalkOutcome::Skipped {
                    show,
                    reason: SkipReason::MalformedDetails { external_id },
                }
            }
            Err(e) => {
                warn!(show = %show.title, external_id, error = %e, "Reference details lookup failed");
                WalkOutcome::Skipped {
                    show,
                    reason: SkipReason::LookupFailed(e.to_string()),
                }
            }
        }
    }
}
