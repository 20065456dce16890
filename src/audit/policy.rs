//! Classification policy
//!
//! Pure predicates deciding whether a catalog item is worth reporting:
//! - season/episode counts disagreeing with the reference database
//! - a single media version encoded below the bitrate its resolution requires
//! - more than one media version behind one library entry
//!
//! Items with several media versions are never bitrate-audited. They are
//! reported by the duplicate audit instead.

use std::collections::HashMap;

use tracing::warn;

use crate::audit::types::{EnrichedShow, MediaDescriptor};
use crate::error::{AuditError, Result};

/// Required bitrate (kbps) per resolution tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdTable {
    entries: HashMap<String, u32>,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self::from_pairs([
            ("4k", 15000),
            ("1080", 8000),
            ("720", 4000),
            ("576", 2000),
            ("480", 1500),
            ("sd", 1500),
        ])
    }
}

impl ThresholdTable {
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, u32)>,
        K: AsRef<str>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (normalize_resolution(k.as_ref()), v))
                .collect(),
        }
    }

    /// Parse a `res=kbps` list such as `"1080=8000, 720=4000"`
    pub fn parse(spec: &str) -> Result<Self> {
        let mut entries = HashMap::new();
        for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (resolution, kbps) = pair.split_once('=').ok_or_else(|| {
                AuditError::config(
                    "BITRATE_THRESHOLDS",
                    format!("expected resolution=kbps, got '{pair}'"),
                )
            })?;
            let kbps: u32 = kbps.trim().parse().map_err(|_| {
                AuditError::config(
                    "BITRATE_THRESHOLDS",
                    format!("invalid bitrate '{}' for {}", kbps.trim(), resolution.trim()),
                )
            })?;
            entries.insert(normalize_resolution(resolution), kbps);
        }

        if entries.is_empty() {
            return Err(AuditError::config(
                "BITRATE_THRESHOLDS",
                "threshold table is empty",
            ));
        }

        Ok(Self { entries })
    }

    pub fn get(&self, resolution: &str) -> Option<u32> {
        self.entries.get(&normalize_resolution(resolution)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Plex reports "1080", Sonarr-style names say "1080p"; treat them alike
fn normalize_resolution(resolution: &str) -> String {
    let lower = resolution.trim().to_lowercase();
    match lower.strip_suffix('p') {
        Some(digits) if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) => {
            digits.to_string()
        }
        _ => lower,
    }
}

/// Outcome of checking one media version against the threshold table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitrateVerdict {
    Meets { threshold: u32 },
    Below { threshold: u32 },
    /// No table entry for the resolution; always flagged
    UnknownResolution,
}

impl BitrateVerdict {
    pub fn is_flagged(&self) -> bool {
        !matches!(self, BitrateVerdict::Meets { .. })
    }

    pub fn threshold(&self) -> Option<u32> {
        match self {
            BitrateVerdict::Meets { threshold } | BitrateVerdict::Below { threshold } => {
                Some(*threshold)
            }
            BitrateVerdict::UnknownResolution => None,
        }
    }
}

/// True when the catalog disagrees with the reference on seasons or episodes
pub fn is_count_mismatch(enriched: &EnrichedShow) -> bool {
    enriched.show.season_count != enriched.reference.season_count
        || enriched.show.episode_count != enriched.reference.episode_count
}

/// Check a media version against the table, logging unknown resolutions
pub fn classify_bitrate(media: &MediaDescriptor, table: &ThresholdTable) -> BitrateVerdict {
    match table.get(&media.resolution) {
        Some(threshold) if media.bitrate < threshold => BitrateVerdict::Below { threshold },
        Some(threshold) => BitrateVerdict::Meets { threshold },
        None => {
            warn!(
                resolution = %media.resolution,
                bitrate = media.bitrate,
                "Unrecognized resolution, no bitrate threshold configured"
            );
            BitrateVerdict::UnknownResolution
        }
    }
}

pub fn is_below_threshold(media: &MediaDescriptor, table: &ThresholdTable) -> bool {
    classify_bitrate(media, table).is_flagged()
}

/// The one media version eligible for bitrate auditing, if there is exactly one
pub fn bitrate_candidate(media: &[MediaDescriptor]) -> Option<&MediaDescriptor> {
    match media {
        [only] => Some(only),
        _ => None,
    }
}

pub fn is_duplicate(media: &[MediaDescriptor]) -> bool {
    media.len() > 1
}
