//! Library audit pipeline
//!
//! Catalog → walker (reference enrichment) → policy → grouping. Everything
//! here is independent of Plex and TMDB; the HTTP clients live in
//! `services` and plug in through the traits in [`source`].

pub mod grouping;
pub mod pipeline;
pub mod policy;
pub mod source;
pub mod types;
pub mod walker;

pub use grouping::NestedGroup;
pub use pipeline::{
    AuditScope, AuditSettings, BitrateAudit, DuplicateAudit, SeasonAudit, audit_bitrates,
    audit_duplicates, audit_seasons,
};
pub use policy::{BitrateVerdict, ThresholdTable};
pub use source::{CatalogSource, ReferenceSource};
pub use types::{
    CatalogEpisode, CatalogMovie, CatalogShow, DuplicateEntry, EnrichedShow, FlaggedMedia,
    MediaDescriptor, ReferenceRecord,
};
pub use walker::{FixedDelay, Pacer, ShowWalker, SkipReason, WalkOutcome, WalkReport};
