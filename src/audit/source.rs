//! Seams between the audit pipeline and the outside world
//!
//! The Plex and TMDB clients in `services` implement these; tests plug in
//! in-memory fixtures.

use anyhow::Result as AnyResult;
use async_trait::async_trait;

use crate::audit::types::{CatalogEpisode, CatalogMovie, CatalogShow, ReferenceRecord};
use crate::error::Result;

/// The local media server's library
///
/// Any error here is fatal to the run: there is nothing to audit without
/// the catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn list_shows(&self) -> Result<Vec<CatalogShow>>;

    async fn list_movies(&self) -> Result<Vec<CatalogMovie>>;

    /// Every episode of `show`, in catalog order
    async fn list_episodes(&self, show: &CatalogShow) -> Result<Vec<CatalogEpisode>>;
}

/// The external metadata database used as ground truth
///
/// `Ok(None)` means no match or an unusable response. Errors are transport
/// failures; callers treat both as a per-show skip.
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    /// Best-guess external id for a show title and first-air year
    async fn find_id(&self, title: &str, year: Option<i32>) -> AnyResult<Option<u64>>;

    /// Authoritative counts for an external id
    async fn get_details(&self, id: u64) -> AnyResult<Option<ReferenceRecord>>;
}
