//! Data model shared by the audit pipeline

use serde::Serialize;

/// A TV show as the local catalog reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogShow {
    /// Catalog key used to list the show's episodes
    #[serde(skip)]
    pub rating_key: String,
    pub title: String,
    /// First-air year, when the catalog knows it
    pub year: Option<i32>,
    /// Season count as reported by the catalog
    pub season_count: u32,
    /// Episode count as reported by the catalog
    pub episode_count: u32,
}

/// One encoded file version of a movie or episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaDescriptor {
    /// Overall bitrate in kbps
    pub bitrate: u32,
    /// Resolution tag as reported by the catalog ("1080", "720", "sd", "4k", ...)
    pub resolution: String,
    /// Number of file parts making up this version (at least 1)
    pub file_count: u32,
}

/// Anything in the catalog that owns media descriptors
pub trait MediaItem {
    fn title(&self) -> &str;
    fn media(&self) -> &[MediaDescriptor];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogMovie {
    pub title: String,
    pub year: Option<i32>,
    pub media: Vec<MediaDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEpisode {
    pub show_title: String,
    pub season_title: String,
    pub title: String,
    pub media: Vec<MediaDescriptor>,
}

impl MediaItem for CatalogMovie {
    fn title(&self) -> &str {
        &self.title
    }

    fn media(&self) -> &[MediaDescriptor] {
        &self.media
    }
}

impl MediaItem for CatalogEpisode {
    fn title(&self) -> &str {
        &self.title
    }

    fn media(&self) -> &[MediaDescriptor] {
        &self.media
    }
}

/// Authoritative counts for a show from the reference database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceRecord {
    pub external_id: u64,
    pub season_count: u32,
    pub episode_count: u32,
    /// e.g. "Returning Series", "Ended"
    pub status: Option<String>,
}

/// A catalog show paired with its reference record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedShow {
    pub show: CatalogShow,
    pub reference: ReferenceRecord,
}

/// A movie or episode that failed the bitrate threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlaggedMedia {
    pub title: String,
    pub bitrate: u32,
    pub resolution: String,
    /// `None` when the resolution had no entry in the threshold table
    pub bitrate_threshold: Option<u32>,
}

/// A movie or episode backed by more than one media version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateEntry {
    pub title: String,
    pub copies: usize,
}
