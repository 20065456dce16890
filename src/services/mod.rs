//! HTTP clients for the Plex catalog and the TMDB reference database

pub mod plex;
pub mod rate_limiter;
pub mod tmdb;

pub use plex::PlexClient;
pub use rate_limiter::{RateLimitConfig, RateLimitedClient};
pub use tmdb::TmdbClient;
