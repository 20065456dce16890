//! Media Auditor - audits a Plex library against TMDB and local quality rules
//!
//! Three audits are available:
//! - seasons: shows whose season or episode counts differ from TMDB
//! - bitrates: movies and episodes encoded below their resolution's threshold
//! - duplicates: movies and episodes backed by more than one media version

pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod services;
