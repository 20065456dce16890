//! Plain-text rendering of audit results
//!
//! Each renderer returns the lines to print. Styling uses crossterm and is
//! optional so reports stay readable when piped.
//!
//! Episode trees look like:
//!
//! ```text
//! Adventure Time
//! └── Season 1
//!     └── Tree Trunks                    2855
//!     └── Memories of Boom Boom Mountain 2698
//! ```

use crossterm::style::{Stylize, style};

use crate::audit::grouping::NestedGroup;
use crate::audit::{
    AuditScope, BitrateAudit, DuplicateAudit, DuplicateEntry, FlaggedMedia, SeasonAudit,
};

/// How far below its threshold a bitrate sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitrateSeverity {
    /// Under half the threshold, or no threshold known
    Critical,
    /// Under three quarters of the threshold
    Poor,
    Marginal,
}

impl BitrateSeverity {
    pub fn classify(bitrate: u32, threshold: Option<u32>) -> Self {
        let Some(threshold) = threshold else {
            return Self::Critical;
        };
        // Widen so 3/4 of a large threshold cannot overflow.
        let bitrate = u64::from(bitrate);
        let threshold = u64::from(threshold);
        if bitrate * 2 < threshold {
            Self::Critical
        } else if bitrate * 4 < threshold * 3 {
            Self::Poor
        } else {
            Self::Marginal
        }
    }
}

fn paint_bitrate(media: &FlaggedMedia, styled: bool) -> String {
    let text = media.bitrate.to_string();
    if !styled {
        return text;
    }
    match BitrateSeverity::classify(media.bitrate, media.bitrate_threshold) {
        BitrateSeverity::Critical => style(text).white().on_red().bold().to_string(),
        BitrateSeverity::Poor => style(text).black().on_yellow().bold().to_string(),
        BitrateSeverity::Marginal => style(text).white().on_blue().bold().to_string(),
    }
}

fn heading(text: &str, styled: bool) -> String {
    if styled {
        style(text).bold().to_string()
    } else {
        text.to_string()
    }
}

fn title_width<'a>(titles: impl Iterator<Item = &'a str>) -> usize {
    titles.map(|t| t.chars().count()).max().unwrap_or(0)
}

/// Movies below their threshold, lowest bitrate first, titles aligned
pub fn movie_bitrate_report(movies: &[FlaggedMedia], styled: bool) -> Vec<String> {
    if movies.is_empty() {
        return vec!["No movies fall below their bitrate threshold.".to_string()];
    }

    let mut sorted: Vec<&FlaggedMedia> = movies.iter().collect();
    sorted.sort_by_key(|m| m.bitrate);

    let width = title_width(sorted.iter().map(|m| m.title.as_str()));
    let mut lines = vec![heading("These movies do not meet the specified bitrate:", styled)];
    lines.extend(
        sorted
            .into_iter()
            .map(|m| format!("{:<width$} - {}", m.title, paint_bitrate(m, styled))),
    );
    lines
}

/// Show / season / episode tree, a blank line after each show
pub fn tv_bitrate_report(episodes: &NestedGroup<FlaggedMedia>, styled: bool) -> Vec<String> {
    if episodes.is_empty() {
        return vec!["No episodes fall below their bitrate threshold.".to_string()];
    }

    let mut lines = vec![heading("These episodes do not meet the specified bitrate:", styled)];
    render_tree(episodes, &mut lines, |width, ep| {
        format!("{:<width$} {}", ep.title, paint_bitrate(ep, styled))
    });
    lines
}

/// Sections for whichever halves of the library were audited
pub fn bitrate_report(audit: &BitrateAudit, scope: AuditScope, styled: bool) -> Vec<String> {
    let mut lines = Vec::new();
    if scope.includes_movies() {
        lines.extend(movie_bitrate_report(&audit.movies, styled));
    }
    if scope.includes_shows() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.extend(tv_bitrate_report(&audit.episodes, styled));
    }
    lines
}

/// Shows whose local counts disagree with TMDB
pub fn season_report(audit: &SeasonAudit, styled: bool) -> Vec<String> {
    let mut lines = Vec::new();
    if audit.mismatched.is_empty() {
        lines.push(format!(
            "All {} checked shows match their reference counts.",
            audit.checked
        ));
    } else {
        lines.push(heading("These shows may have new seasons or episodes:", styled));
        let width = title_width(audit.mismatched.iter().map(|e| e.show.title.as_str()));
        for enriched in &audit.mismatched {
            let show = &enriched.show;
            let reference = &enriched.reference;
            let mut line = format!(
                "{:<width$}  seasons {} / {}  episodes {} / {}",
                show.title,
                show.season_count,
                reference.season_count,
                show.episode_count,
                reference.episode_count,
            );
            if let Some(status) = &reference.status {
                line.push_str(&format!("  ({status})"));
            }
            lines.push(line);
        }
    }

    if !audit.skipped.is_empty() {
        lines.push(format!(
            "{} shows were excluded or could not be matched.",
            audit.skipped.len()
        ));
    }
    lines
}

/// Movie titles and the episode tree of items with several versions
pub fn duplicate_report(audit: &DuplicateAudit, styled: bool) -> Vec<String> {
    let mut lines = Vec::new();

    if audit.movies.is_empty() {
        lines.push("No movies have duplicate media files.".to_string());
    } else {
        lines.push(heading(
            "Here are your movies that may have duplicated media files:",
            styled,
        ));
        lines.extend(audit.movies.iter().map(describe_duplicate));
    }

    lines.push(String::new());

    if audit.episodes.is_empty() {
        lines.push("No episodes have duplicate media files.".to_string());
    } else {
        lines.push(heading(
            "Here are your tv episodes that may have duplicated media files:",
            styled,
        ));
        render_tree(&audit.episodes, &mut lines, |width, entry| {
            format!("{:<width$} ({} copies)", entry.title, entry.copies)
        });
    }
    lines
}

fn describe_duplicate(entry: &DuplicateEntry) -> String {
    format!("{} ({} copies)", entry.title, entry.copies)
}

/// Shared show/season tree layout; `leaf` gets the season's title width
fn render_tree<T: HasTitle>(
    group: &NestedGroup<T>,
    lines: &mut Vec<String>,
    leaf: impl Fn(usize, &T) -> String,
) {
    for show in group.shows() {
        lines.push(show.title.clone());
        for season in &show.seasons {
            lines.push(format!("└── {}", season.title));
            let width = title_width(season.items.iter().map(HasTitle::title));
            for item in &season.items {
                lines.push(format!("    └── {}", leaf(width, item)));
            }
        }
        lines.push(String::new());
    }
}

trait HasTitle {
    fn title(&self) -> &str;
}

impl HasTitle for FlaggedMedia {
    fn title(&self) -> &str {
        &self.title
    }
}

impl HasTitle for DuplicateEntry {
    fn title(&self) -> &str {
        &self.title
    }
}
