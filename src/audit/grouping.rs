//! Show → season → item grouping that keeps first-seen order
//!
//! Both the bitrate audit and the duplicate audit fold a flat, ordered list
//! of episodes into this structure. A show's position is fixed the first
//! time it is seen, and likewise for a season within its show. Later items
//! append to the existing season list.

use serde::ser::{Serialize, SerializeMap, Serializer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonGroup<T> {
    pub title: String,
    pub items: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowGroup<T> {
    pub title: String,
    pub seasons: Vec<SeasonGroup<T>>,
}

impl<T> ShowGroup<T> {
    pub fn season(&self, title: &str) -> Option<&SeasonGroup<T>> {
        self.seasons.iter().find(|s| s.title == title)
    }
}

/// Insertion-ordered nested grouping keyed by show, then season
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedGroup<T> {
    shows: Vec<ShowGroup<T>>,
}

impl<T> Default for NestedGroup<T> {
    fn default() -> Self {
        Self { shows: Vec::new() }
    }
}

impl<T> NestedGroup<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `item` at `[show, season]`, creating either level on first sight
    pub fn insert(&mut self, show: &str, season: &str, item: T) {
        let show_group = match self.shows.iter().position(|s| s.title == show) {
            Some(idx) => &mut self.shows[idx],
            None => {
                self.shows.push(ShowGroup {
                    title: show.to_string(),
                    seasons: Vec::new(),
                });
                let last = self.shows.len() - 1;
                &mut self.shows[last]
            }
        };

        match show_group.seasons.iter_mut().find(|s| s.title == season) {
            Some(season_group) => season_group.items.push(item),
            None => show_group.seasons.push(SeasonGroup {
                title: season.to_string(),
                items: vec![item],
            }),
        }
    }

    pub fn shows(&self) -> &[ShowGroup<T>] {
        &self.shows
    }

    pub fn show(&self, title: &str) -> Option<&ShowGroup<T>> {
        self.shows.iter().find(|s| s.title == title)
    }

    /// Items stored at `[show, season]`
    pub fn get(&self, show: &str, season: &str) -> Option<&[T]> {
        self.show(show)
            .and_then(|s| s.season(season))
            .map(|s| s.items.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.shows.is_empty()
    }

    /// Total number of items across every show and season
    pub fn item_count(&self) -> usize {
        self.shows
            .iter()
            .flat_map(|s| &s.seasons)
            .map(|s| s.items.len())
            .sum()
    }
}

impl<T, S1, S2> Extend<(S1, S2, T)> for NestedGroup<T>
where
    S1: AsRef<str>,
    S2: AsRef<str>,
{
    fn extend<I: IntoIterator<Item = (S1, S2, T)>>(&mut self, iter: I) {
        for (show, season, item) in iter {
            self.insert(show.as_ref(), season.as_ref(), item);
        }
    }
}

impl<T, S1, S2> FromIterator<(S1, S2, T)> for NestedGroup<T>
where
    S1: AsRef<str>,
    S2: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = (S1, S2, T)>>(iter: I) -> Self {
        let mut group = Self::new();
        group.extend(iter);
        group
    }
}

// Serializes as {"Show": {"Season 1": [items...]}} with insertion order kept.
impl<T: Serialize> Serialize for NestedGroup<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.shows.len()))?;
        for show in &self.shows {
            map.serialize_entry(&show.title, &SeasonsMap(&show.seasons))?;
        }
        map.end()
    }
}

struct SeasonsMap<'a, T>(&'a [SeasonGroup<T>]);

impl<T: Serialize> Serialize for SeasonsMap<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for season in self.0 {
            map.serialize_entry(&season.title, &season.items)?;
        }
        map.end()
    }
}
