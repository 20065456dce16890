//! Plex Media Server client for the local library catalog
//!
//! Plex answers library queries with XML `MediaContainer` documents:
//!
//! ```xml
//! <MediaContainer>
//!   <Directory ratingKey="12" title="Adventure Time" year="2010" childCount="10" leafCount="283"/>
//! </MediaContainer>
//! ```
//!
//! Movies and episodes come back as `Video` elements, each holding one
//! `Media` element per encoded version and one `Part` per file of that
//! version.
//!
//! Local servers usually present self-signed certificates, so certificate
//! checks are configurable. Every failure here is fatal to the audit.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use reqwest::Client;
use tracing::debug;

use crate::audit::source::CatalogSource;
use crate::audit::types::{CatalogEpisode, CatalogMovie, CatalogShow, MediaDescriptor};
use crate::config::PlexConfig;
use crate::error::{AuditError, Result};

/// Plex API client
pub struct PlexClient {
    client: Client,
    base_url: String,
    token: String,
    movie_section: String,
    tv_section: String,
}

/// A `Video` element from a Plex library listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlexVideo {
    pub title: String,
    pub year: Option<i32>,
    /// Show title (`grandparentTitle`), episodes only
    pub show_title: Option<String>,
    /// Season title (`parentTitle`), episodes only
    pub season_title: Option<String>,
    /// Season number (`parentIndex`), episodes only
    pub season_index: Option<u32>,
    pub media: Vec<MediaDescriptor>,
}

impl PlexClient {
    pub fn new(config: &PlexConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create Plex HTTP client")?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            movie_section: config.movie_section.clone(),
            tv_section: config.tv_section.clone(),
        })
    }

    /// Fetch an XML document from the server
    async fn fetch_xml(&self, path: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        debug!(path = %path, "Fetching Plex library data");

        let response = self
            .client
            .get(&url)
            .query(&[("X-Plex-Token", self.token.as_str())])
            .header("accept", "application/xml")
            .send()
            .await
            .map_err(|source| AuditError::CatalogRequest {
                path: path.to_string(),
                // The request URL carries the token.
                source: source.without_url(),
            })?;

        if !response.status().is_success() {
            return Err(AuditError::CatalogStatus {
                path: path.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|source| AuditError::CatalogRequest {
                path: path.to_string(),
                // The request URL carries the token.
                source: source.without_url(),
            })
    }
}

#[async_trait]
impl CatalogSource for PlexClient {
    async fn list_shows(&self) -> Result<Vec<CatalogShow>> {
        let xml = self
            .fetch_xml(&format!("/library/sections/{}/all", self.tv_section))
            .await?;
        parse_shows(&xml)
    }

    async fn list_movies(&self) -> Result<Vec<CatalogMovie>> {
        let xml = self
            .fetch_xml(&format!("/library/sections/{}/all", self.movie_section))
            .await?;
        Ok(parse_videos(&xml)?
            .into_iter()
            .map(PlexVideo::into_movie)
            .collect())
    }

    async fn list_episodes(&self, show: &CatalogShow) -> Result<Vec<CatalogEpisode>> {
        let xml = self
            .fetch_xml(&format!("/library/metadata/{}/allLeaves", show.rating_key))
            .await?;
        Ok(parse_videos(&xml)?
            .into_iter()
            .map(|video| video.into_episode(&show.title))
            .collect())
    }
}

impl PlexVideo {
    pub fn into_movie(self) -> CatalogMovie {
        CatalogMovie {
            title: self.title,
            year: self.year,
            media: self.media,
        }
    }

    /// Episode record, falling back to the owning show's title
    pub fn into_episode(self, show_title: &str) -> CatalogEpisode {
        let season_title = match (self.season_title, self.season_index) {
            (Some(title), _) => title,
            (None, Some(index)) => format!("Season {index}"),
            (None, None) => "Unknown Season".to_string(),
        };
        CatalogEpisode {
            show_title: self.show_title.unwrap_or_else(|| show_title.to_string()),
            season_title,
            title: self.title,
            media: self.media,
        }
    }
}

/// Parse the `Directory` entries of a TV section listing
pub fn parse_shows(xml: &str) -> Result<Vec<CatalogShow>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut shows = Vec::new();
    let mut saw_container = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"MediaContainer" => saw_container = true,
                b"Directory" if saw_container => {
                    shows.push(show_from_attributes(&attributes(e))?);
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(AuditError::document(format!("invalid XML: {e}"))),
            _ => {}
        }
    }

    if !saw_container {
        return Err(AuditError::document("missing MediaContainer element"));
    }

    debug!(count = shows.len(), "Parsed shows from Plex");
    Ok(shows)
}

fn show_from_attributes(attrs: &HashMap<String, String>) -> Result<CatalogShow> {
    let title = required(attrs, "title", "Directory")?;
    Ok(CatalogShow {
        rating_key: required(attrs, "ratingKey", &title)?,
        year: attrs.get("year").and_then(|y| y.parse().ok()),
        season_count: parse_count(attrs, "childCount", &title)?,
        episode_count: parse_count(attrs, "leafCount", &title)?,
        title,
    })
}

fn required(attrs: &HashMap<String, String>, key: &str, owner: &str) -> Result<String> {
    attrs
        .get(key)
        .cloned()
        .ok_or_else(|| AuditError::document(format!("{owner} is missing the {key} attribute")))
}

fn parse_count(attrs: &HashMap<String, String>, key: &str, title: &str) -> Result<u32> {
    let raw = required(attrs, key, title)?;
    raw.trim().parse::<u32>().map_err(|_| {
        AuditError::document(format!("'{title}' has a non-numeric {key}: '{raw}'"))
    })
}

#[derive(Default)]
struct MediaBuilder {
    bitrate: u32,
    resolution: String,
    parts: u32,
}

impl MediaBuilder {
    fn from_attributes(attrs: &HashMap<String, String>) -> Self {
        Self {
            // Missing bitrate reads as 0 so the version is flagged, not hidden.
            bitrate: attrs
                .get("bitrate")
                .and_then(|b| b.parse().ok())
                .unwrap_or(0),
            resolution: attrs.get("videoResolution").cloned().unwrap_or_default(),
            parts: 0,
        }
    }

    fn build(self) -> MediaDescriptor {
        MediaDescriptor {
            bitrate: self.bitrate,
            resolution: self.resolution,
            file_count: self.parts.max(1),
        }
    }
}

/// Parse the `Video` entries of a movie section or an `allLeaves` listing
pub fn parse_videos(xml: &str) -> Result<Vec<PlexVideo>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut videos = Vec::new();
    let mut video: Option<PlexVideo> = None;
    let mut media: Option<MediaBuilder> = None;
    let mut saw_container = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                saw_container |= e.name().as_ref() == b"MediaContainer";
                open_element(e, &mut video, &mut media);
            }
            Ok(Event::Empty(ref e)) => {
                saw_container |= e.name().as_ref() == b"MediaContainer";
                open_element(e, &mut video, &mut media);
                close_element(e.name().as_ref(), &mut videos, &mut video, &mut media);
            }
            Ok(Event::End(ref e)) => {
                close_element(e.name().as_ref(), &mut videos, &mut video, &mut media);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(AuditError::document(format!("invalid XML: {e}"))),
            _ => {}
        }
    }

    if !saw_container {
        return Err(AuditError::document("missing MediaContainer element"));
    }

    debug!(count = videos.len(), "Parsed videos from Plex");
    Ok(videos)
}

fn open_element(e: &BytesStart, video: &mut Option<PlexVideo>, media: &mut Option<MediaBuilder>) {
    match e.name().as_ref() {
        b"Video" => {
            let attrs = attributes(e);
            *video = Some(PlexVideo {
                title: attrs.get("title").cloned().unwrap_or_default(),
                year: attrs.get("year").and_then(|y| y.parse().ok()),
                show_title: attrs.get("grandparentTitle").cloned(),
                season_title: attrs.get("parentTitle").cloned(),
                season_index: attrs.get("parentIndex").and_then(|i| i.parse().ok()),
                media: Vec::new(),
            });
        }
        b"Media" if video.is_some() => {
            *media = Some(MediaBuilder::from_attributes(&attributes(e)));
        }
        b"Part" => {
            if let Some(m) = media.as_mut() {
                m.parts += 1;
            }
        }
        _ => {}
    }
}

fn close_element(
    name: &[u8],
    videos: &mut Vec<PlexVideo>,
    video: &mut Option<PlexVideo>,
    media: &mut Option<MediaBuilder>,
) {
    match name {
        b"Media" => {
            if let Some(m) = media.take()
                && let Some(v) = video.as_mut()
            {
                v.media.push(m.build());
            }
        }
        b"Video" => {
            if let Some(v) = video.take() {
                videos.push(v);
            }
        }
        _ => {}
    }
}

/// Attribute map with XML entities unescaped
fn attributes(e: &BytesStart) -> HashMap<String, String> {
    e.attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr
                .unescape_value()
                .map(|v| v.to_string())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).to_string());
            (key, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TV_SECTION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MediaContainer size="2" librarySectionTitle="TV Shows">
  <Directory ratingKey="12" key="/library/metadata/12/children" title="Adventure Time" year="2010" leafCount="283" childCount="10">
    <Genre tag="Animation" />
  </Directory>
  <Directory ratingKey="40" key="/library/metadata/40/children" title="Law &amp; Order" leafCount="20" childCount="2" />
</MediaContainer>"#;

    const MOVIE_SECTION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MediaContainer size="3">
  <Video ratingKey="1" title="Heat" year="1995">
    <Media id="1" bitrate="2110" videoResolution="1080">
      <Part id="1" file="/movies/Heat.mkv" />
    </Media>
  </Video>
  <Video ratingKey="2" title="Alien" year="1979">
    <Media id="2" bitrate="9000" videoResolution="1080">
      <Part id="2" file="/movies/Alien.mkv" />
    </Media>
    <Media id="3" bitrate="1500" videoResolution="sd">
      <Part id="3" file="/movies/Alien.cd1.avi" />
      <Part id="4" file="/movies/Alien.cd2.avi" />
    </Media>
  </Video>
  <Video ratingKey="3" title="No Info">
    <Media id="5" />
  </Video>
</MediaContainer>"#;

    const ALL_LEAVES: &str = r#"<MediaContainer size="2">
  <Video ratingKey="100" title="Tree Trunks" grandparentTitle="Adventure Time" parentTitle="Season 1" parentIndex="1">
    <Media bitrate="2855" videoResolution="720"><Part id="9" /></Media>
  </Video>
  <Video ratingKey="101" title="Untitled" parentIndex="2">
    <Media bitrate="2698" videoResolution="720"><Part id="10" /></Media>
  </Video>
</MediaContainer>"#;

    #[test]
    fn test_parse_shows() {
        let shows = parse_shows(TV_SECTION).unwrap();
        assert_eq!(
            shows,
            vec![
                CatalogShow {
                    rating_key: "12".to_string(),
                    title: "Adventure Time".to_string(),
                    year: Some(2010),
                    season_count: 10,
                    episode_count: 283,
                },
                CatalogShow {
                    rating_key: "40".to_string(),
                    title: "Law & Order".to_string(),
                    year: None,
                    season_count: 2,
                    episode_count: 20,
                },
            ]
        );
    }

    #[test]
    fn test_parse_shows_rejects_non_numeric_counts() {
        let xml = r#"<MediaContainer><Directory ratingKey="1" title="Foo" childCount="two" leafCount="20"/></MediaContainer>"#;
        let err = parse_shows(xml).unwrap_err();
        assert_matches!(err, AuditError::CatalogDocument(msg) if msg.contains("childCount"));
    }

    #[test]
    fn test_parse_requires_media_container() {
        assert!(parse_shows("<html><body>Unauthorized</body></html>").is_err());
        assert!(parse_videos("").is_err());
    }

    #[test]
    fn test_parse_movies() {
        let movies: Vec<CatalogMovie> = parse_videos(MOVIE_SECTION)
            .unwrap()
            .into_iter()
            .map(PlexVideo::into_movie)
            .collect();

        assert_eq!(movies.len(), 3);
        assert_eq!(movies[0].title, "Heat");
        assert_eq!(
            movies[0].media,
            vec![MediaDescriptor {
                bitrate: 2110,
                resolution: "1080".to_string(),
                file_count: 1,
            }]
        );

        assert_eq!(movies[1].media.len(), 2);
        assert_eq!(movies[1].media[1].file_count, 2);

        // Self-closing Media with no attributes still counts as one version.
        assert_eq!(
            movies[2].media,
            vec![MediaDescriptor {
                bitrate: 0,
                resolution: String::new(),
                file_count: 1,
            }]
        );
    }

    #[test]
    fn test_parse_episodes_with_fallbacks() {
        let episodes: Vec<CatalogEpisode> = parse_videos(ALL_LEAVES)
            .unwrap()
            .into_iter()
            .map(|v| v.into_episode("Adventure Time"))
            .collect();

        assert_eq!(episodes[0].show_title, "Adventure Time");
        assert_eq!(episodes[0].season_title, "Season 1");
        assert_eq!(episodes[1].show_title, "Adventure Time");
        assert_eq!(episodes[1].season_title, "Season 2");
        assert_eq!(episodes[1].media[0].bitrate, 2698);
    }

    fn config(url: &str) -> PlexConfig {
        PlexConfig {
            url: url.to_string(),
            token: "plex-token".to_string(),
            movie_section: "4".to_string(),
            tv_section: "5".to_string(),
            accept_invalid_certs: true,
        }
    }

    #[tokio::test]
    async fn test_list_shows_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/library/sections/5/all"))
            .and(query_param("X-Plex-Token", "plex-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(TV_SECTION))
            .mount(&server)
            .await;

        let client = PlexClient::new(&config(&server.uri())).unwrap();
        let shows = client.list_shows().await.unwrap();
        assert_eq!(shows.len(), 2);
    }

    #[tokio::test]
    async fn test_list_episodes_uses_rating_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/library/metadata/12/allLeaves"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ALL_LEAVES))
            .mount(&server)
            .await;

        let client = PlexClient::new(&config(&server.uri())).unwrap();
        let show = CatalogShow {
            rating_key: "12".to_string(),
            title: "Adventure Time".to_string(),
            year: Some(2010),
            season_count: 10,
            episode_count: 283,
        };
        let episodes = client.list_episodes(&show).await.unwrap();
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].title, "Tree Trunks");
    }

    #[tokio::test]
    async fn test_connection_error_hides_token() {
        let mut plex = config("http://127.0.0.1:1");
        plex.token = "SUPERSECRET".to_string();

        let client = PlexClient::new(&plex).unwrap();
        let err = client.list_shows().await.unwrap_err();
        assert_matches!(err, AuditError::CatalogRequest { .. });

        let text = err.to_string();
        assert!(text.contains("/library/sections/5/all"), "{text}");
        assert!(!text.contains("SUPERSECRET"), "{text}");
        assert!(!format!("{err:?}").contains("SUPERSECRET"));
    }

    #[tokio::test]
    async fn test_unauthorized_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/library/sections/4/all"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = PlexClient::new(&config(&server.uri())).unwrap();
        let err = client.list_movies().await.unwrap_err();
        assert_matches!(err, AuditError::CatalogStatus { status: 401, .. });
    }
}
