//! TMDB (The Movie Database) API client for TV show reference counts
//!
//! Base URL: https://api.themoviedb.org/3
//!
//! Authentication uses a v4 read access token sent as a bearer token.
//! A search that matches nothing, or a details response without an `id`,
//! is reported as `None` rather than an error; the walker skips the show.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::rate_limiter::RateLimitedClient;
use crate::audit::source::ReferenceSource;
use crate::audit::types::ReferenceRecord;

pub const DEFAULT_TMDB_URL: &str = "https://api.themoviedb.org/3";

/// TMDB API client with rate limiting
pub struct TmdbClient {
    client: RateLimitedClient,
    base_url: String,
    token: String,
}

/// TV search response from TMDB
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbTvSearchResult {
    pub total_results: Option<u32>,
    #[serde(default)]
    pub results: Vec<TmdbTvSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbTvSummary {
    pub id: u64,
    pub name: Option<String>,
    pub first_air_date: Option<String>,
}

/// TV details from TMDB; every field optional so error bodies still parse
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbTvDetails {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub number_of_seasons: Option<u32>,
    pub number_of_episodes: Option<u32>,
    pub status: Option<String>,
}

impl TmdbTvDetails {
    /// Reference record, if TMDB echoed the id and both counts back
    pub fn into_record(self) -> Option<ReferenceRecord> {
        Some(ReferenceRecord {
            external_id: self.id?,
            season_count: self.number_of_seasons?,
            episode_count: self.number_of_episodes?,
            status: self.status,
        })
    }
}

impl TmdbClient {
    pub fn with_base_url(token: String, base_url: &str) -> Result<Self> {
        Ok(Self {
            client: RateLimitedClient::for_tmdb()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn get<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        query: &T,
    ) -> Result<reqwest::Response> {
        let bearer = format!("Bearer {}", self.token);
        self.client
            .get_with_headers_and_query(
                url,
                &[("accept", "application/json"), ("authorization", bearer.as_str())],
                query,
            )
            .await
    }

    /// Search for a TV show by name and first-air year
    pub async fn search_tv(&self, query: &str, year: Option<i32>) -> Result<TmdbTvSearchResult> {
        let url = format!("{}/search/tv", self.base_url);
        let mut params: Vec<(&str, String)> = vec![("query", query.to_string())];
        if let Some(y) = year {
            params.push(("first_air_date_year", y.to_string()));
        }

        let response = self.get(&url, &params).await?;

        if response.status().as_u16() == 429 {
            warn!("TMDB rate limit hit");
            anyhow::bail!("Rate limited (429)");
        }

        if response.status().as_u16() == 401 {
            anyhow::bail!("TMDB API token is invalid");
        }

        if !response.status().is_success() {
            anyhow::bail!("TMDB search failed with status: {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse TMDB search results")
    }

    /// Get TV show details by TMDB ID
    pub async fn get_tv(&self, tmdb_id: u64) -> Result<TmdbTvDetails> {
        let url = format!("{}/tv/{}", self.base_url, tmdb_id);
        let response = self.get(&url, &[("language", "en-US")]).await?;

        if response.status().as_u16() == 429 {
            warn!("TMDB rate limit hit");
            anyhow::bail!("Rate limited (429)");
        }

        // TMDB answers unknown ids with a JSON body that lacks an id.
        if response.status().as_u16() == 404 {
            return Ok(TmdbTvDetails::default());
        }

        if !response.status().is_success() {
            anyhow::bail!("TMDB get tv failed with status: {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse TMDB tv details")
    }
}

#[async_trait]
impl ReferenceSource for TmdbClient {
    async fn find_id(&self, title: &str, year: Option<i32>) -> Result<Option<u64>> {
        let search = self.search_tv(title, year).await?;
        let best = search.results.into_iter().next();
        if let Some(ref hit) = best {
            debug!(
                title = %title,
                tmdb_id = hit.id,
                total_results = ?search.total_results,
                name = ?hit.name,
                first_air_date = ?hit.first_air_date,
                "TMDB search matched"
            );
        }
        Ok(best.map(|hit| hit.id))
    }

    async fn get_details(&self, id: u64) -> Result<Option<ReferenceRecord>> {
        Ok(self.get_tv(id).await?.into_record())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_details_without_id_are_malformed() {
        let details: TmdbTvDetails =
            serde_json::from_str(r#"{"success":false,"status_code":34}"#).unwrap();
        assert!(details.into_record().is_none());
    }

    #[test]
    fn test_details_into_record() {
        let details: TmdbTvDetails = serde_json::from_str(
            r#"{"id":1396,"name":"Breaking Bad","number_of_seasons":5,"number_of_episodes":62,"status":"Ended"}"#,
        )
        .unwrap();
        assert_eq!(
            details.into_record(),
            Some(ReferenceRecord {
                external_id: 1396,
                season_count: 5,
                episode_count: 62,
                status: Some("Ended".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn test_find_id_takes_first_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/tv"))
            .and(query_param("query", "Adventure Time"))
            .and(query_param("first_air_date_year", "2010"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"page":1,"total_results":2,"results":[{"id":15260,"name":"Adventure Time"},{"id":99,"name":"Other"}]}"#,
            ))
            .mount(&server)
            .await;

        let client = TmdbClient::with_base_url("secret".to_string(), &server.uri()).unwrap();
        let id = client.find_id("Adventure Time", Some(2010)).await.unwrap();
        assert_eq!(id, Some(15260));
    }

    #[tokio::test]
    async fn test_find_id_without_total_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/tv"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"page":1,"results":[{"id":4242,"name":"Bluey"}]}"#),
            )
            .mount(&server)
            .await;

        let client = TmdbClient::with_base_url("secret".to_string(), &server.uri()).unwrap();
        assert_eq!(client.find_id("Bluey", Some(2018)).await.unwrap(), Some(4242));
    }

    #[tokio::test]
    async fn test_find_id_no_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/tv"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"page":1,"total_results":0,"results":[]}"#),
            )
            .mount(&server)
            .await;

        let client = TmdbClient::with_base_url("secret".to_string(), &server.uri()).unwrap();
        assert_eq!(client.find_id("Nothing", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_id_unauthorized_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/tv"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = TmdbClient::with_base_url("bad".to_string(), &server.uri()).unwrap();
        let err = client.find_id("Anything", None).await.unwrap_err();
        assert!(err.to_string().contains("invalid"));
    }

    #[tokio::test]
    async fn test_get_details_not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tv/404"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_string(r#"{"success":false,"status_code":34}"#),
            )
            .mount(&server)
            .await;

        let client = TmdbClient::with_base_url("secret".to_string(), &server.uri()).unwrap();
        assert_eq!(client.get_details(404).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_details_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tv/15260"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"id":15260,"number_of_seasons":10,"number_of_episodes":283,"status":"Ended"}"#,
            ))
            .mount(&server)
            .await;

        let client = TmdbClient::with_base_url("secret".to_string(), &server.uri()).unwrap();
        let record = client.get_details(15260).await.unwrap().unwrap();
        assert_eq!(record.season_count, 10);
        assert_eq!(record.episode_count, 283);
        assert_eq!(record.status.as_deref(), Some("Ended"));
    }
}
