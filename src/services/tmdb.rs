/// TMDB (The Movie Database) API client
///
/// Covers the endpoints the bot relies on: person/movie search, the genre
/// catalog, movie details and credits, the paginated discover query, the
/// curated top-rated/upcoming lists, poster URLs, and guest-session ratings.
///
/// All calls are plain GET/POST with the API key as a query parameter. There
/// is deliberately no retry, backoff, or rate limiting here; a non-success
/// status surfaces as `AppError::ExternalApi` and callers decide what to do.
use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::{
    error::{AppError, AppResult},
    models::{
        CreditsResponse, GenreListResponse, GuestSessionResponse, MovieDetails, MovieListKind,
        MovieResult, MovieSummary, Person, SearchResponse,
    },
};

/// Filters applied to one discover query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoverFilters {
    pub genre_id: Option<i64>,
    pub actor_id: Option<i64>,
    pub primary_release_year: Option<i32>,
    pub min_runtime: Option<i64>,
}

/// Film-metadata catalog abstraction
///
/// The bot engine and the discovery engine only ever talk to this trait, which
/// keeps the remote catalog mockable in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Resolve an actor name to the first matching person, None when the
    /// search comes back empty.
    async fn search_person(&self, name: &str) -> AppResult<Option<Person>>;

    /// Resolve a movie title to the first matching movie id.
    async fn search_movie_id(&self, title: &str) -> AppResult<Option<i64>>;

    /// Genre name → genre id catalog.
    async fn genres(&self) -> AppResult<HashMap<String, i64>>;

    async fn movie_details(&self, movie_id: i64) -> AppResult<MovieDetails>;

    /// Leading cast names for a movie, at most `limit` entries.
    async fn movie_credits(&self, movie_id: i64, limit: usize) -> AppResult<Vec<String>>;

    /// One page of the discover query, most popular first, adult and
    /// video-only content excluded.
    async fn discover(&self, page: u32, filters: &DiscoverFilters)
        -> AppResult<Vec<MovieSummary>>;

    /// A curated TMDB list (top rated / upcoming).
    async fn movie_list(&self, kind: MovieListKind) -> AppResult<Vec<MovieSummary>>;

    /// Full poster image URL for a movie, None when it has no poster.
    async fn poster_url(&self, movie_id: i64) -> AppResult<Option<String>>;

    /// Submit a 1-10 rating through a fresh guest session.
    async fn rate_movie(&self, movie_id: i64, value: f64) -> AppResult<()>;
}

#[derive(Clone)]
pub struct TmdbClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    image_url: String,
}

impl TmdbClient {
    /// Creates a new TMDB client with a hard per-call timeout
    pub fn new(
        api_key: String,
        api_url: String,
        image_url: String,
        timeout: Duration,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url,
            image_url,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        let url = format!("{}{}", self.api_url, path);

        let mut query: Vec<(&str, String)> = vec![("api_key", self.api_key.clone())];
        query.extend_from_slice(params);

        let response = self.http_client.get(&url).query(&query).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }
}

/// Builds the query parameters for one discover page
fn discover_params(page: u32, filters: &DiscoverFilters) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("sort_by", "popularity.desc".to_string()),
        ("include_adult", "false".to_string()),
        ("include_video", "false".to_string()),
        ("page", page.to_string()),
    ];

    if let Some(year) = filters.primary_release_year {
        params.push(("primary_release_year", year.to_string()));
    }
    if let Some(genre_id) = filters.genre_id {
        params.push(("with_genres", genre_id.to_string()));
    }
    if let Some(actor_id) = filters.actor_id {
        params.push(("with_cast", actor_id.to_string()));
    }
    if let Some(min_runtime) = filters.min_runtime {
        params.push(("with_runtime.gte", min_runtime.to_string()));
    }

    params
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbClient {
    async fn search_person(&self, name: &str) -> AppResult<Option<Person>> {
        let response: SearchResponse<Person> = self
            .get_json("/search/person", &[("query", name.to_string())])
            .await?;

        if response.total_results == 0 {
            tracing::debug!(query = %name, "No results found for that actor");
            return Ok(None);
        }

        Ok(response.results.into_iter().next())
    }

    async fn search_movie_id(&self, title: &str) -> AppResult<Option<i64>> {
        let response: SearchResponse<MovieResult> = self
            .get_json("/search/movie", &[("query", title.to_string())])
            .await?;

        if response.total_results == 0 {
            tracing::debug!(query = %title, "No movie found with that name");
            return Ok(None);
        }

        Ok(response.results.into_iter().next().map(|movie| movie.id))
    }

    async fn genres(&self) -> AppResult<HashMap<String, i64>> {
        let response: GenreListResponse = self.get_json("/genre/movie/list", &[]).await?;

        Ok(response
            .genres
            .into_iter()
            .map(|genre| (genre.name, genre.id))
            .collect())
    }

    async fn movie_details(&self, movie_id: i64) -> AppResult<MovieDetails> {
        self.get_json(
            &format!("/movie/{}", movie_id),
            &[("language", "en-US".to_string())],
        )
        .await
    }

    async fn movie_credits(&self, movie_id: i64, limit: usize) -> AppResult<Vec<String>> {
        let response: CreditsResponse = self
            .get_json(&format!("/movie/{}/credits", movie_id), &[])
            .await?;

        Ok(response
            .cast
            .into_iter()
            .take(limit)
            .map(|member| member.name)
            .collect())
    }

    async fn discover(
        &self,
        page: u32,
        filters: &DiscoverFilters,
    ) -> AppResult<Vec<MovieSummary>> {
        let params = discover_params(page, filters);
        let response: SearchResponse<MovieSummary> =
            self.get_json("/discover/movie", &params).await?;

        Ok(response.results)
    }

    async fn movie_list(&self, kind: MovieListKind) -> AppResult<Vec<MovieSummary>> {
        let response: SearchResponse<MovieSummary> = self
            .get_json(
                &format!("/movie/{}", kind.path()),
                &[("language", "en-US".to_string())],
            )
            .await?;

        Ok(response.results)
    }

    async fn poster_url(&self, movie_id: i64) -> AppResult<Option<String>> {
        let details = self.movie_details(movie_id).await?;

        Ok(details
            .poster_path
            .map(|path| format!("{}{}", self.image_url, path)))
    }

    async fn rate_movie(&self, movie_id: i64, value: f64) -> AppResult<()> {
        // Ratings go through a throwaway guest session
        let session: GuestSessionResponse = self
            .get_json("/authentication/guest_session/new", &[])
            .await?;

        let url = format!("{}/movie/{}/rating", self.api_url, movie_id);
        let response = self
            .http_client
            .post(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("guest_session_id", session.guest_session_id.as_str()),
            ])
            .json(&json!({ "value": value }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB rating submission returned status {}: {}",
                status, body
            )));
        }

        tracing::info!(movie_id, value, "Movie rated successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.as_str())
    }

    #[test]
    fn test_discover_params_fixed_filters() {
        let params = discover_params(3, &DiscoverFilters::default());

        assert_eq!(param(&params, "sort_by"), Some("popularity.desc"));
        assert_eq!(param(&params, "include_adult"), Some("false"));
        assert_eq!(param(&params, "include_video"), Some("false"));
        assert_eq!(param(&params, "page"), Some("3"));
    }

    #[test]
    fn test_discover_params_absent_criteria_omitted() {
        let params = discover_params(1, &DiscoverFilters::default());

        assert_eq!(param(&params, "with_genres"), None);
        assert_eq!(param(&params, "with_cast"), None);
        assert_eq!(param(&params, "primary_release_year"), None);
        assert_eq!(param(&params, "with_runtime.gte"), None);
    }

    #[test]
    fn test_discover_params_full_criteria() {
        let filters = DiscoverFilters {
            genre_id: Some(35),
            actor_id: Some(31),
            primary_release_year: Some(2020),
            min_runtime: Some(90),
        };
        let params = discover_params(1, &filters);

        assert_eq!(param(&params, "with_genres"), Some("35"));
        assert_eq!(param(&params, "with_cast"), Some("31"));
        assert_eq!(param(&params, "primary_release_year"), Some("2020"));
        assert_eq!(param(&params, "with_runtime.gte"), Some("90"));
    }
}
