use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Criteria accumulated by the slot-filling dialogue and handed to discovery.
///
/// Every field is optional: an absent field simply drops the corresponding
/// filter from the remote query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryCriteria {
    pub genre: Option<String>,
    pub release_year: Option<i32>,
    pub actor: Option<String>,
    pub min_runtime: Option<i64>,
}

/// A film collected during one discovery run.
///
/// The title is the unique display key within a run; candidates are immutable
/// once added and discarded when the run completes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilmCandidate {
    pub movie_id: i64,
    pub title: String,
    pub genre_ids: Vec<i64>,
    pub release_year: i32,
    pub runtime_minutes: i64,
    /// Up to two leading cast members
    pub cast: Vec<String>,
}

impl FilmCandidate {
    /// Runtime rendered the way captions show it, e.g. "2h 15m"
    pub fn duration_label(&self) -> String {
        format_runtime(self.runtime_minutes)
    }
}

/// Formats a runtime in minutes as "Xh Ym"
pub fn format_runtime(minutes: i64) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Envelope shared by TMDB search and discover endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse<T> {
    #[serde(default)]
    pub total_results: i64,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// Person search result
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Person {
    pub id: i64,
    pub name: String,
}

/// Movie search result (id + title is all the bot needs)
#[derive(Debug, Clone, Deserialize)]
pub struct MovieResult {
    pub id: i64,
    pub title: String,
}

/// One row of a discover / movie-list page
#[derive(Debug, Clone, Deserialize)]
pub struct MovieSummary {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub original_language: String,
}

impl MovieSummary {
    /// Release year parsed from the "YYYY-MM-DD" release date prefix
    pub fn release_year(&self) -> Option<i32> {
        self.release_date.get(..4)?.parse().ok()
    }
}

/// Response from GET /movie/{id}
#[derive(Debug, Clone, Deserialize)]
pub struct MovieDetails {
    #[serde(default)]
    pub runtime: Option<i64>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
}

/// Response from GET /movie/{id}/credits
#[derive(Debug, Clone, Deserialize)]
pub struct CreditsResponse {
    #[serde(default)]
    pub cast: Vec<CastMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CastMember {
    pub name: String,
}

/// Response from GET /genre/movie/list
#[derive(Debug, Clone, Deserialize)]
pub struct GenreListResponse {
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// Response from POST /authentication/guest_session/new
#[derive(Debug, Clone, Deserialize)]
pub struct GuestSessionResponse {
    pub guest_session_id: String,
}

/// Curated TMDB movie lists surfaced by the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieListKind {
    TopRated,
    Upcoming,
}

impl MovieListKind {
    pub fn path(&self) -> &'static str {
        match self {
            MovieListKind::TopRated => "top_rated",
            MovieListKind::Upcoming => "upcoming",
        }
    }
}

// ============================================================================
// Store entities
// ============================================================================

/// User role stored in the `users` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Moderator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Moderator => "moderator",
        }
    }

    /// Parses a stored role string; unknown values fall back to Member
    pub fn parse(value: &str) -> Self {
        match value {
            "moderator" => Role::Moderator,
            _ => Role::Member,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredUser {
    pub id: i64,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct StoredSearch {
    pub id: i64,
    pub user_id: i64,
    pub genre: String,
    pub release_year: i64,
    pub duration: i64,
    pub cast: String,
    pub search_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct StoredRating {
    pub id: i64,
    pub user_id: i64,
    pub movie_id: i64,
    pub rating: f64,
}
