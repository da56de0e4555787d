/// The bot engine: command routing, inline-button callbacks, and the
/// free-text dialogues (four-slot movie search, two-step rating).
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    bot::{
        session::{DialogueState, RatingStep, SearchInProgress, SearchSlot, SessionStore},
        Button, ChatUpdate, Reply,
    },
    db::Store,
    error::{AppError, AppResult},
    models::{format_runtime, DiscoveryCriteria, FilmCandidate, MovieListKind, Role},
    services::{DiscoveryEngine, DiscoveryOutcome, MetadataProvider},
};

const MSG_WELCOME: &str = "Hello there! I'm a bot. What's up?";
const MSG_HELP: &str = "Try typing anything and I will do my best to respond!";
const MSG_ABOUT: &str = "Hi, I'm a bot that searches for the movies that will suit you best.";
const MSG_DONT_UNDERSTAND: &str = "I don't understand";
const MSG_NO_MOVIES: &str = "No movies found.";
const MSG_TRY_AGAIN: &str = "The movie service is unavailable right now, please try again.";

const LIST_LIMIT: usize = 20;

pub struct BotEngine {
    store: Store,
    provider: Arc<dyn MetadataProvider>,
    /// Genre name → id, fetched once at startup
    genres: HashMap<String, i64>,
    /// Reverse lookup for captions
    genre_names: HashMap<i64, String>,
    sessions: SessionStore,
}

impl BotEngine {
    pub fn new(
        store: Store,
        provider: Arc<dyn MetadataProvider>,
        genres: HashMap<String, i64>,
        session_idle: Duration,
    ) -> Self {
        let genre_names = genres
            .iter()
            .map(|(name, id)| (*id, name.clone()))
            .collect();

        Self {
            store,
            provider,
            genres,
            genre_names,
            sessions: SessionStore::new(session_idle),
        }
    }

    /// Handles one incoming update and returns the replies to deliver
    pub async fn handle(&self, update: ChatUpdate) -> AppResult<Vec<Reply>> {
        match update {
            ChatUpdate::Message { chat_id, text } => {
                self.handle_message(chat_id, text.trim()).await
            }
            ChatUpdate::Callback { chat_id, data } => self.handle_callback(chat_id, &data).await,
        }
    }

    async fn handle_message(&self, chat_id: i64, text: &str) -> AppResult<Vec<Reply>> {
        if text.is_empty() {
            return Ok(vec![]);
        }

        if let Some(command) = text.strip_prefix('/') {
            return self.handle_command(chat_id, command).await;
        }

        let mut state = self.sessions.take(chat_id).await;

        // An in-flight rating exchange takes precedence over everything else
        if let Some(step) = state.rating.take() {
            return self.advance_rating(chat_id, state, step, text).await;
        }

        if text.eq_ignore_ascii_case("movie") {
            state.search = Some(SearchInProgress::default());
            self.sessions.put(chat_id, state).await;
            return Ok(vec![Reply::text("Please enter the genre of the movie:")]);
        }

        if let Some(search) = state.search.take() {
            return self.advance_search(chat_id, state, search, text).await;
        }

        Ok(vec![Reply::text(MSG_DONT_UNDERSTAND)])
    }

    async fn handle_command(&self, chat_id: i64, command: &str) -> AppResult<Vec<Reply>> {
        match command {
            "start" => Ok(vec![self.start_menu()]),
            "help" => Ok(vec![Reply::text(MSG_HELP)]),
            "about" => Ok(vec![Reply::text(MSG_ABOUT)]),
            "history" => self.history(chat_id).await,
            "upcoming" => self.movie_list(MovieListKind::Upcoming).await,
            "topmovies" => self.movie_list(MovieListKind::TopRated).await,
            _ => Ok(vec![Reply::text(MSG_DONT_UNDERSTAND)]),
        }
    }

    async fn handle_callback(&self, chat_id: i64, data: &str) -> AppResult<Vec<Reply>> {
        match data {
            "upcoming" => self.movie_list(MovieListKind::Upcoming).await,
            "topmovies" => self.movie_list(MovieListKind::TopRated).await,
            "history" => self.history(chat_id).await,
            "searchmovie" => Ok(vec![Reply::text("Type movie to start the search!")]),
            "randommovies" => self.run_discovery(&DiscoveryCriteria::default()).await,
            "ratemovies" => {
                let mut state = self.sessions.take(chat_id).await;
                state.rating = Some(RatingStep::AwaitingTitle);
                self.sessions.put(chat_id, state).await;
                Ok(vec![Reply::text(
                    "What's the name of the movie you want to rate?",
                )])
            }
            other => {
                tracing::debug!(payload = %other, "Unknown callback payload");
                Ok(vec![Reply::text(MSG_DONT_UNDERSTAND)])
            }
        }
    }

    fn start_menu(&self) -> Reply {
        let buttons = [
            ("Upcoming", "upcoming"),
            ("Top Movies", "topmovies"),
            ("History", "history"),
            ("Random Movies", "randommovies"),
            ("Rate Movies", "ratemovies"),
            ("Search Movie", "searchmovie"),
        ];

        Reply::Menu {
            text: MSG_WELCOME.to_string(),
            buttons: buttons
                .iter()
                .map(|(label, data)| Button {
                    label: label.to_string(),
                    data: data.to_string(),
                })
                .collect(),
        }
    }

    // ------------------------------------------------------------------
    // Rating dialogue
    // ------------------------------------------------------------------

    async fn advance_rating(
        &self,
        chat_id: i64,
        mut state: DialogueState,
        step: RatingStep,
        text: &str,
    ) -> AppResult<Vec<Reply>> {
        match step {
            RatingStep::AwaitingTitle => {
                state.rating = Some(RatingStep::AwaitingValue {
                    title: text.to_string(),
                });
                self.sessions.put(chat_id, state).await;
                Ok(vec![Reply::text(
                    "Type a number between 1 and 10 to rate this movie.",
                )])
            }
            RatingStep::AwaitingValue { title } => {
                let Some(value) = parse_rating(text) else {
                    state.rating = Some(RatingStep::AwaitingValue { title });
                    self.sessions.put(chat_id, state).await;
                    return Ok(vec![Reply::text(
                        "Please provide a valid rating between 1 and 10.",
                    )]);
                };
                self.sessions.put(chat_id, state).await;
                self.submit_rating(chat_id, &title, value).await
            }
        }
    }

    async fn submit_rating(&self, chat_id: i64, title: &str, value: f64) -> AppResult<Vec<Reply>> {
        let movie_id = match self.provider.search_movie_id(title).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                return Ok(vec![Reply::text(format!(
                    "I couldn't find a movie named '{}'.",
                    title
                ))])
            }
            Err(error) => {
                tracing::error!(%error, title, "Movie lookup failed");
                return Ok(vec![Reply::text(MSG_TRY_AGAIN)]);
            }
        };

        if let Err(error) = self.provider.rate_movie(movie_id, value).await {
            tracing::error!(%error, movie_id, "Failed to submit movie rating");
            return Ok(vec![Reply::text(MSG_TRY_AGAIN)]);
        }

        // A local copy of the rating is moderator-only; members still rate
        // upstream, their refusal here is expected.
        match self.store.add_rating(chat_id, movie_id, value).await {
            Ok(_) | Err(AppError::Forbidden(_)) => {}
            Err(error) => return Err(error),
        }

        Ok(vec![Reply::text(format!(
            "You rated '{}' with a rating of {}.",
            title, value
        ))])
    }

    // ------------------------------------------------------------------
    // Search dialogue
    // ------------------------------------------------------------------

    async fn advance_search(
        &self,
        chat_id: i64,
        mut state: DialogueState,
        mut search: SearchInProgress,
        text: &str,
    ) -> AppResult<Vec<Reply>> {
        let prompt = match search.slot {
            SearchSlot::Genre => {
                search.criteria.genre = Some(text.to_string());
                search.slot = SearchSlot::Year;
                "Please enter the release year:"
            }
            SearchSlot::Year => match text.parse::<i32>() {
                Ok(year) => {
                    search.criteria.release_year = Some(year);
                    search.slot = SearchSlot::Duration;
                    "Please enter the duration (in minutes):"
                }
                Err(_) => "Please enter a valid release year:",
            },
            SearchSlot::Duration => match text.parse::<i64>() {
                Ok(minutes) => {
                    search.criteria.min_runtime = Some(minutes);
                    search.slot = SearchSlot::Actor;
                    "Please enter the actor:"
                }
                Err(_) => "Please enter a valid duration in minutes:",
            },
            SearchSlot::Actor => {
                search.criteria.actor = Some(text.to_string());
                let criteria = search.criteria;
                self.sessions.put(chat_id, state).await;
                return self.run_search(chat_id, criteria).await;
            }
        };

        state.search = Some(search);
        self.sessions.put(chat_id, state).await;
        Ok(vec![Reply::text(prompt)])
    }

    /// All four slots are filled: register the user on first contact, record
    /// the search, then discover.
    async fn run_search(&self, chat_id: i64, criteria: DiscoveryCriteria) -> AppResult<Vec<Reply>> {
        if !self.store.user_exists(chat_id).await? {
            self.store.add_user(chat_id, Role::Member).await?;
        }

        let search_id = self
            .store
            .add_search(
                chat_id,
                criteria.genre.as_deref().unwrap_or(""),
                criteria.release_year.unwrap_or(0) as i64,
                criteria.min_runtime.unwrap_or(0),
                criteria.actor.as_deref().unwrap_or(""),
            )
            .await?;
        tracing::info!(chat_id, search_id, "Search recorded");

        self.run_discovery(&criteria).await
    }

    async fn run_discovery(&self, criteria: &DiscoveryCriteria) -> AppResult<Vec<Reply>> {
        let engine = DiscoveryEngine::new(self.provider.as_ref(), &self.genres);
        let outcome = match engine.discover(criteria).await {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::error!(%error, "Discovery failed");
                return Ok(vec![Reply::text(MSG_TRY_AGAIN)]);
            }
        };

        self.render_candidates(outcome).await
    }

    async fn render_candidates(&self, outcome: DiscoveryOutcome) -> AppResult<Vec<Reply>> {
        if outcome.candidates.is_empty() {
            // A remote failure and a genuinely empty result read differently
            let text = if outcome.aborted {
                MSG_TRY_AGAIN
            } else {
                MSG_NO_MOVIES
            };
            return Ok(vec![Reply::text(text)]);
        }

        let mut replies = Vec::with_capacity(outcome.candidates.len());
        for candidate in &outcome.candidates {
            let photo_url = match self.provider.poster_url(candidate.movie_id).await {
                Ok(url) => url,
                Err(error) => {
                    tracing::warn!(movie_id = candidate.movie_id, %error, "Poster lookup failed");
                    None
                }
            };
            replies.push(Reply::Photo {
                photo_url,
                caption: self.caption(candidate),
            });
        }

        Ok(replies)
    }

    fn caption(&self, candidate: &FilmCandidate) -> String {
        format!(
            "Release Year: {}\nDuration: {}\nGenres: {}\nActors: {}",
            candidate.release_year,
            candidate.duration_label(),
            self.genre_labels(&candidate.genre_ids),
            candidate.cast.join(", "),
        )
    }

    fn genre_labels(&self, genre_ids: &[i64]) -> String {
        genre_ids
            .iter()
            .filter_map(|id| self.genre_names.get(id).cloned())
            .collect::<Vec<_>>()
            .join(", ")
    }

    // ------------------------------------------------------------------
    // History and curated lists
    // ------------------------------------------------------------------

    async fn history(&self, chat_id: i64) -> AppResult<Vec<Reply>> {
        let searches = self.store.list_user_searches(chat_id).await?;
        if searches.is_empty() {
            return Ok(vec![Reply::text("You have no recent searches yet.")]);
        }

        let lines: Vec<String> = searches
            .iter()
            .map(|search| {
                format!(
                    "{} ({}), {} min, {}",
                    search.genre, search.release_year, search.duration, search.cast
                )
            })
            .collect();

        Ok(vec![Reply::text(format!(
            "Your recent searches:\n{}",
            lines.join("\n")
        ))])
    }

    async fn movie_list(&self, kind: MovieListKind) -> AppResult<Vec<Reply>> {
        let rows = match self.provider.movie_list(kind).await {
            Ok(rows) => rows,
            Err(error) => {
                tracing::error!(%error, list = kind.path(), "Movie list fetch failed");
                return Ok(vec![Reply::text(MSG_TRY_AGAIN)]);
            }
        };

        let mut lines = Vec::new();
        for row in rows
            .into_iter()
            .filter(|row| row.original_language == "en")
            .take(LIST_LIMIT)
        {
            let Some(year) = row.release_year() else {
                continue;
            };
            let details = match self.provider.movie_details(row.id).await {
                Ok(details) => details,
                Err(error) => {
                    tracing::warn!(movie_id = row.id, %error, "Skipping list entry");
                    continue;
                }
            };
            let cast = self
                .provider
                .movie_credits(row.id, 2)
                .await
                .unwrap_or_else(|error| {
                    tracing::warn!(movie_id = row.id, %error, "Credits lookup failed");
                    Vec::new()
                });

            let title = row.original_title.unwrap_or(row.title);
            lines.push(format!(
                "{} ({}) - {} - {}",
                title,
                year,
                format_runtime(details.runtime.unwrap_or(0)),
                cast.join(", ")
            ));
        }

        if lines.is_empty() {
            return Ok(vec![Reply::text(MSG_NO_MOVIES)]);
        }

        Ok(vec![Reply::text(lines.join("\n"))])
    }
}

fn parse_rating(text: &str) -> Option<f64> {
    let value: u32 = text.trim().parse().ok()?;
    (1..=10).contains(&value).then_some(value as f64)
}
