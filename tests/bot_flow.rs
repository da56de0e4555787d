use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tower::util::ServiceExt;

use film_match::{
    api::{create_router, AppState},
    bot::BotEngine,
    db::{create_schema, Store},
    error::AppResult,
    models::{MovieDetails, MovieListKind, MovieSummary, Person},
    services::{DiscoverFilters, MetadataProvider},
};

/// Canned catalog: twelve 2020 comedies with Tom Hanks on the first discover
/// page, nothing anywhere else.
struct StubCatalog;

fn comedy(id: i64) -> MovieSummary {
    MovieSummary {
        id,
        title: format!("Comedy #{}", id),
        original_title: None,
        genre_ids: vec![35],
        release_date: "2020-01-01".to_string(),
        original_language: "en".to_string(),
    }
}

#[async_trait::async_trait]
impl MetadataProvider for StubCatalog {
    async fn search_person(&self, name: &str) -> AppResult<Option<Person>> {
        Ok((name == "Tom Hanks").then(|| Person {
            id: 31,
            name: "Tom Hanks".to_string(),
        }))
    }

    async fn search_movie_id(&self, _title: &str) -> AppResult<Option<i64>> {
        Ok(Some(13))
    }

    async fn genres(&self) -> AppResult<HashMap<String, i64>> {
        Ok(HashMap::from([("Comedy".to_string(), 35)]))
    }

    async fn movie_details(&self, _movie_id: i64) -> AppResult<MovieDetails> {
        Ok(MovieDetails {
            runtime: Some(100),
            poster_path: Some("/poster.jpg".to_string()),
            original_language: Some("en".to_string()),
            release_date: Some("2020-01-01".to_string()),
        })
    }

    async fn movie_credits(&self, _movie_id: i64, limit: usize) -> AppResult<Vec<String>> {
        let cast = ["Tom Hanks", "Meg Ryan"];
        Ok(cast.iter().take(limit).map(|name| name.to_string()).collect())
    }

    async fn discover(
        &self,
        page: u32,
        filters: &DiscoverFilters,
    ) -> AppResult<Vec<MovieSummary>> {
        if page == 1 && filters.genre_id == Some(35) {
            Ok((1..=12).map(comedy).collect())
        } else {
            Ok(vec![])
        }
    }

    async fn movie_list(&self, _kind: MovieListKind) -> AppResult<Vec<MovieSummary>> {
        Ok(vec![comedy(1)])
    }

    async fn poster_url(&self, movie_id: i64) -> AppResult<Option<String>> {
        Ok(Some(format!(
            "https://image.tmdb.org/t/p/original/{}.jpg",
            movie_id
        )))
    }

    async fn rate_movie(&self, _movie_id: i64, _value: f64) -> AppResult<()> {
        Ok(())
    }
}

async fn create_test_app() -> axum::Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    create_schema(&pool).await.unwrap();

    let engine = BotEngine::new(
        Store::new(pool),
        Arc::new(StubCatalog),
        HashMap::from([("Comedy".to_string(), 35)]),
        Duration::from_secs(60),
    );

    create_router(AppState::new(engine))
}

async fn post_update(app: &axum::Router, body: Value) -> Value {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/updates")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send_message(app: &axum::Router, chat_id: i64, text: &str) -> Value {
    post_update(
        app,
        json!({ "kind": "message", "chat_id": chat_id, "text": text }),
    )
    .await
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app().await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    // The request-id middleware tags every response
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_start_command_returns_menu() {
    let app = create_test_app().await;

    let body = send_message(&app, 1, "/start").await;
    let reply = &body["replies"][0];
    assert_eq!(reply["kind"], "menu");
    assert_eq!(reply["buttons"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_search_movie_callback_prompts() {
    let app = create_test_app().await;

    let body = post_update(
        &app,
        json!({ "kind": "callback", "chat_id": 1, "data": "searchmovie" }),
    )
    .await;
    assert_eq!(body["replies"][0]["text"], "Type movie to start the search!");
}

#[tokio::test]
async fn test_full_search_flow_returns_ten_posters() {
    let app = create_test_app().await;
    let chat = 42;

    let body = send_message(&app, chat, "movie").await;
    assert_eq!(
        body["replies"][0]["text"],
        "Please enter the genre of the movie:"
    );

    let body = send_message(&app, chat, "Comedy").await;
    assert_eq!(body["replies"][0]["text"], "Please enter the release year:");

    let body = send_message(&app, chat, "2020").await;
    assert_eq!(
        body["replies"][0]["text"],
        "Please enter the duration (in minutes):"
    );

    let body = send_message(&app, chat, "90").await;
    assert_eq!(body["replies"][0]["text"], "Please enter the actor:");

    let body = send_message(&app, chat, "Tom Hanks").await;
    let replies = body["replies"].as_array().unwrap();
    assert_eq!(replies.len(), 10);
    for reply in replies {
        assert_eq!(reply["kind"], "photo");
        let caption = reply["caption"].as_str().unwrap();
        assert!(caption.contains("Release Year: 2020"));
        assert!(caption.contains("Genres: Comedy"));
        assert!(caption.contains("Actors: Tom Hanks, Meg Ryan"));
    }

    // The completed search is in the user's history
    let body = send_message(&app, chat, "/history").await;
    let text = body["replies"][0]["text"].as_str().unwrap();
    assert!(text.contains("Comedy (2020), 90 min, Tom Hanks"));
}

#[tokio::test]
async fn test_history_is_per_user() {
    let app = create_test_app().await;

    // Another user's history stays empty
    let body = send_message(&app, 7, "/history").await;
    assert_eq!(
        body["replies"][0]["text"],
        "You have no recent searches yet."
    );
}

#[tokio::test]
async fn test_rating_flow_over_http() {
    let app = create_test_app().await;
    let chat = 9;

    let body = post_update(
        &app,
        json!({ "kind": "callback", "chat_id": chat, "data": "ratemovies" }),
    )
    .await;
    assert_eq!(
        body["replies"][0]["text"],
        "What's the name of the movie you want to rate?"
    );

    let body = send_message(&app, chat, "Forrest Gump").await;
    assert_eq!(
        body["replies"][0]["text"],
        "Type a number between 1 and 10 to rate this movie."
    );

    let body = send_message(&app, chat, "8").await;
    assert_eq!(
        body["replies"][0]["text"],
        "You rated 'Forrest Gump' with a rating of 8."
    );
}

#[tokio::test]
async fn test_malformed_update_is_rejected() {
    let app = create_test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/updates")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"kind": "sticker", "chat_id": 1}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
