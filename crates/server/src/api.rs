//! # Catalog API
//!
//! HTTP handlers for the movie catalog and its ratings.
//!
//! | Method | Path                 | Handler          |
//! |--------|----------------------|------------------|
//! | GET    | /items               | `list_movies`    |
//! | GET    | /items/search        | `search_movies`  |
//! | GET    | /items/{id}          | `get_movie`      |
//! | POST   | /items               | `create_movie`   |
//! | PUT    | /items/{id}          | `update_movie`   |
//! | DELETE | /items/{id}          | `delete_movie`   |
//! | POST   | /items/{id}/rate     | `rate_movie`     |
//! | GET    | /items/{id}/rating   | `movie_rating`   |
//!
//! Handlers only validate and translate; the store and the aggregator do
//! the work. Malformed bodies and query strings are rejected as 400 before a
//! handler runs.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use catalog::validation::{self, MovieFields, SearchQuery};
use catalog::{AggregateView, Movie, MovieId, Rating, RatingOutcome};
use serde::Serialize;
use serde_json::Value;
use store::{MovieRepository, RatingAggregator, StorePool};
use tracing::debug;

use crate::error::ApiResult;
use crate::health;

/// Shared handler state. Every field is a cheap handle onto the same pool.
#[derive(Clone)]
pub struct AppState {
    pub movies: MovieRepository,
    pub ratings: RatingAggregator,
    pub pool: StorePool,
}

impl AppState {
    pub fn new(pool: StorePool) -> Self {
        Self {
            movies: MovieRepository::new(pool.clone()),
            ratings: RatingAggregator::new(pool.clone()),
            pool,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: MovieId,
}

/// Build the full application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/items", get(list_movies).post(create_movie))
        .route("/items/search", get(search_movies))
        .route(
            "/items/{id}",
            get(get_movie).put(update_movie).delete(delete_movie),
        )
        .route("/items/{id}/rate", post(rate_movie))
        .route("/items/{id}/rating", get(movie_rating))
        .route("/health", get(health::liveness_handler))
        .route("/ready", get(health::readiness_handler))
        .with_state(state)
}

async fn list_movies(State(state): State<AppState>) -> ApiResult<Json<Vec<Movie>>> {
    Ok(Json(state.movies.list().await?))
}

async fn search_movies(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Movie>>> {
    let Query(query) = query?;
    let criteria = validation::parse_search(query)?;
    debug!("Searching catalog: {:?}", criteria);
    Ok(Json(state.movies.search(criteria).await?))
}

async fn get_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Movie>> {
    let id = validation::parse_movie_id(&id)?;
    Ok(Json(state.movies.get(id).await?))
}

async fn create_movie(
    State(state): State<AppState>,
    body: Result<Json<MovieFields>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Movie>)> {
    let Json(fields) = body?;
    let movie = validation::validate_new(fields)?;
    let created = state.movies.create(movie).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<MovieFields>, JsonRejection>,
) -> ApiResult<Json<Movie>> {
    let id = validation::parse_movie_id(&id)?;
    let Json(fields) = body?;
    let update = validation::validate_update(fields)?;
    Ok(Json(state.movies.update(id, update).await?))
}

async fn delete_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Deleted>> {
    let id = validation::parse_movie_id(&id)?;
    state.movies.delete(id).await?;
    Ok(Json(Deleted { deleted: id }))
}

async fn rate_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<RatingOutcome>> {
    let id = validation::parse_movie_id(&id)?;
    let Json(body) = body?;
    let rating = Rating::from_json(body.get("rating").unwrap_or(&Value::Null))?;
    Ok(Json(state.ratings.submit_rating(id, rating).await?))
}

async fn movie_rating(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AggregateView>> {
    let id = validation::parse_movie_id(&id)?;
    let aggregate = state.ratings.aggregate(id).await?;
    Ok(Json(AggregateView::from(aggregate)))
}
