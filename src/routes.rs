use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    AppState,
    error::{AppError, AppResult},
    models::{ListQuery, MoviePayload, MovieView, NamedPayload, NamedView},
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/movies", get(list_movies).post(create_movie))
        .route("/movies/", get(list_movies).post(create_movie))
        .route("/movies/{id}", get(get_movie).put(replace_movie).delete(delete_movie))
        .route("/movies/{id}/", get(get_movie).put(replace_movie).delete(delete_movie))
        .route("/directors", get(list_directors).post(create_director))
        .route("/directors/", get(list_directors).post(create_director))
        .route("/directors/{id}", get(get_director))
        .route("/directors/{id}/", get(get_director))
        .route("/genres", get(list_genres).post(create_genre))
        .route("/genres/", get(list_genres).post(create_genre))
        .route("/genres/{id}", get(get_genre))
        .route("/genres/{id}/", get(get_genre))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

/// A path id that is not an integer addresses no resource.
fn parse_id(raw: &str) -> AppResult<i32> {
    raw.parse().map_err(|_| AppError::NotFound)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload.map(|Json(p)| p).map_err(|e| AppError::MalformedRequest(e.body_text()))
}

fn created(location: String) -> Response {
    (StatusCode::CREATED, [(header::LOCATION, location)]).into_response()
}

pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Vec<MovieView>>> {
    let Some(filter) = q.filter() else {
        return Ok(Json(Vec::new()));
    };
    let movies = state.catalog.list_movies(filter).await?;
    Ok(Json(movies.into_iter().map(MovieView::from).collect()))
}

pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MoviePayload>, JsonRejection>,
) -> AppResult<Response> {
    let id = state.catalog.create_movie(body(payload)?).await?;
    Ok(created(format!("/movies/{id}")))
}

pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<MovieView>> {
    let movie = state.catalog.get_movie(parse_id(&id)?).await?;
    Ok(Json(movie.into()))
}

pub async fn replace_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<MoviePayload>, JsonRejection>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id)?;
    state.catalog.replace_movie(id, body(payload)?).await?;
    Ok(StatusCode::OK)
}

pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.catalog.delete_movie(parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_directors(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<NamedView>>> {
    let directors = state.catalog.list_directors().await?;
    Ok(Json(directors.into_iter().map(NamedView::from).collect()))
}

pub async fn get_director(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<NamedView>> {
    Ok(Json(state.catalog.get_director(parse_id(&id)?).await?.into()))
}

pub async fn create_director(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NamedPayload>, JsonRejection>,
) -> AppResult<Response> {
    let id = state.catalog.create_director(body(payload)?).await?;
    Ok(created(format!("/directors/{id}")))
}

pub async fn list_genres(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<NamedView>>> {
    let genres = state.catalog.list_genres().await?;
    Ok(Json(genres.into_iter().map(NamedView::from).collect()))
}

pub async fn get_genre(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<NamedView>> {
    Ok(Json(state.catalog.get_genre(parse_id(&id)?).await?.into()))
}

pub async fn create_genre(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NamedPayload>, JsonRejection>,
) -> AppResult<Response> {
    let id = state.catalog.create_genre(body(payload)?).await?;
    Ok(created(format!("/genres/{id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_integer_path_id_is_not_found() {
        assert!(matches!(parse_id("abc"), Err(AppError::NotFound)));
        assert!(matches!(parse_id("1.5"), Err(AppError::NotFound)));
        assert_eq!(parse_id("12").unwrap(), 12);
    }
}
