use anyhow::Result;
use std::time::Duration;

use tracing::{debug, error};

use crate::catalog::{ArtworkUpload, TrackDraft};
use crate::store::{
    AlbumId, AlbumPatch, ArtistId, ArtistPatch, FavoriteKind, LibraryStore, StoreError, TrackId,
    TrackPatch,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use tower_http::services::ServeDir;

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, response, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use super::session::Session;
use super::state::*;
use super::{log_requests, RequestsLoggingLevel, ServerConfig};

/// One response class per store error variant. Database failures are logged
/// here and surface as an opaque 500.
impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = match &self {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::NotOwner { .. } => StatusCode::FORBIDDEN,
            StoreError::Duplicate(_)
            | StoreError::AlreadyFavorited
            | StoreError::NotFavorited => StatusCode::CONFLICT,
            StoreError::Invalid(_) => StatusCode::BAD_REQUEST,
            StoreError::Db(err) => {
                error!("Database error: {}", err);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };
        (status, self.to_string()).into_response()
    }
}

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub session_token: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        session_token: session.map(|s| s.token.0),
    };
    Json(stats)
}

#[derive(Deserialize, Debug)]
struct SignupBody {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
struct LoginBody {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    token: String,
}

async fn signup(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<SignupBody>,
) -> Response {
    debug!("signup() called for username {}", body.username);
    match user_manager.signup(&body.username, &body.email, &body.password) {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<LoginBody>,
) -> Response {
    match user_manager.authenticate(&body.username, &body.password) {
        Ok(Some(token)) => {
            let response_body = LoginSuccessResponse {
                token: token.value.0.clone(),
            };
            let cookie_value = HeaderValue::from_str(&format!(
                "session_token={}; Path=/; HttpOnly",
                token.value.0
            ))
            .unwrap();
            response::Builder::new()
                .status(StatusCode::CREATED)
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::SET_COOKIE, cookie_value)
                .body(Body::from(serde_json::to_string(&response_body).unwrap()))
                .unwrap()
        }
        Ok(None) => StatusCode::FORBIDDEN.into_response(),
        Err(err) => {
            error!("Error during login: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build(Cookie::new("session_token", ""))
        .path("/")
        .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1))
        .same_site(SameSite::Lax)
        .build()
}

async fn logout(State(user_manager): State<GuardedUserManager>, session: Session) -> Response {
    match user_manager.logout(session.user_id, &session.token) {
        Ok(()) => response::Builder::new()
            .status(StatusCode::OK)
            .header(header::SET_COOKIE, expired_session_cookie().to_string())
            .body(Body::empty())
            .unwrap(),
        Err(err) => err.into_response(),
    }
}

async fn post_artist(
    session: Session,
    State(catalog): State<GuardedCatalogManager>,
    Json(draft): Json<crate::catalog::ArtistDraft>,
) -> Response {
    match catalog.create_artist(session.user_id, draft) {
        Ok(artist) => (StatusCode::CREATED, Json(artist)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_artist(
    _session: Session,
    State(catalog): State<GuardedCatalogManager>,
    Path(id): Path<String>,
) -> Response {
    match catalog.artist(&ArtistId(id)) {
        Ok(Some(artist)) => Json(artist).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn put_artist(
    session: Session,
    State(catalog): State<GuardedCatalogManager>,
    Path(id): Path<String>,
    Json(patch): Json<ArtistPatch>,
) -> Response {
    match catalog.update_artist(session.user_id, &ArtistId(id), &patch) {
        Ok(artist) => Json(artist).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn delete_artist(
    session: Session,
    State(catalog): State<GuardedCatalogManager>,
    Path(id): Path<String>,
) -> Response {
    match catalog.delete_artist(session.user_id, &ArtistId(id)) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn post_album(
    session: Session,
    State(catalog): State<GuardedCatalogManager>,
    Json(draft): Json<crate::catalog::AlbumDraft>,
) -> Response {
    match catalog.create_album(session.user_id, draft) {
        Ok(album) => (StatusCode::CREATED, Json(album)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_album(
    _session: Session,
    State(catalog): State<GuardedCatalogManager>,
    Path(id): Path<String>,
) -> Response {
    match catalog.album(&AlbumId(id)) {
        Ok(Some(album)) => Json(album).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn put_album(
    session: Session,
    State(catalog): State<GuardedCatalogManager>,
    Path(id): Path<String>,
    Json(patch): Json<AlbumPatch>,
) -> Response {
    match catalog.update_album(session.user_id, &AlbumId(id), &patch) {
        Ok(album) => Json(album).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn delete_album(
    session: Session,
    State(catalog): State<GuardedCatalogManager>,
    Path(id): Path<String>,
) -> Response {
    match catalog.delete_album(session.user_id, &AlbumId(id)) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => err.into_response(),
    }
}

/// Pulls the `metadata` JSON part and the optional `artwork` file part out of
/// a multipart body. Anything malformed is a 400.
async fn read_metadata_and_artwork<T: DeserializeOwned>(
    multipart: &mut Multipart,
) -> Result<(T, Option<ArtworkUpload>), Response> {
    let mut metadata: Option<T> = None;
    let mut artwork: Option<ArtworkUpload> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                return Err((StatusCode::BAD_REQUEST, err.to_string()).into_response());
            }
        };
        match field.name() {
            Some("metadata") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()).into_response())?;
                let parsed = serde_json::from_str(&text)
                    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()).into_response())?;
                metadata = Some(parsed);
            }
            Some("artwork") => {
                let file_name = field.file_name().unwrap_or("artwork").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()).into_response())?;
                artwork = Some(ArtworkUpload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    match metadata {
        Some(metadata) => Ok((metadata, artwork)),
        None => Err((StatusCode::BAD_REQUEST, "missing metadata part").into_response()),
    }
}

async fn post_track(
    session: Session,
    State(catalog): State<GuardedCatalogManager>,
    mut multipart: Multipart,
) -> Response {
    let (draft, artwork) = match read_metadata_and_artwork::<TrackDraft>(&mut multipart).await {
        Ok(x) => x,
        Err(response) => return response,
    };
    match catalog.create_track(session.user_id, draft, artwork) {
        Ok(track) => (StatusCode::CREATED, Json(track)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_track(
    _session: Session,
    State(catalog): State<GuardedCatalogManager>,
    Path(id): Path<String>,
) -> Response {
    match catalog.track(&TrackId(id)) {
        Ok(Some(track)) => Json(track).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn put_track(
    session: Session,
    State(catalog): State<GuardedCatalogManager>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let (patch, artwork) = match read_metadata_and_artwork::<TrackPatch>(&mut multipart).await {
        Ok(x) => x,
        Err(response) => return response,
    };
    match catalog.update_track(session.user_id, &TrackId(id), &patch, artwork) {
        Ok(track) => Json(track).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn delete_track(
    session: Session,
    State(catalog): State<GuardedCatalogManager>,
    Path(id): Path<String>,
) -> Response {
    match catalog.delete_track(session.user_id, &TrackId(id)) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Deserialize)]
struct RandomTracksQuery {
    count: Option<usize>,
}

async fn get_random_tracks(
    _session: Session,
    State(catalog): State<GuardedCatalogManager>,
    Query(query): Query<RandomTracksQuery>,
) -> Response {
    match catalog.random_tracks(query.count.unwrap_or(10)) {
        Ok(tracks) => Json(tracks).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Deserialize)]
struct GenreTracksQuery {
    limit: Option<usize>,
}

async fn get_tracks_by_genre(
    _session: Session,
    State(catalog): State<GuardedCatalogManager>,
    Path(genre): Path<String>,
    Query(query): Query<GenreTracksQuery>,
) -> Response {
    match catalog.tracks_by_genre(&genre, query.limit.unwrap_or(20)) {
        Ok(tracks) => Json(tracks).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_artwork(
    _session: Session,
    State(catalog): State<GuardedCatalogManager>,
    Path(path): Path<String>,
) -> Response {
    let bytes = match catalog.artwork(&path) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => return err.into_response(),
    };

    if let Some(kind) = infer::get(&bytes) {
        if kind.mime_type().starts_with("image/") {
            return Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, kind.mime_type().to_string())
                .body(bytes.into())
                .unwrap();
        }
    }
    StatusCode::NOT_FOUND.into_response()
}

async fn add_favorite(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(content_id): Path<String>,
) -> Response {
    match user_manager.add_favorite(session.user_id, &content_id) {
        Ok(kind) => (StatusCode::CREATED, Json(kind)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn remove_favorite(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(content_id): Path<String>,
) -> Response {
    match user_manager.remove_favorite(session.user_id, &content_id) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_favorites(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(kind): Path<String>,
) -> Response {
    let kind = match FavoriteKind::from_route_str(&kind) {
        Some(kind) => kind,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                "kind must be one of artist, album, track",
            )
                .into_response()
        }
    };
    match user_manager.favorites(session.user_id, kind) {
        Ok(ids) => Json(ids).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn delete_account(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> Response {
    match user_manager.delete_user(session.user_id) {
        Ok(()) => response::Builder::new()
            .status(StatusCode::OK)
            .header(header::SET_COOKIE, expired_session_cookie().to_string())
            .body(Body::empty())
            .unwrap(),
        Err(err) => err.into_response(),
    }
}

pub fn make_app(
    config: ServerConfig,
    store: std::sync::Arc<dyn LibraryStore>,
    media: OptionalMediaVault,
    hash: String,
) -> Router {
    let state = ServerState::new(config.clone(), store, media, hash);

    let auth_routes: Router = Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .with_state(state.clone());

    let catalog_routes: Router = Router::new()
        .route("/artist", post(post_artist))
        .route("/artist/{id}", get(get_artist))
        .route("/artist/{id}", put(put_artist))
        .route("/artist/{id}", delete(delete_artist))
        .route("/album", post(post_album))
        .route("/album/{id}", get(get_album))
        .route("/album/{id}", put(put_album))
        .route("/album/{id}", delete(delete_album))
        .route("/track", post(post_track))
        .route("/track/{id}", get(get_track))
        .route("/track/{id}", put(put_track))
        .route("/track/{id}", delete(delete_track))
        .route("/tracks/random", get(get_random_tracks))
        .route("/tracks/genre/{genre}", get(get_tracks_by_genre))
        .route("/artwork/{*path}", get(get_artwork))
        .with_state(state.clone());

    let user_routes: Router = Router::new()
        .route("/favorite/{content_id}", post(add_favorite))
        .route("/favorite/{content_id}", delete(remove_favorite))
        .route("/favorites/{kind}", get(get_favorites))
        .route("/", delete(delete_account))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    home_router
        .nest("/v1/auth", auth_routes)
        .nest("/v1/catalog", catalog_routes)
        .nest("/v1/user", user_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

pub async fn run_server(
    store: std::sync::Arc<dyn LibraryStore>,
    media: OptionalMediaVault,
    requests_logging_level: RequestsLoggingLevel,
    port: u16,
    frontend_dir_path: Option<String>,
    hash: String,
) -> Result<()> {
    let config = ServerConfig {
        port,
        requests_logging_level,
        frontend_dir_path,
    };
    let app = make_app(config, store, media, hash);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;

    Ok(axum::serve(listener, app).await?)
}
