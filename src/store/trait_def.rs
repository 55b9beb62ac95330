//! LibraryStore trait definition.
//!
//! Every mutating method that targets an owned entity takes the requesting
//! `UserId` and performs the ownership comparison inside the same transaction
//! as the mutation itself. Cascading deletes are all-or-nothing.

use super::error::StoreResult;
use super::models::*;
use crate::user::auth::{SessionToken, TokenValue};

pub trait LibraryStore: Send + Sync {
    // =========================================================================
    // Users
    // =========================================================================

    /// Creates a user and its credentials row in one transaction.
    /// Fails with `Duplicate` if the username or email is taken.
    fn create_user(&self, new_user: &NewUser) -> StoreResult<User>;

    fn user(&self, id: UserId) -> StoreResult<Option<User>>;

    fn user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    fn user_credentials(&self, user_id: UserId) -> StoreResult<Option<PasswordCredentials>>;

    /// Deletes the user together with every artist they manage (full artist
    /// cascade), their favorites, credentials and session tokens. One
    /// transaction; fails with `NotFound` if the user does not exist.
    fn delete_user(&self, id: UserId) -> StoreResult<()>;

    // =========================================================================
    // Session tokens
    // =========================================================================

    fn add_session_token(&self, token: &SessionToken) -> StoreResult<()>;

    fn session_token(&self, value: &TokenValue) -> StoreResult<Option<SessionToken>>;

    /// Removes the token, returning it if it existed.
    fn delete_session_token(&self, value: &TokenValue) -> StoreResult<Option<SessionToken>>;

    fn touch_session_token(&self, value: &TokenValue) -> StoreResult<()>;

    // =========================================================================
    // Favorites
    // =========================================================================

    /// Fails with `AlreadyFavorited` if the (user, content) pair exists.
    fn add_favorite(&self, user_id: UserId, content_id: &str, kind: FavoriteKind)
        -> StoreResult<()>;

    /// Fails with `NotFavorited` if the (user, content) pair does not exist.
    fn remove_favorite(&self, user_id: UserId, content_id: &str) -> StoreResult<()>;

    fn favorites(&self, user_id: UserId, kind: FavoriteKind) -> StoreResult<Vec<String>>;

    /// Determines which entity table (if any) an id belongs to.
    fn resolve_content_kind(&self, content_id: &str) -> StoreResult<Option<FavoriteKind>>;

    // =========================================================================
    // Artists
    // =========================================================================

    /// Fails with `NotFound("user")` if the managing user is absent and with
    /// `Duplicate("artist name")` if the name is taken.
    fn create_artist(&self, artist: &Artist) -> StoreResult<()>;

    fn artist(&self, id: &ArtistId) -> StoreResult<Option<Artist>>;

    fn update_artist(
        &self,
        requester: UserId,
        id: &ArtistId,
        patch: &ArtistPatch,
    ) -> StoreResult<Artist>;

    /// Transactionally deletes the artist, all of its albums and tracks, and
    /// every favorites row pointing at any of them.
    fn delete_artist(&self, requester: UserId, id: &ArtistId) -> StoreResult<()>;

    // =========================================================================
    // Albums
    // =========================================================================

    fn create_album(&self, album: &Album) -> StoreResult<()>;

    fn album(&self, id: &AlbumId) -> StoreResult<Option<Album>>;

    fn update_album(
        &self,
        requester: UserId,
        id: &AlbumId,
        patch: &AlbumPatch,
    ) -> StoreResult<Album>;

    /// Transactionally deletes the album, its tracks, and the favorites rows
    /// for the album and those tracks.
    fn delete_album(&self, requester: UserId, id: &AlbumId) -> StoreResult<()>;

    // =========================================================================
    // Tracks
    // =========================================================================

    fn create_track(&self, track: &Track) -> StoreResult<()>;

    fn track(&self, id: &TrackId) -> StoreResult<Option<Track>>;

    fn update_track(
        &self,
        requester: UserId,
        id: &TrackId,
        patch: &TrackPatch,
        artwork_path: Option<String>,
    ) -> StoreResult<Track>;

    fn delete_track(&self, requester: UserId, id: &TrackId) -> StoreResult<()>;

    /// Random sample of up to `count` tracks joined with artist names.
    fn random_tracks(&self, count: usize) -> StoreResult<Vec<TrackSample>>;

    /// Random sample of up to `limit` tracks of the given genre.
    fn tracks_by_genre(&self, genre: &str, limit: usize) -> StoreResult<Vec<TrackSample>>;
}
