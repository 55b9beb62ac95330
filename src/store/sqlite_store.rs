//! SQLite-backed [`LibraryStore`].
//!
//! A single connection behind a mutex. Multi-row mutations (user signup,
//! entity updates, cascading deletes) run inside a transaction on that
//! connection, so ownership checks and the mutations they guard can never
//! observe different states.

use super::error::{StoreError, StoreResult};
use super::models::*;
use super::schema::LIBRARY_VERSIONED_SCHEMAS;
use super::trait_def::LibraryStore;
use crate::sqlite_persistence::open_versioned;
use crate::user::auth::{SessionToken, TokenValue};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

#[derive(Clone)]
pub struct SqliteLibraryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLibraryStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path, LIBRARY_VERSIONED_SCHEMAS)?;
        Ok(SqliteLibraryStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn system_time_from_secs(value: i64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(value.max(0) as u64)
}

fn unix_secs(value: SystemTime) -> i64 {
    value
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn links_to_json(links: &HashMap<String, String>) -> String {
    serde_json::to_string(links).unwrap_or_else(|_| "{}".to_string())
}

fn links_from_json(value: String) -> HashMap<String, String> {
    serde_json::from_str(&value).unwrap_or_default()
}

fn date_from_column(idx: usize, value: String) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

const ARTIST_COLUMNS: &str =
    "id, name, slug, genre, biography, links, artwork_path, managing_user_id";

fn artist_from_row(row: &Row) -> rusqlite::Result<Artist> {
    Ok(Artist {
        id: ArtistId(row.get(0)?),
        name: row.get(1)?,
        slug: row.get(2)?,
        genre: row.get(3)?,
        biography: row.get(4)?,
        links: links_from_json(row.get(5)?),
        artwork_path: row.get(6)?,
        managing_user_id: UserId(row.get(7)?),
    })
}

const ALBUM_COLUMNS: &str = "id, title, artist_id, release_date, genre, managing_user_id";

fn album_from_row(row: &Row) -> rusqlite::Result<Album> {
    Ok(Album {
        id: AlbumId(row.get(0)?),
        title: row.get(1)?,
        artist_id: ArtistId(row.get(2)?),
        release_date: date_from_column(3, row.get(3)?)?,
        genre: row.get(4)?,
        managing_user_id: UserId(row.get(5)?),
    })
}

const TRACK_COLUMNS: &str =
    "id, title, artist_id, album_id, duration_secs, isrc, genre, links, artwork_path, managing_user_id";

fn track_from_row(row: &Row) -> rusqlite::Result<Track> {
    Ok(Track {
        id: TrackId(row.get(0)?),
        title: row.get(1)?,
        artist_id: ArtistId(row.get(2)?),
        album_id: AlbumId(row.get(3)?),
        duration_secs: row.get(4)?,
        isrc: row.get(5)?,
        genre: row.get(6)?,
        links: links_from_json(row.get(7)?),
        artwork_path: row.get(8)?,
        managing_user_id: UserId(row.get(9)?),
    })
}

fn track_sample_from_row(row: &Row) -> rusqlite::Result<TrackSample> {
    Ok(TrackSample {
        id: TrackId(row.get(0)?),
        title: row.get(1)?,
        artist_id: ArtistId(row.get(2)?),
        artist_name: row.get(3)?,
        genre: row.get(4)?,
        duration_secs: row.get(5)?,
    })
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    let status: String = row.get(3)?;
    Ok(User {
        id: UserId(row.get(0)?),
        username: row.get(1)?,
        email: row.get(2)?,
        status: AccountStatus::from_db_str(&status),
    })
}

fn session_token_from_row(row: &Row) -> rusqlite::Result<SessionToken> {
    Ok(SessionToken {
        user_id: UserId(row.get(0)?),
        value: TokenValue(row.get(1)?),
        created: system_time_from_secs(row.get(2)?),
        last_used: row
            .get::<usize, Option<i64>>(3)?
            .map(system_time_from_secs),
    })
}

fn user_exists(conn: &Connection, id: UserId) -> StoreResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE id = ?1",
        params![id.0],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Fetches the managing user of `id` in `table` and compares it against the
/// requester. Runs on the caller's transaction so the check and the guarded
/// mutation see the same state.
fn check_owner(
    conn: &Connection,
    table: &str,
    id: &str,
    requester: UserId,
    entity: &'static str,
) -> StoreResult<()> {
    let owner: Option<i64> = conn
        .query_row(
            &format!("SELECT managing_user_id FROM {} WHERE id = ?1", table),
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    match owner {
        None => Err(StoreError::NotFound(entity)),
        Some(owner) if owner != requester.0 => Err(StoreError::NotOwner {
            user: requester,
            entity,
        }),
        Some(_) => Ok(()),
    }
}

fn get_artist(conn: &Connection, id: &str) -> StoreResult<Option<Artist>> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM artists WHERE id = ?1", ARTIST_COLUMNS),
            params![id],
            artist_from_row,
        )
        .optional()?)
}

fn get_album(conn: &Connection, id: &str) -> StoreResult<Option<Album>> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM albums WHERE id = ?1", ALBUM_COLUMNS),
            params![id],
            album_from_row,
        )
        .optional()?)
}

fn get_track(conn: &Connection, id: &str) -> StoreResult<Option<Track>> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM tracks WHERE id = ?1", TRACK_COLUMNS),
            params![id],
            track_from_row,
        )
        .optional()?)
}

/// Removes the artist with the tree below it: tracks, albums and every
/// favorites row pointing at any of them. Ownership is the caller's problem.
fn cascade_delete_artist(conn: &Connection, artist_id: &str) -> StoreResult<()> {
    conn.execute(
        "DELETE FROM favorites WHERE content_id IN (SELECT id FROM tracks WHERE artist_id = ?1)",
        params![artist_id],
    )?;
    conn.execute(
        "DELETE FROM favorites WHERE content_id IN (SELECT id FROM albums WHERE artist_id = ?1)",
        params![artist_id],
    )?;
    conn.execute(
        "DELETE FROM favorites WHERE content_id = ?1",
        params![artist_id],
    )?;
    conn.execute("DELETE FROM tracks WHERE artist_id = ?1", params![artist_id])?;
    conn.execute("DELETE FROM albums WHERE artist_id = ?1", params![artist_id])?;
    conn.execute("DELETE FROM artists WHERE id = ?1", params![artist_id])?;
    Ok(())
}

impl LibraryStore for SqliteLibraryStore {
    fn create_user(&self, new_user: &NewUser) -> StoreResult<User> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO users (username, email, status) VALUES (?1, ?2, ?3)",
            params![
                new_user.username,
                new_user.email,
                new_user.status.as_db_str()
            ],
        )
        .map_err(|e| StoreError::duplicate_on_conflict(e, "username or email"))?;
        let id = UserId(tx.last_insert_rowid());
        tx.execute(
            "INSERT INTO user_credentials (user_id, salt, hash, hasher) VALUES (?1, ?2, ?3, ?4)",
            params![
                id.0,
                new_user.password_salt,
                new_user.password_hash,
                new_user.hasher
            ],
        )?;
        tx.commit()?;
        Ok(User {
            id,
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            status: new_user.status,
        })
    }

    fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT id, username, email, status FROM users WHERE id = ?1",
                params![id.0],
                user_from_row,
            )
            .optional()?)
    }

    fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT id, username, email, status FROM users WHERE username = ?1",
                params![username],
                user_from_row,
            )
            .optional()?)
    }

    fn user_credentials(&self, user_id: UserId) -> StoreResult<Option<PasswordCredentials>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT user_id, salt, hash, hasher FROM user_credentials WHERE user_id = ?1",
                params![user_id.0],
                |row| {
                    Ok(PasswordCredentials {
                        user_id: UserId(row.get(0)?),
                        salt: row.get(1)?,
                        hash: row.get(2)?,
                        hasher: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        if !user_exists(&tx, id)? {
            return Err(StoreError::NotFound("user"));
        }

        let managed_artists: Vec<String> = {
            let mut stmt = tx.prepare("SELECT id FROM artists WHERE managing_user_id = ?1")?;
            let rows = stmt.query_map(params![id.0], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        };
        for artist_id in &managed_artists {
            cascade_delete_artist(&tx, artist_id)?;
        }

        // Credentials, session tokens and the user's own favorites go with
        // the users row through ON DELETE CASCADE.
        tx.execute("DELETE FROM users WHERE id = ?1", params![id.0])?;
        tx.commit()?;
        Ok(())
    }

    fn add_session_token(&self, token: &SessionToken) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO session_tokens (user_id, value, created) VALUES (?1, ?2, ?3)",
            params![token.user_id.0, token.value.0, unix_secs(token.created)],
        )?;
        Ok(())
    }

    fn session_token(&self, value: &TokenValue) -> StoreResult<Option<SessionToken>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT user_id, value, created, last_used FROM session_tokens WHERE value = ?1",
                params![value.0],
                session_token_from_row,
            )
            .optional()?)
    }

    fn delete_session_token(&self, value: &TokenValue) -> StoreResult<Option<SessionToken>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let token = tx
            .query_row(
                "SELECT user_id, value, created, last_used FROM session_tokens WHERE value = ?1",
                params![value.0],
                session_token_from_row,
            )
            .optional()?;
        if token.is_some() {
            tx.execute(
                "DELETE FROM session_tokens WHERE value = ?1",
                params![value.0],
            )?;
        }
        tx.commit()?;
        Ok(token)
    }

    fn touch_session_token(&self, value: &TokenValue) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE session_tokens SET last_used = cast(strftime('%s','now') as int) WHERE value = ?1",
            params![value.0],
        )?;
        Ok(())
    }

    fn add_favorite(
        &self,
        user_id: UserId,
        content_id: &str,
        kind: FavoriteKind,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO favorites (user_id, content_id, kind) VALUES (?1, ?2, ?3)",
            params![user_id.0, content_id, kind.to_int()],
        )
        .map_err(|e| match StoreError::duplicate_on_conflict(e, "favorite") {
            StoreError::Duplicate(_) => StoreError::AlreadyFavorited,
            other => other,
        })?;
        Ok(())
    }

    fn remove_favorite(&self, user_id: UserId, content_id: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM favorites WHERE user_id = ?1 AND content_id = ?2",
            params![user_id.0, content_id],
        )?;
        if deleted == 0 {
            return Err(StoreError::NotFavorited);
        }
        Ok(())
    }

    fn favorites(&self, user_id: UserId, kind: FavoriteKind) -> StoreResult<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT content_id FROM favorites WHERE user_id = ?1 AND kind = ?2 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id.0, kind.to_int()], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    fn resolve_content_kind(&self, content_id: &str) -> StoreResult<Option<FavoriteKind>> {
        let conn = self.conn.lock().unwrap();
        for (table, kind) in [
            ("artists", FavoriteKind::Artist),
            ("albums", FavoriteKind::Album),
            ("tracks", FavoriteKind::Track),
        ] {
            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {} WHERE id = ?1", table),
                params![content_id],
                |row| row.get(0),
            )?;
            if count > 0 {
                return Ok(Some(kind));
            }
        }
        Ok(None)
    }

    fn create_artist(&self, artist: &Artist) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        if !user_exists(&conn, artist.managing_user_id)? {
            return Err(StoreError::NotFound("user"));
        }
        conn.execute(
            &format!(
                "INSERT INTO artists ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                ARTIST_COLUMNS
            ),
            params![
                artist.id.0,
                artist.name,
                artist.slug,
                artist.genre,
                artist.biography,
                links_to_json(&artist.links),
                artist.artwork_path,
                artist.managing_user_id.0,
            ],
        )
        .map_err(|e| StoreError::duplicate_on_conflict(e, "artist name"))?;
        Ok(())
    }

    fn artist(&self, id: &ArtistId) -> StoreResult<Option<Artist>> {
        let conn = self.conn.lock().unwrap();
        get_artist(&conn, &id.0)
    }

    fn update_artist(
        &self,
        requester: UserId,
        id: &ArtistId,
        patch: &ArtistPatch,
    ) -> StoreResult<Artist> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut artist = get_artist(&tx, &id.0)?.ok_or(StoreError::NotFound("artist"))?;
        if artist.managing_user_id != requester {
            return Err(StoreError::NotOwner {
                user: requester,
                entity: "artist",
            });
        }

        if let Some(name) = &patch.name {
            artist.name = name.clone();
            artist.slug = slugify(name);
        }
        if let Some(genre) = &patch.genre {
            artist.genre = genre.clone();
        }
        if let Some(biography) = &patch.biography {
            artist.biography = biography.clone();
        }
        if let Some(links) = &patch.links {
            artist.links = links.clone();
        }

        tx.execute(
            "UPDATE artists SET name = ?1, slug = ?2, genre = ?3, biography = ?4, links = ?5 WHERE id = ?6",
            params![
                artist.name,
                artist.slug,
                artist.genre,
                artist.biography,
                links_to_json(&artist.links),
                artist.id.0,
            ],
        )
        .map_err(|e| StoreError::duplicate_on_conflict(e, "artist name"))?;
        tx.commit()?;
        Ok(artist)
    }

    fn delete_artist(&self, requester: UserId, id: &ArtistId) -> StoreResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        check_owner(&tx, "artists", &id.0, requester, "artist")?;
        cascade_delete_artist(&tx, &id.0)?;
        tx.commit()?;
        Ok(())
    }

    fn create_album(&self, album: &Album) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        if get_artist(&conn, &album.artist_id.0)?.is_none() {
            return Err(StoreError::NotFound("artist"));
        }
        conn.execute(
            &format!(
                "INSERT INTO albums ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                ALBUM_COLUMNS
            ),
            params![
                album.id.0,
                album.title,
                album.artist_id.0,
                album.release_date.format("%Y-%m-%d").to_string(),
                album.genre,
                album.managing_user_id.0,
            ],
        )
        .map_err(|e| StoreError::duplicate_on_conflict(e, "album title"))?;
        Ok(())
    }

    fn album(&self, id: &AlbumId) -> StoreResult<Option<Album>> {
        let conn = self.conn.lock().unwrap();
        get_album(&conn, &id.0)
    }

    fn update_album(
        &self,
        requester: UserId,
        id: &AlbumId,
        patch: &AlbumPatch,
    ) -> StoreResult<Album> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut album = get_album(&tx, &id.0)?.ok_or(StoreError::NotFound("album"))?;
        if album.managing_user_id != requester {
            return Err(StoreError::NotOwner {
                user: requester,
                entity: "album",
            });
        }

        if let Some(title) = &patch.title {
            album.title = title.clone();
        }
        if let Some(release_date) = patch.release_date {
            album.release_date = release_date;
        }
        if let Some(genre) = &patch.genre {
            album.genre = genre.clone();
        }

        tx.execute(
            "UPDATE albums SET title = ?1, release_date = ?2, genre = ?3 WHERE id = ?4",
            params![
                album.title,
                album.release_date.format("%Y-%m-%d").to_string(),
                album.genre,
                album.id.0,
            ],
        )
        .map_err(|e| StoreError::duplicate_on_conflict(e, "album title"))?;
        tx.commit()?;
        Ok(album)
    }

    fn delete_album(&self, requester: UserId, id: &AlbumId) -> StoreResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        check_owner(&tx, "albums", &id.0, requester, "album")?;
        tx.execute(
            "DELETE FROM favorites WHERE content_id IN (SELECT id FROM tracks WHERE album_id = ?1)",
            params![id.0],
        )?;
        tx.execute(
            "DELETE FROM favorites WHERE content_id = ?1",
            params![id.0],
        )?;
        tx.execute("DELETE FROM tracks WHERE album_id = ?1", params![id.0])?;
        tx.execute("DELETE FROM albums WHERE id = ?1", params![id.0])?;
        tx.commit()?;
        Ok(())
    }

    fn create_track(&self, track: &Track) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let album = get_album(&conn, &track.album_id.0)?.ok_or(StoreError::NotFound("album"))?;
        if album.artist_id != track.artist_id {
            return Err(StoreError::Invalid(format!(
                "album {} does not belong to artist {}",
                track.album_id, track.artist_id
            )));
        }
        conn.execute(
            &format!(
                "INSERT INTO tracks ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                TRACK_COLUMNS
            ),
            params![
                track.id.0,
                track.title,
                track.artist_id.0,
                track.album_id.0,
                track.duration_secs,
                track.isrc,
                track.genre,
                links_to_json(&track.links),
                track.artwork_path,
                track.managing_user_id.0,
            ],
        )
        .map_err(|e| StoreError::duplicate_on_conflict(e, "track title or isrc"))?;
        Ok(())
    }

    fn track(&self, id: &TrackId) -> StoreResult<Option<Track>> {
        let conn = self.conn.lock().unwrap();
        get_track(&conn, &id.0)
    }

    fn update_track(
        &self,
        requester: UserId,
        id: &TrackId,
        patch: &TrackPatch,
        artwork_path: Option<String>,
    ) -> StoreResult<Track> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut track = get_track(&tx, &id.0)?.ok_or(StoreError::NotFound("track"))?;
        if track.managing_user_id != requester {
            return Err(StoreError::NotOwner {
                user: requester,
                entity: "track",
            });
        }

        if let Some(title) = &patch.title {
            track.title = title.clone();
        }
        if let Some(duration_secs) = patch.duration_secs {
            track.duration_secs = duration_secs;
        }
        if let Some(genre) = &patch.genre {
            track.genre = genre.clone();
        }
        if let Some(links) = &patch.links {
            track.links = links.clone();
        }
        if let Some(artwork_path) = artwork_path {
            track.artwork_path = Some(artwork_path);
        }

        tx.execute(
            "UPDATE tracks SET title = ?1, duration_secs = ?2, genre = ?3, links = ?4, artwork_path = ?5 WHERE id = ?6",
            params![
                track.title,
                track.duration_secs,
                track.genre,
                links_to_json(&track.links),
                track.artwork_path,
                track.id.0,
            ],
        )
        .map_err(|e| StoreError::duplicate_on_conflict(e, "track title"))?;
        tx.commit()?;
        Ok(track)
    }

    fn delete_track(&self, requester: UserId, id: &TrackId) -> StoreResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        check_owner(&tx, "tracks", &id.0, requester, "track")?;
        tx.execute(
            "DELETE FROM favorites WHERE content_id = ?1",
            params![id.0],
        )?;
        tx.execute("DELETE FROM tracks WHERE id = ?1", params![id.0])?;
        tx.commit()?;
        Ok(())
    }

    fn random_tracks(&self, count: usize) -> StoreResult<Vec<TrackSample>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT t.id, t.title, t.artist_id, a.name, t.genre, t.duration_secs
             FROM tracks t JOIN artists a ON a.id = t.artist_id
             ORDER BY RANDOM() LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![count], track_sample_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    fn tracks_by_genre(&self, genre: &str, limit: usize) -> StoreResult<Vec<TrackSample>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT t.id, t.title, t.artist_id, a.name, t.genre, t.duration_secs
             FROM tracks t JOIN artists a ON a.id = t.artist_id
             WHERE t.genre = ?1 COLLATE NOCASE
             ORDER BY RANDOM() LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![genre, limit], track_sample_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }
}
