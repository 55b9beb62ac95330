//! SQLite schema for the library database.
//!
//! One database holds users, their credentials and session tokens, the
//! favorites relation, and the three catalog entity tables. Keeping them
//! together lets cascading deletes run as a single transaction.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnDelete, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};

const USER_FK_CASCADE: ForeignKey = ForeignKey {
    foreign_table: "users",
    foreign_column: "id",
    on_delete: ForeignKeyOnDelete::Cascade,
};

/// Managing-user references are RESTRICT: the store deletes managed entities
/// explicitly inside the user-deletion transaction, and the constraint
/// guarantees nothing slips through.
const MANAGING_USER_FK: ForeignKey = ForeignKey {
    foreign_table: "users",
    foreign_column: "id",
    on_delete: ForeignKeyOnDelete::Restrict,
};

const ARTIST_FK: ForeignKey = ForeignKey {
    foreign_table: "artists",
    foreign_column: "id",
    on_delete: ForeignKeyOnDelete::Restrict,
};

const ALBUM_FK: ForeignKey = ForeignKey {
    foreign_table: "albums",
    foreign_column: "id",
    on_delete: ForeignKeyOnDelete::Restrict,
};

const USERS_TABLE: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("username", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("email", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("status", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_users_username", "username")],
    unique_constraints: &[],
};

const USER_CREDENTIALS_TABLE: Table = Table {
    name: "user_credentials",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            is_unique = true,
            foreign_key = Some(&USER_FK_CASCADE)
        ),
        sqlite_column!("salt", &SqlType::Text, non_null = true),
        sqlite_column!("hash", &SqlType::Text, non_null = true),
        sqlite_column!("hasher", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

const SESSION_TOKENS_TABLE: Table = Table {
    name: "session_tokens",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK_CASCADE)
        ),
        sqlite_column!("value", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    indices: &[("idx_session_tokens_value", "value")],
    unique_constraints: &[],
};

const FAVORITES_TABLE: Table = Table {
    name: "favorites",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK_CASCADE)
        ),
        sqlite_column!("content_id", &SqlType::Text, non_null = true),
        sqlite_column!("kind", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_favorites_content_id", "content_id")],
    unique_constraints: &[&["user_id", "content_id"]],
};

const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("slug", &SqlType::Text, non_null = true),
        sqlite_column!("genre", &SqlType::Text, non_null = true),
        sqlite_column!("biography", &SqlType::Text, non_null = true),
        sqlite_column!("links", &SqlType::Text, non_null = true), // JSON object
        sqlite_column!("artwork_path", &SqlType::Text),
        sqlite_column!(
            "managing_user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&MANAGING_USER_FK)
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_artists_managing_user", "managing_user_id")],
    unique_constraints: &[],
};

const ALBUMS_TABLE: Table = Table {
    name: "albums",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!(
            "artist_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ARTIST_FK)
        ),
        sqlite_column!("release_date", &SqlType::Text, non_null = true), // YYYY-MM-DD
        sqlite_column!("genre", &SqlType::Text, non_null = true),
        sqlite_column!(
            "managing_user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&MANAGING_USER_FK)
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_albums_artist", "artist_id")],
    unique_constraints: &[&["title", "artist_id"]],
};

const TRACKS_TABLE: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!(
            "artist_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ARTIST_FK)
        ),
        sqlite_column!(
            "album_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ALBUM_FK)
        ),
        sqlite_column!("duration_secs", &SqlType::Integer, non_null = true),
        sqlite_column!("isrc", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("genre", &SqlType::Text, non_null = true),
        sqlite_column!("links", &SqlType::Text, non_null = true), // JSON object
        sqlite_column!("artwork_path", &SqlType::Text),
        sqlite_column!(
            "managing_user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&MANAGING_USER_FK)
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[
        ("idx_tracks_artist", "artist_id"),
        ("idx_tracks_album", "album_id"),
        ("idx_tracks_genre", "genre"),
    ],
    unique_constraints: &[&["title", "artist_id"]],
};

pub const LIBRARY_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        USERS_TABLE,
        USER_CREDENTIALS_TABLE,
        SESSION_TOKENS_TABLE,
        FAVORITES_TABLE,
        ARTISTS_TABLE,
        ALBUMS_TABLE,
        TRACKS_TABLE,
    ],
    migration: None,
}];

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn schema_creates_and_validates() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = &LIBRARY_VERSIONED_SCHEMAS[0];
        schema.create(&conn).unwrap();
        schema.validate(&conn).unwrap();
    }

    #[test]
    fn username_and_email_are_unique() {
        let conn = Connection::open_in_memory().unwrap();
        LIBRARY_VERSIONED_SCHEMAS[0].create(&conn).unwrap();

        conn.execute(
            "INSERT INTO users (username, email, status) VALUES ('alice', 'alice@example.com', 'active')",
            [],
        )
        .unwrap();

        let same_username = conn.execute(
            "INSERT INTO users (username, email, status) VALUES ('alice', 'other@example.com', 'active')",
            [],
        );
        assert!(same_username.is_err());

        let same_email = conn.execute(
            "INSERT INTO users (username, email, status) VALUES ('bob', 'alice@example.com', 'active')",
            [],
        );
        assert!(same_email.is_err());
    }

    #[test]
    fn album_title_unique_per_artist_only() {
        let conn = Connection::open_in_memory().unwrap();
        LIBRARY_VERSIONED_SCHEMAS[0].create(&conn).unwrap();

        conn.execute(
            "INSERT INTO users (username, email, status) VALUES ('alice', 'alice@example.com', 'active')",
            [],
        )
        .unwrap();
        for artist in ["a1", "a2"] {
            conn.execute(
                "INSERT INTO artists (id, name, slug, genre, biography, links, managing_user_id)
                 VALUES (?1, ?1, ?1, 'rock', '', '{}', 1)",
                [artist],
            )
            .unwrap();
        }

        conn.execute(
            "INSERT INTO albums (id, title, artist_id, release_date, genre, managing_user_id)
             VALUES ('al1', 'Same Title', 'a1', '2020-01-01', 'rock', 1)",
            [],
        )
        .unwrap();

        // Same title under another artist is fine
        conn.execute(
            "INSERT INTO albums (id, title, artist_id, release_date, genre, managing_user_id)
             VALUES ('al2', 'Same Title', 'a2', '2020-01-01', 'rock', 1)",
            [],
        )
        .unwrap();

        // Same title under the same artist is not
        let dup = conn.execute(
            "INSERT INTO albums (id, title, artist_id, release_date, genre, managing_user_id)
             VALUES ('al3', 'Same Title', 'a1', '2021-01-01', 'rock', 1)",
            [],
        );
        assert!(dup.is_err());
    }

    #[test]
    fn managing_user_restricts_bare_delete() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON").unwrap();
        LIBRARY_VERSIONED_SCHEMAS[0].create(&conn).unwrap();

        conn.execute(
            "INSERT INTO users (username, email, status) VALUES ('alice', 'alice@example.com', 'active')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO artists (id, name, slug, genre, biography, links, managing_user_id)
             VALUES ('a1', 'Artist', 'artist', 'rock', '', '{}', 1)",
            [],
        )
        .unwrap();

        // Deleting the user while they still manage an artist must fail
        assert!(conn.execute("DELETE FROM users WHERE id = 1", []).is_err());
    }
}
