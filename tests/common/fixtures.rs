//! Seeded library fixture for end-to-end tests
//!
//! Two users, each managing one artist with one album: three rock tracks
//! under artist-1 (TEST_USER) and two jazz tracks under artist-2
//! (SECOND_USER).

use super::constants::*;
use anyhow::Result;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::Path;
use tunedex_server::store::{
    slugify, AccountStatus, Album, AlbumId, Artist, ArtistId, LibraryStore, NewUser,
    SqliteLibraryStore, Track, TrackId, UserId,
};
use tunedex_server::user::CredentialsHasher;

fn seed_user(store: &SqliteLibraryStore, username: &str, email: &str, password: &str) -> UserId {
    let hasher = CredentialsHasher::default_hasher();
    let salt = hasher.generate_b64_salt();
    let hash = hasher
        .hash(password.as_bytes(), &salt)
        .expect("Failed to hash fixture password");
    store
        .create_user(&NewUser {
            username: username.to_string(),
            email: email.to_string(),
            status: AccountStatus::Active,
            password_salt: salt,
            password_hash: hash,
            hasher: hasher.to_string(),
        })
        .expect("Failed to seed fixture user")
        .id
}

fn seed_artist(store: &SqliteLibraryStore, id: &str, name: &str, genre: &str, user: UserId) {
    store
        .create_artist(&Artist {
            id: ArtistId(id.to_string()),
            name: name.to_string(),
            slug: slugify(name),
            genre: genre.to_string(),
            biography: format!("Biography of {}", name),
            links: HashMap::new(),
            artwork_path: None,
            managing_user_id: user,
        })
        .expect("Failed to seed fixture artist");
}

fn seed_album(
    store: &SqliteLibraryStore,
    id: &str,
    title: &str,
    artist: &str,
    genre: &str,
    user: UserId,
) {
    store
        .create_album(&Album {
            id: AlbumId(id.to_string()),
            title: title.to_string(),
            artist_id: ArtistId(artist.to_string()),
            release_date: NaiveDate::from_ymd_opt(2020, 6, 1).unwrap(),
            genre: genre.to_string(),
            managing_user_id: user,
        })
        .expect("Failed to seed fixture album");
}

#[allow(clippy::too_many_arguments)]
fn seed_track(
    store: &SqliteLibraryStore,
    id: &str,
    title: &str,
    artist: &str,
    album: &str,
    genre: &str,
    user: UserId,
) {
    store
        .create_track(&Track {
            id: TrackId(id.to_string()),
            title: title.to_string(),
            artist_id: ArtistId(artist.to_string()),
            album_id: AlbumId(album.to_string()),
            duration_secs: 200,
            isrc: format!("TESTISRC{}", id),
            genre: genre.to_string(),
            links: HashMap::new(),
            artwork_path: None,
            managing_user_id: user,
        })
        .expect("Failed to seed fixture track");
}

/// Creates the library database at `db_path` and fills it with the fixture
/// users and catalog.
pub fn create_test_library<P: AsRef<Path>>(db_path: P) -> Result<SqliteLibraryStore> {
    let store = SqliteLibraryStore::new(db_path)?;

    let user_1 = seed_user(&store, TEST_USER, TEST_EMAIL, TEST_PASS);
    let user_2 = seed_user(&store, SECOND_USER, SECOND_EMAIL, SECOND_PASS);

    seed_artist(&store, ARTIST_1_ID, ARTIST_1_NAME, ROCK_GENRE, user_1);
    seed_artist(&store, ARTIST_2_ID, ARTIST_2_NAME, JAZZ_GENRE, user_2);

    seed_album(&store, ALBUM_1_ID, ALBUM_1_TITLE, ARTIST_1_ID, ROCK_GENRE, user_1);
    seed_album(&store, ALBUM_2_ID, ALBUM_2_TITLE, ARTIST_2_ID, JAZZ_GENRE, user_2);

    seed_track(&store, TRACK_1_ID, TRACK_1_TITLE, ARTIST_1_ID, ALBUM_1_ID, ROCK_GENRE, user_1);
    seed_track(&store, TRACK_2_ID, TRACK_2_TITLE, ARTIST_1_ID, ALBUM_1_ID, ROCK_GENRE, user_1);
    seed_track(&store, TRACK_3_ID, TRACK_3_TITLE, ARTIST_1_ID, ALBUM_1_ID, ROCK_GENRE, user_1);
    seed_track(&store, TRACK_4_ID, TRACK_4_TITLE, ARTIST_2_ID, ALBUM_2_ID, JAZZ_GENRE, user_2);
    seed_track(&store, TRACK_5_ID, TRACK_5_TITLE, ARTIST_2_ID, ALBUM_2_ID, JAZZ_GENRE, user_2);

    Ok(store)
}
