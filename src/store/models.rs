//! Typed models for the library store.
//!
//! Identifiers are newtypes on purpose: an `AlbumId` handed where an
//! `ArtistId` is expected is a compile error, not a dangling reference.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(ArtistId);
entity_id!(AlbumId);
entity_id!(TrackId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Pending,
    Active,
    Inactive,
    Banned,
}

impl AccountStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
            AccountStatus::Banned => "banned",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "pending" => AccountStatus::Pending,
            "active" => AccountStatus::Active,
            "banned" => AccountStatus::Banned,
            _ => AccountStatus::Inactive,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub status: AccountStatus,
}

/// Everything needed to insert a user row plus its credentials row in one
/// transaction. The password arrives here already hashed.
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub status: AccountStatus,
    pub password_salt: String,
    pub password_hash: String,
    pub hasher: String,
}

#[derive(Debug, Clone)]
pub struct PasswordCredentials {
    pub user_id: UserId,
    pub salt: String,
    pub hash: String,
    pub hasher: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteKind {
    Artist,
    Album,
    Track,
}

impl FavoriteKind {
    pub fn to_int(self) -> i32 {
        match self {
            FavoriteKind::Artist => 1,
            FavoriteKind::Album => 2,
            FavoriteKind::Track => 3,
        }
    }

    pub fn from_route_str(s: &str) -> Option<Self> {
        match s {
            "artist" => Some(FavoriteKind::Artist),
            "album" => Some(FavoriteKind::Album),
            "track" => Some(FavoriteKind::Track),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
    pub slug: String,
    pub genre: String,
    pub biography: String,
    pub links: HashMap<String, String>,
    pub artwork_path: Option<String>,
    pub managing_user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Album {
    pub id: AlbumId,
    pub title: String,
    pub artist_id: ArtistId,
    pub release_date: NaiveDate,
    pub genre: String,
    pub managing_user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist_id: ArtistId,
    pub album_id: AlbumId,
    pub duration_secs: u32,
    pub isrc: String,
    pub genre: String,
    pub links: HashMap<String, String>,
    pub artwork_path: Option<String>,
    pub managing_user_id: UserId,
}

/// A track row joined with its artist's name, as returned by the sampling
/// queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackSample {
    pub id: TrackId,
    pub title: String,
    pub artist_id: ArtistId,
    pub artist_name: String,
    pub genre: String,
    pub duration_secs: u32,
}

/// Partial update for an artist. `managing_user_id` is deliberately absent:
/// ownership is not transferable through the update path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtistPatch {
    pub name: Option<String>,
    pub genre: Option<String>,
    pub biography: Option<String>,
    pub links: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlbumPatch {
    pub title: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub genre: Option<String>,
}

/// URL-safe identifier derived from a display name. Lowercased, runs of
/// non-alphanumeric characters collapse into a single dash.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackPatch {
    pub title: Option<String>,
    pub duration_secs: Option<u32>,
    pub genre: Option<String>,
    pub links: Option<HashMap<String, String>>,
}
