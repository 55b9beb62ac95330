mod error;
mod models;
mod schema;
mod sqlite_store;
mod trait_def;

pub use error::{StoreError, StoreResult};
pub use models::{
    slugify, AccountStatus, Album, AlbumId, AlbumPatch, Artist, ArtistId, ArtistPatch,
    FavoriteKind, NewUser, PasswordCredentials, Track, TrackId, TrackPatch, TrackSample, User,
    UserId,
};
pub use schema::LIBRARY_VERSIONED_SCHEMAS;
pub use sqlite_store::SqliteLibraryStore;
pub use trait_def::LibraryStore;
