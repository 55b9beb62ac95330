//! Catalog entity actions: artists, albums, tracks.

use crate::media::MediaVault;
use crate::store::{
    slugify, Album, AlbumId, AlbumPatch, Artist, ArtistId, ArtistPatch, LibraryStore, StoreError,
    StoreResult, Track, TrackId, TrackPatch, TrackSample, UserId,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Hard cap on the sampling endpoints, whatever the query string asks for.
pub const MAX_SAMPLE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ArtistDraft {
    pub name: String,
    pub genre: String,
    #[serde(default)]
    pub biography: String,
    #[serde(default)]
    pub links: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct AlbumDraft {
    pub title: String,
    pub artist_id: ArtistId,
    pub release_date: NaiveDate,
    pub genre: String,
}

#[derive(Debug, Deserialize)]
pub struct TrackDraft {
    pub title: String,
    pub album_id: AlbumId,
    pub duration_secs: u32,
    pub isrc: String,
    pub genre: String,
    #[serde(default)]
    pub links: HashMap<String, String>,
}

/// An artwork file received alongside track metadata.
pub struct ArtworkUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub struct CatalogManager {
    store: Arc<dyn LibraryStore>,
    media: Option<Arc<dyn MediaVault>>,
}

impl CatalogManager {
    pub fn new(store: Arc<dyn LibraryStore>, media: Option<Arc<dyn MediaVault>>) -> Self {
        Self { store, media }
    }

    pub fn create_artist(&self, requester: UserId, draft: ArtistDraft) -> StoreResult<Artist> {
        if draft.name.trim().is_empty() {
            return Err(StoreError::Invalid("artist name cannot be empty".to_string()));
        }
        let artist = Artist {
            id: ArtistId::generate(),
            slug: slugify(&draft.name),
            name: draft.name,
            genre: draft.genre,
            biography: draft.biography,
            links: draft.links,
            artwork_path: None,
            managing_user_id: requester,
        };
        self.store.create_artist(&artist)?;
        info!("User {} created artist {} ({})", requester, artist.name, artist.id);
        Ok(artist)
    }

    pub fn artist(&self, id: &ArtistId) -> StoreResult<Option<Artist>> {
        self.store.artist(id)
    }

    pub fn update_artist(
        &self,
        requester: UserId,
        id: &ArtistId,
        patch: &ArtistPatch,
    ) -> StoreResult<Artist> {
        self.store.update_artist(requester, id, patch)
    }

    pub fn delete_artist(&self, requester: UserId, id: &ArtistId) -> StoreResult<()> {
        self.store.delete_artist(requester, id)?;
        info!("User {} deleted artist {}", requester, id);
        Ok(())
    }

    /// Albums can only be added under an artist the requester manages, so a
    /// whole artist tree always has a single managing user.
    pub fn create_album(&self, requester: UserId, draft: AlbumDraft) -> StoreResult<Album> {
        let artist = self
            .store
            .artist(&draft.artist_id)?
            .ok_or(StoreError::NotFound("artist"))?;
        if artist.managing_user_id != requester {
            return Err(StoreError::NotOwner {
                user: requester,
                entity: "artist",
            });
        }
        let album = Album {
            id: AlbumId::generate(),
            title: draft.title,
            artist_id: draft.artist_id,
            release_date: draft.release_date,
            genre: draft.genre,
            managing_user_id: requester,
        };
        self.store.create_album(&album)?;
        Ok(album)
    }

    pub fn album(&self, id: &AlbumId) -> StoreResult<Option<Album>> {
        self.store.album(id)
    }

    pub fn update_album(
        &self,
        requester: UserId,
        id: &AlbumId,
        patch: &AlbumPatch,
    ) -> StoreResult<Album> {
        self.store.update_album(requester, id, patch)
    }

    pub fn delete_album(&self, requester: UserId, id: &AlbumId) -> StoreResult<()> {
        self.store.delete_album(requester, id)
    }

    pub fn create_track(
        &self,
        requester: UserId,
        draft: TrackDraft,
        artwork: Option<ArtworkUpload>,
    ) -> StoreResult<Track> {
        let album = self
            .store
            .album(&draft.album_id)?
            .ok_or(StoreError::NotFound("album"))?;
        if album.managing_user_id != requester {
            return Err(StoreError::NotOwner {
                user: requester,
                entity: "album",
            });
        }

        let id = TrackId::generate();
        let artwork_path = match artwork {
            Some(upload) => Some(self.store_artwork(&id, upload)?),
            None => None,
        };
        let track = Track {
            artist_id: album.artist_id,
            album_id: draft.album_id,
            title: draft.title,
            duration_secs: draft.duration_secs,
            isrc: draft.isrc,
            genre: draft.genre,
            links: draft.links,
            artwork_path,
            managing_user_id: requester,
            id,
        };
        self.store.create_track(&track)?;
        Ok(track)
    }

    pub fn track(&self, id: &TrackId) -> StoreResult<Option<Track>> {
        self.store.track(id)
    }

    pub fn update_track(
        &self,
        requester: UserId,
        id: &TrackId,
        patch: &TrackPatch,
        artwork: Option<ArtworkUpload>,
    ) -> StoreResult<Track> {
        // The vault write must not happen until the requester is known to
        // manage the track, or a rejected update would still clobber the
        // stored artwork bytes.
        let track = self.store.track(id)?.ok_or(StoreError::NotFound("track"))?;
        if track.managing_user_id != requester {
            return Err(StoreError::NotOwner {
                user: requester,
                entity: "track",
            });
        }
        let artwork_path = match artwork {
            Some(upload) => Some(self.store_artwork(id, upload)?),
            None => None,
        };
        self.store.update_track(requester, id, patch, artwork_path)
    }

    pub fn delete_track(&self, requester: UserId, id: &TrackId) -> StoreResult<()> {
        self.store.delete_track(requester, id)
    }

    pub fn random_tracks(&self, count: usize) -> StoreResult<Vec<TrackSample>> {
        self.store.random_tracks(count.min(MAX_SAMPLE_SIZE))
    }

    pub fn tracks_by_genre(&self, genre: &str, limit: usize) -> StoreResult<Vec<TrackSample>> {
        self.store.tracks_by_genre(genre, limit.min(MAX_SAMPLE_SIZE))
    }

    pub fn artwork(&self, path: &str) -> StoreResult<Option<Vec<u8>>> {
        match &self.media {
            Some(vault) => Ok(vault.download(path).ok()),
            None => Ok(None),
        }
    }

    fn store_artwork(&self, track_id: &TrackId, upload: ArtworkUpload) -> StoreResult<String> {
        let vault = self.media.as_ref().ok_or_else(|| {
            StoreError::Invalid("no media storage configured, cannot accept artwork".to_string())
        })?;
        let path = format!("artwork/{}/{}", track_id, upload.file_name);
        vault
            .upload(&path, &upload.bytes)
            .map_err(|e| StoreError::Invalid(e.to_string()))?;
        Ok(path)
    }
}
