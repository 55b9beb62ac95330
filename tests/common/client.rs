//! HTTP client for end-to-end tests
//!
//! High-level wrapper around reqwest with one method per server endpoint.
//! When routes or request formats change, update only this file.

#![allow(dead_code)]

use super::constants::*;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    /// Creates a new unauthenticated client
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client logged in as TEST_USER (manages artist-1)
    pub async fn authenticated(base_url: String) -> Self {
        let client = Self::new(base_url);
        let response = client.login(TEST_USER, TEST_PASS).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Test user authentication failed: {:?}",
            response.text().await
        );
        client
    }

    /// Creates a client logged in as SECOND_USER (manages artist-2)
    pub async fn authenticated_second(base_url: String) -> Self {
        let client = Self::new(base_url);
        let response = client.login(SECOND_USER, SECOND_PASS).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Second user authentication failed: {:?}",
            response.text().await
        );
        client
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /v1/auth/signup
    pub async fn signup(&self, username: &str, email: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/v1/auth/signup", self.base_url))
            .json(&json!({
                "username": username,
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .expect("Signup request failed")
    }

    /// POST /v1/auth/login
    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/v1/auth/login", self.base_url))
            .json(&json!({
                "username": username,
                "password": password,
            }))
            .send()
            .await
            .expect("Login request failed")
    }

    /// GET /v1/auth/logout
    pub async fn logout(&self) -> Response {
        self.client
            .get(format!("{}/v1/auth/logout", self.base_url))
            .send()
            .await
            .expect("Logout request failed")
    }

    /// GET /
    pub async fn stats(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Stats request failed")
    }

    // ========================================================================
    // Artist Endpoints
    // ========================================================================

    /// POST /v1/catalog/artist
    pub async fn create_artist(&self, body: &serde_json::Value) -> Response {
        self.client
            .post(format!("{}/v1/catalog/artist", self.base_url))
            .json(body)
            .send()
            .await
            .expect("Create artist request failed")
    }

    /// GET /v1/catalog/artist/{id}
    pub async fn get_artist(&self, id: &str) -> Response {
        self.client
            .get(format!("{}/v1/catalog/artist/{}", self.base_url, id))
            .send()
            .await
            .expect("Get artist request failed")
    }

    /// PUT /v1/catalog/artist/{id}
    pub async fn update_artist(&self, id: &str, patch: &serde_json::Value) -> Response {
        self.client
            .put(format!("{}/v1/catalog/artist/{}", self.base_url, id))
            .json(patch)
            .send()
            .await
            .expect("Update artist request failed")
    }

    /// DELETE /v1/catalog/artist/{id}
    pub async fn delete_artist(&self, id: &str) -> Response {
        self.client
            .delete(format!("{}/v1/catalog/artist/{}", self.base_url, id))
            .send()
            .await
            .expect("Delete artist request failed")
    }

    // ========================================================================
    // Album Endpoints
    // ========================================================================

    /// POST /v1/catalog/album
    pub async fn create_album(&self, body: &serde_json::Value) -> Response {
        self.client
            .post(format!("{}/v1/catalog/album", self.base_url))
            .json(body)
            .send()
            .await
            .expect("Create album request failed")
    }

    /// GET /v1/catalog/album/{id}
    pub async fn get_album(&self, id: &str) -> Response {
        self.client
            .get(format!("{}/v1/catalog/album/{}", self.base_url, id))
            .send()
            .await
            .expect("Get album request failed")
    }

    /// PUT /v1/catalog/album/{id}
    pub async fn update_album(&self, id: &str, patch: &serde_json::Value) -> Response {
        self.client
            .put(format!("{}/v1/catalog/album/{}", self.base_url, id))
            .json(patch)
            .send()
            .await
            .expect("Update album request failed")
    }

    /// DELETE /v1/catalog/album/{id}
    pub async fn delete_album(&self, id: &str) -> Response {
        self.client
            .delete(format!("{}/v1/catalog/album/{}", self.base_url, id))
            .send()
            .await
            .expect("Delete album request failed")
    }

    // ========================================================================
    // Track Endpoints
    // ========================================================================

    fn track_form(metadata: &serde_json::Value, artwork: Option<(&str, Vec<u8>)>) -> Form {
        let mut form = Form::new().text("metadata", metadata.to_string());
        if let Some((file_name, bytes)) = artwork {
            form = form.part("artwork", Part::bytes(bytes).file_name(file_name.to_string()));
        }
        form
    }

    /// POST /v1/catalog/track (multipart: metadata + optional artwork)
    pub async fn create_track(
        &self,
        metadata: &serde_json::Value,
        artwork: Option<(&str, Vec<u8>)>,
    ) -> Response {
        self.client
            .post(format!("{}/v1/catalog/track", self.base_url))
            .multipart(Self::track_form(metadata, artwork))
            .send()
            .await
            .expect("Create track request failed")
    }

    /// GET /v1/catalog/track/{id}
    pub async fn get_track(&self, id: &str) -> Response {
        self.client
            .get(format!("{}/v1/catalog/track/{}", self.base_url, id))
            .send()
            .await
            .expect("Get track request failed")
    }

    /// PUT /v1/catalog/track/{id} (multipart: metadata + optional artwork)
    pub async fn update_track(
        &self,
        id: &str,
        metadata: &serde_json::Value,
        artwork: Option<(&str, Vec<u8>)>,
    ) -> Response {
        self.client
            .put(format!("{}/v1/catalog/track/{}", self.base_url, id))
            .multipart(Self::track_form(metadata, artwork))
            .send()
            .await
            .expect("Update track request failed")
    }

    /// DELETE /v1/catalog/track/{id}
    pub async fn delete_track(&self, id: &str) -> Response {
        self.client
            .delete(format!("{}/v1/catalog/track/{}", self.base_url, id))
            .send()
            .await
            .expect("Delete track request failed")
    }

    /// GET /v1/catalog/tracks/random?count=
    pub async fn random_tracks(&self, count: Option<usize>) -> Response {
        let mut url = format!("{}/v1/catalog/tracks/random", self.base_url);
        if let Some(count) = count {
            url = format!("{}?count={}", url, count);
        }
        self.client
            .get(url)
            .send()
            .await
            .expect("Random tracks request failed")
    }

    /// GET /v1/catalog/tracks/genre/{genre}?limit=
    pub async fn tracks_by_genre(&self, genre: &str, limit: Option<usize>) -> Response {
        let mut url = format!("{}/v1/catalog/tracks/genre/{}", self.base_url, genre);
        if let Some(limit) = limit {
            url = format!("{}?limit={}", url, limit);
        }
        self.client
            .get(url)
            .send()
            .await
            .expect("Tracks by genre request failed")
    }

    /// GET /v1/catalog/artwork/{path}
    pub async fn get_artwork(&self, path: &str) -> Response {
        self.client
            .get(format!("{}/v1/catalog/artwork/{}", self.base_url, path))
            .send()
            .await
            .expect("Get artwork request failed")
    }

    // ========================================================================
    // User Endpoints
    // ========================================================================

    /// POST /v1/user/favorite/{content_id}
    pub async fn add_favorite(&self, content_id: &str) -> Response {
        self.client
            .post(format!("{}/v1/user/favorite/{}", self.base_url, content_id))
            .send()
            .await
            .expect("Add favorite request failed")
    }

    /// DELETE /v1/user/favorite/{content_id}
    pub async fn remove_favorite(&self, content_id: &str) -> Response {
        self.client
            .delete(format!("{}/v1/user/favorite/{}", self.base_url, content_id))
            .send()
            .await
            .expect("Remove favorite request failed")
    }

    /// GET /v1/user/favorites/{kind}
    pub async fn get_favorites(&self, kind: &str) -> Response {
        self.client
            .get(format!("{}/v1/user/favorites/{}", self.base_url, kind))
            .send()
            .await
            .expect("Get favorites request failed")
    }

    /// DELETE /v1/user
    pub async fn delete_account(&self) -> Response {
        self.client
            .delete(format!("{}/v1/user", self.base_url))
            .send()
            .await
            .expect("Delete account request failed")
    }
}
