//! Shared constants for end-to-end tests
//!
//! When the seeded fixture data changes, update only this file.

#![allow(dead_code)]

// ============================================================================
// Test User Credentials
// ============================================================================

/// First test user, manages artist-1 and everything under it
pub const TEST_USER: &str = "testuser";
pub const TEST_PASS: &str = "testpass123";
pub const TEST_EMAIL: &str = "testuser@example.com";

/// Second test user, manages artist-2 and everything under it
pub const SECOND_USER: &str = "seconduser";
pub const SECOND_PASS: &str = "secondpass123";
pub const SECOND_EMAIL: &str = "seconduser@example.com";

// ============================================================================
// Seeded Catalog IDs
// ============================================================================

/// Artist managed by TEST_USER
pub const ARTIST_1_ID: &str = "artist-1";
pub const ARTIST_1_NAME: &str = "The Test Band";

/// Artist managed by SECOND_USER
pub const ARTIST_2_ID: &str = "artist-2";
pub const ARTIST_2_NAME: &str = "Jazz Ensemble";

/// Album by artist-1
pub const ALBUM_1_ID: &str = "album-1";
pub const ALBUM_1_TITLE: &str = "First Album";

/// Album by artist-2
pub const ALBUM_2_ID: &str = "album-2";
pub const ALBUM_2_TITLE: &str = "Jazz Collection";

/// Rock tracks on album-1
pub const TRACK_1_ID: &str = "track-1";
pub const TRACK_1_TITLE: &str = "Opening Track";
pub const TRACK_2_ID: &str = "track-2";
pub const TRACK_2_TITLE: &str = "Middle Track";
pub const TRACK_3_ID: &str = "track-3";
pub const TRACK_3_TITLE: &str = "Closing Track";

/// Jazz tracks on album-2
pub const TRACK_4_ID: &str = "track-4";
pub const TRACK_4_TITLE: &str = "Smooth Jazz";
pub const TRACK_5_ID: &str = "track-5";
pub const TRACK_5_TITLE: &str = "Upbeat Jazz";

pub const ROCK_GENRE: &str = "rock";
pub const JAZZ_GENRE: &str = "jazz";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
