//! Common test infrastructure
//!
//! Everything the end-to-end tests need: an isolated server per test, a
//! cookie-aware HTTP client, and the seeded library fixture.

mod client;
mod constants;
mod fixtures;
mod server;

// Public API - this is what tests import
#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use constants::*;
#[allow(unused_imports)]
pub use server::TestServer;
