//! Tunedex server library.
//!
//! Exposes the internal modules for the binary and the end-to-end tests.

pub mod catalog;
pub mod media;
pub mod server;
pub mod sqlite_persistence;
pub mod store;
pub mod user;

pub use server::{run_server, RequestsLoggingLevel};
pub use store::{LibraryStore, SqliteLibraryStore};
pub use user::UserManager;
