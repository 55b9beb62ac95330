use crate::store::models::UserId;
use thiserror::Error;

/// Error contract between the persistence layer, the action modules and the
/// HTTP controllers. Every variant maps to exactly one response class.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("duplicate {0}")]
    Duplicate(&'static str),

    #[error("user {user} does not manage this {entity}")]
    NotOwner { user: UserId, entity: &'static str },

    #[error("content is already in favorites")]
    AlreadyFavorited,

    #[error("content is not in favorites")]
    NotFavorited,

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

impl StoreError {
    /// Reinterprets a unique-constraint violation as a duplicate of `what`,
    /// leaving every other database error untouched.
    pub fn duplicate_on_conflict(err: rusqlite::Error, what: &'static str) -> StoreError {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                StoreError::Duplicate(what)
            }
            _ => StoreError::Db(err),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
