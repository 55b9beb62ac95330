//! Account lifecycle, authentication and favorites.

use super::auth::{CredentialsHasher, SessionToken, TokenValue};
use crate::store::{
    AccountStatus, FavoriteKind, LibraryStore, NewUser, StoreError, StoreResult, User, UserId,
};
use anyhow::{Context, Result};
use std::str::FromStr;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};

pub struct UserManager {
    store: Arc<dyn LibraryStore>,
}

impl UserManager {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self { store }
    }

    /// Creates an active account with hashed credentials. Usernames, emails
    /// and passwords must be non-empty; name collisions surface as
    /// `Duplicate`.
    pub fn signup(&self, username: &str, email: &str, password: &str) -> StoreResult<User> {
        if username.trim().is_empty() {
            return Err(StoreError::Invalid("username cannot be empty".to_string()));
        }
        if email.trim().is_empty() || !email.contains('@') {
            return Err(StoreError::Invalid(format!("invalid email {:?}", email)));
        }
        if password.is_empty() {
            return Err(StoreError::Invalid("password cannot be empty".to_string()));
        }

        let hasher = CredentialsHasher::default_hasher();
        let salt = hasher.generate_b64_salt();
        let hash = hasher
            .hash(password.as_bytes(), &salt)
            .map_err(|e| StoreError::Invalid(e.to_string()))?;

        let user = self.store.create_user(&NewUser {
            username: username.to_string(),
            email: email.to_string(),
            status: AccountStatus::Active,
            password_salt: salt,
            password_hash: hash,
            hasher: hasher.to_string(),
        })?;
        info!("Created user {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Verifies the password and mints a session token. `None` means the
    /// caller gets a 403 and no hint about which part was wrong.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<SessionToken>> {
        let user = match self.store.user_by_username(username)? {
            Some(user) => user,
            None => {
                debug!("Authentication attempt for unknown user {}", username);
                return Ok(None);
            }
        };
        if user.status != AccountStatus::Active {
            debug!("Authentication attempt for non-active user {}", username);
            return Ok(None);
        }

        let credentials = self
            .store
            .user_credentials(user.id)?
            .with_context(|| format!("User {} has no credentials", user.id))?;
        let hasher = CredentialsHasher::from_str(&credentials.hasher)?;
        if !hasher.verify(password, &credentials.hash, &credentials.salt)? {
            debug!("Wrong password for user {}", username);
            return Ok(None);
        }

        let token = SessionToken {
            user_id: user.id,
            value: TokenValue::generate(),
            created: SystemTime::now(),
            last_used: None,
        };
        self.store.add_session_token(&token)?;
        Ok(Some(token))
    }

    /// Resolves a token to its user, refusing tokens whose account is no
    /// longer active. Bumps the token's last-used timestamp.
    pub fn resolve_session(&self, value: &TokenValue) -> StoreResult<Option<User>> {
        let token = match self.store.session_token(value)? {
            Some(token) => token,
            None => return Ok(None),
        };
        let user = match self.store.user(token.user_id)? {
            Some(user) if user.status == AccountStatus::Active => user,
            _ => return Ok(None),
        };
        self.store.touch_session_token(value)?;
        Ok(Some(user))
    }

    /// Discards the token if it belongs to the requester. A token owned by
    /// someone else is left in place.
    pub fn logout(&self, requester: UserId, value: &TokenValue) -> StoreResult<()> {
        match self.store.session_token(value)? {
            Some(token) if token.user_id == requester => {
                self.store.delete_session_token(value)?;
                Ok(())
            }
            _ => Err(StoreError::NotFound("session")),
        }
    }

    pub fn add_favorite(&self, user_id: UserId, content_id: &str) -> StoreResult<FavoriteKind> {
        if self.store.user(user_id)?.is_none() {
            return Err(StoreError::NotFound("user"));
        }
        let kind = self
            .store
            .resolve_content_kind(content_id)?
            .ok_or(StoreError::NotFound("content"))?;
        self.store.add_favorite(user_id, content_id, kind)?;
        Ok(kind)
    }

    pub fn remove_favorite(&self, user_id: UserId, content_id: &str) -> StoreResult<()> {
        self.store.remove_favorite(user_id, content_id)
    }

    pub fn favorites(&self, user_id: UserId, kind: FavoriteKind) -> StoreResult<Vec<String>> {
        self.store.favorites(user_id, kind)
    }

    /// Deletes the account with everything hanging off it, managed catalog
    /// entities included.
    pub fn delete_user(&self, user_id: UserId) -> StoreResult<()> {
        self.store.delete_user(user_id)?;
        info!("Deleted user {}", user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteLibraryStore;
    use tempfile::TempDir;

    fn create_manager() -> (UserManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteLibraryStore::new(temp_dir.path().join("test.db")).unwrap();
        (UserManager::new(Arc::new(store)), temp_dir)
    }

    #[test]
    fn signup_rejects_blank_fields() {
        let (manager, _tmp) = create_manager();
        assert!(matches!(
            manager.signup("", "a@b.com", "pw"),
            Err(StoreError::Invalid(_))
        ));
        assert!(matches!(
            manager.signup("alice", "not-an-email", "pw"),
            Err(StoreError::Invalid(_))
        ));
        assert!(matches!(
            manager.signup("alice", "a@b.com", ""),
            Err(StoreError::Invalid(_))
        ));
    }

    #[test]
    fn signup_then_authenticate() {
        let (manager, _tmp) = create_manager();
        let user = manager.signup("alice", "alice@example.com", "s3cret").unwrap();
        assert_eq!(user.status, AccountStatus::Active);

        let token = manager.authenticate("alice", "s3cret").unwrap();
        assert!(token.is_some());

        assert!(manager.authenticate("alice", "wrong").unwrap().is_none());
        assert!(manager.authenticate("nobody", "s3cret").unwrap().is_none());
    }

    #[test]
    fn sessions_resolve_until_logout() {
        let (manager, _tmp) = create_manager();
        let user = manager.signup("alice", "alice@example.com", "s3cret").unwrap();
        let token = manager.authenticate("alice", "s3cret").unwrap().unwrap();

        let resolved = manager.resolve_session(&token.value).unwrap().unwrap();
        assert_eq!(resolved.id, user.id);

        manager.logout(user.id, &token.value).unwrap();
        assert!(manager.resolve_session(&token.value).unwrap().is_none());
        assert!(manager.logout(user.id, &token.value).is_err());
    }

    #[test]
    fn logout_by_another_user_keeps_the_session_alive() {
        let (manager, _tmp) = create_manager();
        let alice = manager.signup("alice", "alice@example.com", "s3cret").unwrap();
        let bob = manager.signup("bob", "bob@example.com", "s3cret").unwrap();
        let token = manager.authenticate("alice", "s3cret").unwrap().unwrap();

        let denied = manager.logout(bob.id, &token.value);
        assert!(matches!(denied, Err(StoreError::NotFound("session"))));

        // alice's session survived the failed logout and still works
        let resolved = manager.resolve_session(&token.value).unwrap().unwrap();
        assert_eq!(resolved.id, alice.id);
        manager.logout(alice.id, &token.value).unwrap();
    }

    #[test]
    fn favoriting_unknown_content_is_not_found() {
        let (manager, _tmp) = create_manager();
        let user = manager.signup("alice", "alice@example.com", "s3cret").unwrap();
        let result = manager.add_favorite(user.id, "no-such-id");
        assert!(matches!(result, Err(StoreError::NotFound("content"))));
    }
}
