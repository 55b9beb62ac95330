use axum::extract::FromRef;

use crate::catalog::CatalogManager;
use crate::media::MediaVault;
use crate::store::LibraryStore;
use crate::user::UserManager;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedUserManager = Arc<UserManager>;
pub type GuardedCatalogManager = Arc<CatalogManager>;
pub type OptionalMediaVault = Option<Arc<dyn MediaVault>>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub user_manager: GuardedUserManager,
    pub catalog_manager: GuardedCatalogManager,
    pub hash: String,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn LibraryStore>,
        media: OptionalMediaVault,
        hash: String,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            user_manager: Arc::new(UserManager::new(store.clone())),
            catalog_manager: Arc::new(CatalogManager::new(store, media)),
            hash,
        }
    }
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedCatalogManager {
    fn from_ref(input: &ServerState) -> Self {
        input.catalog_manager.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
