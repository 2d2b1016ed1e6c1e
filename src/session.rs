//! Composition root: one instance per process, shared by every consumer.
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::auth::{AuthProvider, FirebaseAuthClient, Identity, IdentityWatcher, Transition};
use crate::catalog::{CatalogSync, Outcome};
use crate::config::Config;
use crate::debounce::SearchDebouncer;
use crate::error::{Result, SyncError};
use crate::events::ErrorBus;
use crate::firestore::{FirestoreClient, UserListStore};
use crate::liked::LikedSync;
use crate::models::{LikedMovie, MediaType, MovieSummary};
use crate::state::StateStore;
use crate::tmdb::{PagingLimits, TmdbApi, TmdbClient};

pub struct Session {
    pub state: Arc<StateStore>,
    pub errors: ErrorBus,
    pub catalog: Arc<CatalogSync>,
    pub liked: LikedSync,
    pub identity: IdentityWatcher,
    pub search: SearchDebouncer,
    store: Arc<dyn UserListStore>,
    auth: Arc<dyn AuthProvider>,
}

impl Session {
    pub fn new(
        tmdb: Arc<dyn TmdbApi>,
        store: Arc<dyn UserListStore>,
        auth: Arc<dyn AuthProvider>,
        paging: PagingLimits,
        search_quiet: Duration,
    ) -> Self {
        let state = Arc::new(StateStore::new());
        let errors = ErrorBus::new();
        let catalog = Arc::new(CatalogSync::new(
            tmdb,
            state.clone(),
            errors.clone(),
            paging,
        ));
        let liked = LikedSync::new(store.clone(), state.clone(), errors.clone());
        let search = SearchDebouncer::new(catalog.clone(), search_quiet);
        Self {
            state,
            errors,
            catalog,
            liked,
            identity: IdentityWatcher::new(),
            search,
            store,
            auth,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::from_config(config)?);
        let store: Arc<dyn UserListStore> = Arc::new(FirestoreClient::from_config(config)?);
        let auth: Arc<dyn AuthProvider> = Arc::new(FirebaseAuthClient::from_config(config)?);
        Ok(Self::new(
            tmdb,
            store,
            auth,
            config.paging,
            config.search_debounce,
        ))
    }

    /// Loads genres, then the trending catalog for `media`.
    pub async fn bootstrap(&self, media: MediaType) -> Result<Outcome> {
        self.catalog.load_genres().await?;
        self.catalog.load_catalog(media).await
    }

    /// Feeds one auth provider callback through the watcher. Every transition
    /// clears the liked list and cancels its in-flight round trips; a sign-in
    /// then refreshes it once.
    pub async fn on_identity_event(&self, event: Option<Identity>) -> Option<Transition> {
        let transition = self.identity.observe(event);
        let ticket = transition.is_some().then(|| self.liked.clear());
        let token = self.identity.current().and_then(|i| i.id_token);
        self.store.authorize(token).await;
        if let (Some(Transition::SignedIn(identity)), Some(ticket)) = (&transition, ticket) {
            self.liked.refresh_as(ticket, &identity.email).await;
        }
        transition
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        let identity = self
            .auth
            .sign_in(email, password)
            .await
            .map_err(|e| self.fail("auth.sign_in", e))?;
        self.on_identity_event(Some(identity.clone())).await;
        Ok(identity)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Identity> {
        let identity = self
            .auth
            .sign_up(email, password)
            .await
            .map_err(|e| self.fail("auth.sign_up", e))?;
        info!(email = %identity.email, "Account created");
        self.on_identity_event(Some(identity.clone())).await;
        Ok(identity)
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.auth
            .sign_out()
            .await
            .map_err(|e| self.fail("auth.sign_out", e))?;
        self.on_identity_event(None).await;
        Ok(())
    }

    pub async fn add_liked(&self, movie: &MovieSummary) -> Result<Vec<LikedMovie>> {
        let email = self.signed_in_email("liked.add")?;
        self.liked.add(&email, movie).await
    }

    pub async fn remove_liked(&self, movie_id: i64) -> Result<Vec<LikedMovie>> {
        let email = self.signed_in_email("liked.remove")?;
        self.liked.remove(&email, movie_id).await
    }

    fn signed_in_email(&self, operation: &'static str) -> Result<String> {
        self.identity
            .current()
            .map(|i| i.email)
            .ok_or_else(|| self.fail(operation, SyncError::NotSignedIn))
    }

    fn fail(&self, operation: &'static str, err: SyncError) -> SyncError {
        self.errors.publish(operation, &err);
        err
    }
}
