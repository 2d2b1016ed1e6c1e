use std::sync::Arc;
use tracing::{info, warn};

use crate::error::Result;
use crate::events::ErrorBus;
use crate::firestore::{self, UserListStore};
use crate::models::{LikedMovie, MovieSummary};
use crate::state::{Generation, StateStore, Ticket};

pub fn is_liked(liked: &[LikedMovie], movie_id: i64) -> bool {
    liked.iter().any(|m| m.id == movie_id)
}

/// Owns `likedMovies`. Mutations are full round trips: the state only ever
/// holds the list the store returned, and only while the principal that
/// issued the round trip is still the signed-in one.
pub struct LikedSync {
    store: Arc<dyn UserListStore>,
    state: Arc<StateStore>,
    errors: ErrorBus,
    principal: Generation,
}

struct PendingGuard<'a> {
    state: &'a StateStore,
    movie_id: i64,
}

impl<'a> PendingGuard<'a> {
    fn new(state: &'a StateStore, movie_id: i64) -> Self {
        state.begin_pending_like(movie_id);
        Self { state, movie_id }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.state.end_pending_like(self.movie_id);
    }
}

impl LikedSync {
    pub fn new(store: Arc<dyn UserListStore>, state: Arc<StateStore>, errors: ErrorBus) -> Self {
        Self {
            store,
            state,
            errors,
            principal: Generation::new(),
        }
    }

    pub async fn refresh(&self, email: &str) -> Vec<LikedMovie> {
        self.refresh_as(self.principal.current(), email).await
    }

    /// Refresh on behalf of the identity that `ticket` was issued for.
    pub(crate) async fn refresh_as(&self, ticket: Ticket, email: &str) -> Vec<LikedMovie> {
        let liked = firestore::get_liked_movies(self.store.as_ref(), email).await;
        if self.apply(ticket, &liked) {
            info!(email, count = liked.len(), "Liked list refreshed");
        }
        liked
    }

    pub async fn add(&self, email: &str, movie: &MovieSummary) -> Result<Vec<LikedMovie>> {
        let ticket = self.principal.current();
        let _pending = PendingGuard::new(&self.state, movie.id);
        match firestore::add_liked(self.store.as_ref(), email, movie).await {
            Ok(liked) => {
                self.apply(ticket, &liked);
                Ok(liked)
            }
            Err(e) => {
                self.errors.publish("liked.add", &e);
                Err(e)
            }
        }
    }

    pub async fn remove(&self, email: &str, movie_id: i64) -> Result<Vec<LikedMovie>> {
        let ticket = self.principal.current();
        let _pending = PendingGuard::new(&self.state, movie_id);
        match firestore::remove_liked(self.store.as_ref(), email, movie_id).await {
            Ok(liked) => {
                self.apply(ticket, &liked);
                Ok(liked)
            }
            Err(e) => {
                self.errors.publish("liked.remove", &e);
                Err(e)
            }
        }
    }

    /// Drops the local list and invalidates every round trip still in
    /// flight. Called on each identity transition; the returned ticket
    /// belongs to the new identity.
    pub fn clear(&self) -> Ticket {
        let ticket = self.principal.begin();
        self.state
            .replace_liked_movies_if_current(&self.principal, ticket, Vec::new());
        ticket
    }

    fn apply(&self, ticket: Ticket, liked: &[LikedMovie]) -> bool {
        let applied = self
            .state
            .replace_liked_movies_if_current(&self.principal, ticket, liked.to_vec());
        if !applied {
            warn!("Discarding liked list issued for a previous identity");
        }
        applied
    }

    /// Evaluated against the current state on every call.
    pub fn is_liked(&self, movie_id: i64) -> bool {
        is_liked(&self.state.liked_movies(), movie_id)
    }
}
