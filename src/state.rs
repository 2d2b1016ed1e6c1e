//! Shared application state with subscribe/notify semantics.
//!
//! The store is owned by the composition root and handed to each synchronizer.
//! Every write replaces one named field after an operation completes; readers
//! either take a snapshot or hold a `watch::Receiver` that wakes on each write.
//! Operation families that can overlap (catalog loads, searches) tag their
//! requests with a [`Generation`] ticket so only the latest issued request may
//! write its result.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

use crate::models::{Genre, LikedMovie, MovieSummary, SearchResult};

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub movies: Vec<MovieSummary>,
    pub genres: Vec<Genre>,
    pub genres_loaded: bool,
    pub search_results: Vec<SearchResult>,
    pub liked_movies: Vec<LikedMovie>,
    /// Movie ids with an add/remove round trip still in flight.
    pub pending_likes: BTreeSet<i64>,
    /// In-flight round trips per id; an id stays pending until all finish.
    #[serde(skip)]
    pending_counts: BTreeMap<i64, usize>,
}

/// Monotonic request counter for one family of overlapping operations.
#[derive(Debug, Default)]
pub struct Generation(AtomicU64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> Ticket {
        Ticket(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Ticket for work that should survive until the next `begin`, without
    /// superseding anything itself.
    pub fn current(&self) -> Ticket {
        Ticket(self.0.load(Ordering::SeqCst))
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.0.load(Ordering::SeqCst) == ticket.0
    }
}

#[derive(Debug)]
pub struct StateStore {
    tx: watch::Sender<AppState>,
}

impl StateStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(AppState::default());
        Self { tx }
    }

    pub fn snapshot(&self) -> AppState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }

    /// Genres if they have been loaded at least once.
    pub fn loaded_genres(&self) -> Option<Vec<Genre>> {
        let state = self.tx.borrow();
        state.genres_loaded.then(|| state.genres.clone())
    }

    pub fn liked_movies(&self) -> Vec<LikedMovie> {
        self.tx.borrow().liked_movies.clone()
    }

    pub(crate) fn replace_genres(&self, genres: Vec<Genre>) {
        self.tx.send_modify(|s| {
            s.genres = genres;
            s.genres_loaded = true;
        });
    }

    /// Writes `movies` only when `ticket` is still the latest issued by `generation`.
    pub(crate) fn replace_movies_if_current(
        &self,
        generation: &Generation,
        ticket: Ticket,
        movies: Vec<MovieSummary>,
    ) -> bool {
        self.tx.send_if_modified(|s| {
            if !generation.is_current(ticket) {
                return false;
            }
            s.movies = movies;
            true
        })
    }

    pub(crate) fn replace_search_results_if_current(
        &self,
        generation: &Generation,
        ticket: Ticket,
        results: Vec<SearchResult>,
    ) -> bool {
        self.tx.send_if_modified(|s| {
            if !generation.is_current(ticket) {
                return false;
            }
            s.search_results = results;
            true
        })
    }

    pub(crate) fn replace_liked_movies_if_current(
        &self,
        generation: &Generation,
        ticket: Ticket,
        liked: Vec<LikedMovie>,
    ) -> bool {
        self.tx.send_if_modified(|s| {
            if !generation.is_current(ticket) {
                return false;
            }
            s.liked_movies = liked;
            true
        })
    }

    pub(crate) fn begin_pending_like(&self, movie_id: i64) {
        self.tx.send_if_modified(|s| {
            *s.pending_counts.entry(movie_id).or_default() += 1;
            s.pending_likes.insert(movie_id)
        });
    }

    pub(crate) fn end_pending_like(&self, movie_id: i64) {
        self.tx.send_if_modified(|s| {
            let Some(count) = s.pending_counts.get_mut(&movie_id) else {
                return false;
            };
            *count -= 1;
            if *count > 0 {
                return false;
            }
            s.pending_counts.remove(&movie_id);
            s.pending_likes.remove(&movie_id)
        });
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
