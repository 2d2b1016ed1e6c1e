use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{Result, SyncError};
use crate::events::ErrorBus;
use crate::models::{Genre, MediaType, MovieDetails};
use crate::state::{Generation, StateStore};
use crate::tmdb::{self, CatalogEndpoint, PagingLimits, TmdbApi};

/// How a guarded operation ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// A newer request of the same family was issued before this one finished.
    Superseded,
}

/// Owns `genres`, `movies` and `searchResults` in the shared state.
pub struct CatalogSync {
    tmdb: Arc<dyn TmdbApi>,
    state: Arc<StateStore>,
    errors: ErrorBus,
    paging: PagingLimits,
    catalog_generation: Generation,
    search_generation: Generation,
}

impl CatalogSync {
    pub fn new(
        tmdb: Arc<dyn TmdbApi>,
        state: Arc<StateStore>,
        errors: ErrorBus,
        paging: PagingLimits,
    ) -> Self {
        Self {
            tmdb,
            state,
            errors,
            paging,
            catalog_generation: Generation::new(),
            search_generation: Generation::new(),
        }
    }

    pub async fn load_genres(&self) -> Result<Vec<Genre>> {
        match self.tmdb.fetch_genres().await {
            Ok(genres) => {
                info!(count = genres.len(), "Genres loaded");
                self.state.replace_genres(genres.clone());
                Ok(genres)
            }
            Err(e) => Err(self.fail("catalog.load_genres", e)),
        }
    }

    /// Trending listing for `media`. Requires genres to be loaded.
    pub async fn load_catalog(&self, media: MediaType) -> Result<Outcome> {
        self.load(CatalogEndpoint::Trending(media), "catalog.load_catalog")
            .await
    }

    /// Discover listing filtered by `genre`; `None` refetches the unfiltered listing.
    pub async fn load_by_genre(&self, genre: Option<i64>, media: MediaType) -> Result<Outcome> {
        self.load(
            CatalogEndpoint::Discover { media, genre },
            "catalog.load_by_genre",
        )
        .await
    }

    async fn load(&self, endpoint: CatalogEndpoint, operation: &'static str) -> Result<Outcome> {
        let Some(genres) = self.state.loaded_genres() else {
            return Err(self.fail(operation, SyncError::GenresNotLoaded));
        };
        let ticket = self.catalog_generation.begin();
        let fetched = tmdb::fetch_paged(self.tmdb.as_ref(), &endpoint, &genres, self.paging).await;

        match fetched {
            Ok(movies) => {
                let count = movies.len();
                if self
                    .state
                    .replace_movies_if_current(&self.catalog_generation, ticket, movies)
                {
                    info!(endpoint = %endpoint.path_and_query(), count, "Catalog replaced");
                    Ok(Outcome::Applied)
                } else {
                    warn!(endpoint = %endpoint.path_and_query(), "Discarding superseded catalog load");
                    Ok(Outcome::Superseded)
                }
            }
            Err(_) if !self.catalog_generation.is_current(ticket) => {
                warn!(endpoint = %endpoint.path_and_query(), "Ignoring failure of superseded catalog load");
                Ok(Outcome::Superseded)
            }
            Err(e) => Err(self.fail(operation, e)),
        }
    }

    /// Runs a search and replaces `searchResults`. A blank term clears them
    /// without a request.
    pub async fn search(&self, term: &str) -> Result<Outcome> {
        let ticket = self.search_generation.begin();
        match tmdb::search_movies(self.tmdb.as_ref(), term).await {
            Ok(results) => {
                let count = results.len();
                if self.state.replace_search_results_if_current(
                    &self.search_generation,
                    ticket,
                    results,
                ) {
                    info!(count, "Search results replaced");
                    Ok(Outcome::Applied)
                } else {
                    warn!("Discarding superseded search results");
                    Ok(Outcome::Superseded)
                }
            }
            Err(_) if !self.search_generation.is_current(ticket) => Ok(Outcome::Superseded),
            Err(e) => Err(self.fail("catalog.search", e)),
        }
    }

    /// Empties `searchResults` and invalidates any search still in flight.
    pub fn clear_search(&self) {
        let ticket = self.search_generation.begin();
        self.state
            .replace_search_results_if_current(&self.search_generation, ticket, Vec::new());
    }

    pub async fn movie_details(&self, id: i64) -> Result<MovieDetails> {
        self.tmdb
            .fetch_movie_details(id)
            .await
            .map_err(|e| self.fail("catalog.movie_details", e))
    }

    fn fail(&self, operation: &'static str, err: SyncError) -> SyncError {
        self.errors.publish(operation, &err);
        err
    }
}
