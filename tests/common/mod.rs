#![allow(dead_code)]

use async_trait::async_trait;
use reelsync::auth::{AuthErrorKind, AuthProvider, Identity};
use reelsync::error::{Result, SyncError};
use reelsync::firestore::{UserDocument, UserListStore};
use reelsync::models::{Genre, LikedMovie, MovieDetails, MovieSummary, RawMovie, SearchResult};
use reelsync::session::Session;
use reelsync::tmdb::{CatalogEndpoint, PagingLimits, TmdbApi};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const QUIET: Duration = Duration::from_millis(600);

pub fn genres() -> Vec<Genre> {
    vec![
        Genre {
            id: 28,
            name: "Action".to_string(),
        },
        Genre {
            id: 35,
            name: "Comedy".to_string(),
        },
    ]
}

pub fn summary(id: i64, name: &str) -> MovieSummary {
    MovieSummary {
        id,
        name: name.to_string(),
        image: format!("/{id}.jpg"),
        genres: vec!["Action".to_string()],
    }
}

pub fn hit(id: i64, title: &str) -> SearchResult {
    SearchResult {
        id,
        title: Some(title.to_string()),
        name: None,
        poster_path: None,
        release_date: None,
        first_air_date: None,
    }
}

/// Provider fake that serves `per_page` records for every page of every
/// endpoint. Record ids encode the page, names encode the endpoint path.
pub struct FakeTmdb {
    pub per_page: usize,
    pub genres: Mutex<Option<Vec<Genre>>>,
    pub search_hits: Vec<SearchResult>,
    pub page_calls: Mutex<Vec<(String, u32)>>,
    pub search_calls: Mutex<Vec<(String, tokio::time::Instant)>>,
    pub delays: HashMap<String, Duration>,
    pub search_delay: Duration,
    pub fail_pages: bool,
}

impl FakeTmdb {
    pub fn new(per_page: usize) -> Self {
        Self {
            per_page,
            genres: Mutex::new(Some(genres())),
            search_hits: (1..=8).map(|i| hit(i, &format!("Hit {i}"))).collect(),
            page_calls: Mutex::new(Vec::new()),
            search_calls: Mutex::new(Vec::new()),
            delays: HashMap::new(),
            search_delay: Duration::ZERO,
            fail_pages: false,
        }
    }

    pub fn with_delay(mut self, path: &str, delay: Duration) -> Self {
        self.delays.insert(path.to_string(), delay);
        self
    }

    pub fn page_count(&self) -> usize {
        self.page_calls.lock().unwrap().len()
    }

    pub fn search_count(&self) -> usize {
        self.search_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TmdbApi for FakeTmdb {
    async fn fetch_genres(&self) -> Result<Vec<Genre>> {
        self.genres
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SyncError::Network("connection refused".to_string()))
    }

    async fn fetch_page(&self, endpoint: &CatalogEndpoint, page: u32) -> Result<Vec<RawMovie>> {
        let path = endpoint.path_and_query();
        self.page_calls.lock().unwrap().push((path.clone(), page));
        if let Some(delay) = self.delays.get(&path) {
            tokio::time::sleep(*delay).await;
        }
        if self.fail_pages {
            return Err(SyncError::Upstream {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok((0..self.per_page)
            .map(|i| RawMovie {
                id: page as i64 * 1000 + i as i64,
                genre_ids: vec![28, 35],
                backdrop_path: Some(format!("/{page}-{i}.jpg")),
                original_title: Some(path.clone()),
                original_name: None,
            })
            .collect())
    }

    async fn search(&self, term: &str) -> Result<Vec<SearchResult>> {
        self.search_calls
            .lock()
            .unwrap()
            .push((term.to_string(), tokio::time::Instant::now()));
        if !self.search_delay.is_zero() {
            tokio::time::sleep(self.search_delay).await;
        }
        Ok(self
            .search_hits
            .iter()
            .cloned()
            .map(|mut h| {
                h.title = Some(format!("{term}: {}", h.title.unwrap_or_default()));
                h
            })
            .collect())
    }

    async fn fetch_movie_details(&self, id: i64) -> Result<MovieDetails> {
        if id == 404 {
            return Err(SyncError::NotFound("movie".to_string()));
        }
        Ok(MovieDetails {
            id,
            title: "Details".to_string(),
            overview: String::new(),
            poster_path: None,
            release_date: None,
            vote_average: Some(7.5),
            genres: vec!["Action".to_string()],
            runtime: Some(100),
            adult: false,
            popularity: None,
            homepage: None,
            cast: vec![],
        })
    }
}

/// In-memory document store with the union/remove semantics of the real one.
#[derive(Default)]
pub struct FakeStore {
    pub docs: Mutex<HashMap<String, Vec<LikedMovie>>>,
    pub reads: Mutex<usize>,
    pub deny_writes: bool,
    pub fail_reads: bool,
    pub ignore_removes: bool,
    pub read_delay: Duration,
    pub write_delay: Duration,
    pub tokens: Mutex<Vec<Option<String>>>,
}

impl FakeStore {
    pub fn read_count(&self) -> usize {
        *self.reads.lock().unwrap()
    }

    pub fn stored(&self, email: &str) -> Option<Vec<LikedMovie>> {
        self.docs.lock().unwrap().get(email).cloned()
    }

    async fn check_write(&self) -> Result<()> {
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
        if self.deny_writes {
            return Err(SyncError::Permission(
                "Missing or insufficient permissions.".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl UserListStore for FakeStore {
    async fn get_user_doc(&self, email: &str) -> Result<Option<UserDocument>> {
        *self.reads.lock().unwrap() += 1;
        if !self.read_delay.is_zero() {
            tokio::time::sleep(self.read_delay).await;
        }
        if self.fail_reads {
            return Err(SyncError::Network("offline".to_string()));
        }
        Ok(self.stored(email).map(|liked_movies| UserDocument {
            email: email.to_string(),
            liked_movies,
        }))
    }

    async fn create_user_doc(&self, doc: &UserDocument) -> Result<()> {
        self.check_write().await?;
        self.docs
            .lock()
            .unwrap()
            .insert(doc.email.clone(), doc.liked_movies.clone());
        Ok(())
    }

    async fn array_union(&self, email: &str, movie: &LikedMovie) -> Result<()> {
        self.check_write().await?;
        let mut docs = self.docs.lock().unwrap();
        let list = docs
            .get_mut(email)
            .ok_or_else(|| SyncError::NotFound(email.to_string()))?;
        if !list.contains(movie) {
            list.push(movie.clone());
        }
        Ok(())
    }

    async fn array_remove(&self, email: &str, movie: &LikedMovie) -> Result<()> {
        self.check_write().await?;
        if self.ignore_removes {
            return Ok(());
        }
        let mut docs = self.docs.lock().unwrap();
        if let Some(list) = docs.get_mut(email) {
            list.retain(|m| m != movie);
        }
        Ok(())
    }

    async fn authorize(&self, id_token: Option<String>) {
        self.tokens.lock().unwrap().push(id_token);
    }
}

#[derive(Default)]
pub struct FakeAuth {
    pub signed_out: Mutex<usize>,
}

pub fn identity(email: &str) -> Identity {
    Identity {
        uid: format!("uid-{email}"),
        email: email.to_string(),
        id_token: Some(format!("token-{email}")),
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        if password != "secret123" {
            return Err(SyncError::Auth(AuthErrorKind::InvalidCredential));
        }
        Ok(identity(email))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity> {
        if password.len() < 6 {
            return Err(SyncError::Auth(AuthErrorKind::WeakPassword));
        }
        Ok(identity(email))
    }

    async fn sign_out(&self) -> Result<()> {
        *self.signed_out.lock().unwrap() += 1;
        Ok(())
    }
}

pub fn session_with(tmdb: Arc<FakeTmdb>, store: Arc<FakeStore>) -> Session {
    Session::new(
        tmdb,
        store,
        Arc::new(FakeAuth::default()),
        PagingLimits::default(),
        QUIET,
    )
}
