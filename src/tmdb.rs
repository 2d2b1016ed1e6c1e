use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::models::{Genre, MediaType, MovieDetails, MovieSummary, RawMovie, SearchResult};
use crate::normalize::normalize;

pub const TMDB_BASE: &str = "https://api.themoviedb.org/3";
pub const SEARCH_LIMIT: usize = 5;
const DETAILS_CAST: usize = 5;

/// Loop-exit thresholds for `fetch_paged`. `max_results` is checked before each
/// page, so the final page may push the total past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingLimits {
    pub max_results: usize,
    pub max_pages: u32,
}

impl Default for PagingLimits {
    fn default() -> Self {
        Self {
            max_results: 60,
            max_pages: 9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogEndpoint {
    Trending(MediaType),
    Discover {
        media: MediaType,
        genre: Option<i64>,
    },
}

impl CatalogEndpoint {
    /// Path plus the endpoint-specific query, without the api key or page.
    pub fn path_and_query(&self) -> String {
        match self {
            CatalogEndpoint::Trending(media) => format!("/trending/{}/week", media.as_path()),
            CatalogEndpoint::Discover { media, genre } => {
                // The provider has no "all" discover listing.
                let media = match media {
                    MediaType::All => MediaType::Movie,
                    other => *other,
                };
                match genre {
                    Some(g) => format!("/discover/{}?with_genres={g}", media.as_path()),
                    None => format!("/discover/{}", media.as_path()),
                }
            }
        }
    }

    fn url(&self, base: &str, api_key: &str, page: u32) -> String {
        let path = self.path_and_query();
        let sep = if path.contains('?') { '&' } else { '?' };
        format!("{base}{path}{sep}api_key={api_key}&page={page}")
    }
}

#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn fetch_genres(&self) -> Result<Vec<Genre>>;
    async fn fetch_page(&self, endpoint: &CatalogEndpoint, page: u32) -> Result<Vec<RawMovie>>;
    async fn search(&self, term: &str) -> Result<Vec<SearchResult>>;
    async fn fetch_movie_details(&self, id: i64) -> Result<MovieDetails>;
}

/// Requests pages 1..=max_pages one after another, normalizing each against
/// `genres`, until `max_results` summaries are collected. Stops early when the
/// provider returns an empty page.
pub async fn fetch_paged(
    api: &dyn TmdbApi,
    endpoint: &CatalogEndpoint,
    genres: &[Genre],
    limits: PagingLimits,
) -> Result<Vec<MovieSummary>> {
    let mut movies = Vec::new();
    let mut page = 1;
    while movies.len() < limits.max_results && page <= limits.max_pages {
        let raw = api.fetch_page(endpoint, page).await?;
        if raw.is_empty() {
            debug!(endpoint = %endpoint.path_and_query(), page, "Empty page, stopping");
            break;
        }
        let before = movies.len();
        movies.extend(normalize(&raw, genres));
        debug!(
            endpoint = %endpoint.path_and_query(),
            page,
            raw = raw.len(),
            kept = movies.len() - before,
            "Fetched catalog page"
        );
        page += 1;
    }
    Ok(movies)
}

/// Top hits for `term`. A blank term short-circuits without a request.
pub async fn search_movies(api: &dyn TmdbApi, term: &str) -> Result<Vec<SearchResult>> {
    if term.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut results = api.search(term).await?;
    results.truncate(SEARCH_LIMIT);
    Ok(results)
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TmdbClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(format!("reelsync/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::Network(e.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.tmdb_base_url, &config.tmdb_api_key)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, label: &str, url: &str) -> Result<T> {
        let res = self.client.get(url).send().await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            debug!(%status, "TMDB {} failed", label);
            return Err(SyncError::from_status(status, &text));
        }
        let parsed: T = serde_json::from_str(&text)?;
        Ok(parsed)
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn fetch_genres(&self) -> Result<Vec<Genre>> {
        #[derive(Deserialize)]
        struct GenreList {
            genres: Vec<Genre>,
        }

        let url = format!("{}/genre/movie/list?api_key={}", self.base_url, self.api_key);
        let data: GenreList = self.get_json("genre list", &url).await?;
        Ok(data.genres)
    }

    async fn fetch_page(&self, endpoint: &CatalogEndpoint, page: u32) -> Result<Vec<RawMovie>> {
        let url = endpoint.url(&self.base_url, &self.api_key, page);
        let data: Paged<RawMovie> = self.get_json(&endpoint.path_and_query(), &url).await?;
        Ok(data.results)
    }

    async fn search(&self, term: &str) -> Result<Vec<SearchResult>> {
        let url = format!(
            "{}/search/movie?api_key={}&query={}",
            self.base_url,
            self.api_key,
            urlencoding::encode(term)
        );
        let data: Paged<SearchResult> = self.get_json("search", &url).await?;
        Ok(data.results)
    }

    async fn fetch_movie_details(&self, id: i64) -> Result<MovieDetails> {
        let url = format!(
            "{}/movie/{id}?api_key={}&append_to_response=credits",
            self.base_url, self.api_key
        );
        let detail: MovieDetail = self.get_json("movie details", &url).await?;
        Ok(detail.into())
    }
}

#[derive(Debug, Deserialize)]
struct Paged<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct NamedGenre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CastMember {
    name: String,
}

#[derive(Debug, Deserialize, Default)]
struct Credits {
    #[serde(default)]
    cast: Vec<CastMember>,
}

#[derive(Debug, Deserialize)]
struct MovieDetail {
    id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    overview: String,
    poster_path: Option<String>,
    release_date: Option<String>,
    vote_average: Option<f64>,
    #[serde(default)]
    genres: Vec<NamedGenre>,
    runtime: Option<u32>,
    #[serde(default)]
    adult: bool,
    popularity: Option<f64>,
    homepage: Option<String>,
    #[serde(default)]
    credits: Credits,
}

impl From<MovieDetail> for MovieDetails {
    fn from(d: MovieDetail) -> Self {
        MovieDetails {
            id: d.id,
            title: d.title,
            overview: d.overview,
            poster_path: d.poster_path,
            release_date: d.release_date,
            vote_average: d.vote_average,
            genres: d.genres.into_iter().map(|g| g.name).collect(),
            runtime: d.runtime,
            adult: d.adult,
            popularity: d.popularity,
            homepage: d.homepage.filter(|h| !h.is_empty()),
            cast: d
                .credits
                .cast
                .into_iter()
                .take(DETAILS_CAST)
                .map(|c| c.name)
                .collect(),
        }
    }
}
