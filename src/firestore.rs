//! Per-user liked list persisted as one document per email in the `users`
//! collection of a Firestore database.
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::models::{LikedMovie, MovieSummary};

pub const USERS_COLLECTION: &str = "users";
const LIKED_FIELD: &str = "likedMovies";

#[derive(Debug, Clone, PartialEq)]
pub struct UserDocument {
    pub email: String,
    pub liked_movies: Vec<LikedMovie>,
}

/// Document operations the liked list needs. Array updates follow the
/// store's union/remove semantics: union skips values already present,
/// remove drops every element structurally equal to the given value.
#[async_trait]
pub trait UserListStore: Send + Sync {
    async fn get_user_doc(&self, email: &str) -> Result<Option<UserDocument>>;
    async fn create_user_doc(&self, doc: &UserDocument) -> Result<()>;
    async fn array_union(&self, email: &str, movie: &LikedMovie) -> Result<()>;
    async fn array_remove(&self, email: &str, movie: &LikedMovie) -> Result<()>;

    /// Credential for subsequent calls; `None` after sign-out.
    async fn authorize(&self, _id_token: Option<String>) {}
}

/// Reads the user's list. Read failures degrade to an empty list.
pub async fn get_liked_movies(store: &dyn UserListStore, email: &str) -> Vec<LikedMovie> {
    match store.get_user_doc(email).await {
        Ok(Some(doc)) => {
            debug!(email, count = doc.liked_movies.len(), "Liked movies found");
            doc.liked_movies
        }
        Ok(None) => {
            debug!(email, "No liked movies document for user");
            Vec::new()
        }
        Err(e) => {
            warn!(email, "Failed to read liked movies, using empty list: {}", e);
            Vec::new()
        }
    }
}

pub async fn add_liked(
    store: &dyn UserListStore,
    email: &str,
    movie: &MovieSummary,
) -> Result<Vec<LikedMovie>> {
    match store.get_user_doc(email).await? {
        Some(_) => store.array_union(email, movie).await?,
        None => {
            info!(email, "Creating liked list document");
            store
                .create_user_doc(&UserDocument {
                    email: email.to_string(),
                    liked_movies: vec![movie.clone()],
                })
                .await?
        }
    }
    let updated = reread(store, email).await?;
    info!(email, movie = %movie.name, total = updated.len(), "Movie added to liked list");
    Ok(updated)
}

/// Removes the first stored entry with `movie_id`, matched back to the store
/// by its full stored value. No document yields an empty list; no matching
/// entry leaves the list untouched and returns it.
pub async fn remove_liked(
    store: &dyn UserListStore,
    email: &str,
    movie_id: i64,
) -> Result<Vec<LikedMovie>> {
    let Some(doc) = store.get_user_doc(email).await? else {
        debug!(email, movie_id, "No liked list document, nothing to remove");
        return Ok(Vec::new());
    };
    let Some(stored) = doc.liked_movies.iter().find(|m| m.id == movie_id) else {
        debug!(email, movie_id, "Movie not in liked list");
        return Ok(doc.liked_movies);
    };
    store.array_remove(email, stored).await?;
    let updated = reread(store, email).await?;
    if updated.iter().any(|m| m.id == movie_id) {
        // removeAllFromArray matches whole values; the stored element differs
        // from what decoding gave back.
        warn!(email, movie_id, "Liked entry still present after removal");
    } else {
        info!(email, movie_id, remaining = updated.len(), "Movie removed from liked list");
    }
    Ok(updated)
}

async fn reread(store: &dyn UserListStore, email: &str) -> Result<Vec<LikedMovie>> {
    Ok(store
        .get_user_doc(email)
        .await?
        .map(|d| d.liked_movies)
        .unwrap_or_default())
}

/// Firestore REST client. Requests carry the signed-in user's ID token when
/// one is set so the database's access rules apply to that user.
#[derive(Debug)]
pub struct FirestoreClient {
    client: Client,
    base_url: String,
    project_id: String,
    api_key: String,
    id_token: RwLock<Option<String>>,
}

impl FirestoreClient {
    pub fn new(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| SyncError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            api_key: api_key.into(),
            id_token: RwLock::new(None),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.firestore_base_url,
            &config.firebase_project_id,
            &config.firebase_api_key,
        )
    }

    fn database_path(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }

    fn document_name(&self, email: &str) -> String {
        format!("{}/{USERS_COLLECTION}/{email}", self.database_path())
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<(StatusCode, String)> {
        let req = match self.id_token.read().await.as_deref() {
            Some(token) => req.bearer_auth(token),
            None => req,
        };
        let res = req.send().await?;
        let status = res.status();
        let text = res.text().await?;
        Ok((status, text))
    }

    async fn commit_transform(&self, email: &str, transform: Value) -> Result<()> {
        let url = format!(
            "{}/{}:commit?key={}",
            self.base_url,
            self.database_path(),
            self.api_key
        );
        let mut field_transform = json!({ "fieldPath": LIKED_FIELD });
        if let (Some(target), Some(extra)) = (field_transform.as_object_mut(), transform.as_object())
        {
            target.extend(extra.clone());
        }
        let body = json!({
            "writes": [{
                "transform": {
                    "document": self.document_name(email),
                    "fieldTransforms": [field_transform]
                },
                "currentDocument": { "exists": true }
            }]
        });
        let (status, text) = self.send(self.client.post(&url).json(&body)).await?;
        if !status.is_success() {
            return Err(SyncError::from_status(status, &text));
        }
        Ok(())
    }
}

#[async_trait]
impl UserListStore for FirestoreClient {
    async fn get_user_doc(&self, email: &str) -> Result<Option<UserDocument>> {
        let url = format!(
            "{}/{}/{USERS_COLLECTION}/{}?key={}",
            self.base_url,
            self.database_path(),
            urlencoding::encode(email),
            self.api_key
        );
        let (status, text) = self.send(self.client.get(&url)).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SyncError::from_status(status, &text));
        }
        let doc: Value = serde_json::from_str(&text)?;
        decode_user_doc(email, &doc).map(Some)
    }

    async fn create_user_doc(&self, doc: &UserDocument) -> Result<()> {
        let url = format!(
            "{}/{}/{USERS_COLLECTION}?documentId={}&key={}",
            self.base_url,
            self.database_path(),
            urlencoding::encode(&doc.email),
            self.api_key
        );
        let body = json!({ "fields": encode_user_fields(doc) });
        let (status, text) = self.send(self.client.post(&url).json(&body)).await?;
        if !status.is_success() {
            return Err(SyncError::from_status(status, &text));
        }
        Ok(())
    }

    async fn array_union(&self, email: &str, movie: &LikedMovie) -> Result<()> {
        self.commit_transform(
            email,
            json!({ "appendMissingElements": { "values": [encode_movie(movie)] } }),
        )
        .await
    }

    async fn array_remove(&self, email: &str, movie: &LikedMovie) -> Result<()> {
        self.commit_transform(
            email,
            json!({ "removeAllFromArray": { "values": [encode_movie(movie)] } }),
        )
        .await
    }

    async fn authorize(&self, id_token: Option<String>) {
        *self.id_token.write().await = id_token;
    }
}

pub(crate) fn encode_movie(movie: &MovieSummary) -> Value {
    json!({
        "mapValue": {
            "fields": {
                "id": { "integerValue": movie.id.to_string() },
                "name": { "stringValue": movie.name },
                "image": { "stringValue": movie.image },
                "genres": {
                    "arrayValue": {
                        "values": movie
                            .genres
                            .iter()
                            .map(|g| json!({ "stringValue": g }))
                            .collect::<Vec<_>>()
                    }
                }
            }
        }
    })
}

fn encode_user_fields(doc: &UserDocument) -> Value {
    json!({
        "email": { "stringValue": doc.email },
        LIKED_FIELD: {
            "arrayValue": {
                "values": doc.liked_movies.iter().map(encode_movie).collect::<Vec<_>>()
            }
        }
    })
}

pub(crate) fn decode_user_doc(email: &str, doc: &Value) -> Result<UserDocument> {
    let fields = doc.get("fields").and_then(Value::as_object);
    let email = fields
        .and_then(|f| f.get("email"))
        .and_then(|v| v.get("stringValue"))
        .and_then(Value::as_str)
        .unwrap_or(email)
        .to_string();
    let liked_movies = fields
        .and_then(|f| f.get(LIKED_FIELD))
        .map(array_values)
        .unwrap_or_default()
        .iter()
        .map(decode_movie)
        .collect::<Result<Vec<_>>>()?;
    Ok(UserDocument {
        email,
        liked_movies,
    })
}

fn array_values(value: &Value) -> Vec<Value> {
    value
        .get("arrayValue")
        .and_then(|a| a.get("values"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn decode_movie(value: &Value) -> Result<MovieSummary> {
    let empty = Map::new();
    let fields = value
        .get("mapValue")
        .and_then(|m| m.get("fields"))
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let id = fields
        .get("id")
        .and_then(|v| {
            v.get("integerValue")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<i64>().ok())
                .or_else(|| v.get("doubleValue").and_then(Value::as_f64).map(|f| f as i64))
        })
        .ok_or_else(|| SyncError::Decode("liked movie without an id".to_string()))?;
    let string_field = |key: &str| {
        fields
            .get(key)
            .and_then(|v| v.get("stringValue"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let genres = fields
        .get("genres")
        .map(array_values)
        .unwrap_or_default()
        .iter()
        .filter_map(|g| g.get("stringValue").and_then(Value::as_str))
        .map(str::to_string)
        .collect();

    Ok(MovieSummary {
        id,
        name: string_field("name"),
        image: string_field("image"),
        genres,
    })
}
