use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, SyncError};

/// Authenticated principal as reported by the auth provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub id_token: Option<String>,
}

impl Identity {
    /// Same principal, ignoring token refreshes.
    pub fn same_principal(&self, other: &Identity) -> bool {
        self.uid == other.uid && self.email == other.email
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    SignedIn(Identity),
    SignedOut,
}

/// Process-wide view of who is signed in. Provider callbacks go through
/// `observe`, which reports a transition only when the principal changes.
#[derive(Debug)]
pub struct IdentityWatcher {
    tx: watch::Sender<Option<Identity>>,
}

impl IdentityWatcher {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }

    pub fn observe(&self, event: Option<Identity>) -> Option<Transition> {
        let mut transition = None;
        self.tx.send_if_modified(|current| {
            let Some(next) = event else {
                if current.take().is_some() {
                    transition = Some(Transition::SignedOut);
                    return true;
                }
                return false;
            };
            if let Some(existing) = current.as_mut() {
                if existing.same_principal(&next) {
                    // Token refresh: keep the newest credential without a transition.
                    existing.id_token = next.id_token;
                    return false;
                }
            }
            *current = Some(next.clone());
            transition = Some(Transition::SignedIn(next));
            true
        });
        match &transition {
            Some(Transition::SignedIn(id)) => info!(email = %id.email, "Identity signed in"),
            Some(Transition::SignedOut) => info!("Identity signed out"),
            None => debug!("Identity callback without change"),
        }
        transition
    }
}

impl Default for IdentityWatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    InvalidEmail,
    UserDisabled,
    UserNotFound,
    WrongPassword,
    TooManyRequests,
    InvalidCredential,
    EmailAlreadyInUse,
    WeakPassword,
    OperationNotAllowed,
    Other,
}

impl AuthErrorKind {
    /// Maps an Identity Toolkit error message such as
    /// `WEAK_PASSWORD : Password should be at least 6 characters`.
    pub fn from_code(message: &str) -> Self {
        let code = message.split(" : ").next().unwrap_or(message).trim();
        match code {
            "INVALID_EMAIL" | "MISSING_EMAIL" => AuthErrorKind::InvalidEmail,
            "USER_DISABLED" => AuthErrorKind::UserDisabled,
            "EMAIL_NOT_FOUND" => AuthErrorKind::UserNotFound,
            "INVALID_PASSWORD" | "MISSING_PASSWORD" => AuthErrorKind::WrongPassword,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthErrorKind::TooManyRequests,
            "INVALID_LOGIN_CREDENTIALS" => AuthErrorKind::InvalidCredential,
            "EMAIL_EXISTS" => AuthErrorKind::EmailAlreadyInUse,
            "WEAK_PASSWORD" => AuthErrorKind::WeakPassword,
            "OPERATION_NOT_ALLOWED" | "PASSWORD_LOGIN_DISABLED" => {
                AuthErrorKind::OperationNotAllowed
            }
            _ => AuthErrorKind::Other,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            AuthErrorKind::InvalidEmail => "Invalid email address.",
            AuthErrorKind::UserDisabled => "This account has been disabled.",
            AuthErrorKind::UserNotFound => "No account found with this email.",
            AuthErrorKind::WrongPassword => "Incorrect password. Please try again.",
            AuthErrorKind::TooManyRequests => "Too many failed attempts. Please try again later.",
            AuthErrorKind::InvalidCredential => "Invalid email or password. Please try again.",
            AuthErrorKind::EmailAlreadyInUse => {
                "This email is already registered. Please login instead."
            }
            AuthErrorKind::WeakPassword => "Password should be at least 6 characters.",
            AuthErrorKind::OperationNotAllowed => "Email/password accounts are not enabled.",
            AuthErrorKind::Other => "An error occurred. Please try again.",
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity>;
    async fn sign_out(&self) -> Result<()>;
}

/// Email/password accounts through the Identity Toolkit REST API.
#[derive(Debug, Clone)]
pub struct FirebaseAuthClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl FirebaseAuthClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SyncError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.auth_base_url, &config.firebase_api_key)
    }

    async fn password_call(&self, action: &str, email: &str, password: &str) -> Result<Identity> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct AccountResponse {
            local_id: String,
            email: Option<String>,
            id_token: Option<String>,
        }
        #[derive(Deserialize)]
        struct ErrorEnvelope {
            error: ErrorBody,
        }
        #[derive(Deserialize)]
        struct ErrorBody {
            message: String,
        }

        let url = format!("{}/accounts:{action}?key={}", self.base_url, self.api_key);
        let body = json!({
            "email": email,
            "password": password,
            "returnSecureToken": true
        });
        let res = self.client.post(&url).json(&body).send().await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(envelope) => {
                    debug!(action, code = %envelope.error.message, "Auth provider rejected request");
                    Err(SyncError::Auth(AuthErrorKind::from_code(
                        &envelope.error.message,
                    )))
                }
                Err(_) => Err(SyncError::from_status(status, &text)),
            };
        }
        let account: AccountResponse = serde_json::from_str(&text)?;
        Ok(Identity {
            uid: account.local_id,
            email: account.email.unwrap_or_else(|| email.to_string()),
            id_token: account.id_token,
        })
    }
}

#[async_trait]
impl AuthProvider for FirebaseAuthClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        self.password_call("signInWithPassword", email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity> {
        self.password_call("signUp", email, password).await
    }

    async fn sign_out(&self) -> Result<()> {
        // Sessions are token based; dropping the identity is all sign-out needs.
        Ok(())
    }
}
