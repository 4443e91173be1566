use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::models::{ApiResponse, DisplaySnapshot};

/// Typed failure of a snapshot fetch. Every variant maps to a distinct
/// user-facing message and is recoverable with a manual retry; none clears
/// the last good snapshot.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum FetchError {
    #[error("display not found")]
    NotFound,
    #[error("access to this display denied")]
    Forbidden,
    #[error("server error: {0}")]
    ServerError(String),
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("unexpected error: {0}")]
    Unknown(String),
}

impl FetchError {
    /// Message shown on the screen itself.
    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::NotFound => "Écran introuvable. Vérifiez l'identifiant d'affichage.",
            FetchError::Forbidden => "Accès refusé pour cet écran.",
            FetchError::ServerError(_) => "Le serveur a rencontré une erreur.",
            FetchError::NetworkError(_) => "Connexion au serveur impossible.",
            FetchError::Unknown(_) => "Une erreur inattendue s'est produite.",
        }
    }

    fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::NOT_FOUND => FetchError::NotFound,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FetchError::Forbidden,
            status if status.is_server_error() => FetchError::ServerError(status.to_string()),
            status => FetchError::Unknown(status.to_string()),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            FetchError::from_status(status)
        } else if err.is_connect() || err.is_timeout() {
            FetchError::NetworkError(err.to_string())
        } else {
            FetchError::Unknown(err.to_string())
        }
    }
}

/// HTTP API client for one tenant-scoped display
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tenant: String,
    display_id: String,
}

impl ApiClient {
    pub fn new(base_url: &str, tenant: &str, display_id: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            tenant: tenant.to_string(),
            display_id: display_id.to_string(),
        }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn display_id(&self) -> &str {
        &self.display_id
    }

    /// Fetches the full snapshot for this display. No authentication: the
    /// display endpoint is public by contract.
    pub async fn fetch_snapshot(&self) -> Result<DisplaySnapshot, FetchError> {
        let url = format!(
            "{}/api/displays/{}/{}",
            self.base_url, self.tenant, self.display_id
        );
        let response = self.client.get(&url).send().await.map_err(FetchError::from)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status));
        }

        let body: ApiResponse<DisplaySnapshot> =
            response.json().await.map_err(FetchError::from)?;
        if body.success {
            body.data
                .ok_or_else(|| FetchError::Unknown("empty response body".to_string()))
        } else {
            Err(FetchError::Unknown(
                body.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }

    /// Liveness ping. The response body is ignored; callers swallow errors.
    pub async fn heartbeat(&self) -> anyhow::Result<()> {
        let url = format!(
            "{}/api/displays/{}/{}/ping",
            self.base_url, self.tenant, self.display_id
        );
        self.client.post(&url).send().await?.error_for_status()?;
        Ok(())
    }

    /// URL of the push-channel topic for this display.
    pub fn stream_ws_url(&self) -> anyhow::Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/api/displays/{}/{}/stream/ws",
            self.base_url, self.tenant, self.display_id
        ))?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| anyhow::anyhow!("cannot derive websocket scheme for {url}"))?;
        Ok(url)
    }
}
