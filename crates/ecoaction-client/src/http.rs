use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use ecoaction_types::api::Envelope;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::session::Credential;

/// Thin JSON transport over the REST API. Every response goes through
/// [`decode_body`], the one place where HTTP status and the body's
/// `success`/`error` fields are turned into a `Result`.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base: Arc<str>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_http(http, &config.api_base))
    }

    pub fn with_http(http: Client, api_base: &str) -> Self {
        Self {
            http,
            base: Arc::from(api_base.trim_end_matches('/')),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// `path` is relative to the API base and starts with `/`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn request(&self, method: Method, path: &str, credential: Option<&Credential>) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match credential {
            Some(credential) => builder.header(header::AUTHORIZATION, credential.bearer()),
            None => builder,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, credential: Option<&Credential>) -> Result<T> {
        self.execute(Method::GET, path, self.request(Method::GET, path, credential))
            .await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        credential: Option<&Credential>,
    ) -> Result<T> {
        let builder = self.request(Method::GET, path, credential).query(query);
        self.execute(Method::GET, path, builder).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B, credential: Option<&Credential>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path, credential).json(body);
        self.execute(Method::POST, path, builder).await
    }

    /// POST without a body, as used by the join/leave/approve endpoints.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str, credential: Option<&Credential>) -> Result<T> {
        self.execute(Method::POST, path, self.request(Method::POST, path, credential))
            .await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B, credential: Option<&Credential>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::PUT, path, credential).json(body);
        self.execute(Method::PUT, path, builder).await
    }

    pub async fn patch_json<B, T>(&self, path: &str, body: &B, credential: Option<&Credential>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::PATCH, path, credential).json(body);
        self.execute(Method::PATCH, path, builder).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str, credential: Option<&Credential>) -> Result<T> {
        self.execute(Method::DELETE, path, self.request(Method::DELETE, path, credential))
            .await
    }

    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<T> {
        let resp = builder.send().await.map_err(|e| {
            warn!(%method, path, "request failed: {}", e);
            ClientError::Transport(e)
        })?;
        debug!(%method, path, status = resp.status().as_u16(), "api response");
        decode(resp).await
    }
}

pub(crate) async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    let body = resp.bytes().await?;
    decode_body(status, &body)
}

/// Normalize a raw response into either the typed payload or an
/// `Api` error carrying the backend's message.
pub fn decode_body<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T> {
    let envelope: Option<Envelope> = serde_json::from_slice(body).ok();

    if !status.is_success() || envelope.as_ref().is_some_and(Envelope::is_failure) {
        let message = envelope
            .and_then(|e| e.error_message())
            .unwrap_or_else(|| status_message(status));
        return Err(ClientError::Api { status, message });
    }

    Ok(serde_json::from_slice(body)?)
}

fn status_message(status: StatusCode) -> String {
    format!(
        "HTTP {}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Status")
    )
}
