use super::interceptor::SessionGuard;
use super::retry::RetryPolicy;
use super::{ApiError, Envelope};
use crate::settings::ClientSettings;
use crate::storage::TokenStorage;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Per-request switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Never attach the bearer token. Used by login and registration.
    pub skip_auth: bool,
}

impl RequestOptions {
    pub fn public() -> Self {
        Self { skip_auth: true }
    }
}

#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Request payload, kept in a form that can be rebuilt for every attempt.
#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(FilePart),
}

impl Body {
    pub fn json<B: Serialize + ?Sized>(body: &B) -> Result<Self, ApiError> {
        serde_json::to_value(body)
            .map(Body::Json)
            .map_err(|e| ApiError::InvalidInput(e.to_string()))
    }

    fn apply(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, ApiError> {
        match self {
            Body::Empty => Ok(request),
            Body::Json(value) => Ok(request.json(value)),
            Body::Multipart(part) => {
                let file = reqwest::multipart::Part::bytes(part.bytes.clone())
                    .file_name(part.file_name.clone())
                    .mime_str(&part.mime)
                    .map_err(|e| ApiError::InvalidInput(e.to_string()))?;
                let form = reqwest::multipart::Form::new().part(part.field.clone(), file);
                Ok(request.multipart(form))
            }
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// HTTP client for the account API.
///
/// Owns the token storage handle, the retry policy and the session guard, so
/// two clients never share interceptor state.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    storage: TokenStorage,
    guard: SessionGuard,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
        storage: TokenStorage,
    ) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::InvalidInput(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            storage,
            guard: SessionGuard::new(),
            retry,
        })
    }

    pub fn from_settings(settings: &ClientSettings, storage: TokenStorage) -> Result<Self, ApiError> {
        Self::new(
            settings.api_url.clone(),
            settings.timeout(),
            settings.retry_policy(),
            storage,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn storage(&self) -> &TokenStorage {
        &self.storage
    }

    pub fn session_guard(&self) -> &SessionGuard {
        &self.guard
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Option<T>, ApiError> {
        self.send(Method::GET, path, &(), Body::Empty, options).await
    }

    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send(Method::GET, path, query, Body::Empty, RequestOptions::default())
            .await
    }

    pub async fn post<T, B>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::POST, path, &(), Body::json(body)?, options)
            .await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::PUT, path, &(), Body::json(body)?, RequestOptions::default())
            .await
    }

    pub async fn put_file<T: DeserializeOwned>(
        &self,
        path: &str,
        part: FilePart,
    ) -> Result<Option<T>, ApiError> {
        self.send(Method::PUT, path, &(), Body::Multipart(part), RequestOptions::default())
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ApiError> {
        self.send(Method::DELETE, path, &(), Body::Empty, RequestOptions::default())
            .await
    }

    /// Send a request and unwrap the `{ success, message, data }` envelope.
    pub async fn send<T, Q>(
        &self,
        method: Method,
        path: &str,
        query: &Q,
        body: Body,
        options: RequestOptions,
    ) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let value = self.send_raw(method, path, query, body, options).await?;
        let envelope: Envelope<T> =
            serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))?;
        envelope.into_data()
    }

    /// Send a request and return the decoded JSON body without envelope checks.
    pub async fn send_raw<Q>(
        &self,
        method: Method,
        path: &str,
        query: &Q,
        body: Body,
        options: RequestOptions,
    ) -> Result<serde_json::Value, ApiError>
    where
        Q: Serialize + ?Sized,
    {
        let query = query_pairs(query)?;
        let url = self.url(path);
        let mut attempt = 1;

        loop {
            match self.attempt(&method, &url, &query, &body, options).await {
                Ok(value) => return Ok(value),
                Err(e) if self.retry.should_retry(&method, &e, attempt) => {
                    let delay = self.retry.delay_after(attempt);
                    log::warn!(
                        "{} {} failed (attempt {}/{}): {}, retrying in {:?}",
                        method,
                        url,
                        attempt,
                        self.retry.max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    log::error!("{} {} failed: {}", method, url, e);
                    return Err(e);
                }
            }
        }
    }

    async fn attempt(
        &self,
        method: &Method,
        url: &str,
        query: &[(String, String)],
        body: &Body,
        options: RequestOptions,
    ) -> Result<serde_json::Value, ApiError> {
        let dispatch = self.guard.ready().await;
        if dispatch.after_invalidation && !options.skip_auth {
            log::debug!("{} {} dropped, its session was invalidated while queued", method, url);
            return Err(ApiError::AuthExpired);
        }
        let token = if options.skip_auth {
            None
        } else {
            self.current_token().await
        };

        let request_id = Uuid::new_v4();
        let mut request = self.http.request(method.clone(), url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = &token {
            request = request.bearer_auth(token);
        }
        request = body.apply(request)?;

        log::debug!("[{}] {} {}", request_id, method, url);
        let response = request.send().await.map_err(ApiError::from_reqwest)?;
        let status = response.status();
        let text = response.text().await.map_err(ApiError::from_reqwest)?;
        log::debug!("[{}] {} {} -> {}", request_id, method, url, status);

        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(serde_json::Value::Null);
            }
            return serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()));
        }

        let message = error_message(&text, status);
        log::error!("API Error: {} {}", status.as_u16(), message);

        match status.as_u16() {
            401 if token.is_some() => Err(self.guard.invalidate(dispatch.epoch, &self.storage).await),
            401 => Err(ApiError::Unauthorized(message)),
            403 => Err(ApiError::Forbidden(message)),
            404 => Err(ApiError::NotFound(message)),
            code @ 500..=599 => Err(ApiError::Server {
                status: code,
                message,
            }),
            code => Err(ApiError::Validation {
                status: code,
                message,
            }),
        }
    }

    async fn current_token(&self) -> Option<String> {
        match self.storage.blocking(|storage| storage.usable_token()).await {
            Ok(token) => token,
            Err(e) => {
                log::error!("Error retrieving token: {}", e);
                None
            }
        }
    }
}

fn error_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        })
}

fn query_pairs<Q: Serialize + ?Sized>(query: &Q) -> Result<Vec<(String, String)>, ApiError> {
    let value = serde_json::to_value(query).map_err(|e| ApiError::InvalidInput(e.to_string()))?;
    let serde_json::Value::Object(map) = value else {
        return Ok(Vec::new());
    };
    Ok(map
        .into_iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect())
}
