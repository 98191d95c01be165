//! The shared request pipeline for the RouteMate REST API.
//!
//! Every call goes through [`ApiClient`], which attaches the stored bearer
//! token on the way out and reacts to a 401 on the way back by tearing the
//! session down and navigating to the login location before the error
//! reaches the caller.

use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::Form;
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::auth::Session;
use crate::config::Config;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL of the development server
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8082/api";

/// Where to send the user when the server rejects their credentials
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Receives the redirect issued when the server answers 401.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Navigator that only records the redirect in the log.
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, path: &str) {
        warn!(path = path, "Authentication required, redirecting to login");
    }
}

/// API client for RouteMate.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    login_path: String,
    session: Arc<Session>,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    /// Create a client for `base_url` with no request timeout and a logging navigator
    pub fn new(base_url: &str, session: Arc<Session>) -> Result<Self, ApiError> {
        Self::build(base_url, None, session)
    }

    /// Create a client from the user's configuration
    pub fn from_config(config: &Config, session: Arc<Session>) -> Result<Self, ApiError> {
        let client = Self::build(&config.api_base_url(), config.request_timeout(), session)?;
        Ok(client.with_login_path(&config.login_path()))
    }

    fn build(
        base_url: &str,
        timeout: Option<Duration>,
        session: Arc<Session>,
    ) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            session,
            navigator: Arc::new(LogNavigator),
        })
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn with_login_path(mut self, login_path: &str) -> Self {
        self.login_path = login_path.to_string();
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_headers(token: Option<&str>) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = token {
            let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    // ===== Request stage =====

    /// Start a request, attaching the stored token as a bearer credential if one exists.
    pub(crate) fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let token = self.session.stored_token();
        self.request_with_token(method, path, token.as_deref())
    }

    /// Start a request carrying `token` instead of whatever is stored.
    pub(crate) fn request_with_token(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
    ) -> Result<RequestBuilder, ApiError> {
        Ok(self
            .client
            .request(method, self.url(path))
            .headers(Self::auth_headers(token)?))
    }

    // ===== Response stage =====

    /// Send a request and run the response stage on the result.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        self.check_response(response).await
    }

    /// Pass successes through. A 401 ends the session and redirects before the
    /// error is returned; other failures are returned untouched.
    async fn check_response(&self, response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            warn!(url = %response.url(), "Request unauthorized, ending session");
            self.session.logout();
            self.navigator.navigate(&self.login_path);
            return Err(ApiError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = %status, "Request failed");
        Err(ApiError::from_status(status, &body))
    }

    async fn parse_json<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    // ===== Typed helpers =====

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::GET, path)?).await?;
        Self::parse_json(response, path).await
    }

    pub(crate) async fn get_with_token<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
    ) -> Result<T, ApiError> {
        let request = self.request_with_token(Method::GET, path, Some(token))?;
        let response = self.send(request).await?;
        Self::parse_json(response, path).await
    }

    pub(crate) async fn get_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self.send(self.request(Method::GET, path)?.query(query)).await?;
        Self::parse_json(response, path).await
    }

    pub(crate) async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.send(self.request(Method::GET, path)?).await?;
        Ok(response.bytes().await?.to_vec())
    }

    pub(crate) async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.send(self.request(Method::POST, path)?.json(body)).await?;
        Self::parse_json(response, path).await
    }

    /// POST for endpoints that acknowledge with a plain-text message.
    pub(crate) async fn post_text<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<String, ApiError> {
        let response = self.send(self.request(Method::POST, path)?.json(body)).await?;
        Ok(response.text().await?)
    }

    /// POST a multipart form, acknowledged with a plain-text message.
    pub(crate) async fn post_multipart_text(&self, path: &str, form: Form) -> Result<String, ApiError> {
        let response = self.send(self.request(Method::POST, path)?.multipart(form)).await?;
        Ok(response.text().await?)
    }

    pub(crate) async fn put_text<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<String, ApiError> {
        let response = self.send(self.request(Method::PUT, path)?.json(body)).await?;
        Ok(response.text().await?)
    }

    pub(crate) async fn delete_text(&self, path: &str) -> Result<String, ApiError> {
        let response = self.send(self.request(Method::DELETE, path)?).await?;
        Ok(response.text().await?)
    }

    pub(crate) async fn delete_query_text<Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<String, ApiError> {
        let response = self.send(self.request(Method::DELETE, path)?.query(query)).await?;
        Ok(response.text().await?)
    }
}

// ============================================================================
// Tests
// ============================================================================
