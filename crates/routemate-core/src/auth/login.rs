use std::sync::Arc;

use tracing::{error, info, warn};

use super::error::AuthError;
use super::session::Session;
use super::token::{self, MalformedTokenError, TokenPayload};
use crate::api::ApiClient;
use crate::models::Registration;

/// Logs users in and out against the RouteMate server.
///
/// Shares the gateway's session, so a successful login is immediately visible
/// to every request the gateway sends.
#[derive(Clone)]
pub struct AuthClient {
    api: ApiClient,
    session: Arc<Session>,
}

impl AuthClient {
    pub fn new(api: ApiClient) -> Self {
        let session = api.session().clone();
        Self { api, session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Log in and persist the issued token.
    ///
    /// Returns `Ok(None)` when the server hands back a token that is already
    /// expired; the session is torn down in that case. Request failures are
    /// returned as [`AuthError::Failed`] and never retried.
    pub async fn login(&self, username: &str, password: &str) -> Result<Option<String>, AuthError> {
        let response = self.api.login(username, password).await.map_err(|e| {
            error!(error = %e, username = username, "Login failed");
            AuthError::Failed(e)
        })?;

        let payload = self.decode_token(&response.token).map_err(|e| {
            error!(error = %e, username = username, "Login returned an unreadable token");
            AuthError::MalformedToken(e)
        })?;

        // Expiry equal to now already counts as expired, same as `is_authenticated`
        if !payload.is_valid() {
            warn!(username = username, "Token already expired, please log in again");
            self.session.logout();
            return Ok(None);
        }

        if let Err(e) = self.persist(username, &response.token) {
            error!(error = %e, username = username, "Failed to store session, rolling back");
            self.session.logout();
            return Err(AuthError::Storage(e));
        }

        info!(username = username, expires_at = ?payload.expires_at(), "Login successful");
        Ok(Some(response.token))
    }

    fn persist(&self, username: &str, token: &str) -> anyhow::Result<()> {
        self.session.set_username(username)?;
        self.session.store_token(token)
    }

    /// Read a token's claims. Same decoder the session uses.
    pub fn decode_token(&self, token: &str) -> Result<TokenPayload, MalformedTokenError> {
        token::decode(token)
    }

    pub fn logout(&self) {
        self.session.logout();
    }

    /// Create an account. The form is checked locally before it is sent.
    pub async fn register(&self, registration: &Registration) -> Result<String, AuthError> {
        registration
            .validate()
            .map_err(AuthError::InvalidRegistration)?;
        let message = self.api.register(registration).await?;
        info!(username = %registration.username, "Registration accepted");
        Ok(message)
    }

    pub async fn username_taken(&self, username: &str) -> Result<bool, AuthError> {
        Ok(self.api.check_username(username).await?)
    }
}

// ============================================================================
// Tests
// ============================================================================
