use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::storage::{DurableStore, StorageKey};
use super::token;
use crate::api::ApiClient;

#[derive(Debug, Default)]
struct SessionState {
    username: Option<String>,
    is_admin: bool,
    /// Advanced on every teardown so late responses can tell they are stale
    epoch: u64,
}

/// Point-in-time view of the session for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub username: Option<String>,
    pub is_admin: bool,
    pub authenticated: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionStatus {
    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> Option<i64> {
        self.expires_at
            .map(|exp| (exp - Utc::now()).num_minutes().max(0))
    }
}

/// The current user's session: one per running client, shared by `Arc`
/// between the gateway and the auth client.
///
/// In-memory fields are only changed through these methods. The durable
/// credential record (`token`, `username`) lives in the injected store.
pub struct Session {
    store: Arc<dyn DurableStore>,
    state: Mutex<SessionState>,
}

impl Session {
    /// An empty session over `store`. Call [`Session::load_from_persisted`]
    /// to pick up a previous process's login.
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self {
            store,
            state: Mutex::new(SessionState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn username(&self) -> Option<String> {
        self.state().username.clone()
    }

    pub fn is_admin(&self) -> bool {
        self.state().is_admin
    }

    /// Set the username in memory and persist it. The name is not validated.
    pub fn set_username(&self, name: &str) -> Result<()> {
        self.state().username = Some(name.to_string());
        self.store.set(StorageKey::Username, name)
    }

    /// Persist a token as the current credential.
    pub fn store_token(&self, token: &str) -> Result<()> {
        self.store.set(StorageKey::Token, token)
    }

    /// The persisted token, if any. Storage failures read as "no token".
    pub fn stored_token(&self) -> Option<String> {
        match self.store.get(StorageKey::Token) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                None
            }
        }
    }

    /// Restore the session written by a previous process.
    ///
    /// The stored username is loaded first; if a token is stored, its subject
    /// claim wins. A token that fails to decode is logged and leaves the
    /// state as it was.
    pub fn load_from_persisted(&self) {
        match self.store.get(StorageKey::Username) {
            Ok(Some(name)) => self.state().username = Some(name),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to read stored username"),
        }

        let Some(token) = self.stored_token() else {
            debug!("No stored token");
            return;
        };

        match token::decode(&token) {
            Ok(payload) => match payload.subject() {
                Some(subject) => {
                    if let Err(e) = self.set_username(subject) {
                        warn!(error = %e, "Failed to persist username from token");
                    }
                }
                None => debug!("Stored token carries no subject claim"),
            },
            Err(e) => warn!(error = %e, "Failed to decode stored token"),
        }
    }

    /// Ask the server whether the current user is an administrator.
    ///
    /// Without a token or username this is `false` and no request is made.
    /// Only a body of exactly `true` grants admin; any failure fails closed.
    /// A response that arrives after a logout is discarded.
    pub async fn fetch_role(&self, api: &ApiClient) -> bool {
        let token = self.stored_token();
        let (username, epoch) = {
            let state = self.state();
            (state.username.clone(), state.epoch)
        };

        let (Some(token), Some(username)) = (token, username) else {
            self.state().is_admin = false;
            return false;
        };

        let is_admin = match api.fetch_role(&username, &token).await {
            Ok(is_admin) => is_admin,
            Err(e) => {
                warn!(error = %e, username = %username, "Failed to fetch role");
                false
            }
        };

        let mut state = self.state();
        if state.epoch != epoch {
            debug!(username = %username, "Discarding role response for a session that was torn down");
            return state.is_admin;
        }
        state.is_admin = is_admin;
        is_admin
    }

    /// Tear the session down: clear memory and both durable keys.
    ///
    /// This is the only teardown path. Safe to call any number of times.
    pub fn logout(&self) {
        {
            let mut state = self.state();
            state.username = None;
            state.is_admin = false;
            state.epoch += 1;
        }

        for key in [StorageKey::Token, StorageKey::Username] {
            if let Err(e) = self.store.remove(key) {
                warn!(error = %e, key = key.as_str(), "Failed to remove stored credential");
            }
        }
        info!("Session cleared");
    }

    /// Whether a stored token exists, decodes, and has not expired.
    /// Recomputed on every call.
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(Utc::now())
    }

    pub fn is_authenticated_at(&self, now: DateTime<Utc>) -> bool {
        let Some(token) = self.stored_token() else {
            return false;
        };
        token::decode(&token)
            .map(|payload| payload.is_valid_at(now))
            .unwrap_or(false)
    }

    pub fn status(&self) -> SessionStatus {
        let expires_at = self
            .stored_token()
            .and_then(|token| token::decode(&token).ok())
            .and_then(|payload| payload.expires_at());
        let state = self.state();
        SessionStatus {
            username: state.username.clone(),
            is_admin: state.is_admin,
            authenticated: self.is_authenticated(),
            expires_at,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::storage::{FileStore, MemoryStore};
    use crate::auth::token::{encode_unsigned, token_expiring_in};

    fn new_session() -> (Arc<MemoryStore>, Arc<Session>) {
        let store = Arc::new(MemoryStore::new());
        let session = Arc::new(Session::new(store.clone()));
        (store, session)
    }

    #[test]
    fn test_set_username_persists() {
        let (store, session) = new_session();
        session.set_username("alice").unwrap();

        assert_eq!(session.username().as_deref(), Some("alice"));
        assert_eq!(store.get(StorageKey::Username).unwrap().as_deref(), Some("alice"));
    }

    #[test]
    fn test_expired_token_is_not_authenticated_regardless_of_username() {
        let (store, session) = new_session();
        store.set(StorageKey::Token, &token_expiring_in("alice", -1)).unwrap();
        session.set_username("alice").unwrap();

        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_malformed_tokens_are_not_authenticated() {
        let (store, session) = new_session();
        for bad in ["", "abc", "a.b", "a.!!!.c", "a.aGVsbG8.c", "a.b.c.d"] {
            store.set(StorageKey::Token, bad).unwrap();
            assert!(!session.is_authenticated(), "token {:?} should not authenticate", bad);
        }
    }

    #[test]
    fn test_valid_token_is_authenticated() {
        let (store, session) = new_session();
        assert!(!session.is_authenticated());

        store.set(StorageKey::Token, &token_expiring_in("alice", 3600)).unwrap();
        assert!(session.is_authenticated());
        assert!(!session.is_authenticated_at(Utc::now() + chrono::Duration::hours(2)));
    }

    #[test]
    fn test_load_from_persisted_prefers_token_subject() {
        let (store, session) = new_session();
        store.set(StorageKey::Username, "stale-name").unwrap();
        store.set(StorageKey::Token, &token_expiring_in("alice", 3600)).unwrap();

        session.load_from_persisted();

        assert_eq!(session.username().as_deref(), Some("alice"));
        assert_eq!(store.get(StorageKey::Username).unwrap().as_deref(), Some("alice"));
    }

    #[test]
    fn test_load_from_persisted_uses_username_claim() {
        let (store, session) = new_session();
        let token = encode_unsigned(&json!({ "username": "bob", "exp": 4_000_000_000u64 }));
        store.set(StorageKey::Token, &token).unwrap();

        session.load_from_persisted();
        assert_eq!(session.username().as_deref(), Some("bob"));
    }

    #[test]
    fn test_load_from_persisted_swallows_malformed_token() {
        let (store, session) = new_session();
        store.set(StorageKey::Username, "alice").unwrap();
        store.set(StorageKey::Token, "not-a-token").unwrap();

        session.load_from_persisted();

        assert_eq!(session.username().as_deref(), Some("alice"));
        assert_eq!(store.get(StorageKey::Token).unwrap().as_deref(), Some("not-a-token"));
    }

    #[test]
    fn test_load_from_persisted_with_nothing_stored() {
        let (_store, session) = new_session();
        session.load_from_persisted();
        assert_eq!(session.username(), None);
        assert!(!session.is_admin());
    }

    #[test]
    fn test_logout_clears_everything_and_is_idempotent() {
        let (store, session) = new_session();
        store.set(StorageKey::Token, &token_expiring_in("alice", 3600)).unwrap();
        session.set_username("alice").unwrap();
        session.state().is_admin = true;

        session.logout();
        let once = session.status();
        session.logout();
        let twice = session.status();

        assert_eq!(once, twice);
        assert!(!session.is_authenticated());
        assert_eq!(session.username(), None);
        assert!(!session.is_admin());
        assert_eq!(store.get(StorageKey::Token).unwrap(), None);
        assert_eq!(store.get(StorageKey::Username).unwrap(), None);
    }

    #[test]
    fn test_logout_clears_corrupt_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"token": "a.b"#).unwrap();
        let session = Session::new(Arc::new(FileStore::new(dir.path().to_path_buf())));

        session.logout();
        assert!(!path.exists());

        let token = token_expiring_in("alice", 3600);
        session.store_token(&token).unwrap();
        session.set_username("alice").unwrap();
        assert_eq!(session.stored_token().as_deref(), Some(token.as_str()));
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_status_reports_expiry() {
        let (store, session) = new_session();
        store.set(StorageKey::Token, &token_expiring_in("alice", 3600)).unwrap();
        session.load_from_persisted();

        let status = session.status();
        assert!(status.authenticated);
        assert_eq!(status.username.as_deref(), Some("alice"));
        let minutes = status.minutes_until_expiry().unwrap();
        assert!((58..=60).contains(&minutes));
    }

    #[tokio::test]
    async fn test_fetch_role_without_token_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
            .expect(0)
            .mount(&server)
            .await;

        let (_store, session) = new_session();
        session.set_username("alice").unwrap();
        session.state().is_admin = true;
        let api = ApiClient::new(&server.uri(), session.clone()).unwrap();

        assert!(!session.fetch_role(&api).await);
        assert!(!session.is_admin());
    }

    #[tokio::test]
    async fn test_fetch_role_without_username_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
            .expect(0)
            .mount(&server)
            .await;

        let (store, session) = new_session();
        store.set(StorageKey::Token, &token_expiring_in("alice", 3600)).unwrap();
        let api = ApiClient::new(&server.uri(), session.clone()).unwrap();

        assert!(!session.fetch_role(&api).await);
    }

    #[tokio::test]
    async fn test_fetch_role_grants_admin_on_literal_true() {
        let server = MockServer::start().await;
        let token = token_expiring_in("alice", 3600);
        Mock::given(method("GET"))
            .and(path("/role/alice"))
            .and(header("Authorization", format!("Bearer {}", token).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
            .expect(1)
            .mount(&server)
            .await;

        let (store, session) = new_session();
        store.set(StorageKey::Token, &token).unwrap();
        session.set_username("alice").unwrap();
        let api = ApiClient::new(&server.uri(), session.clone()).unwrap();

        assert!(session.fetch_role(&api).await);
        assert!(session.is_admin());
    }

    #[tokio::test]
    async fn test_fetch_role_only_accepts_boolean_true() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/role/alice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!("true")))
            .mount(&server)
            .await;

        let (store, session) = new_session();
        store.set(StorageKey::Token, &token_expiring_in("alice", 3600)).unwrap();
        session.set_username("alice").unwrap();
        let api = ApiClient::new(&server.uri(), session.clone()).unwrap();

        assert!(!session.fetch_role(&api).await);
    }

    #[tokio::test]
    async fn test_fetch_role_fails_closed_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/role/alice"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (store, session) = new_session();
        store.set(StorageKey::Token, &token_expiring_in("alice", 3600)).unwrap();
        session.set_username("alice").unwrap();
        session.state().is_admin = true;
        let api = ApiClient::new(&server.uri(), session.clone()).unwrap();

        assert!(!session.fetch_role(&api).await);
        assert!(!session.is_admin());
        // A server error is not an authentication failure
        assert_eq!(session.username().as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_role_response_after_logout_is_discarded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/role/alice"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!(true))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        let (store, session) = new_session();
        store.set(StorageKey::Token, &token_expiring_in("alice", 3600)).unwrap();
        session.set_username("alice").unwrap();
        let api = ApiClient::new(&server.uri(), session.clone()).unwrap();

        let (is_admin, ()) = tokio::join!(session.fetch_role(&api), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            session.logout();
        });

        assert!(!is_admin);
        assert!(!session.is_admin());
        assert_eq!(session.username(), None);
    }
}
