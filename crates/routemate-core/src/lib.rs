//! Core library for the RouteMate client.
//!
//! The interesting part is the session lifecycle: a server-issued token is
//! persisted locally, its claims are read (never verified) to know who is
//! logged in and until when, and a single gateway attaches it to every
//! request and clears everything when the server answers 401.
//!
//! ```no_run
//! use std::sync::Arc;
//! use routemate_core::{ApiClient, AuthClient, MemoryStore, Session};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let session = Arc::new(Session::new(Arc::new(MemoryStore::new())));
//! let api = ApiClient::new("http://localhost:8082/api", session.clone())?;
//! let auth = AuthClient::new(api.clone());
//!
//! if auth.login("alice", "secret-password").await?.is_some() {
//!     let is_admin = session.fetch_role(&api).await;
//!     println!("admin: {}", is_admin);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, Navigator};
pub use auth::{AuthClient, AuthError, DurableStore, FileStore, KeyringStore, MemoryStore, Session};
pub use config::Config;
