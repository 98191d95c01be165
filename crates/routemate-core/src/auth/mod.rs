//! Authentication module for managing the user session and credentials.
//!
//! This module provides:
//! - `token`: Decoding of server-issued tokens (claims only, no signature check)
//! - `Session`: The process-wide session context and its canonical teardown
//! - `AuthClient`: Login, logout and registration against the server
//! - `DurableStore`: Credential persistence (file, OS keychain, or memory)
//!
//! Token expiry is checked client-side as a convenience only; the server
//! decides, and a 401 from it clears the session.

pub mod credentials;
pub mod error;
pub mod login;
pub mod session;
pub mod storage;
pub mod token;

pub use credentials::KeyringStore;
pub use error::AuthError;
pub use login::AuthClient;
pub use session::{Session, SessionStatus};
pub use storage::{DurableStore, FileStore, MemoryStore, StorageKey};
pub use token::{MalformedTokenError, TokenPayload};
