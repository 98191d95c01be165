//! REST API client module for the RouteMate service.
//!
//! This module provides the `ApiClient`, the single request pipeline every
//! call to the server goes through, and the typed endpoint methods built on
//! top of it.
//!
//! The API uses JWT bearer token authentication obtained from the `/login`
//! endpoint. A 401 from any endpoint ends the local session.

pub mod client;
pub mod endpoints;
pub mod error;

pub use client::{ApiClient, LogNavigator, Navigator, DEFAULT_API_BASE_URL, DEFAULT_LOGIN_PATH};
pub use error::ApiError;
