//! Data models for RouteMate entities.
//!
//! This module contains the request and response bodies of the RouteMate
//! REST API:
//!
//! - `Route`, `RoutePoint`: Planned routes and their waypoints
//! - `NewRoute`, `RouteUpdate`: Creating and editing routes
//! - `Comment`, `NewComment`: Discussion attached to a route
//! - `FavoriteRequest`: A user's bookmark of a route
//! - `User`, `Registration`, `LoginRequest`, `LoginResponse`: Accounts

pub mod comment;
pub mod route;
pub mod timestamp;
pub mod user;

pub use comment::{Comment, FavoriteRequest, NewComment};
pub use route::{NewRoute, NewRoutePoint, PlannedPoint, Route, RouteImage, RoutePoint, RouteUpdate};
pub use user::{LoginRequest, LoginResponse, Registration, User};
