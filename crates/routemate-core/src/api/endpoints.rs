//! Typed calls for the RouteMate REST surface.
//!
//! Each method goes through the gateway pipeline, so every one of them
//! carries the stored token and ends the session on a 401.

use reqwest::multipart::{Form, Part};
use serde_json::Value;
use urlencoding::encode;
use uuid::Uuid;

use crate::models::{
    Comment, FavoriteRequest, LoginRequest, LoginResponse, NewComment, NewRoute, NewRoutePoint,
    Registration, Route, RoutePoint, RouteUpdate, User,
};

use super::{ApiClient, ApiError};

impl ApiClient {
    // ===== Authentication =====

    /// Exchange credentials for a signed token
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        self.post("/login", &LoginRequest { username, password }).await
    }

    /// Ask whether `username` has the admin role, presenting `token`.
    /// Only a body of exactly `true` counts.
    pub async fn fetch_role(&self, username: &str, token: &str) -> Result<bool, ApiError> {
        let path = format!("/role/{}", encode(username));
        let body: Value = self.get_with_token(&path, token).await?;
        Ok(body == Value::Bool(true))
    }

    /// Create an account
    pub async fn register(&self, registration: &Registration) -> Result<String, ApiError> {
        self.post_text("/save-user", registration).await
    }

    /// Whether an account with this username already exists
    pub async fn check_username(&self, username: &str) -> Result<bool, ApiError> {
        self.get(&format!("/check/{}", encode(username))).await
    }

    // ===== Users =====

    pub async fn fetch_user(&self, user_id: Uuid) -> Result<User, ApiError> {
        self.get(&format!("/user/{}", user_id)).await
    }

    pub async fn fetch_user_by_username(&self, username: &str) -> Result<User, ApiError> {
        self.get(&format!("/{}", encode(username))).await
    }

    // ===== Routes =====

    pub async fn fetch_all_routes(&self) -> Result<Vec<Route>, ApiError> {
        self.get("/all-route").await
    }

    /// Routes created by one user
    pub async fn fetch_user_routes(&self, user_id: Uuid) -> Result<Vec<Route>, ApiError> {
        self.get(&format!("/route/{}", user_id)).await
    }

    pub async fn fetch_route(&self, route_id: Uuid) -> Result<Route, ApiError> {
        self.get(&format!("/route/details/{}", route_id)).await
    }

    /// Routes between two named places
    pub async fn search_routes(
        &self,
        start_location: &str,
        end_location: &str,
    ) -> Result<Vec<Route>, ApiError> {
        self.get_query(
            "/route/search",
            &[("startLocation", start_location), ("endLocation", end_location)],
        )
        .await
    }

    /// Create a route with its image and waypoints in one multipart upload
    pub async fn create_route(&self, route: &NewRoute) -> Result<String, ApiError> {
        self.post_multipart_text("/save-route", route_form(route)?).await
    }

    /// Change the description or place names of a route.
    /// At least one field must be set.
    pub async fn update_route(&self, route_id: Uuid, update: &RouteUpdate) -> Result<String, ApiError> {
        if update.is_empty() {
            return Err(ApiError::InvalidRequest("Route update has no fields set".to_string()));
        }
        self.put_text(&format!("/put/{}", route_id), update).await
    }

    pub async fn delete_route(&self, route_id: Uuid) -> Result<String, ApiError> {
        self.delete_text(&format!("/delete-route/{}", route_id)).await
    }

    /// Raw image bytes of the finished route
    pub async fn fetch_route_image(&self, route_id: Uuid) -> Result<Vec<u8>, ApiError> {
        self.get_bytes(&format!("/route/{}/image", route_id)).await
    }

    // ===== Route points =====

    pub async fn fetch_route_points(&self, route_id: Uuid) -> Result<Vec<RoutePoint>, ApiError> {
        self.get(&format!("/point/{}", route_id)).await
    }

    pub async fn add_route_point(&self, point: &NewRoutePoint) -> Result<String, ApiError> {
        self.post_text("/set-point", point).await
    }

    // ===== Favorites =====

    pub async fn add_favorite(&self, route_id: Uuid, user_id: Uuid) -> Result<String, ApiError> {
        self.post_text("/add", &FavoriteRequest { route_id, user_id })
            .await
    }

    pub async fn remove_favorite(&self, route_id: Uuid, user_id: Uuid) -> Result<String, ApiError> {
        self.delete_query_text(
            "/delete",
            &[("routeId", route_id.to_string()), ("userId", user_id.to_string())],
        )
        .await
    }

    /// IDs of the routes a user has favorited
    pub async fn fetch_favorite_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, ApiError> {
        self.get_query("/list", &[("userId", user_id.to_string())])
            .await
    }

    pub async fn fetch_routes_by_ids(&self, route_ids: &[Uuid]) -> Result<Vec<Route>, ApiError> {
        if route_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = route_ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.get_query("/routes-by-ids", &[("routeIds", ids)]).await
    }

    // ===== Comments =====

    pub async fn fetch_comments(&self, route_id: Uuid) -> Result<Vec<Comment>, ApiError> {
        self.get(&format!("/get-comment/{}", route_id)).await
    }

    pub async fn create_comment(&self, comment: &NewComment) -> Result<String, ApiError> {
        self.post_text("/create-comment", comment).await
    }

    pub async fn delete_comment(&self, comment_id: Uuid) -> Result<String, ApiError> {
        self.delete_text(&format!("/del/{}", comment_id)).await
    }
}

/// Form fields use the server's camelCase names; `points` travels as a JSON string.
fn route_form(route: &NewRoute) -> Result<Form, ApiError> {
    let points = serde_json::to_string(&route.points)
        .map_err(|e| ApiError::InvalidRequest(format!("Failed to encode route points: {}", e)))?;
    let image = Part::bytes(route.finish_image.bytes.clone())
        .file_name(route.finish_image.file_name.clone())
        .mime_str(route.finish_image.mime_type())?;

    let mut form = Form::new()
        .text("name", route.name.clone())
        .text("startLat", route.start_lat.to_string())
        .text("startLng", route.start_lng.to_string())
        .text("endLat", route.end_lat.to_string())
        .text("endLng", route.end_lng.to_string())
        .text("userId", route.user_id.to_string())
        .text("points", points)
        .part("finishImage", image);

    let optional = [
        ("description", &route.description),
        ("startLocation", &route.start_location),
        ("endLocation", &route.end_location),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            form = form.text(name, value.clone());
        }
    }
    Ok(form)
}

// ============================================================================
// Tests
// ============================================================================
