use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_lat: f64,
    pub start_lng: f64,
    pub end_lat: f64,
    pub end_lng: f64,
    #[serde(rename = "userId", default)]
    pub user_id: Option<Uuid>,
    #[serde(default, with = "super::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "super::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "startLocation", default)]
    pub start_location: Option<String>,
    #[serde(rename = "endLocation", default)]
    pub end_location: Option<String>,
    /// Base64 image of the finished route, when the server includes it
    #[serde(rename = "finishImage", default, skip_serializing)]
    pub finish_image: Option<String>,
}

impl Route {
    /// "Start → End" using place names when known, coordinates otherwise
    pub fn endpoints_display(&self) -> String {
        let start = self
            .start_location
            .clone()
            .unwrap_or_else(|| format!("{:.5}, {:.5}", self.start_lat, self.start_lng));
        let end = self
            .end_location
            .clone()
            .unwrap_or_else(|| format!("{:.5}, {:.5}", self.end_lat, self.end_lng));
        format!("{} → {}", start, end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePoint {
    pub id: Uuid,
    pub route_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, with = "super::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRoutePoint {
    pub route_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, with = "super::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A waypoint submitted together with a new route. The server fills in the
/// route id once the route exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlannedPoint {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Picture of the finished route, uploaded with it.
#[derive(Debug, Clone)]
pub struct RouteImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl RouteImage {
    /// Content type guessed from the file extension
    pub fn mime_type(&self) -> &'static str {
        let extension = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            _ => "application/octet-stream",
        }
    }
}

/// Everything needed to create a route. Sent as a multipart form because
/// of the image.
#[derive(Debug, Clone)]
pub struct NewRoute {
    pub name: String,
    pub description: Option<String>,
    pub start_lat: f64,
    pub start_lng: f64,
    pub end_lat: f64,
    pub end_lng: f64,
    pub user_id: Uuid,
    pub start_location: Option<String>,
    pub end_location: Option<String>,
    pub finish_image: RouteImage,
    pub points: Vec<PlannedPoint>,
}

/// Partial edit of an existing route. Unset fields are left as they are.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RouteUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "startLocation", skip_serializing_if = "Option::is_none")]
    pub start_location: Option<String>,
    #[serde(rename = "endLocation", skip_serializing_if = "Option::is_none")]
    pub end_location: Option<String>,
}

impl RouteUpdate {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.start_location.is_none() && self.end_location.is_none()
    }
}
