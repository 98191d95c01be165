use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    #[serde(rename = "userId", default)]
    pub user_id: Option<Uuid>,
    pub comment: String,
    #[serde(rename = "createAt", default, with = "super::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    #[serde(rename = "routeId")]
    pub route_id: Uuid,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub comment: String,
    #[serde(rename = "createAt", default, with = "super::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewComment {
    /// A comment stamped with the current time
    pub fn now(route_id: Uuid, user_id: Uuid, comment: &str) -> Self {
        Self {
            route_id,
            user_id,
            comment: comment.to_string(),
            created_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FavoriteRequest {
    #[serde(rename = "routeId")]
    pub route_id: Uuid,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
}
