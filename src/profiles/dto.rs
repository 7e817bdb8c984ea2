use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub id: Uuid,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub subscribers_count: i64,
    pub channels_subscribed_to_count: i64,
    pub is_subscribed: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoOwner {
    pub id: Uuid,
    pub full_name: String,
    pub username: String,
    pub avatar: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedVideo {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub video_file: String,
    pub duration: f64,
    pub views: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub owner: Option<VideoOwner>,
}

/// Flat row produced by the watch-history pipeline.
#[derive(Debug, FromRow)]
pub struct WatchHistoryRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub video_file: String,
    pub duration: f64,
    pub views: i64,
    pub created_at: OffsetDateTime,
    pub owner_id: Option<Uuid>,
    pub owner_full_name: Option<String>,
    pub owner_username: Option<String>,
    pub owner_avatar: Option<String>,
}

impl From<WatchHistoryRow> for WatchedVideo {
    fn from(r: WatchHistoryRow) -> Self {
        let owner = match (r.owner_id, r.owner_full_name, r.owner_username, r.owner_avatar) {
            (Some(id), Some(full_name), Some(username), Some(avatar)) => Some(VideoOwner {
                id,
                full_name,
                username,
                avatar,
            }),
            _ => None,
        };
        Self {
            id: r.id,
            title: r.title,
            description: r.description,
            thumbnail: r.thumbnail,
            video_file: r.video_file,
            duration: r.duration,
            views: r.views,
            created_at: r.created_at,
            owner,
        }
    }
}
