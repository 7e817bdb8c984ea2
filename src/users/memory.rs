//! In-process `UserStore` used by unit and router tests.

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    media::MediaKind,
    profiles::dto::{ChannelProfile, VideoOwner, WatchedVideo},
    users::{
        repo::{StoreError, StoreResult, UserStore},
        repo_types::{NewUser, User},
    },
};

#[derive(Debug, Clone)]
pub struct Subscription {
    pub subscriber: Uuid,
    pub channel: Uuid,
}

#[derive(Debug, Clone)]
pub struct Video {
    pub id: Uuid,
    pub owner: Uuid,
    pub title: String,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    subscriptions: Vec<Subscription>,
    videos: Vec<Video>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub async fn subscribe(&self, subscriber: Uuid, channel: Uuid) {
        self.tables
            .lock()
            .await
            .subscriptions
            .push(Subscription { subscriber, channel });
    }

    pub async fn add_video(&self, owner: Uuid, title: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().await.videos.push(Video {
            id,
            owner,
            title: title.to_string(),
        });
        id
    }

    pub async fn watch(&self, user: Uuid, video: Uuid) {
        let mut t = self.tables.lock().await;
        if let Some(u) = t.users.iter_mut().find(|u| u.id == user) {
            u.watch_history.push(video);
        }
    }

    pub async fn stored_refresh_token(&self, user: Uuid) -> Option<String> {
        let t = self.tables.lock().await;
        t.users
            .iter()
            .find(|u| u.id == user)
            .and_then(|u| u.refresh_token.clone())
    }
}

fn touch(user: &mut User) {
    user.updated_at = OffsetDateTime::now_utc();
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users
            .iter()
            .find(|u| {
                username.is_some_and(|n| u.username == n) || email.is_some_and(|e| u.email == e)
            })
            .cloned())
    }

    async fn create(&self, new: NewUser) -> StoreResult<User> {
        let mut t = self.tables.lock().await;
        if t.users.iter().any(|u| u.username == new.username) {
            return Err(StoreError::Duplicate("username"));
        }
        if t.users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::Duplicate("email"));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            full_name: new.full_name,
            password_hash: new.password_hash,
            avatar: new.avatar,
            cover_image: new.cover_image,
            refresh_token: None,
            watch_history: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        let Some(user) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };
        user.refresh_token = token.map(str::to_string);
        touch(user);
        Ok(true)
    }

    async fn swap_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        next: &str,
    ) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        match t.users.iter_mut().find(|u| u.id == id) {
            Some(user) if user.refresh_token.as_deref() == Some(expected) => {
                user.refresh_token = Some(next.to_string());
                touch(user);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        let Some(user) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };
        user.password_hash = password_hash.to_string();
        touch(user);
        Ok(true)
    }

    async fn update_account(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> StoreResult<Option<User>> {
        let mut t = self.tables.lock().await;
        if t.users.iter().any(|u| u.id != id && u.email == email) {
            return Err(StoreError::Duplicate("email"));
        }
        let Some(user) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        user.full_name = full_name.to_string();
        user.email = email.to_string();
        touch(user);
        Ok(Some(user.clone()))
    }

    async fn update_media(
        &self,
        id: Uuid,
        kind: MediaKind,
        url: &str,
    ) -> StoreResult<Option<User>> {
        let mut t = self.tables.lock().await;
        let Some(user) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        match kind {
            MediaKind::Avatar => user.avatar = url.to_string(),
            MediaKind::CoverImage => user.cover_image = Some(url.to_string()),
        }
        touch(user);
        Ok(Some(user.clone()))
    }

    async fn channel_profile(
        &self,
        username: &str,
        viewer: Uuid,
    ) -> StoreResult<Option<ChannelProfile>> {
        let t = self.tables.lock().await;
        let username = username.to_lowercase();
        let Some(matched) = t.users.iter().find(|u| u.username == username) else {
            return Ok(None);
        };
        let subscribers: Vec<Uuid> = t
            .subscriptions
            .iter()
            .filter(|s| s.channel == matched.id)
            .map(|s| s.subscriber)
            .collect();
        let subscribed_to = t
            .subscriptions
            .iter()
            .filter(|s| s.subscriber == matched.id)
            .count();
        Ok(Some(ChannelProfile {
            id: matched.id,
            full_name: matched.full_name.clone(),
            username: matched.username.clone(),
            email: matched.email.clone(),
            avatar: matched.avatar.clone(),
            cover_image: matched.cover_image.clone(),
            subscribers_count: subscribers.len() as i64,
            channels_subscribed_to_count: subscribed_to as i64,
            is_subscribed: subscribers.contains(&viewer),
        }))
    }

    async fn watch_history(&self, id: Uuid) -> StoreResult<Vec<WatchedVideo>> {
        let t = self.tables.lock().await;
        let Some(matched) = t.users.iter().find(|u| u.id == id) else {
            return Ok(Vec::new());
        };
        let watched = matched
            .watch_history
            .iter()
            .filter_map(|vid| t.videos.iter().find(|v| v.id == *vid))
            .map(|v| WatchedVideo {
                id: v.id,
                title: v.title.clone(),
                description: String::new(),
                thumbnail: String::new(),
                video_file: String::new(),
                duration: 0.0,
                views: 0,
                created_at: matched.created_at,
                owner: t.users.iter().find(|u| u.id == v.owner).map(|o| VideoOwner {
                    id: o.id,
                    full_name: o.full_name.clone(),
                    username: o.username.clone(),
                    avatar: o.avatar.clone(),
                }),
            })
            .collect();
        Ok(watched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (InMemoryStore, Uuid) {
        let store = InMemoryStore::default();
        let user = store
            .create(NewUser {
                username: "ann".into(),
                email: "ann@x.com".into(),
                full_name: "Ann".into(),
                password_hash: "hash".into(),
                avatar: "https://fake.local/a.png".into(),
                cover_image: None,
            })
            .await
            .unwrap();
        store.set_refresh_token(user.id, Some("current")).await.unwrap();
        (store, user.id)
    }

    #[tokio::test]
    async fn swap_with_stale_token_changes_nothing() {
        let (store, id) = seeded().await;
        assert!(!store.swap_refresh_token(id, "stale", "next").await.unwrap());
        assert_eq!(store.stored_refresh_token(id).await.as_deref(), Some("current"));
    }

    #[tokio::test]
    async fn swap_with_current_token_rotates_once() {
        let (store, id) = seeded().await;
        assert!(store.swap_refresh_token(id, "current", "next").await.unwrap());
        assert!(!store.swap_refresh_token(id, "current", "other").await.unwrap());
        assert_eq!(store.stored_refresh_token(id).await.as_deref(), Some("next"));
    }

    #[tokio::test]
    async fn swap_after_logout_or_for_unknown_user_fails() {
        let (store, id) = seeded().await;
        store.set_refresh_token(id, None).await.unwrap();
        assert!(!store.swap_refresh_token(id, "current", "next").await.unwrap());
        assert!(store.stored_refresh_token(id).await.is_none());
        assert!(!store
            .swap_refresh_token(Uuid::new_v4(), "current", "next")
            .await
            .unwrap());
    }
}
