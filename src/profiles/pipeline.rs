//! Read pipelines over the users / subscriptions / videos tables.
//!
//! A pipeline is a list of [`Stage`]s rendered as named CTEs, in order,
//! followed by a final [`Projection`]. Stages only ever carry public user
//! columns forward, so credentials cannot leak into a read model.

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

/// Public columns of `users` that any stage may carry.
const PUBLIC_USER_COLUMNS: &str =
    "id, username, email, full_name, avatar, cover_image, watch_history";

#[derive(Debug, Clone)]
pub enum UserMatch {
    /// Already-normalized (lowercased) username.
    Username(String),
    Id(Uuid),
}

#[derive(Debug, Clone)]
pub enum Stage {
    /// Select the single user the pipeline is about (`matched`).
    MatchUser(UserMatch),
    /// Subscription edges where the matched user is the channel (`subscribers`).
    LookupSubscribers,
    /// Subscription edges where the matched user is the subscriber (`subscribed_to`).
    LookupSubscribedTo,
    /// Watch-history ids unnested with their position (`history`).
    UnwindWatchHistory,
    /// Videos for each history entry, keeping the position (`watched`).
    LookupVideos,
    /// Owner of each watched video, collapsed to one public record (`owners`).
    LookupOwner,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::MatchUser(_) => "matched",
            Stage::LookupSubscribers => "subscribers",
            Stage::LookupSubscribedTo => "subscribed_to",
            Stage::UnwindWatchHistory => "history",
            Stage::LookupVideos => "watched",
            Stage::LookupOwner => "owners",
        }
    }

    fn render(self, qb: &mut QueryBuilder<'static, Postgres>) {
        match self {
            Stage::MatchUser(m) => {
                qb.push("SELECT ")
                    .push(PUBLIC_USER_COLUMNS)
                    .push(" FROM users WHERE ");
                match m {
                    UserMatch::Username(username) => {
                        qb.push("username = ").push_bind(username);
                    }
                    UserMatch::Id(id) => {
                        qb.push("id = ").push_bind(id);
                    }
                }
                qb.push(" LIMIT 1");
            }
            Stage::LookupSubscribers => {
                qb.push(
                    "SELECT s.subscriber FROM subscriptions s \
                     JOIN matched m ON s.channel = m.id",
                );
            }
            Stage::LookupSubscribedTo => {
                qb.push(
                    "SELECT s.channel FROM subscriptions s \
                     JOIN matched m ON s.subscriber = m.id",
                );
            }
            Stage::UnwindWatchHistory => {
                qb.push(
                    "SELECT h.video_id, h.position FROM matched m \
                     CROSS JOIN LATERAL unnest(m.watch_history) \
                     WITH ORDINALITY AS h(video_id, position)",
                );
            }
            Stage::LookupVideos => {
                qb.push(
                    "SELECT h.position, v.id, v.owner, v.title, v.description, v.thumbnail, \
                     v.video_file, v.duration, v.views, v.created_at \
                     FROM history h JOIN videos v ON v.id = h.video_id",
                );
            }
            Stage::LookupOwner => {
                qb.push(
                    "SELECT w.position, o.id, o.full_name, o.username, o.avatar FROM watched w \
                     CROSS JOIN LATERAL (SELECT u.id, u.full_name, u.username, u.avatar \
                     FROM users u WHERE u.id = w.owner LIMIT 1) o",
                );
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Projection {
    /// Public channel fields plus subscription counters for `viewer`.
    ChannelProfile { viewer: Uuid },
    /// Watched videos in history order with their owner.
    WatchHistory,
}

impl Projection {
    fn render(self, qb: &mut QueryBuilder<'static, Postgres>) {
        match self {
            Projection::ChannelProfile { viewer } => {
                qb.push(
                    "SELECT m.id, m.full_name, m.username, m.email, m.avatar, m.cover_image, \
                     (SELECT COUNT(*) FROM subscribers) AS subscribers_count, \
                     (SELECT COUNT(*) FROM subscribed_to) AS channels_subscribed_to_count, \
                     EXISTS (SELECT 1 FROM subscribers WHERE subscriber = ",
                )
                .push_bind(viewer)
                .push(") AS is_subscribed FROM matched m");
            }
            Projection::WatchHistory => {
                qb.push(
                    "SELECT w.id, w.title, w.description, w.thumbnail, w.video_file, w.duration, \
                     w.views, w.created_at, o.id AS owner_id, o.full_name AS owner_full_name, \
                     o.username AS owner_username, o.avatar AS owner_avatar \
                     FROM watched w LEFT JOIN owners o ON o.position = w.position \
                     ORDER BY w.position",
                );
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(Stage::name).collect()
    }

    pub fn project(self, projection: Projection) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("");
        for (i, stage) in self.stages.into_iter().enumerate() {
            qb.push(if i == 0 { "WITH " } else { ", " });
            qb.push(stage.name()).push(" AS (");
            stage.render(&mut qb);
            qb.push(")\n");
        }
        projection.render(&mut qb);
        qb
    }
}

pub fn channel_profile_stages(username: &str) -> Pipeline {
    Pipeline::default()
        .stage(Stage::MatchUser(UserMatch::Username(username.to_lowercase())))
        .stage(Stage::LookupSubscribers)
        .stage(Stage::LookupSubscribedTo)
}

pub fn watch_history_stages(user_id: Uuid) -> Pipeline {
    Pipeline::default()
        .stage(Stage::MatchUser(UserMatch::Id(user_id)))
        .stage(Stage::UnwindWatchHistory)
        .stage(Stage::LookupVideos)
        .stage(Stage::LookupOwner)
}
