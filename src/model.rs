//! Wire types shared by the backend and the client.
//!
//! The backend serializes these out of YouTube's Atom feed and oEmbed
//! responses; the client deserializes them back. Every field is defaulted so
//! a partially populated payload still renders instead of failing to decode.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, PlaylistId};

/// One entry of a channel or playlist feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedItem {
    pub video_id: String,
    pub title: String,
    pub description: String,
    /// ISO-8601 timestamp as published by the feed.
    pub published: String,
    pub updated: String,
    pub thumbnail: String,
    pub link: String,
}

/// A syndicated listing. `items` keeps the upstream order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Feed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_url: Option<String>,
    pub title: String,
    pub updated: String,
    pub author: String,
    pub items: Vec<FeedItem>,
}

impl Feed {
    /// Placeholder shown when a feed could not be loaded.
    pub fn unavailable() -> Self {
        Self {
            title: "Feed".to_owned(),
            ..Self::default()
        }
    }
}

/// The subset of an oEmbed document the metadata panel shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OEmbedMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
}

/// Which upstream listing a feed request targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Channel(ChannelId),
    Playlist(PlaylistId),
    /// Unvalidated `channel_id`, `playlist_id` or `user` value as received
    /// by the backend, forwarded to YouTube as given.
    Raw { param: &'static str, value: String },
}

impl FeedSource {
    /// Query parameter name used by both the backend API and YouTube.
    pub fn param(&self) -> &'static str {
        match self {
            Self::Channel(_) => "channel_id",
            Self::Playlist(_) => "playlist_id",
            Self::Raw { param, .. } => *param,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::Channel(id) => id.as_str(),
            Self::Playlist(id) => id.as_str(),
            Self::Raw { value, .. } => value,
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.param(), self.value())
    }
}
