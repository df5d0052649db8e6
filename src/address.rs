//! Page address state.
//!
//! The visible page keeps its selection in three query parameters: `v`,
//! `channel` and `playlist`. [`AddressState`] is a plain value; applying a
//! [`QueryUpdate`] returns the next value and the caller decides where it is
//! stored. Updates replace the current address rather than navigating, so no
//! history entry is ever created.

use std::fmt;

use url::Url;

use crate::ids::{ChannelId, PlaylistId, VideoId};

pub const VIDEO_PARAM: &str = "v";
pub const CHANNEL_PARAM: &str = "channel";
pub const PLAYLIST_PARAM: &str = "playlist";

/// Recognized parameters read from the address on first load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapParams {
    pub v: Option<String>,
    pub channel: Option<String>,
    pub playlist: Option<String>,
}

/// A batch of parameter writes. `None` (or an empty string) removes the key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryUpdate {
    changes: Vec<(String, Option<String>)>,
}

impl QueryUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<String>) -> Self {
        self.changes.push((key.to_owned(), Some(value.into())));
        self
    }

    pub fn clear(mut self, key: &str) -> Self {
        self.changes.push((key.to_owned(), None));
        self
    }

    /// Points `v` at `id`. Channel and playlist are left alone.
    pub fn select_video(id: &VideoId) -> Self {
        Self::new().set(VIDEO_PARAM, id.as_str())
    }

    pub fn select_channel(id: &ChannelId) -> Self {
        Self::new()
            .set(CHANNEL_PARAM, id.as_str())
            .clear(PLAYLIST_PARAM)
    }

    pub fn select_playlist(id: &PlaylistId) -> Self {
        Self::new()
            .set(PLAYLIST_PARAM, id.as_str())
            .clear(CHANNEL_PARAM)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// The current page address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressState {
    url: Url,
}

impl AddressState {
    pub fn parse(href: &str) -> Result<Self, url::ParseError> {
        Url::parse(href).map(Self::from)
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// First non-empty value of `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    }

    pub fn bootstrap(&self) -> BootstrapParams {
        BootstrapParams {
            v: self.get(VIDEO_PARAM),
            channel: self.get(CHANNEL_PARAM),
            playlist: self.get(PLAYLIST_PARAM),
        }
    }

    /// Returns the address after `update`. Parameters the update does not
    /// mention keep their value and position; a set key replaces its first
    /// occurrence and drops any duplicates; new keys are appended.
    pub fn apply(&self, update: &QueryUpdate) -> Self {
        let mut pairs: Vec<(String, String)> = self
            .url
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        for (key, value) in &update.changes {
            match value.as_deref().filter(|value| !value.is_empty()) {
                Some(value) => {
                    let mut seen = false;
                    pairs.retain_mut(|(name, current)| {
                        if name != key {
                            return true;
                        }
                        if seen {
                            return false;
                        }
                        seen = true;
                        *current = value.to_owned();
                        true
                    });
                    if !seen {
                        pairs.push((key.clone(), value.to_owned()));
                    }
                }
                None => pairs.retain(|(name, _)| name != key),
            }
        }

        let mut url = self.url.clone();
        if pairs.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(pairs);
        }
        Self { url }
    }

    /// Shareable address reproducing the current view with `id` playing.
    pub fn permalink(&self, id: &VideoId) -> String {
        self.apply(&QueryUpdate::select_video(id)).url.into()
    }
}

impl From<Url> for AddressState {
    fn from(url: Url) -> Self {
        Self { url }
    }
}

impl fmt::Display for AddressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(href: &str) -> AddressState {
        AddressState::parse(href).unwrap()
    }

    #[test]
    fn selecting_a_channel_clears_the_playlist() {
        let before = address("http://localhost:8000/?v=dQw4w9WgXcQ&playlist=PL1");
        let after = before.apply(&QueryUpdate::new().set(CHANNEL_PARAM, "UC1").clear(PLAYLIST_PARAM));
        assert_eq!(after.get(PLAYLIST_PARAM), None);
        assert_eq!(after.get(CHANNEL_PARAM).as_deref(), Some("UC1"));
        assert_eq!(after.get(VIDEO_PARAM).as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(after.as_str(), "http://localhost:8000/?v=dQw4w9WgXcQ&channel=UC1");
    }

    #[test]
    fn selecting_a_playlist_clears_the_channel() {
        let before = address("http://localhost/?channel=UCX6OQ3DkcsbYNE6H8uQQuVA");
        let playlist = PlaylistId::parse("PLabc").unwrap();
        let after = before.apply(&QueryUpdate::select_playlist(&playlist));
        assert_eq!(after.as_str(), "http://localhost/?playlist=PLabc");
    }

    #[test]
    fn selecting_a_video_keeps_the_feed_selection() {
        let before = address("http://localhost/?channel=UCX6OQ3DkcsbYNE6H8uQQuVA&v=aaaaaaaaaaa");
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        let after = before.apply(&QueryUpdate::select_video(&id));
        assert_eq!(
            after.as_str(),
            "http://localhost/?channel=UCX6OQ3DkcsbYNE6H8uQQuVA&v=dQw4w9WgXcQ"
        );
    }

    #[test]
    fn empty_values_remove_the_parameter() {
        let before = address("http://localhost/app?v=dQw4w9WgXcQ");
        let after = before.apply(&QueryUpdate::new().set(VIDEO_PARAM, ""));
        assert_eq!(after.as_str(), "http://localhost/app");
        assert_eq!(after.get(VIDEO_PARAM), None);
    }

    #[test]
    fn unrelated_parameters_and_fragment_survive() {
        let before = address("http://localhost/?lang=en&v=a&v=b#top");
        let after = before.apply(&QueryUpdate::new().set(VIDEO_PARAM, "dQw4w9WgXcQ"));
        assert_eq!(after.as_str(), "http://localhost/?lang=en&v=dQw4w9WgXcQ#top");
    }

    #[test]
    fn bootstrap_reads_recognized_parameters() {
        let state = address("http://localhost/?v=dQw4w9WgXcQ&channel=&playlist=PL1&x=1");
        assert_eq!(
            state.bootstrap(),
            BootstrapParams {
                v: Some("dQw4w9WgXcQ".into()),
                channel: None,
                playlist: Some("PL1".into()),
            }
        );
    }

    #[test]
    fn permalink_sets_v_on_the_current_address() {
        let state = address("http://localhost:8000/?playlist=PL1");
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        assert_eq!(
            state.permalink(&id),
            "http://localhost:8000/?playlist=PL1&v=dQw4w9WgXcQ"
        );
        assert_eq!(state.get(VIDEO_PARAM), None);
    }
}
