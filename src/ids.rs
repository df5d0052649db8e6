//! Identifier extraction for videos, channels and playlists.
//!
//! Users paste all sorts of things into the inputs: bare ids, full watch
//! URLs, `youtu.be` short links, or a sentence with a channel id somewhere in
//! the middle. Everything here is pure and total; unrecognized input yields
//! [`Extraction::NotFound`] rather than an error.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

static VIDEO_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("video id pattern"));
static CHANNEL_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"UC[A-Za-z0-9_-]{22}").expect("channel id pattern"));
static PLAYLIST_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"PL[A-Za-z0-9_-]+").expect("playlist id pattern"));

const EMBED_HOST: &str = "https://www.youtube-nocookie.com/embed";
const WATCH_URL: &str = "https://www.youtube.com/watch";

/// Outcome of running an extractor over free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction<T> {
    Found(T),
    NotFound,
}

impl<T> Extraction<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

impl<T> From<Option<T>> for Extraction<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::NotFound, Self::Found)
    }
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $check:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Accepts `value` only when it is already in canonical form.
            pub fn parse(value: &str) -> Option<Self> {
                let check: fn(&str) -> bool = $check;
                check(value).then(|| Self(value.to_owned()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
                    .ok_or_else(|| format!("invalid {}: {value}", stringify!($name)))
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

identifier!(
    /// Exactly 11 characters drawn from `[A-Za-z0-9_-]`.
    VideoId,
    |value| VIDEO_ID_RE.is_match(value)
);

identifier!(
    /// `UC` followed by 22 characters drawn from `[A-Za-z0-9_-]`.
    ChannelId,
    |value| CHANNEL_ID_RE
        .find(value)
        .is_some_and(|m| m.start() == 0 && m.end() == value.len())
);

identifier!(
    /// `PL` followed by one or more characters drawn from `[A-Za-z0-9_-]`.
    PlaylistId,
    |value| PLAYLIST_ID_RE
        .find(value)
        .is_some_and(|m| m.start() == 0 && m.end() == value.len())
);

/// Resolves a video id from a bare id, a `youtu.be` link, or a
/// `youtube.com` watch/shorts/embed URL.
pub fn extract_video_id(input: &str) -> Extraction<VideoId> {
    let input = input.trim();
    if let Some(id) = VideoId::parse(input) {
        return Extraction::Found(id);
    }

    let Ok(url) = Url::parse(input) else {
        return Extraction::NotFound;
    };
    let Some(host) = url.host_str() else {
        return Extraction::NotFound;
    };
    let host = host.strip_prefix("www.").unwrap_or(host);
    let mut segments = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter();

    let candidate = if host == "youtu.be" {
        segments.next().map(str::to_owned)
    } else if host.ends_with("youtube.com") {
        let from_query = url
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())
            .filter(|value| VIDEO_ID_RE.is_match(value));
        from_query.or_else(|| match segments.next() {
            Some("shorts" | "embed") => segments.next().map(str::to_owned),
            _ => None,
        })
    } else {
        None
    };

    candidate.and_then(|id| VideoId::parse(&id)).into()
}

/// Finds the first channel id anywhere in `input`.
pub fn extract_channel_id(input: &str) -> Extraction<ChannelId> {
    CHANNEL_ID_RE
        .find(input.trim())
        .map(|m| ChannelId(m.as_str().to_owned()))
        .into()
}

/// Finds the first playlist id anywhere in `input`.
pub fn extract_playlist_id(input: &str) -> Extraction<PlaylistId> {
    PLAYLIST_ID_RE
        .find(input.trim())
        .map(|m| PlaylistId(m.as_str().to_owned()))
        .into()
}

/// Canonical watch page for a video.
pub fn watch_url(id: &VideoId) -> String {
    format!("{WATCH_URL}?v={id}")
}

/// Privacy-enhanced embed address with autoplay on and related videos off.
pub fn embed_url(id: &VideoId) -> String {
    format!("{EMBED_HOST}/{id}?autoplay=1&rel=0&modestbranding=1")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(input: &str) -> Option<String> {
        extract_video_id(input).found().map(String::from)
    }

    #[test]
    fn bare_ids_are_returned_unchanged() {
        for id in ["dQw4w9WgXcQ", "abc-_123ABC", "___________", "-----------"] {
            assert_eq!(video(id).as_deref(), Some(id));
        }
        assert_eq!(video("  dQw4w9WgXcQ \n").as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn short_links_use_first_path_segment() {
        assert_eq!(
            video("https://youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            video("https://youtu.be/M9bq_alk-sw?si=B_RZg_I-lLaa7UU-").as_deref(),
            Some("M9bq_alk-sw")
        );
        assert_eq!(video("https://youtu.be/"), None);
        assert_eq!(video("https://youtu.be/tooshort"), None);
    }

    #[test]
    fn watch_urls_prefer_the_v_parameter() {
        assert_eq!(
            video("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=5").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            video("https://m.youtube.com/watch?feature=share&v=lalOy8Mbfdc").as_deref(),
            Some("lalOy8Mbfdc")
        );
        assert_eq!(
            video("https://music.youtube.com/watch?v=dQw4w9WgXcQ&list=RD1").as_deref(),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn shorts_and_embed_paths_are_recognized() {
        assert_eq!(
            video("https://www.youtube.com/shorts/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            video("https://youtube.com/embed/dQw4w9WgXcQ?autoplay=1").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(video("https://www.youtube.com/live/dQw4w9WgXcQ"), None);
    }

    #[test]
    fn candidates_are_never_truncated() {
        assert_eq!(video("https://www.youtube.com/shorts/dQw4w9WgXcQextra"), None);
        assert_eq!(video("https://youtu.be/dQw4w9WgXcQ123"), None);
        assert_eq!(video("https://www.youtube.com/watch?v=short"), None);
    }

    #[test]
    fn garbage_is_not_found() {
        assert_eq!(video("not a url"), None);
        assert_eq!(video(""), None);
        assert_eq!(video("https://vimeo.com/dQw4w9WgXcQ"), None);
        assert_eq!(video("youtube.com/watch?v=dQw4w9WgXcQ"), None);
    }

    #[test]
    fn channel_ids_are_found_inside_text() {
        assert_eq!(
            extract_channel_id("check out UCX6OQ3DkcsbYNE6H8uQQuVA please")
                .found()
                .map(String::from)
                .as_deref(),
            Some("UCX6OQ3DkcsbYNE6H8uQQuVA")
        );
        assert_eq!(
            extract_channel_id("https://www.youtube.com/channel/UCX6OQ3DkcsbYNE6H8uQQuVA/videos")
                .found()
                .map(String::from)
                .as_deref(),
            Some("UCX6OQ3DkcsbYNE6H8uQQuVA")
        );
        assert!(!extract_channel_id("UCshort").is_found());
        assert!(!extract_channel_id("https://www.youtube.com/@handle").is_found());
    }

    #[test]
    fn playlist_ids_are_found_inside_text() {
        assert_eq!(
            extract_playlist_id("PLsomeid123-_")
                .found()
                .map(String::from)
                .as_deref(),
            Some("PLsomeid123-_")
        );
        assert_eq!(
            extract_playlist_id("https://www.youtube.com/playlist?list=PLabc_DEF&si=x")
                .found()
                .map(String::from)
                .as_deref(),
            Some("PLabc_DEF")
        );
        assert!(!extract_playlist_id("PL").is_found());
        assert!(!extract_playlist_id("nothing here").is_found());
    }

    #[test]
    fn parse_requires_canonical_form() {
        assert!(VideoId::parse("dQw4w9WgXcQ").is_some());
        assert!(VideoId::parse(" dQw4w9WgXcQ").is_none());
        assert!(ChannelId::parse("UCX6OQ3DkcsbYNE6H8uQQuVA").is_some());
        assert!(ChannelId::parse("xUCX6OQ3DkcsbYNE6H8uQQuVA").is_none());
        assert!(PlaylistId::parse("PL1").is_some());
        assert!(PlaylistId::parse("PL1 ").is_none());
    }

    #[test]
    fn addresses_point_at_the_expected_hosts() {
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        assert_eq!(watch_url(&id), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(
            embed_url(&id),
            "https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ?autoplay=1&rel=0&modestbranding=1"
        );
    }
}
