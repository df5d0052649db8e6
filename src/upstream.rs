//! Access to YouTube's unauthenticated endpoints: the Atom feed listing and
//! oEmbed. Responses are cached in-process for a short TTL, keyed by the
//! upstream URL, so bursts of page loads do not hammer YouTube.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;
use tokio::task;
use url::Url;

use crate::model::{Feed, FeedSource};
use crate::syndication::{FeedParseError, parse_feed};

pub const FEEDS_BASE: &str = "https://www.youtube.com/feeds/videos.xml";
pub const OEMBED_BASE: &str = "https://www.youtube.com/oembed";
pub const USER_AGENT: &str = "TubeKit/0.1 (+https://example.invalid) ureq";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTP Error {0}")]
    Status(u16),
    #[error("{0}")]
    Transport(String),
    #[error("reading response: {0}")]
    Read(#[from] std::io::Error),
    #[error(transparent)]
    Feed(#[from] FeedParseError),
    #[error("invalid oEmbed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid upstream address: {0}")]
    Address(#[from] url::ParseError),
    #[error("upstream task failed: {0}")]
    Join(#[from] task::JoinError),
}

/// Small time-bounded cache. Every insert drops the entries that have expired.
pub struct TtlCache<V> {
    ttl: Duration,
    entries: RwLock<HashMap<String, (Instant, V)>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read();
        let (stored, value) = entries.get(key)?;
        (stored.elapsed() < self.ttl).then(|| value.clone())
    }

    pub fn insert(&self, key: String, value: V) {
        let mut entries = self.entries.write();
        entries.retain(|_, (stored, _)| stored.elapsed() < self.ttl);
        entries.insert(key, (Instant::now(), value));
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub feeds_base: Url,
    pub oembed_base: Url,
    pub timeout: Duration,
    pub cache_ttl: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            feeds_base: Url::parse(FEEDS_BASE).expect("static feeds URL"),
            oembed_base: Url::parse(OEMBED_BASE).expect("static oEmbed URL"),
            timeout: DEFAULT_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

#[derive(Clone)]
pub struct Upstream {
    agent: ureq::Agent,
    feeds_base: Url,
    oembed_base: Url,
    feeds: Arc<TtlCache<Feed>>,
    oembeds: Arc<TtlCache<Value>>,
}

impl Upstream {
    pub fn new(config: UpstreamConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            feeds_base: config.feeds_base,
            oembed_base: config.oembed_base,
            feeds: Arc::new(TtlCache::new(config.cache_ttl)),
            oembeds: Arc::new(TtlCache::new(config.cache_ttl)),
        }
    }

    pub fn feed_url(&self, source: &FeedSource) -> Url {
        let mut url = self.feeds_base.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair(source.param(), source.value());
        url
    }

    pub fn oembed_url(&self, target: &str) -> Url {
        let mut url = self.oembed_base.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("url", target)
            .append_pair("format", "json");
        url
    }

    /// Fetches and parses the listing for `source`, annotated with where it
    /// came from.
    pub async fn feed(&self, source: &FeedSource) -> Result<Feed, UpstreamError> {
        let url = self.feed_url(source);
        let key = url.to_string();
        if let Some(cached) = self.feeds.get(&key) {
            tracing::debug!(%url, "feed cache hit");
            return Ok(cached);
        }

        let agent = self.agent.clone();
        let body = task::spawn_blocking({
            let url = url.clone();
            move || fetch_text(&agent, &url)
        })
        .await??;

        let mut feed = parse_feed(&body)?;
        feed.kind = Some(source.param().to_owned());
        feed.value = Some(source.value().to_owned());
        feed.feed_url = Some(key.clone());
        tracing::debug!(%url, items = feed.items.len(), "feed fetched");

        self.feeds.insert(key, feed.clone());
        Ok(feed)
    }

    /// Looks up oEmbed metadata for `target` (a watch page URL).
    pub async fn oembed(&self, target: &str) -> Result<Value, UpstreamError> {
        let url = self.oembed_url(target);
        let key = url.to_string();
        if let Some(cached) = self.oembeds.get(&key) {
            return Ok(cached);
        }

        let agent = self.agent.clone();
        let body = task::spawn_blocking({
            let url = url.clone();
            move || fetch_text(&agent, &url)
        })
        .await??;
        let payload: Value = serde_json::from_str(&body)?;

        self.oembeds.insert(key, payload.clone());
        Ok(payload)
    }
}

fn fetch_text(agent: &ureq::Agent, url: &Url) -> Result<String, UpstreamError> {
    match agent.request_url("GET", url).set("Accept", "*/*").call() {
        Ok(response) => Ok(response.into_string()?),
        Err(ureq::Error::Status(status, _)) => Err(UpstreamError::Status(status)),
        Err(ureq::Error::Transport(err)) => Err(UpstreamError::Transport(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ChannelId;
    use axum::{
        Router,
        extract::{Query, State},
        http::StatusCode,
        routing::get,
    };
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const XML: &str = r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:yt="http://www.youtube.com/xml/schemas/2015"><title>Uploads</title><entry><yt:videoId>dQw4w9WgXcQ</yt:videoId><title>One</title></entry></feed>"#;

    async fn fake_youtube(hits: Arc<AtomicUsize>) -> Url {
        let app = Router::new()
            .route(
                "/feeds/videos.xml",
                get(
                    |State(hits): State<Arc<AtomicUsize>>,
                     Query(q): Query<HashMap<String, String>>| async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        if q.contains_key("playlist_id") {
                            (StatusCode::NOT_FOUND, String::from("nope"))
                        } else {
                            (StatusCode::OK, XML.to_owned())
                        }
                    },
                ),
            )
            .route(
                "/oembed",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    format!(r#"{{"title":"T","author_name":"A","url":"{}","format":"{}"}}"#, q["url"], q["format"])
                }),
            )
            .with_state(hits);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    fn upstream(base: &Url, ttl: Duration) -> Upstream {
        Upstream::new(UpstreamConfig {
            feeds_base: base.join("feeds/videos.xml").unwrap(),
            oembed_base: base.join("oembed").unwrap(),
            timeout: Duration::from_secs(5),
            cache_ttl: ttl,
        })
    }

    fn channel() -> FeedSource {
        FeedSource::Channel(ChannelId::parse("UCX6OQ3DkcsbYNE6H8uQQuVA").unwrap())
    }

    #[test]
    fn default_urls_point_at_youtube() {
        let upstream = Upstream::new(UpstreamConfig::default());
        assert_eq!(
            upstream.feed_url(&channel()).as_str(),
            "https://www.youtube.com/feeds/videos.xml?channel_id=UCX6OQ3DkcsbYNE6H8uQQuVA"
        );
        assert_eq!(
            upstream
                .oembed_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
                .as_str(),
            "https://www.youtube.com/oembed?url=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3DdQw4w9WgXcQ&format=json"
        );
    }

    #[test]
    fn ttl_cache_expires_entries() {
        let cache = TtlCache::new(Duration::from_millis(0));
        cache.insert("k".into(), 1);
        assert_eq!(cache.get("k"), None);

        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("k".into(), 1);
        assert_eq!(cache.get("k"), Some(1));
        assert_eq!(cache.get("other"), None);
    }

    #[test]
    fn ttl_cache_drops_expired_keys_on_insert() {
        let cache = TtlCache::new(Duration::from_millis(0));
        for n in 0..5 {
            cache.insert(format!("user={n}"), n);
        }
        assert_eq!(cache.entries.read().len(), 1);

        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("a".into(), 1);
        cache.insert("b".into(), 2);
        assert_eq!(cache.entries.read().len(), 2);
    }

    #[tokio::test]
    async fn feed_is_parsed_annotated_and_cached() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = fake_youtube(hits.clone()).await;
        let upstream = upstream(&base, Duration::from_secs(60));

        let feed = upstream.feed(&channel()).await.unwrap();
        assert_eq!(feed.title, "Uploads");
        assert_eq!(feed.kind.as_deref(), Some("channel_id"));
        assert_eq!(feed.value.as_deref(), Some("UCX6OQ3DkcsbYNE6H8uQQuVA"));
        assert!(
            feed.feed_url
                .as_deref()
                .unwrap()
                .ends_with("/feeds/videos.xml?channel_id=UCX6OQ3DkcsbYNE6H8uQQuVA")
        );
        assert_eq!(feed.items[0].video_id, "dQw4w9WgXcQ");

        let again = upstream.feed(&channel()).await.unwrap();
        assert_eq!(again, feed);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn upstream_errors_are_reported() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = fake_youtube(hits).await;
        let upstream = upstream(&base, Duration::from_secs(60));
        let source = FeedSource::Playlist(crate::ids::PlaylistId::parse("PLx").unwrap());
        let err = upstream.feed(&source).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status(404)));
        assert_eq!(err.to_string(), "HTTP Error 404");
    }

    #[tokio::test]
    async fn oembed_passes_url_and_format() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = fake_youtube(hits).await;
        let upstream = upstream(&base, Duration::from_secs(60));
        let payload = upstream
            .oembed("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .await
            .unwrap();
        assert_eq!(payload["title"], "T");
        assert_eq!(payload["url"], "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(payload["format"], "json");
    }
}
