//! User actions and the initial load.
//!
//! Every action runs as its own task on a single-threaded `LocalSet`. Tasks
//! are never cancelled: when two fetches overlap, whichever completes last
//! renders last. Page borrows are never held across an `.await`.

use std::cell::RefCell;
use std::rc::Rc;

use tokio::task::{self, JoinHandle};

use crate::address::QueryUpdate;
use crate::client::DataSource;
use crate::ids::{Extraction, extract_channel_id, extract_playlist_id, extract_video_id};
use crate::model::{Feed, FeedSource};
use crate::page::{Page, ResultClick};
use crate::render::{MetaView, Status};

pub const LOADING_FEED: &str = "Loading feed…";
pub const INVALID_VIDEO: &str = "Could not find a video ID in that input. Paste a video URL or an 11-character ID.";
pub const INVALID_CHANNEL: &str = "Could not find a channel ID. Paste a channel ID (starts with UC) or a /channel/ URL.";
pub const INVALID_PLAYLIST: &str = "Could not find a playlist ID. Paste a playlist ID (starts with PL) or a playlist URL.";

/// Which kind of listing a feed action loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Channel,
    Playlist,
}

/// A user-originated event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    PlayVideo { input: String },
    LoadFeed { kind: FeedKind, input: String },
    PickResult { index: usize, click: ResultClick },
    Bootstrap,
}

/// Shared state of one running page.
pub struct App<D> {
    data: D,
    page: RefCell<Page>,
}

impl<D: DataSource> App<D> {
    pub fn new(data: D, page: Page) -> Rc<Self> {
        Rc::new(Self {
            data,
            page: RefCell::new(page),
        })
    }

    /// Runs `f` against the page. Must not be called while another
    /// borrow is alive.
    pub fn with_page<T>(&self, f: impl FnOnce(&mut Page) -> T) -> T {
        f(&mut self.page.borrow_mut())
    }

    pub fn snapshot(&self) -> Page {
        self.page.borrow().clone()
    }
}

/// Plays whatever video `input` names. `push_address` writes `v` into the
/// address; the initial load skips that since `v` is already there.
pub async fn play_video<D: DataSource>(app: &App<D>, input: &str, push_address: bool) {
    let Extraction::Found(id) = extract_video_id(input) else {
        app.with_page(|page| page.set_status(Status::error(INVALID_VIDEO)));
        return;
    };

    app.with_page(|page| {
        page.set_status(Status::clear());
        page.inputs.video = id.to_string();
        page.show_player(Some(&id));
        if push_address {
            page.replace_address(&QueryUpdate::select_video(&id));
        }
        page.show_meta(&MetaView {
            video: Some(id.clone()),
            ..MetaView::default()
        });
    });

    let meta = match app.data.oembed(&id).await {
        Ok(meta) => MetaView {
            video: Some(id),
            title: meta.title,
            author: meta.author_name,
        },
        Err(err) => {
            tracing::warn!(video = %id, error = %err, "metadata lookup failed");
            MetaView {
                video: Some(id),
                ..MetaView::default()
            }
        }
    };
    app.with_page(|page| page.show_meta(&meta));
}

/// Loads a channel or playlist listing into the results region.
pub async fn load_feed<D: DataSource>(app: &App<D>, kind: FeedKind, input: &str) {
    let (source, update) = match kind {
        FeedKind::Channel => match extract_channel_id(input) {
            Extraction::Found(id) => (
                FeedSource::Channel(id.clone()),
                QueryUpdate::select_channel(&id),
            ),
            Extraction::NotFound => {
                app.with_page(|page| page.set_status(Status::error(INVALID_CHANNEL)));
                return;
            }
        },
        FeedKind::Playlist => match extract_playlist_id(input) {
            Extraction::Found(id) => (
                FeedSource::Playlist(id.clone()),
                QueryUpdate::select_playlist(&id),
            ),
            Extraction::NotFound => {
                app.with_page(|page| page.set_status(Status::error(INVALID_PLAYLIST)));
                return;
            }
        },
    };

    app.with_page(|page| {
        match kind {
            FeedKind::Channel => page.inputs.channel = source.value().to_owned(),
            FeedKind::Playlist => page.inputs.playlist = source.value().to_owned(),
        }
        page.replace_address(&update);
        page.set_status(Status::info(LOADING_FEED));
    });

    match app.data.feed(&source).await {
        Ok(feed) => {
            tracing::debug!(%source, items = feed.items.len(), "feed loaded");
            app.with_page(|page| {
                page.show_results(&feed);
                page.set_status(Status::clear());
            });
        }
        Err(err) => {
            tracing::warn!(%source, error = %err, "feed load failed");
            app.with_page(|page| {
                page.show_results(&Feed::unavailable());
                page.set_status(Status::error(err.to_string()));
            });
        }
    }
}

/// Plays the video behind a clicked result entry.
pub async fn pick_result<D: DataSource>(app: &App<D>, index: usize, click: ResultClick) {
    let target = app.with_page(|page| page.click_result(index, click));
    if let Some(video) = target {
        play_video(app, &video, true).await;
    }
}

/// Restores the view described by the address the page was opened with.
pub async fn bootstrap<D: DataSource>(app: &App<D>) {
    let params = app.with_page(|page| {
        let params = page.address().bootstrap();
        page.inputs.video = params.v.clone().unwrap_or_default();
        page.inputs.channel = params.channel.clone().unwrap_or_default();
        page.inputs.playlist = params.playlist.clone().unwrap_or_default();
        params
    });

    let video = async {
        if let Some(v) = &params.v {
            play_video(app, v, false).await;
        }
    };
    let feed = async {
        if let Some(channel) = &params.channel {
            load_feed(app, FeedKind::Channel, channel).await;
        } else if let Some(playlist) = &params.playlist {
            load_feed(app, FeedKind::Playlist, playlist).await;
        }
    };
    tokio::join!(video, feed);
}

pub async fn run<D: DataSource>(app: &App<D>, action: Action) {
    match action {
        Action::PlayVideo { input } => play_video(app, &input, true).await,
        Action::LoadFeed { kind, input } => load_feed(app, kind, &input).await,
        Action::PickResult { index, click } => pick_result(app, index, click).await,
        Action::Bootstrap => bootstrap(app).await,
    }
}

/// Owns the UI thread's task queue. Must be used from inside a
/// [`tokio::task::LocalSet`].
pub struct Dispatcher<D> {
    app: Rc<App<D>>,
}

impl<D: DataSource + 'static> Dispatcher<D> {
    pub fn new(app: Rc<App<D>>) -> Self {
        Self { app }
    }

    pub fn app(&self) -> &Rc<App<D>> {
        &self.app
    }

    /// Starts `action` without waiting for it. Earlier actions keep running.
    pub fn dispatch(&self, action: Action) -> JoinHandle<()> {
        let app = Rc::clone(&self.app);
        tracing::debug!(?action, "dispatching");
        task::spawn_local(async move { run(&app, action).await })
    }
}
