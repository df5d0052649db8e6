//! The visible document: address, inputs and the four rendered regions.

use crate::address::{AddressState, QueryUpdate};
use crate::ids::VideoId;
use crate::model::Feed;
use crate::render::{
    Element, MetaView, Status, render_meta, render_player, render_results,
};

/// Text currently shown in the three input boxes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inputs {
    pub video: String,
    pub channel: String,
    pub playlist: String,
}

/// Where inside a result entry a click landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultClick {
    Entry,
    /// One of the entry's own links; the browser follows it instead.
    Link,
}

#[derive(Debug, Clone)]
pub struct Page {
    address: AddressState,
    pub inputs: Inputs,
    player: Element,
    playing: Option<VideoId>,
    meta: Element,
    results: Element,
    targets: Vec<Option<String>>,
    status: Status,
}

impl Page {
    pub fn new(address: AddressState) -> Self {
        let meta = render_meta(&MetaView::default(), &address);
        Self {
            address,
            inputs: Inputs::default(),
            player: render_player(None),
            playing: None,
            meta,
            results: Element::new("section").attr("id", "results"),
            targets: Vec::new(),
            status: Status::clear(),
        }
    }

    pub fn address(&self) -> &AddressState {
        &self.address
    }

    /// Replaces the address in place; no history entry is added.
    pub fn replace_address(&mut self, update: &QueryUpdate) {
        self.address = self.address.apply(update);
    }

    pub fn show_player(&mut self, video: Option<&VideoId>) {
        self.player = render_player(video);
        self.playing = video.cloned();
    }

    pub fn show_meta(&mut self, meta: &MetaView) {
        self.meta = render_meta(meta, &self.address);
    }

    pub fn show_results(&mut self, feed: &Feed) {
        let view = render_results(feed);
        self.results = view.element;
        self.targets = view.targets;
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub fn playing(&self) -> Option<&VideoId> {
        self.playing.as_ref()
    }

    pub fn player(&self) -> &Element {
        &self.player
    }

    pub fn meta(&self) -> &Element {
        &self.meta
    }

    pub fn results(&self) -> &Element {
        &self.results
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Video the clicked entry should play, if any.
    pub fn click_result(&self, index: usize, click: ResultClick) -> Option<String> {
        match click {
            ResultClick::Link => None,
            ResultClick::Entry => self.targets.get(index).cloned().flatten(),
        }
    }

    pub fn to_html(&self) -> String {
        let status = self.status.render();
        let inputs = Element::new("form")
            .attr("id", "controls")
            .child(input("video", &self.inputs.video))
            .child(input("channel", &self.inputs.channel))
            .child(input("playlist", &self.inputs.playlist));
        let body = Element::new("body")
            .child(inputs)
            .child(status)
            .child(self.player.clone())
            .child(self.meta.clone())
            .child(self.results.clone());
        format!(
            "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>TubeKit</title></head>{}</html>\n",
            body.to_html()
        )
    }
}

fn input(name: &'static str, value: &str) -> Element {
    Element::new("input")
        .attr("name", name)
        .attr("type", "text")
        .attr("value", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FeedItem;

    fn page() -> Page {
        Page::new(AddressState::parse("http://localhost:8000/").unwrap())
    }

    #[test]
    fn new_page_is_blank() {
        let page = page();
        assert!(page.playing().is_none());
        assert_eq!(page.player().get_attr("hidden"), None);
        assert!(page.player().find_class("placeholder").is_some());
        assert_eq!(page.status(), &Status::clear());
        assert_eq!(page.click_result(0, ResultClick::Entry), None);
    }

    #[test]
    fn results_replace_previous_render() {
        let mut page = page();
        let feed = Feed {
            title: "One".into(),
            items: vec![FeedItem {
                video_id: "dQw4w9WgXcQ".into(),
                ..FeedItem::default()
            }],
            ..Feed::default()
        };
        page.show_results(&feed);
        page.show_results(&feed);
        assert_eq!(page.results().find_class("items").unwrap().children().count(), 1);
        assert_eq!(
            page.click_result(0, ResultClick::Entry).as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(page.click_result(0, ResultClick::Link), None);

        page.show_results(&Feed::unavailable());
        assert_eq!(page.click_result(0, ResultClick::Entry), None);
        assert_eq!(page.click_result(5, ResultClick::Entry), None);
    }

    #[test]
    fn document_snapshot_includes_every_region() {
        let mut page = page();
        page.inputs.video = "a \"quoted\" value".into();
        page.set_status(Status::error("Nope"));
        let html = page.to_html();
        assert!(html.contains("id=\"player\""));
        assert!(html.contains("id=\"meta\""));
        assert!(html.contains("id=\"results\""));
        assert!(html.contains("class=\"status error\""));
        assert!(html.contains("a &quot;quoted&quot; value"));
    }
}
