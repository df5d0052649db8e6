//! Rendering of the player, metadata panel and results list.
//!
//! Each function builds a fresh element for its region. Callers swap the
//! whole region for the returned element, so rendering the same input twice
//! always yields the same output.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::address::AddressState;
use crate::ids::{VideoId, embed_url, watch_url};
use crate::model::Feed;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// A minimal owned DOM element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: &'static str,
    attrs: Vec<(&'static str, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, value.into()));
        self
    }

    pub fn class(self, value: &str) -> Self {
        self.attr("class", value)
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn tag(&self) -> &str {
        self.tag
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Depth-first search for the first descendant with `class`.
    pub fn find_class(&self, class: &str) -> Option<&Element> {
        self.children().find_map(|child| {
            if child.has_class(class) {
                Some(child)
            } else {
                child.find_class(class)
            }
        })
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.get_attr("class")
            .is_some_and(|value| value.split_whitespace().any(|c| c == class))
    }

    /// Concatenated text of this element and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Element(element) => element.collect_text(out),
            }
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.tag);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            if !value.is_empty() {
                out.push_str("=\"");
                out.push_str(&encode_double_quoted_attribute(value));
                out.push('"');
            }
        }
        out.push('>');
        if is_void(self.tag) {
            return;
        }
        for node in &self.children {
            match node {
                Node::Text(text) => out.push_str(&encode_text(text)),
                Node::Element(element) => element.write_html(out),
            }
        }
        out.push_str("</");
        out.push_str(self.tag);
        out.push('>');
    }
}

fn is_void(tag: &str) -> bool {
    matches!(tag, "img" | "br" | "hr" | "input" | "meta" | "link")
}

/// Single-line status message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub error: bool,
}

impl Status {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            error: true,
        }
    }

    pub fn clear() -> Self {
        Self::default()
    }

    pub fn render(&self) -> Element {
        let class = if self.error { "status error" } else { "status" };
        Element::new("p")
            .class(class)
            .attr("role", "status")
            .text(self.text.clone())
    }
}

pub fn render_player(video: Option<&VideoId>) -> Element {
    let player = Element::new("section").attr("id", "player");
    match video {
        None => player.class("empty").child(
            Element::new("p")
                .class("placeholder")
                .text("Paste a video link or ID to start playing."),
        ),
        Some(id) => player.child(
            Element::new("iframe")
                .attr("src", embed_url(id))
                .attr("title", "YouTube video player")
                .attr(
                    "allow",
                    "accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture",
                )
                .attr("referrerpolicy", "strict-origin-when-cross-origin")
                .attr("allowfullscreen", ""),
        ),
    }
}

/// Inputs of the metadata panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaView {
    pub video: Option<VideoId>,
    pub title: Option<String>,
    pub author: Option<String>,
}

pub fn render_meta(meta: &MetaView, address: &AddressState) -> Element {
    let title = meta
        .title
        .clone()
        .filter(|title| !title.is_empty())
        .or_else(|| meta.video.as_ref().map(|id| format!("Video: {id}")))
        .unwrap_or_default();
    let byline = meta.author.clone().unwrap_or_default();

    let mut actions = Element::new("div").class("actions");
    if let Some(id) = &meta.video {
        actions = actions
            .child(
                Element::new("a")
                    .class("external")
                    .attr("href", watch_url(id))
                    .attr("target", "_blank")
                    .attr("rel", "noopener noreferrer")
                    .text("Open on YouTube"),
            )
            .child(
                Element::new("a")
                    .class("permalink")
                    .attr("href", address.permalink(id))
                    .text("Permalink"),
            );
    }

    Element::new("section")
        .attr("id", "meta")
        .child(Element::new("h2").class("title").text(title))
        .child(Element::new("p").class("byline").text(byline))
        .child(actions)
}

/// A rendered results list plus the video each entry plays when clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsView {
    pub element: Element,
    pub targets: Vec<Option<String>>,
}

pub fn render_results(feed: &Feed) -> ResultsView {
    let title = if feed.title.is_empty() {
        "Feed"
    } else {
        feed.title.as_str()
    };
    let mut header = Element::new("header").child(Element::new("h2").text(title));
    if let Some(source) = feed.feed_url.as_deref().filter(|url| !url.is_empty()) {
        header = header.child(Element::new("p").class("subtitle").text(source));
    }

    let mut list = Element::new("ul").class("items");
    let mut targets = Vec::with_capacity(feed.items.len().max(1));

    if feed.items.is_empty() {
        list = list.child(Element::new("li").class("empty").text("No items"));
        targets.push(None);
    }

    for item in &feed.items {
        let label = [item.title.as_str(), item.video_id.as_str()]
            .into_iter()
            .find(|value| !value.is_empty())
            .unwrap_or("Untitled");
        let link = if !item.link.is_empty() {
            item.link.clone()
        } else {
            VideoId::parse(&item.video_id)
                .map(|id| watch_url(&id))
                .unwrap_or_default()
        };

        let mut entry = Element::new("li")
            .class("item")
            .attr("data-video-id", item.video_id.clone());
        if !item.thumbnail.is_empty() {
            entry = entry.child(
                Element::new("img")
                    .class("thumb")
                    .attr("src", item.thumbnail.clone())
                    .attr("alt", "")
                    .attr("loading", "lazy"),
            );
        }
        entry = entry.child(
            Element::new("div")
                .class("body")
                .child(Element::new("h3").class("item-title").text(label))
                .child(
                    Element::new("time")
                        .attr("datetime", item.published.clone())
                        .text(format_published(Some(&item.published))),
                )
                .child(
                    Element::new("a")
                        .class("external")
                        .attr("href", link)
                        .attr("target", "_blank")
                        .attr("rel", "noopener noreferrer")
                        .text("Open in YouTube"),
                )
                .child(
                    Element::new("p")
                        .class("description")
                        .text(item.description.clone()),
                ),
        );

        list = list.child(entry);
        targets.push(Some(item.video_id.clone()).filter(|id| !id.is_empty()));
    }

    let element = Element::new("section")
        .attr("id", "results")
        .child(header)
        .child(list);
    ResultsView { element, targets }
}

/// Medium-style date for an ISO-8601 timestamp.
pub fn format_published(value: Option<&str>) -> String {
    let Some(value) = value.filter(|value| !value.is_empty()) else {
        return String::new();
    };
    let date = DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.date_naive())
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").map(|parsed| parsed.date())
        })
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"));
    match date {
        Ok(date) => date.format("%b %-d, %Y").to_string(),
        Err(_) => value.to_owned(),
    }
}
