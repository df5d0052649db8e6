//! Parser for YouTube's public Atom feeds (`/feeds/videos.xml`).
//!
//! Elements are matched by local name along the current element path, so the
//! `yt:` and `media:` prefixes do not need to be resolved. Entries keep the
//! order they appear in the document.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

use crate::model::{Feed, FeedItem};

#[derive(Debug, Error)]
pub enum FeedParseError {
    #[error("malformed feed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed feed attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),
    #[error("document is not an Atom feed")]
    NotAFeed,
}

pub fn parse_feed(xml: &str) -> Result<Feed, FeedParseError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut feed = Feed::default();
    let mut path: Vec<String> = Vec::new();
    let mut entry: Option<FeedItem> = None;
    let mut saw_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let name = local_name(&start);
                if path.is_empty() {
                    if name != "feed" {
                        return Err(FeedParseError::NotAFeed);
                    }
                    saw_root = true;
                }
                if name == "entry" && path.len() == 1 {
                    entry = Some(FeedItem::default());
                }
                path.push(name);
                if let Some(item) = entry.as_mut() {
                    read_entry_attributes(&start, &path, item)?;
                }
            }
            Event::Empty(start) => {
                if path.is_empty() {
                    return Err(FeedParseError::NotAFeed);
                }
                path.push(local_name(&start));
                if let Some(item) = entry.as_mut() {
                    read_entry_attributes(&start, &path, item)?;
                }
                path.pop();
            }
            Event::Text(text) => {
                let text = text.unescape()?;
                assign_text(&path, &text, &mut feed, entry.as_mut());
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data).into_owned();
                assign_text(&path, &text, &mut feed, entry.as_mut());
            }
            Event::End(_) => {
                if path.len() == 2 && path[1] == "entry" {
                    if let Some(mut item) = entry.take() {
                        item.description = item.description.trim().to_owned();
                        feed.items.push(item);
                    }
                }
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(FeedParseError::NotAFeed);
    }
    Ok(feed)
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

/// `path` includes the element that carries the attributes.
fn read_entry_attributes(
    start: &BytesStart<'_>,
    path: &[String],
    item: &mut FeedItem,
) -> Result<(), FeedParseError> {
    let rel = relative(path);
    match rel.as_slice() {
        ["link"] => {
            let mut href = None;
            let mut alternate = false;
            for attr in start.attributes() {
                let attr = attr?;
                match attr.key.local_name().as_ref() {
                    b"href" => href = Some(attr.unescape_value()?.into_owned()),
                    b"rel" => alternate = attr.unescape_value()? == "alternate",
                    _ => {}
                }
            }
            if alternate && item.link.is_empty() {
                if let Some(href) = href {
                    item.link = href;
                }
            }
        }
        ["group", "thumbnail"] if item.thumbnail.is_empty() => {
            for attr in start.attributes() {
                let attr = attr?;
                if attr.key.local_name().as_ref() == b"url" {
                    item.thumbnail = attr.unescape_value()?.into_owned();
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// Path below the current `entry`, e.g. `["group", "description"]`.
fn relative(path: &[String]) -> Vec<&str> {
    path.iter().skip(2).map(String::as_str).collect()
}

fn assign_text(path: &[String], text: &str, feed: &mut Feed, entry: Option<&mut FeedItem>) {
    if let Some(item) = entry {
        let target = match relative(path).as_slice() {
            ["videoId"] => &mut item.video_id,
            ["title"] => &mut item.title,
            ["published"] => &mut item.published,
            ["updated"] => &mut item.updated,
            ["group", "description"] => &mut item.description,
            _ => return,
        };
        target.push_str(text);
        return;
    }

    let names: Vec<&str> = path.iter().map(String::as_str).collect();
    match names.as_slice() {
        ["feed", "title"] => feed.title.push_str(text),
        ["feed", "updated"] => feed.updated.push_str(text),
        ["feed", "author", "name"] => feed.author.push_str(text),
        _ => {}
    }
}
