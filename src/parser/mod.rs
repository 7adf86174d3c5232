//! Syndication parsing.
//!
//! Documents are transcoded to UTF-8 before they reach `feed-rs`, so a feed
//! declared as ISO-8859-1 or KOI8-R reads the same as a UTF-8 one. Unknown
//! charset labels and byte sequences that are invalid in the declared charset
//! are hard failures.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};
use feed_rs::parser;
use html_escape::decode_html_entities;
use thiserror::Error;

use crate::domain::{Channel, Entry};

/// Only the first bytes are searched for the XML declaration.
const DECLARATION_WINDOW: usize = 1024;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("unsupported character encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("document is not valid {0}")]
    MalformedText(&'static str),

    #[error("{0}")]
    Feed(#[from] parser::ParseFeedError),
}

#[derive(Clone, Default)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, body: &[u8]) -> Result<Channel, ParseError> {
        let text = decode_document(body)?;
        let feed = parser::parse(text.as_bytes())?;

        let entries = feed
            .entries
            .into_iter()
            .map(|entry| {
                let enclosure = entry
                    .media
                    .iter()
                    .flat_map(|m| m.content.iter())
                    .find_map(|c| c.url.as_ref().map(|u| u.to_string()));

                Entry {
                    title: entry
                        .title
                        .map(|t| decode_html_entities(&t.content).trim().to_string())
                        .unwrap_or_default(),
                    link: entry
                        .links
                        .first()
                        .map(|l| l.href.trim().to_string())
                        .unwrap_or_default(),
                    content: entry.content.and_then(|c| c.body),
                    summary: entry.summary.map(|s| s.content),
                    published_at: entry.published.or(entry.updated),
                    enclosure,
                }
            })
            .collect();

        Ok(Channel {
            title: feed
                .title
                .map(|t| decode_html_entities(&t.content).to_string()),
            link: feed.links.first().map(|l| l.href.clone()),
            entries,
        })
    }
}

/// Decodes a feed document into UTF-8 text with its XML declaration removed.
///
/// A byte-order mark wins over the declared label; without either the
/// document is taken to be UTF-8.
pub fn decode_document(body: &[u8]) -> Result<String, ParseError> {
    let (encoding, bom_len) = match Encoding::for_bom(body) {
        Some((encoding, len)) => (encoding, len),
        None => match declared_encoding(body) {
            Some(label) => {
                let encoding = Encoding::for_label(label.as_bytes())
                    .ok_or_else(|| ParseError::UnsupportedEncoding(label.clone()))?;
                (encoding, 0)
            }
            None => (UTF_8, 0),
        },
    };

    let text: Cow<'_, str> = encoding
        .decode_without_bom_handling_and_without_replacement(&body[bom_len..])
        .ok_or(ParseError::MalformedText(encoding.name()))?;

    if encoding != UTF_8 {
        tracing::debug!(encoding = encoding.name(), "transcoded feed document");
    }

    Ok(strip_declaration(&text).to_string())
}

/// Reads the `encoding` pseudo-attribute of a leading `<?xml ...?>`.
fn declared_encoding(body: &[u8]) -> Option<String> {
    let window = &body[..body.len().min(DECLARATION_WINDOW)];
    let start = window.iter().position(|b| !b.is_ascii_whitespace())?;
    let window = &window[start..];
    if !window.starts_with(b"<?xml") {
        return None;
    }
    let end = window.windows(2).position(|w| w == b"?>")?;
    let decl = std::str::from_utf8(&window[..end]).ok()?;

    let rest = &decl[decl.find("encoding")? + "encoding".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    let label = &value[..value.find(quote)?];

    Some(label.trim().to_string())
}

fn strip_declaration(text: &str) -> &str {
    let trimmed = text.trim_start();
    if trimmed.starts_with("<?xml") {
        if let Some(end) = trimmed.find("?>") {
            return &trimmed[end + 2..];
        }
    }
    text
}
