//! Entry rendering: an entry's markup becomes a self-contained HTML body
//! with a linked title header and a reference footer.

mod fragment;

use std::string::FromUtf8Error;

use html_escape::{encode_double_quoted_attribute, encode_text};
use thiserror::Error;

use crate::domain::Entry;

pub use fragment::{ElementVisitor, Fragment, ImgAltCaption};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("fragment produced no document")]
    EmptyDocument,

    #[error("failed to serialize fragment: {0}")]
    Serialize(#[from] std::io::Error),

    #[error("serialized fragment is not UTF-8: {0}")]
    NotUtf8(#[from] FromUtf8Error),
}

/// Parses `html` permissively and applies the image caption rewrite.
pub fn render_fragment(html: &str) -> Result<String, RenderError> {
    let fragment = Fragment::parse(html);
    fragment.apply(&ImgAltCaption);
    fragment.render()
}

pub fn render_entry(entry: &Entry) -> Result<String, RenderError> {
    let body = render_fragment(entry.raw_content())?;
    let link_attr = encode_double_quoted_attribute(&entry.link);
    let link_text = encode_text(&entry.link);

    let mut out = format!(
        "<h1><a href=\"{}\">{}</a></h1>\n{}\n<p>Url: <a href=\"{}\">{}</a></p>",
        link_attr,
        encode_text(&entry.title),
        body,
        link_attr,
        link_text
    );
    if let Some(url) = entry.enclosure.as_deref().filter(|u| !u.is_empty()) {
        out.push_str(&format!(
            "\n<p>Enclosure: <a href=\"{}\">{}</a></p>",
            encode_double_quoted_attribute(url),
            encode_text(url)
        ));
    }
    out.push('\n');

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::FeedParser;

    #[test]
    fn test_render_entry_layout() {
        let mut entry = Entry::new("Title", "Link");
        entry.summary = Some("ignore".into());
        entry.content = Some("Content".into());

        let html = render_entry(&entry).unwrap();
        assert_eq!(
            html,
            "<h1><a href=\"Link\">Title</a></h1>\nContent\n<p>Url: <a href=\"Link\">Link</a></p>\n"
        );
    }

    #[test]
    fn test_render_entry_with_enclosure() {
        let mut entry = Entry::new("Episode 1", "https://pod.example/1");
        entry.summary = Some("<p>Show notes</p>".into());
        entry.enclosure = Some("https://pod.example/1.mp3".into());

        let html = render_entry(&entry).unwrap();
        assert!(html.contains("<p>Show notes</p>"));
        assert!(html.ends_with(
            "<p>Enclosure: <a href=\"https://pod.example/1.mp3\">https://pod.example/1.mp3</a></p>\n"
        ));
    }

    #[test]
    fn test_render_entry_escapes_title_and_link() {
        let entry = Entry::new("Fish & <Chips>", "http://x.example/?a=1&b=\"2\"");
        let html = render_entry(&entry).unwrap();
        assert!(html.starts_with(
            "<h1><a href=\"http://x.example/?a=1&amp;b=&quot;2&quot;\">Fish &amp; &lt;Chips&gt;</a></h1>\n"
        ));
    }

    #[test]
    fn test_render_xkcd_entry_captions_image() {
        let channel = FeedParser::new()
            .parse(include_bytes!("../../testdata/xkcd.rss.xml"))
            .unwrap();
        let html = render_entry(&channel.entries[0]).unwrap();

        assert!(html.starts_with("<h1><a href=\"http://xkcd.com/1187/\">Aspect Ratio</a></h1>\n<img "));
        assert!(html.contains(
            "<p>I'm always disappointed when 'Anamorphic Widescreen' doesn't refer to a widescreen Animorphs movie.</p>"
        ));
        assert!(html.ends_with("<p>Url: <a href=\"http://xkcd.com/1187/\">http://xkcd.com/1187/</a></p>\n"));
    }
}
