//! Permissive HTML fragment parsing with a tag-based visitor.
//!
//! This is the only place that knows about the HTML tree implementation;
//! callers see [`Fragment`] and [`ElementVisitor`].

use std::cell::RefCell;
use std::rc::Rc;

use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{parse_fragment, LocalName, Namespace, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};

use super::RenderError;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// A rewrite applied to every element carrying a given tag name.
pub trait ElementVisitor {
    fn tag(&self) -> &str;
    fn visit(&self, element: &Handle);
}

/// A parsed HTML fragment, as if it were the content of a `<body>`.
pub struct Fragment {
    dom: RcDom,
}

impl Fragment {
    pub fn parse(html: &str) -> Self {
        let context = QualName::new(None, html_ns(), LocalName::from("body"));
        let dom = parse_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new())
            .one(html);
        Self { dom }
    }

    /// Runs `visitor` on every matching element in document order.
    ///
    /// Matches are collected before any visit, so a visitor may insert
    /// siblings without being re-triggered by them.
    pub fn apply(&self, visitor: &dyn ElementVisitor) {
        let mut matches = Vec::new();
        collect_elements(&self.dom.document, visitor.tag(), &mut matches);
        for element in &matches {
            visitor.visit(element);
        }
    }

    pub fn render(&self) -> Result<String, RenderError> {
        let root = self
            .dom
            .document
            .children
            .borrow()
            .first()
            .cloned()
            .ok_or(RenderError::EmptyDocument)?;

        let mut out = Vec::new();
        let opts = SerializeOpts {
            traversal_scope: TraversalScope::ChildrenOnly(None),
            ..Default::default()
        };
        serialize(&mut out, &SerializableHandle::from(root), opts)?;

        Ok(String::from_utf8(out)?)
    }
}

/// Promotes an image's `alt` text to a visible paragraph right after it.
pub struct ImgAltCaption;

impl ElementVisitor for ImgAltCaption {
    fn tag(&self) -> &str {
        "img"
    }

    fn visit(&self, element: &Handle) {
        let Some(alt) = attribute(element, "alt").filter(|a| !a.trim().is_empty()) else {
            return;
        };
        let caption = new_element("p", vec![new_text(&alt)]);
        insert_after(element, caption);
    }
}

fn html_ns() -> Namespace {
    Namespace::from(HTML_NAMESPACE)
}

fn collect_elements(node: &Handle, tag: &str, out: &mut Vec<Handle>) {
    if let NodeData::Element { ref name, .. } = node.data {
        if str::eq_ignore_ascii_case(&name.local, tag) {
            out.push(node.clone());
        }
    }
    for child in node.children.borrow().iter() {
        collect_elements(child, tag, out);
    }
}

/// Attribute values come back entity-decoded from the parser.
fn attribute(node: &Handle, key: &str) -> Option<String> {
    match node.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| str::eq_ignore_ascii_case(&a.name.local, key))
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

fn new_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from_slice(text)),
    })
}

fn new_element(tag: &str, children: Vec<Handle>) -> Handle {
    let element = Node::new(NodeData::Element {
        name: QualName::new(None, html_ns(), LocalName::from(tag)),
        attrs: RefCell::new(Vec::new()),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    });
    for child in children {
        child.parent.set(Some(Rc::downgrade(&element)));
        element.children.borrow_mut().push(child);
    }
    element
}

fn insert_after(node: &Handle, sibling: Handle) {
    let weak_parent = node.parent.take();
    node.parent.set(weak_parent.clone());
    let Some(parent) = weak_parent.and_then(|w| w.upgrade()) else {
        return;
    };

    let mut children = parent.children.borrow_mut();
    let index = children
        .iter()
        .position(|c| Rc::ptr_eq(c, node))
        .map_or(children.len(), |i| i + 1);
    sibling.parent.set(Some(Rc::downgrade(&parent)));
    children.insert(index, sibling);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caption(html: &str) -> String {
        let fragment = Fragment::parse(html);
        fragment.apply(&ImgAltCaption);
        fragment.render().unwrap()
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(caption("Content"), "Content");
    }

    #[test]
    fn test_alt_text_becomes_paragraph() {
        assert_eq!(
            caption(r#"<img src="a.png" alt="A cat">"#),
            r#"<img src="a.png" alt="A cat"><p>A cat</p>"#
        );
    }

    #[test]
    fn test_uppercase_markup_is_matched() {
        assert_eq!(
            caption(r#"<IMG SRC="a.png" ALT="A cat">"#),
            r#"<img src="a.png" alt="A cat"><p>A cat</p>"#
        );
    }

    #[test]
    fn test_alt_text_is_unescaped_then_reescaped_once() {
        assert_eq!(
            caption(r#"<img src="a.png" alt="Tom &amp; Jerry">"#),
            r#"<img src="a.png" alt="Tom &amp; Jerry"><p>Tom &amp; Jerry</p>"#
        );
    }

    #[test]
    fn test_caption_inserted_before_following_sibling() {
        assert_eq!(
            caption(r#"<div><img alt="x"><span>after</span></div>"#),
            r#"<div><img alt="x"><p>x</p><span>after</span></div>"#
        );
    }

    #[test]
    fn test_image_without_alt_untouched() {
        assert_eq!(caption(r#"<img src="a.png">"#), r#"<img src="a.png">"#);
        assert_eq!(
            caption(r#"<img src="a.png" alt="">"#),
            r#"<img src="a.png" alt="">"#
        );
    }

    #[test]
    fn test_every_image_is_visited() {
        let out = caption(r#"<img alt="one"><img alt="two">"#);
        assert_eq!(out, r#"<img alt="one"><p>one</p><img alt="two"><p>two</p>"#);
    }

    #[test]
    fn test_unclosed_markup_is_completed() {
        assert_eq!(caption("<b>bold <i>both"), "<b>bold <i>both</i></b>");
    }
}
