//! A small owned XML element tree on top of `quick-xml`.
//!
//! Both the arXiv Atom response and the podcast feed are read into this tree.
//! The feed is also written back out from it, so every mutation goes through a
//! structured representation instead of string surgery.
//!
//! Parsing keeps elements, attributes and non-blank text. Comments, processing
//! instructions and whitespace-only text between elements are dropped; the
//! writer re-indents deterministically.

use crate::error::{Error, Result};
use quick_xml::errors::IllFormedError;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesDecl, BytesEnd, BytesRef, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// One XML element with its attributes and children, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Qualified name as written, e.g. `itunes:author`.
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        self.name
            .rsplit_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((key, value)),
        }
    }

    /// Concatenated direct text content.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Replace all direct text children with `text`, keeping child elements.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children.retain(|n| matches!(n, Node::Element(_)));
        let text = text.into();
        if !text.is_empty() {
            self.children.insert(0, Node::Text(text));
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|n| match n {
            Node::Element(e) if e.name == name => Some(e),
            _ => None,
        })
    }

    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).map(Element::text)
    }
}

/// Parse a document and return its root element.
pub fn parse(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut text = String::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                flush_text(&mut stack, &mut text);
                stack.push(open_element(&e)?);
            }
            Event::Empty(e) => {
                flush_text(&mut stack, &mut text);
                let element = open_element(&e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                flush_text(&mut stack, &mut text);
                let element = stack.pop().ok_or_else(|| {
                    Error::Xml(IllFormedError::UnmatchedEndTag(String::new()).into())
                })?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(e) => text.push_str(&e.decode()?),
            Event::CData(e) => text.push_str(&e.decode()?),
            Event::GeneralRef(r) => push_reference(&mut text, &r)?,
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(Error::Xml(IllFormedError::MissingEndTag(open.name).into()));
    }
    root.ok_or_else(|| Error::Xml(IllFormedError::MissingEndTag("<root>".into()).into()))
}

fn open_element(e: &BytesStart<'_>) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attrs.push((key, value));
    }
    Ok(element)
}

fn push_reference(text: &mut String, r: &BytesRef<'_>) -> Result<()> {
    if let Some(ch) = r.resolve_char_ref()? {
        text.push(ch);
        return Ok(());
    }
    let name = r.decode()?;
    match resolve_predefined_entity(&name) {
        Some(resolved) => text.push_str(resolved),
        // Unknown entity: keep it verbatim so nothing is silently lost.
        None => {
            text.push('&');
            text.push_str(&name);
            text.push(';');
        }
    }
    Ok(())
}

fn flush_text(stack: &mut [Element], text: &mut String) {
    if !text.trim().is_empty() {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(Node::Text(std::mem::take(text)));
        }
    }
    text.clear();
}

/// A document has exactly one root; a second top-level element is an error.
fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(Error::ExtraRoot(element.name));
        }
    }
    Ok(())
}

/// Serialize `root` as a UTF-8 document with a declaration and two-space indentation.
pub fn to_string(root: &Element) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_element(&mut writer, root)?;
    let mut out = String::from_utf8_lossy(&writer.into_inner()).into_owned();
    out.push('\n');
    Ok(out)
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (k, v) in &element.attrs {
        start.push_attribute((k.as_str(), v.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        match child {
            Node::Element(e) => write_element(writer, e)?,
            Node::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_resolves_entities_and_keeps_spaces() {
        let root = parse("<a><b>Q &amp; A &#x41;</b></a>").unwrap();
        assert_eq!(root.child_text("b").as_deref(), Some("Q & A A"));
    }

    #[test]
    fn test_parse_reads_attributes_and_cdata() {
        let root = parse(r#"<a><link href="x?a=1&amp;b=2"/><d><![CDATA[<p>hi</p>]]></d></a>"#).unwrap();
        assert_eq!(root.child("link").unwrap().attr("href"), Some("x?a=1&b=2"));
        assert_eq!(root.child_text("d").as_deref(), Some("<p>hi</p>"));
    }

    #[test]
    fn test_parse_rejects_unclosed_document() {
        assert!(parse("<rss><channel>").is_err());
    }

    #[test]
    fn test_parse_rejects_mismatched_end_tag() {
        assert!(parse("<rss><channel></rss>").is_err());
    }

    #[test]
    fn test_parse_rejects_second_root_element() {
        assert!(matches!(
            parse("<rss><channel/></rss><rss><channel/></rss>"),
            Err(Error::ExtraRoot(name)) if name == "rss"
        ));
        assert!(matches!(parse("<a/><b/>"), Err(Error::ExtraRoot(_))));
    }

    #[test]
    fn test_serialize_is_indented_and_reparses() {
        let root = Element::new("rss").with_attr("version", "2.0").with_child(
            Element::new("channel")
                .with_child(Element::new("title").with_text("A <b> & \"c\""))
                .with_child(Element::new("itunes:image").with_attr("href", "http://x/y.png")),
        );
        let out = to_string(&root).unwrap();
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(out.contains("\n  <channel>\n    <title>"));
        assert!(out.ends_with("</rss>\n"));
        assert_eq!(parse(&out).unwrap(), root);
    }

    #[test]
    fn test_set_text_keeps_child_elements() {
        let mut e = Element::new("x")
            .with_text("old")
            .with_child(Element::new("y"));
        e.set_text("new");
        assert_eq!(e.text(), "new");
        assert_eq!(e.elements().count(), 1);
    }

    #[test]
    fn test_local_name_strips_prefix() {
        assert_eq!(Element::new("arxiv:primary_category").local_name(), "primary_category");
        assert_eq!(Element::new("entry").local_name(), "entry");
    }
}
