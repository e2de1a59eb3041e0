//! Owned XML element tree with namespace-resolved names.
//!
//! WPS responses are small, so they are read fully into memory and then queried
//! by `(namespace, local name)` pairs rather than by prefix strings.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    namespace: Option<String>,
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    /// Namespace URI the element name resolved to, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Local element name, without prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }

    /// Value of an attribute, matched by local name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Character data directly inside this element, trimmed.
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// First direct child with the given qualified name.
    pub fn child(&self, namespace: &str, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is(namespace, name))
    }

    /// This element followed by all of its descendants, in document order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// First element (this one included) with the given qualified name.
    pub fn find(&self, namespace: &str, name: &str) -> Option<&Element> {
        self.descendants().find(|e| e.is(namespace, name))
    }

    fn open(namespace: ResolveResult<'_>, start: &BytesStart<'_>) -> Result<Self> {
        let namespace = match namespace {
            ResolveResult::Bound(Namespace(uri)) => Some(String::from_utf8_lossy(uri).into_owned()),
            ResolveResult::Unbound => None,
            ResolveResult::Unknown(prefix) => {
                return Err(Error::Parse(format!(
                    "undeclared namespace prefix '{}'",
                    String::from_utf8_lossy(&prefix)
                )));
            }
        };

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            if attr.key.as_namespace_binding().is_some() {
                continue;
            }
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }

        Ok(Element {
            namespace,
            name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            attributes,
            text: String::new(),
            children: Vec::new(),
        })
    }
}

/// Depth-first, pre-order walk over an element subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

/// Parses a complete document and returns its root element.
pub fn parse(xml: &str) -> Result<Element> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut open: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let (namespace, event) = reader.read_resolved_event()?;
        match event {
            Event::Start(start) => {
                let element = Element::open(namespace, &start)?;
                open.push(element);
            }
            Event::Empty(start) => {
                let element = Element::open(namespace, &start)?;
                close(&mut open, &mut root, element)?;
            }
            Event::End(_) => {
                let element = open
                    .pop()
                    .ok_or_else(|| Error::Parse("unexpected closing tag".into()))?;
                close(&mut open, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(current) = open.last_mut() {
                    current.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(current) = open.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(unclosed) = open.last() {
        return Err(Error::Parse(format!(
            "unexpected end of document inside <{}>",
            unclosed.name
        )));
    }
    root.ok_or_else(|| Error::Parse("document has no root element".into()))
}

fn close(open: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = open.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(Error::Parse(format!(
            "second root element <{}>",
            element.name
        )));
    }
    *root = Some(element);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "urn:test";

    #[test]
    fn resolves_default_and_prefixed_namespaces() {
        let root = parse(
            r#"<a xmlns="urn:test" xmlns:o="urn:other" id="1"><o:b>x</o:b><c/></a>"#,
        )
        .unwrap();
        assert!(root.is(NS, "a"));
        assert_eq!(root.attribute("id"), Some("1"));
        assert_eq!(root.attribute("xmlns"), None);
        assert_eq!(root.children().len(), 2);
        assert!(root.children()[0].is("urn:other", "b"));
        assert_eq!(root.children()[0].text(), "x");
        assert!(root.child(NS, "c").is_some());
        assert!(root.child(NS, "b").is_none());
    }

    #[test]
    fn descendants_walk_in_document_order() {
        let root = parse(
            r#"<r xmlns="urn:test"><n>1</n><g><n>2</n><g><n>3</n></g></g><n>4</n></r>"#,
        )
        .unwrap();
        let found: Vec<&str> = root
            .descendants()
            .filter(|e| e.is(NS, "n"))
            .map(Element::text)
            .collect();
        assert_eq!(found, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn unescapes_text_and_attributes() {
        let root = parse(r#"<r at="a&amp;b">x &lt; y<![CDATA[ & z]]></r>"#).unwrap();
        assert_eq!(root.attribute("at"), Some("a&b"));
        assert_eq!(root.text(), "x < y & z");
        assert_eq!(root.namespace(), None);
    }

    #[test]
    fn rejects_malformed_documents() {
        for bad in [
            "",
            "<a><b></a>",
            "<a>",
            "<a/><b/>",
            "<p:a>text</p:a>",
            "just text",
        ] {
            assert!(
                matches!(parse(bad), Err(Error::Parse(_))),
                "expected parse error for {bad:?}"
            );
        }
    }
}
