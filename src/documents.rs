//! XML document reading
//!
//! Turns XML text into a small element tree the parser walks. Only the parts
//! of XML that ADT responses use are kept: elements, attributes, text and
//! CDATA. Comments, processing instructions and doctypes are dropped.

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::namespaces::{NamespaceContext, QName};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// XML Element in the document tree
#[derive(Debug, Clone)]
pub struct Element {
    /// Element qualified name
    pub qname: QName,
    /// Attributes in document order, namespace declarations excluded
    pub attributes: Vec<(QName, String)>,
    /// Text content (if any)
    pub text: Option<String>,
    /// Child elements
    pub children: Vec<Element>,
}

impl Element {
    /// Create a new element
    pub fn new(qname: QName) -> Self {
        Self {
            qname,
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Get the local name of the element
    pub fn local_name(&self) -> &str {
        &self.qname.local_name
    }

    /// Get the namespace of the element
    pub fn namespace(&self) -> Option<&str> {
        self.qname.namespace.as_deref()
    }

    /// Get an attribute value by local name, ignoring any prefix
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(qname, _)| qname.local_name == name)
            .map(|(_, value)| value.as_str())
    }

    /// Text content, empty when the element has none
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Find child elements by local name
    pub fn find_children(&self, local_name: &str) -> Vec<&Element> {
        self.children
            .iter()
            .filter(|e| e.local_name() == local_name)
            .collect()
    }
}

/// XML Document representation
#[derive(Debug, Clone)]
pub struct Document {
    /// Root element of the document
    pub root: Element,
}

struct OpenElement {
    element: Element,
    namespaces: NamespaceContext,
    text: String,
}

impl Document {
    /// Parse an XML document with default limits
    pub fn parse(xml: &str) -> Result<Self> {
        Self::parse_with_limits(xml, &Limits::default())
    }

    /// Parse an XML document
    pub fn parse_with_limits(xml: &str, limits: &Limits) -> Result<Self> {
        limits.check_xml_size(xml.len())?;

        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);

        let root_context = NamespaceContext::new();
        let mut stack: Vec<OpenElement> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                Error::MalformedDocument(format!(
                    "error at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            })?;

            match event {
                Event::Start(e) => {
                    let parent = stack.last().map(|o| &o.namespaces).unwrap_or(&root_context);
                    let open = Self::open_element(&e, parent)?;
                    if stack.is_empty() && root.is_some() {
                        return Err(Error::MalformedDocument(
                            "more than one root element".to_string(),
                        ));
                    }
                    stack.push(open);
                    limits.check_xml_depth(stack.len())?;
                }
                Event::Empty(e) => {
                    let parent = stack.last().map(|o| &o.namespaces).unwrap_or(&root_context);
                    let open = Self::open_element(&e, parent)?;
                    limits.check_xml_depth(stack.len() + 1)?;
                    Self::close_element(open, &mut stack, &mut root)?;
                }
                Event::End(_) => {
                    let open = stack.pop().ok_or_else(|| {
                        Error::MalformedDocument("unexpected closing tag".to_string())
                    })?;
                    Self::close_element(open, &mut stack, &mut root)?;
                }
                Event::Text(e) => {
                    let text = e.unescape().map_err(|e| {
                        Error::MalformedDocument(format!("failed to unescape text: {}", e))
                    })?;
                    match stack.last_mut() {
                        Some(current) => current.text.push_str(&text),
                        None if text.trim().is_empty() => {}
                        None => {
                            return Err(Error::MalformedDocument(
                                "text outside of the root element".to_string(),
                            ))
                        }
                    }
                }
                Event::CData(e) => {
                    let bytes = e.into_inner();
                    let text = std::str::from_utf8(&bytes).map_err(|e| {
                        Error::MalformedDocument(format!("invalid UTF-8 in CDATA: {}", e))
                    })?;
                    match stack.last_mut() {
                        Some(current) => current.text.push_str(text),
                        None => {
                            return Err(Error::MalformedDocument(
                                "CDATA outside of the root element".to_string(),
                            ))
                        }
                    }
                }
                Event::Eof => break,
                _ => {} // Declarations, comments, processing instructions, doctypes
            }
        }

        if let Some(open) = stack.last() {
            return Err(Error::MalformedDocument(format!(
                "unexpected end of document inside <{}>",
                open.element.local_name()
            )));
        }

        root.map(|root| Document { root })
            .ok_or_else(|| Error::MalformedDocument("document has no root element".to_string()))
    }

    fn open_element(start: &BytesStart, parent: &NamespaceContext) -> Result<OpenElement> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| Error::MalformedDocument(format!("invalid element name: {}", e)))?
            .to_string();

        let mut namespaces = parent.clone();
        let mut raw_attributes = Vec::new();

        for attr_result in start.attributes() {
            let attr = attr_result.map_err(|e| {
                Error::MalformedDocument(format!("failed to parse attribute of <{}>: {}", name, e))
            })?;

            let attr_name = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| Error::MalformedDocument(format!("invalid attribute name: {}", e)))?
                .to_string();

            let attr_value = attr
                .unescape_value()
                .map_err(|e| {
                    Error::MalformedDocument(format!("failed to unescape attribute value: {}", e))
                })?
                .to_string();

            if attr_name == "xmlns" {
                namespaces.set_default_namespace(attr_value);
            } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
                namespaces.add_prefix(prefix, attr_value);
            } else {
                raw_attributes.push((attr_name, attr_value));
            }
        }

        let qname = namespaces.resolve_element(&name);
        if qname.prefix.is_some() && qname.namespace.is_none() {
            log::warn!("element <{}> uses an undeclared namespace prefix", name);
        }

        let mut element = Element::new(qname);
        element.attributes = raw_attributes
            .into_iter()
            .map(|(attr_name, value)| (namespaces.resolve_attribute(&attr_name), value))
            .collect();

        Ok(OpenElement {
            element,
            namespaces,
            text: String::new(),
        })
    }

    fn close_element(
        open: OpenElement,
        stack: &mut Vec<OpenElement>,
        root: &mut Option<Element>,
    ) -> Result<()> {
        let OpenElement {
            mut element, text, ..
        } = open;

        // Indentation between child elements is not content.
        let indentation = !element.children.is_empty() && text.trim().is_empty();
        if !text.is_empty() && !indentation {
            element.text = Some(text);
        }

        match stack.last_mut() {
            Some(parent) => parent.element.children.push(element),
            None if root.is_none() => *root = Some(element),
            None => {
                return Err(Error::MalformedDocument(
                    "more than one root element".to_string(),
                ))
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_xml() {
        let xml = r#"<root><child>text</child></root>"#;
        let doc = Document::parse(xml).unwrap();

        assert_eq!(doc.root.local_name(), "root");
        assert_eq!(doc.root.children.len(), 1);
        assert_eq!(doc.root.children[0].local_name(), "child");
        assert_eq!(doc.root.children[0].text.as_deref(), Some("text"));
    }

    #[test]
    fn test_parse_with_attributes() {
        let xml = r#"<root attr1="value1" adtcore:name="ZCL_X" xmlns:adtcore="http://www.sap.com/adt/core"><child/></root>"#;
        let doc = Document::parse(xml).unwrap();

        assert_eq!(doc.root.get_attribute("attr1"), Some("value1"));
        assert_eq!(doc.root.get_attribute("name"), Some("ZCL_X"));
        assert_eq!(doc.root.attributes.len(), 2);
        assert_eq!(
            doc.root.attributes[1].0.namespace.as_deref(),
            Some("http://www.sap.com/adt/core")
        );
    }

    #[test]
    fn test_parse_with_namespaces() {
        let xml = r#"<o:order xmlns:o="urn:orders"><o:line/><plain xmlns="urn:other"/></o:order>"#;
        let doc = Document::parse(xml).unwrap();

        assert_eq!(doc.root.local_name(), "order");
        assert_eq!(doc.root.namespace(), Some("urn:orders"));
        assert_eq!(doc.root.children[0].namespace(), Some("urn:orders"));
        assert_eq!(doc.root.children[1].namespace(), Some("urn:other"));
    }

    #[test]
    fn test_whitespace_between_children_dropped() {
        let xml = "<root>\n  <a> keep </a>\n  <b/>\n</root>";
        let doc = Document::parse(xml).unwrap();
        assert_eq!(doc.root.text, None);
        assert_eq!(doc.root.children[0].text(), " keep ");
    }

    #[test]
    fn test_entities_and_cdata() {
        let xml = "<root><a>1 &lt; 2</a><b><![CDATA[<raw>]]></b></root>";
        let doc = Document::parse(xml).unwrap();
        assert_eq!(doc.root.children[0].text(), "1 < 2");
        assert_eq!(doc.root.children[1].text(), "<raw>");
    }

    #[test]
    fn test_find_children() {
        let xml = r#"<root><child1/><child2/><child1/></root>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(doc.root.find_children("child1").len(), 2);
    }

    #[test]
    fn test_malformed_documents() {
        for xml in [
            "",
            "<root>",
            "<root></other>",
            "<a/><b/>",
            "text<root/>",
            r#"<root a="1" a="2"/>"#,
        ] {
            let err = Document::parse(xml).unwrap_err();
            assert!(
                matches!(err, Error::MalformedDocument(_)),
                "expected malformed for {:?}, got {:?}",
                xml,
                err
            );
        }
    }

    #[test]
    fn test_depth_limit() {
        let limits = Limits {
            max_xml_depth: 2,
            ..Limits::default()
        };
        let err = Document::parse_with_limits("<a><b><c/></b></a>", &limits).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
    }
}
