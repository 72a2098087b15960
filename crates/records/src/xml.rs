//! Owned XML element tree for embedded report payloads.
//!
//! The payloads are small enough (one facility, one month) to be materialised in full, and the
//! parsers need repeated scoped searches over nested elements, so a pull parser alone is not a
//! good fit. `quick_xml` drives the tokenising; this module only keeps elements and attributes.
//! Text nodes, comments and processing instructions are discarded because no record field lives
//! in element text.

use crate::{RecordsError, RecordsResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const DOCUMENT_NODE: &str = "#document";

/// One XML element with its attributes and child elements, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
}

impl XmlElement {
    /// Parses a payload into a synthetic document node holding every top-level element.
    ///
    /// # Errors
    ///
    /// Returns `RecordsError` if the payload is not well-formed XML (mismatched or unclosed
    /// tags, broken attribute syntax). Attribute values with entities XML does not define are
    /// kept raw.
    pub fn parse_document(xml: &str) -> RecordsResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack = vec![XmlElement {
            name: DOCUMENT_NODE.to_owned(),
            ..Default::default()
        }];

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(Self::from_start(&start)?),
                Event::Empty(start) => {
                    let element = Self::from_start(&start)?;
                    Self::attach(&mut stack, element)?;
                }
                Event::End(_) => {
                    if stack.len() < 2 {
                        return Err(RecordsError::MalformedXml(
                            "closing tag without matching opening tag".into(),
                        ));
                    }
                    if let Some(element) = stack.pop() {
                        Self::attach(&mut stack, element)?;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        match stack.pop() {
            Some(document) if stack.is_empty() => Ok(document),
            Some(unclosed) => Err(RecordsError::MalformedXml(format!(
                "unclosed element <{}>",
                unclosed.name
            ))),
            None => Err(RecordsError::MalformedXml("empty element stack".into())),
        }
    }

    fn from_start(start: &BytesStart<'_>) -> RecordsResult<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            // HTML-hosted exports carry entities such as `&nbsp;` that XML does not define.
            let value = match attribute.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(e) => {
                    tracing::debug!("Keeping raw value of attribute {}: {}", key, e);
                    String::from_utf8_lossy(&attribute.value).into_owned()
                }
            };
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    fn attach(stack: &mut [XmlElement], element: XmlElement) -> RecordsResult<()> {
        match stack.last_mut() {
            Some(parent) => {
                parent.children.push(element);
                Ok(())
            }
            None => Err(RecordsError::MalformedXml(
                "element outside of document".into(),
            )),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    /// Raw attribute value, if the attribute is present. Names are case-sensitive.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// All descendants named `name`, in document order.
    ///
    /// Matched elements are not searched further for nested matches of the same name.
    pub fn find_all(&self, name: &str) -> Vec<&XmlElement> {
        self.find_scoped(name, &[])
    }

    /// Descendants named `name`, without entering elements named in `barriers`.
    ///
    /// Used to keep nested windows from leaking their children into the enclosing window, e.g.
    /// monitoring rows of a follow-up belong to the follow-up, not to the administration time.
    pub fn find_scoped<'a>(&'a self, name: &str, barriers: &[&str]) -> Vec<&'a XmlElement> {
        let mut found = Vec::new();
        self.collect_scoped(name, barriers, &mut found);
        found
    }

    fn collect_scoped<'a>(&'a self, name: &str, barriers: &[&str], found: &mut Vec<&'a XmlElement>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            } else if !barriers.contains(&child.name.as_str()) {
                child.collect_scoped(name, barriers, found);
            }
        }
    }
}
