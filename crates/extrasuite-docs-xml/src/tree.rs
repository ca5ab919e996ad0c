//! Generic XML tree parsing with line tracking.
//!
//! The grammar layer works over this small DOM rather than raw events,
//! so every consumer gets line numbers for free when it rejects a
//! construct.

use crate::error::{Result, XmlError};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text { text: String, line: usize },
}

impl XmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|n| match n {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text { .. } => None,
        })
    }

    /// Concatenated direct text content.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let XmlNode::Text { text, .. } = node {
                out.push_str(text);
            }
        }
        out
    }
}

fn line_of(source: &str, byte: usize) -> usize {
    let byte = byte.min(source.len());
    source.as_bytes()[..byte].iter().filter(|b| **b == b'\n').count() + 1
}

/// Parse one XML file into a tree. `file` names the source for errors.
pub fn parse(source: &str, file: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text_start = false;
    reader.config_mut().trim_text_end = false;

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    let build = |e: &BytesStart<'_>, line: usize, file: &str| -> Result<XmlElement> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| XmlError::XmlMalformed {
                file: file.to_string(),
                line,
                message: err.to_string(),
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| XmlError::XmlMalformed {
                    file: file.to_string(),
                    line,
                    message: err.to_string(),
                })?
                .into_owned();
            attrs.push((key, value));
        }
        Ok(XmlElement {
            name,
            attrs,
            children: Vec::new(),
            line,
        })
    };

    loop {
        let pos = reader.buffer_position() as usize;
        let line = line_of(source, pos);
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                stack.push(build(&e, line, file)?);
            }
            Ok(Event::Empty(e)) => {
                let element = build(&e, line, file)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(XmlNode::Element(element)),
                    None if root.is_none() => root = Some(element),
                    None => {
                        return Err(XmlError::XmlMalformed {
                            file: file.to_string(),
                            line,
                            message: "multiple root elements".to_string(),
                        });
                    }
                }
            }
            Ok(Event::End(e)) => {
                let Some(element) = stack.pop() else {
                    return Err(XmlError::XmlMalformed {
                        file: file.to_string(),
                        line,
                        message: format!(
                            "unexpected closing tag </{}>",
                            String::from_utf8_lossy(e.name().as_ref())
                        ),
                    });
                };
                let name = e.name();
                let closing = String::from_utf8_lossy(name.as_ref());
                if closing != element.name {
                    return Err(XmlError::XmlMalformed {
                        file: file.to_string(),
                        line,
                        message: format!(
                            "mismatched closing tag </{closing}> for <{}>",
                            element.name
                        ),
                    });
                }
                match stack.last_mut() {
                    Some(parent) => parent.children.push(XmlNode::Element(element)),
                    None if root.is_none() => root = Some(element),
                    None => {
                        return Err(XmlError::XmlMalformed {
                            file: file.to_string(),
                            line,
                            message: "multiple root elements".to_string(),
                        });
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| XmlError::XmlMalformed {
                        file: file.to_string(),
                        line,
                        message: err.to_string(),
                    })?
                    .into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text { text, line });
                } else if !text.trim().is_empty() {
                    return Err(XmlError::XmlMalformed {
                        file: file.to_string(),
                        line,
                        message: "text outside the root element".to_string(),
                    });
                }
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text { text, line });
                }
            }
            Ok(Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_)) => {}
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(XmlError::XmlMalformed {
                    file: file.to_string(),
                    line: line_of(source, reader.error_position() as usize),
                    message: err.to_string(),
                });
            }
        }
    }

    if let Some(unclosed) = stack.last() {
        return Err(XmlError::XmlMalformed {
            file: file.to_string(),
            line: unclosed.line,
            message: format!("unclosed element <{}>", unclosed.name),
        });
    }
    root.ok_or_else(|| XmlError::XmlMalformed {
        file: file.to_string(),
        line: 1,
        message: "no root element".to_string(),
    })
}

/// Escape text for use in an XML text node.
pub fn escape_text(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}

/// Escape text for use in a double-quoted attribute value.
pub fn escape_attr(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_with_attrs() {
        let xml = "<document id=\"t.0\">\n  <p class=\"warn\">Hello <b>World</b></p>\n</document>";
        let root = parse(xml, "document.xml").unwrap();
        assert_eq!(root.name, "document");
        assert_eq!(root.attr("id"), Some("t.0"));
        let p = root.child_elements().next().unwrap();
        assert_eq!(p.name, "p");
        assert_eq!(p.attr("class"), Some("warn"));
        assert_eq!(p.line, 2);
        assert_eq!(p.text(), "Hello ");
    }

    #[test]
    fn reports_mismatched_tags_with_line() {
        let err = parse("<document>\n<p></b>\n</document>", "document.xml").unwrap_err();
        assert!(matches!(err, XmlError::XmlMalformed { line: 2, .. }));
    }

    #[test]
    fn unescapes_entities() {
        let root = parse("<p>a &amp; b &lt;c&gt;</p>", "f").unwrap();
        assert_eq!(root.text(), "a & b <c>");
    }

    #[test]
    fn rejects_unclosed() {
        assert!(parse("<document><p>", "f").is_err());
    }
}
