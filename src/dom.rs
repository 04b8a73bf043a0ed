//! # Element tree
//!
//! A small owned XML tree, read and written with `quick_xml`. It keeps element
//! order, attributes, text, comments and CDATA so a document can be loaded,
//! have its `boundedBy` property rewritten, and be written back out.
//!
//! Names are stored qualified (`gml:Envelope`). Lookups by name compare the
//! local part only, so the same code works whatever prefix a document binds
//! the GML namespace to.

use std::io::{BufRead, Write};
use std::str::FromStr;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;

use crate::error::{GmlError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    CData(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Looks an attribute up by its exact (qualified) name.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replaces the value if the attribute exists, appends it otherwise.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn find_child(&self, local_name: &str) -> Option<&Element> {
        self.child_elements()
            .find(|child| child.local_name() == local_name)
    }

    /// Index into `children` of the first element whose local name is one of `local_names`.
    pub fn position_of_child(&self, local_names: &[&str]) -> Option<usize> {
        self.children.iter().position(|node| match node {
            Node::Element(element) => local_names.contains(&element.local_name()),
            _ => false,
        })
    }

    pub fn insert_child(&mut self, index: usize, child: Element) {
        self.children.insert(index, Node::Element(child));
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Removes every child element with the given local name and returns how many went.
    pub fn remove_children_named(&mut self, local_name: &str) -> usize {
        let before = self.children.len();
        self.children.retain(|node| match node {
            Node::Element(element) => element.local_name() != local_name,
            _ => true,
        });
        before - self.children.len()
    }

    /// Concatenated text and CDATA content of the direct children.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for node in &self.children {
            match node {
                Node::Text(t) | Node::CData(t) => text.push_str(t),
                _ => {}
            }
        }
        text
    }

    /// Prefix this element binds to `uri`: `Some("")` for a default namespace declaration.
    pub fn namespace_prefix_for(&self, uri: &str) -> Option<&str> {
        self.attributes.iter().find_map(|(key, value)| {
            if value != uri {
                return None;
            }
            if key == "xmlns" {
                Some("")
            } else {
                key.strip_prefix("xmlns:")
            }
        })
    }

    fn from_start(start: &BytesStart) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| GmlError::Xml(e.into()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| GmlError::Xml(e.into()))?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
        })
    }
}

pub(crate) fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// `prefix:local`, or just `local` for an empty prefix.
pub fn qualify(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{}:{}", prefix, local)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Whether the source carried an XML declaration; output always declares UTF-8.
    pub declaration: bool,
    pub root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self {
            declaration: true,
            root,
        }
    }

    pub fn read<R: BufRead>(input: R) -> Result<Self> {
        let mut reader = Reader::from_reader(input);
        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        let mut declaration = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Decl(_)) => declaration = true,
                Ok(Event::Start(start)) => stack.push(Element::from_start(&start)?),
                Ok(Event::Empty(start)) => {
                    let element = Element::from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::End(_)) => {
                    let element = stack.pop().ok_or_else(|| {
                        GmlError::MalformedDocument("unexpected closing tag".to_string())
                    })?;
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::Text(text)) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = text.unescape().map_err(|e| GmlError::Xml(e.into()))?;
                        parent.children.push(Node::Text(text.into_owned()));
                    }
                }
                Ok(Event::CData(data)) => {
                    if let Some(parent) = stack.last_mut() {
                        let data = String::from_utf8_lossy(&data).into_owned();
                        parent.children.push(Node::CData(data));
                    }
                }
                Ok(Event::Comment(comment)) => {
                    if let Some(parent) = stack.last_mut() {
                        let comment = String::from_utf8_lossy(&comment).into_owned();
                        parent.children.push(Node::Comment(comment));
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(
                        "XML read error at position {}: {:?}",
                        reader.buffer_position(),
                        e
                    );
                    return Err(GmlError::Xml(e));
                }
            }
            buf.clear();
        }

        if let Some(open) = stack.last() {
            return Err(GmlError::MalformedDocument(format!(
                "element <{}> is not closed",
                open.name
            )));
        }
        let root = root
            .ok_or_else(|| GmlError::MalformedDocument("document has no root element".to_string()))?;

        Ok(Self { declaration, root })
    }

    pub fn write<W: Write>(&self, output: W) -> Result<()> {
        let mut writer = Writer::new(output);
        if self.declaration {
            writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
            writer.get_mut().write_all(b"\n")?;
        }
        write_element(&mut writer, &self.root)?;
        writer.into_inner().flush()?;
        Ok(())
    }

    pub fn to_xml_string(&self) -> Result<String> {
        let mut out = Vec::new();
        self.write(&mut out)?;
        String::from_utf8(out).map_err(|e| GmlError::MalformedDocument(e.to_string()))
    }
}

impl FromStr for Document {
    type Err = GmlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::read(s.as_bytes())
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(GmlError::MalformedDocument(format!(
                "second root element <{}>",
                element.name
            )))
        }
    }
    Ok(())
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
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
            Node::Comment(c) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(c.as_str())))?
            }
            Node::CData(c) => writer.write_event(Event::CData(BytesCData::new(c.as_str())))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}
