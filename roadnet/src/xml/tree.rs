//! Small owned XML tree.
//!
//! `roxmltree` documents are read-only; configs are edited in place and written back, so the parsed
//! document is copied into this tree. Comments survive, processing instructions other than the
//! declaration do not.

use std::fmt::Write as _;

pub const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#;
const INDENT: &str = "  ";

#[derive(Clone, Debug, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    Comment(String),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct XmlDocument {
    pub root: XmlElement,
}

pub fn parse(text: &str) -> Result<XmlDocument, roxmltree::Error> {
    let doc = roxmltree::Document::parse(text)?;
    Ok(XmlDocument {
        root: convert(doc.root_element()),
    })
}

// namespaces that come into scope on `node`, i.e. not already declared by its parent
fn declarations(node: roxmltree::Node<'_, '_>) -> Vec<(String, String)> {
    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();
    node.namespaces()
        .filter(|ns| ns.name() != Some("xml") && !inherited.contains(&(ns.name(), ns.uri())))
        .map(|ns| {
            let name = match ns.name() {
                Some(prefix) => format!("xmlns:{}", prefix),
                None => "xmlns".to_string(),
            };
            (name, ns.uri().to_string())
        })
        .collect()
}

fn qualified(node: roxmltree::Node<'_, '_>, local: &str, namespace: Option<&str>) -> String {
    match namespace.and_then(|uri| node.lookup_prefix(uri)) {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, local),
        _ => local.to_string(),
    }
}

fn convert(node: roxmltree::Node<'_, '_>) -> XmlElement {
    let tag = node.tag_name();
    let mut element = XmlElement::new(qualified(node, tag.name(), tag.namespace()));
    element.attributes = declarations(node);
    for attr in node.attributes() {
        element
            .attributes
            .push((qualified(node, attr.name(), attr.namespace()), attr.value().to_string()));
    }
    for child in node.children() {
        if child.is_element() {
            element.children.push(XmlNode::Element(convert(child)));
        } else if child.is_text() {
            element.children.push(XmlNode::Text(child.text().unwrap_or_default().to_string()));
        } else if child.is_comment() {
            element.children.push(XmlNode::Comment(child.text().unwrap_or_default().to_string()));
        }
    }
    element
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        XmlElement {
            name: name.into(),
            ..XmlElement::default()
        }
    }

    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut el = XmlElement::new(name);
        el.set_text(text);
        el
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|c| match c {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|el| el.name == name)
    }

    /// First descendant named `name`, in document order.
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        for el in self.elements() {
            if el.name == name {
                return Some(el);
            }
            if let Some(found) = el.find(name) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        for el in self.elements_mut() {
            if el.name == name {
                return Some(el);
            }
            if let Some(found) = el.find_mut(name) {
                return Some(found);
            }
        }
        None
    }

    /// Visits every descendant element (not `self`) in document order.
    pub fn for_each_element_mut(&mut self, f: &mut dyn FnMut(&mut XmlElement)) {
        for el in self.elements_mut() {
            f(el);
            el.for_each_element_mut(f);
        }
    }

    /// Concatenated text content of the direct children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for c in &self.children {
            if let XmlNode::Text(t) = c {
                out.push_str(t);
            }
        }
        out
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children.clear();
        let text = text.into();
        if !text.is_empty() {
            self.children.push(XmlNode::Text(text));
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|(k, _)| k != name);
        before != self.attributes.len()
    }

    pub fn push_element(&mut self, el: XmlElement) -> &mut XmlElement {
        self.children.push(XmlNode::Element(el));
        match self.children.last_mut() {
            Some(XmlNode::Element(el)) => el,
            _ => unreachable!(),
        }
    }

    /// Existing child named `name`, or a new empty one appended at the end.
    pub fn ensure_child(&mut self, name: &str) -> &mut XmlElement {
        match self.children.iter().position(|c| matches!(c, XmlNode::Element(el) if el.name == name)) {
            Some(i) => match &mut self.children[i] {
                XmlNode::Element(el) => el,
                _ => unreachable!(),
            },
            None => self.push_element(XmlElement::new(name)),
        }
    }

    /// First descendant named `name`, or a new empty child of `self` when there is none.
    pub fn ensure_descendant(&mut self, name: &str) -> &mut XmlElement {
        if self.find(name).is_none() {
            return self.push_element(XmlElement::new(name));
        }
        match self.find_mut(name) {
            Some(el) => el,
            None => unreachable!(),
        }
    }

    pub fn clear_children(&mut self) {
        self.children.clear();
    }
}

impl XmlDocument {
    /// Serializes with whitespace-only text dropped and two-space indentation.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::with_capacity(4096);
        out.push_str(DECLARATION);
        out.push('\n');
        write_element(&mut out, &self.root, 0);
        out
    }
}

fn is_blank(node: &XmlNode) -> bool {
    matches!(node, XmlNode::Text(t) if t.trim().is_empty())
}

fn write_element(out: &mut String, el: &XmlElement, depth: usize) {
    let pad = INDENT.repeat(depth);
    out.push_str(&pad);
    out.push('<');
    out.push_str(&el.name);
    for (k, v) in &el.attributes {
        let _ = write!(out, " {}=\"{}\"", k, escape(v, true));
    }
    let children: Vec<&XmlNode> = el.children.iter().filter(|c| !is_blank(c)).collect();
    if children.is_empty() {
        out.push_str("/>\n");
        return;
    }
    if children.iter().all(|c| matches!(c, XmlNode::Text(_))) {
        out.push('>');
        for c in &children {
            if let XmlNode::Text(t) = c {
                out.push_str(&escape(t, false));
            }
        }
        let _ = writeln!(out, "</{}>", el.name);
        return;
    }
    out.push_str(">\n");
    for c in children {
        match c {
            XmlNode::Element(child) => write_element(out, child, depth + 1),
            XmlNode::Text(t) => {
                let _ = writeln!(out, "{}{}{}", pad, INDENT, escape(t.trim(), false));
            }
            XmlNode::Comment(t) => {
                let _ = writeln!(out, "{}{}<!--{}-->", pad, INDENT, t);
            }
        }
    }
    let _ = writeln!(out, "{}</{}>", pad, el.name);
}

fn escape(s: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\n' if attribute => out.push_str("&#10;"),
            '\r' if attribute => out.push_str("&#13;"),
            '\t' if attribute => out.push_str("&#9;"),
            c => out.push(c),
        }
    }
    out
}
