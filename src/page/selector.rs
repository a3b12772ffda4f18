//! Minimal selector engine for resolving catalog entries against the
//! page.
//!
//! Supports the grammar site catalogs actually use: tag names, `#id`,
//! `.class`, `[attr]`, `[attr=value]`, `[attr*=value]` and the
//! descendant combinator. Anything else (child/sibling combinators,
//! pseudo-classes, selector lists) is rejected as an invalid selector so
//! the binder can log it and move on to the next candidate.

use crate::error::Error;

use super::dom::{Document, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Contains,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrFilter {
    name: String,
    op: AttrOp,
    value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrFilter>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }
}

/// A parsed selector: a chain of compounds joined by the descendant
/// combinator, matched right to left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    compounds: Vec<Compound>,
}

fn invalid(selector: &str, reason: impl Into<String>) -> Error {
    Error::InvalidSelector {
        selector: selector.to_string(),
        reason: reason.into(),
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

impl Selector {
    /// Parse a selector string
    pub fn parse(input: &str) -> Result<Selector, Error> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid(input, "empty selector"));
        }
        for bad in [',', '>', '+', '~', ':'] {
            // reject combinators/pseudos up front, including inside
            // attribute values where they would be legal CSS but are not
            // worth supporting here
            if trimmed.contains(bad) {
                return Err(invalid(input, format!("unsupported `{}`", bad)));
            }
        }

        let mut compounds = Vec::new();
        for part in split_compounds(trimmed) {
            compounds.push(parse_compound(input, &part)?);
        }
        if compounds.is_empty() {
            return Err(invalid(input, "empty selector"));
        }
        Ok(Selector {
            source: trimmed.to_string(),
            compounds,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// True if `node` matches the full selector chain
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let (last, rest) = self
            .compounds
            .split_last()
            .expect("parsed selector has at least one compound");
        if !compound_matches(doc, node, last) {
            return false;
        }
        let mut current = doc.parent(node);
        for compound in rest.iter().rev() {
            loop {
                match current {
                    Some(ancestor) => {
                        current = doc.parent(ancestor);
                        if compound_matches(doc, ancestor, compound) {
                            break;
                        }
                    }
                    None => return false,
                }
            }
        }
        true
    }

    /// First matching descendant of `root` in document order
    pub fn query(&self, doc: &Document, root: NodeId) -> Option<NodeId> {
        doc.descendants(root)
            .into_iter()
            .find(|node| doc.is_element(*node) && self.matches(doc, *node))
    }

    /// All matching descendants of `root` in document order
    pub fn query_all(&self, doc: &Document, root: NodeId) -> Vec<NodeId> {
        doc.descendants(root)
            .into_iter()
            .filter(|node| doc.is_element(*node) && self.matches(doc, *node))
            .collect()
    }
}

/// Split on whitespace outside brackets and quotes
fn split_compounds(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_brackets = false;
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => {
                    current.push(c);
                    quote = Some(c);
                }
                '[' => {
                    current.push(c);
                    in_brackets = true;
                }
                ']' => {
                    current.push(c);
                    in_brackets = false;
                }
                c if c.is_whitespace() && !in_brackets => {
                    if !current.is_empty() {
                        parts.push(std::mem::take(&mut current));
                    }
                }
                _ => current.push(c),
            },
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

fn parse_compound(source: &str, part: &str) -> Result<Compound, Error> {
    let mut compound = Compound::default();
    let chars: Vec<char> = part.chars().collect();
    let mut i = 0;

    // optional leading tag (`*` matches any element)
    if i < chars.len() && (chars[i].is_alphabetic() || chars[i] == '*') {
        if chars[i] == '*' {
            compound.tag = Some("*".to_string());
            i += 1;
        } else {
            let start = i;
            while i < chars.len() && is_ident_char(chars[i]) {
                i += 1;
            }
            compound.tag = Some(chars[start..i].iter().collect::<String>().to_lowercase());
        }
    }

    while i < chars.len() {
        match chars[i] {
            '#' | '.' => {
                let marker = chars[i];
                i += 1;
                let start = i;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                if start == i {
                    return Err(invalid(source, format!("empty name after `{}`", marker)));
                }
                let name: String = chars[start..i].iter().collect();
                if marker == '#' {
                    compound.id = Some(name);
                } else {
                    compound.classes.push(name);
                }
            }
            '[' => {
                let close = chars[i..]
                    .iter()
                    .position(|c| *c == ']')
                    .ok_or_else(|| invalid(source, "unterminated `[`"))?;
                let body: String = chars[i + 1..i + close].iter().collect();
                compound.attrs.push(parse_attr_filter(source, &body)?);
                i += close + 1;
            }
            c => return Err(invalid(source, format!("unexpected `{}`", c))),
        }
    }

    if compound.is_empty() {
        return Err(invalid(source, "empty compound"));
    }
    Ok(compound)
}

fn parse_attr_filter(source: &str, body: &str) -> Result<AttrFilter, Error> {
    let body = body.trim();
    if body.is_empty() {
        return Err(invalid(source, "empty attribute filter"));
    }
    let (name_part, op, value_part) = if let Some(idx) = body.find("*=") {
        (&body[..idx], AttrOp::Contains, Some(&body[idx + 2..]))
    } else if let Some(idx) = body.find('=') {
        (&body[..idx], AttrOp::Equals, Some(&body[idx + 1..]))
    } else {
        (body, AttrOp::Exists, None)
    };

    let name = name_part.trim();
    if name.is_empty() || !name.chars().all(is_ident_char) {
        return Err(invalid(source, format!("bad attribute name `{}`", name)));
    }

    let value = match value_part {
        None => String::new(),
        Some(raw) => {
            let raw = raw.trim();
            if (raw.starts_with('"') && raw.ends_with('"') && raw.len() >= 2)
                || (raw.starts_with('\'') && raw.ends_with('\'') && raw.len() >= 2)
            {
                raw[1..raw.len() - 1].to_string()
            } else if raw.contains('"') || raw.contains('\'') {
                return Err(invalid(source, "mismatched quotes in attribute value"));
            } else {
                raw.to_string()
            }
        }
    };

    Ok(AttrFilter {
        name: name.to_string(),
        op,
        value,
    })
}

fn compound_matches(doc: &Document, node: NodeId, compound: &Compound) -> bool {
    if !doc.is_element(node) {
        return false;
    }
    if let Some(tag) = &compound.tag {
        if tag != "*" && doc.tag(node).as_deref() != Some(tag.as_str()) {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if doc.attribute(node, "id").as_deref() != Some(id.as_str()) {
            return false;
        }
    }
    if !compound.classes.is_empty() {
        let class_attr = doc.attribute(node, "class").unwrap_or_default();
        let classes: Vec<&str> = class_attr.split_whitespace().collect();
        if !compound
            .classes
            .iter()
            .all(|c| classes.contains(&c.as_str()))
        {
            return false;
        }
    }
    for filter in &compound.attrs {
        let actual = doc.attribute(node, &filter.name);
        let ok = match filter.op {
            AttrOp::Exists => actual.is_some(),
            AttrOp::Equals => actual.as_deref() == Some(filter.value.as_str()),
            AttrOp::Contains => actual
                .map(|v| v.contains(filter.value.as_str()))
                .unwrap_or(false),
        };
        if !ok {
            return false;
        }
    }
    true
}
