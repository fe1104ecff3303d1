//! A small CSS selector engine.
//!
//! Supported: selector lists, type and universal selectors, `#id`, `.class`, the attribute
//! selectors (`[a]`, `[a=v]`, `[a~=v]`, `[a|=v]`, `[a^=v]`, `[a$=v]`, `[a*=v]`) and the
//! descendant and child combinators. Matching runs right to left with backtracking over the
//! descendant combinator.

use crate::error::{DomError, Result};
use crate::node::{Element, Node};

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    complex: Vec<ComplexSelector>,
}

/// Compounds joined by combinators, stored right to left.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ComplexSelector {
    subject: Compound,
    ancestors: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    parts: Vec<Simple>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Simple {
    Type(String),
    Universal,
    Id(String),
    Class(String),
    Attribute {
        name: String,
        matcher: Option<(AttrOp, String)>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self> {
        let complex = Parser::new(source).parse_list()?;
        Ok(Self {
            source: source.to_string(),
            complex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The attribute names whose values can change the result of [`Selector::matches`].
    ///
    /// `#id` reads `id` and `.class` reads `class`.
    pub fn attribute_dependencies(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if !out.iter().any(|n| n == name) {
                out.push(name.to_string());
            }
        };
        for complex in &self.complex {
            let compounds =
                std::iter::once(&complex.subject).chain(complex.ancestors.iter().map(|(_, c)| c));
            for compound in compounds {
                for part in &compound.parts {
                    match part {
                        Simple::Id(_) => push("id"),
                        Simple::Class(_) => push("class"),
                        Simple::Attribute { name, .. } => push(name),
                        Simple::Type(_) | Simple::Universal => {}
                    }
                }
            }
        }
        out
    }

    pub fn matches(&self, element: Element) -> bool {
        self.complex.iter().any(|c| matches_selector(c, element))
    }

    pub fn closest(&self, element: Element) -> Option<Element> {
        let mut current = Some(element);
        while let Some(element) = current {
            if self.matches(element) {
                return Some(element);
            }
            current = element.parent_element();
        }
        None
    }

    pub fn query_all(&self, root: Node) -> Vec<Element> {
        descendant_elements(root)
            .into_iter()
            .filter(|element| self.matches(*element))
            .collect()
    }

    pub fn query_first(&self, root: Node) -> Option<Element> {
        descendant_elements(root)
            .into_iter()
            .find(|element| self.matches(*element))
    }
}

fn descendant_elements(root: Node) -> Vec<Element> {
    root.descendant_elements()
}

fn matches_selector(selector: &ComplexSelector, element: Element) -> bool {
    matches_compound(&selector.subject, element) && matches_ancestors(&selector.ancestors, element)
}

fn matches_ancestors(rest: &[(Combinator, Compound)], element: Element) -> bool {
    let Some(((combinator, compound), rest)) = rest.split_first() else {
        return true;
    };
    match combinator {
        Combinator::Child => element
            .parent_element()
            .is_some_and(|parent| matches_compound(compound, parent) && matches_ancestors(rest, parent)),
        Combinator::Descendant => {
            let mut current = element.parent_element();
            while let Some(ancestor) = current {
                if matches_compound(compound, ancestor) && matches_ancestors(rest, ancestor) {
                    return true;
                }
                current = ancestor.parent_element();
            }
            false
        }
    }
}

fn matches_compound(compound: &Compound, element: Element) -> bool {
    compound.parts.iter().all(|part| matches_simple(part, element))
}

fn matches_simple(simple: &Simple, element: Element) -> bool {
    match simple {
        Simple::Universal => true,
        Simple::Type(tag) => element.local_name() == *tag,
        Simple::Id(id) => element.get_attribute("id").as_deref() == Some(id.as_str()),
        Simple::Class(class) => element
            .get_attribute("class")
            .is_some_and(|value| value.split_ascii_whitespace().any(|c| c == class)),
        Simple::Attribute { name, matcher } => {
            let Some(value) = element.get_attribute(name) else {
                return false;
            };
            let Some((op, expected)) = matcher else {
                return true;
            };
            let expected = expected.as_str();
            match op {
                AttrOp::Equals => value == expected,
                AttrOp::Includes => value.split_ascii_whitespace().any(|t| t == expected),
                AttrOp::DashMatch => {
                    value == expected
                        || value
                            .strip_prefix(expected)
                            .is_some_and(|rest| rest.starts_with('-'))
                }
                AttrOp::Prefix => !expected.is_empty() && value.starts_with(expected),
                AttrOp::Suffix => !expected.is_empty() && value.ends_with(expected),
                AttrOp::Substring => !expected.is_empty() && value.contains(expected),
            }
        }
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> DomError {
        DomError::InvalidSelector {
            selector: self.source.to_string(),
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_list(&mut self) -> Result<Vec<ComplexSelector>> {
        let mut list = vec![self.parse_complex()?];
        while self.peek() == Some(',') {
            self.pos += 1;
            list.push(self.parse_complex()?);
        }
        if let Some(c) = self.peek() {
            return Err(self.error(format!("unexpected '{c}'")));
        }
        Ok(list)
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector> {
        self.skip_whitespace();
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_whitespace = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(_) if had_whitespace => Combinator::Descendant,
                Some(c) => return Err(self.error(format!("unexpected '{c}'"))),
            };
            combinators.push(combinator);
            compounds.push(self.parse_compound()?);
        }

        let subject = compounds.pop().unwrap_or_default();
        let ancestors = combinators.into_iter().rev().zip(compounds.into_iter().rev()).collect();
        Ok(ComplexSelector { subject, ancestors })
    }

    fn parse_compound(&mut self) -> Result<Compound> {
        let mut parts = Vec::new();
        match self.peek() {
            Some('*') => {
                self.pos += 1;
                parts.push(Simple::Universal);
            }
            Some(c) if is_ident_start(c) => {
                parts.push(Simple::Type(self.parse_ident()?.to_ascii_lowercase()));
            }
            _ => {}
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    parts.push(Simple::Id(self.parse_ident()?));
                }
                Some('.') => {
                    self.pos += 1;
                    parts.push(Simple::Class(self.parse_ident()?));
                }
                Some('[') => {
                    self.pos += 1;
                    parts.push(self.parse_attribute()?);
                }
                Some(':') => return Err(self.error("pseudo-classes are not supported")),
                _ => break,
            }
        }
        if parts.is_empty() {
            return Err(match self.peek() {
                Some(c) => self.error(format!("expected a selector, found '{c}'")),
                None => self.error("expected a selector"),
            });
        }
        Ok(Compound { parts })
    }

    fn parse_attribute(&mut self) -> Result<Simple> {
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        let op = match self.bump() {
            Some(']') => return Ok(Simple::Attribute { name, matcher: None }),
            Some('=') => AttrOp::Equals,
            Some(c @ ('~' | '|' | '^' | '$' | '*')) => {
                if self.bump() != Some('=') {
                    return Err(self.error(format!("expected '=' after '{c}'")));
                }
                match c {
                    '~' => AttrOp::Includes,
                    '|' => AttrOp::DashMatch,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    _ => AttrOp::Substring,
                }
            }
            Some(c) => return Err(self.error(format!("unexpected '{c}' in attribute selector"))),
            None => return Err(self.error("unterminated attribute selector")),
        };
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some(c) if c == quote => break,
                        Some('\\') => {
                            if let Some(c) = self.bump() {
                                value.push(c);
                            }
                        }
                        Some(c) => value.push(c),
                        None => return Err(self.error("unterminated string")),
                    }
                }
                value
            }
            _ => self.parse_ident()?,
        };
        self.skip_whitespace();
        if self.bump() != Some(']') {
            return Err(self.error("expected ']'"));
        }
        Ok(Simple::Attribute {
            name,
            matcher: Some((op, value)),
        })
    }

    fn parse_ident(&mut self) -> Result<String> {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.pos += 1;
                match self.bump() {
                    Some(escaped) => ident.push(escaped),
                    None => return Err(self.error("trailing escape")),
                }
            } else if is_ident_char(c) {
                ident.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        if ident.is_empty() {
            return Err(match self.peek() {
                Some(c) => self.error(format!("expected an identifier, found '{c}'")),
                None => self.error("expected an identifier"),
            });
        }
        Ok(ident)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '-' || c == '\\' || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || !c.is_ascii()
}
