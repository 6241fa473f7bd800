//! RFC 6570 URL templates as published by the gateway.
//!
//! The gateway uses forms like `/users{/id}` and `/orders/{id}/items`.
//! All eight expression operators are understood; explode (`*`) and prefix
//! (`:n`) modifiers are accepted and ignored since parameters are scalars
//! by the time they reach a template.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{RemoteError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Simple,
    Reserved,
    Fragment,
    Label,
    Path,
    PathParam,
    Query,
    QueryContinuation,
}

impl Operator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Reserved),
            '#' => Some(Self::Fragment),
            '.' => Some(Self::Label),
            '/' => Some(Self::Path),
            ';' => Some(Self::PathParam),
            '?' => Some(Self::Query),
            '&' => Some(Self::QueryContinuation),
            _ => None,
        }
    }

    fn first(self) -> &'static str {
        match self {
            Self::Simple | Self::Reserved => "",
            Self::Fragment => "#",
            Self::Label => ".",
            Self::Path => "/",
            Self::PathParam => ";",
            Self::Query => "?",
            Self::QueryContinuation => "&",
        }
    }

    fn separator(self) -> &'static str {
        match self {
            Self::Simple | Self::Reserved | Self::Fragment => ",",
            Self::Label => ".",
            Self::Path => "/",
            Self::PathParam => ";",
            Self::Query | Self::QueryContinuation => "&",
        }
    }

    fn named(self) -> bool {
        matches!(self, Self::PathParam | Self::Query | Self::QueryContinuation)
    }

    fn allow_reserved(self) -> bool {
        matches!(self, Self::Reserved | Self::Fragment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Expression { op: Operator, vars: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    source: String,
    parts: Vec<Part>,
}

impl UriTemplate {
    pub fn parse(source: &str) -> Result<Self> {
        let invalid = |reason: &str| RemoteError::InvalidTemplate {
            template: source.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = Vec::new();
        let mut rest = source;

        while let Some(open) = rest.find('{') {
            if open > 0 {
                parts.push(Part::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| invalid("unclosed expression"))?;
            let body = &after[..close];
            if body.contains('{') {
                return Err(invalid("nested expression"));
            }

            let mut chars = body.chars();
            let (op, list) = match chars.next().and_then(Operator::from_char) {
                Some(op) => (op, chars.as_str()),
                None => (Operator::Simple, body),
            };

            let vars = list
                .split(',')
                .map(|spec| {
                    spec.trim_end_matches('*')
                        .split(':')
                        .next()
                        .unwrap_or_default()
                        .to_string()
                })
                .collect::<Vec<_>>();
            if vars.iter().any(String::is_empty) {
                return Err(invalid("empty variable name"));
            }

            parts.push(Part::Expression { op, vars });
            rest = &after[close + 1..];
        }

        if rest.contains('}') {
            return Err(invalid("unmatched closing brace"));
        }
        if !rest.is_empty() {
            parts.push(Part::Literal(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Every placeholder name in the template.
    pub fn variables(&self) -> BTreeSet<&str> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Expression { vars, .. } => Some(vars.iter().map(String::as_str)),
                Part::Literal(_) => None,
            })
            .flatten()
            .collect()
    }

    /// Expand the template. Variables for which `lookup` returns `None` are
    /// undefined and drop out of the result along with their operator.
    pub fn expand<F>(&self, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut out = String::with_capacity(self.source.len());

        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Expression { op, vars } => {
                    let mut first = true;
                    for name in vars {
                        let Some(value) = lookup(name) else {
                            continue;
                        };
                        out.push_str(if first { op.first() } else { op.separator() });
                        first = false;

                        if op.named() {
                            out.push_str(name);
                            if value.is_empty() {
                                if *op != Operator::PathParam {
                                    out.push('=');
                                }
                                continue;
                            }
                            out.push('=');
                        }
                        out.push_str(&encode(&value, op.allow_reserved()));
                    }
                }
            }
        }

        out
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

const RESERVED: &str = ":/?#[]@!$&'()*+,;=";

fn encode(value: &str, allow_reserved: bool) -> String {
    if !allow_reserved {
        return urlencoding::encode(value).into_owned();
    }

    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if RESERVED.contains(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            out.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        }
    }
    out
}
