//! Typed builder for graph pattern queries.
//!
//! A [`Match`] renders to the controller's single-line query syntax, e.g.
//!
//! ```text
//! match(node('system', name='sw', label='leaf1').out('interface_map').node('interface_map', name='im'))
//! ```
//!
//! Nothing here validates a pattern against the remote schema; node and edge
//! kinds come from closed enums so spelling mistakes fail at compile time.

use std::fmt;

use super::schema::{EdgeKind, NodeKind};

/// Attribute filter value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Bool(bool),
    IsIn(Vec<String>),
    Ne(String),
    NotNone,
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::Str(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::Str(s)
    }
}

impl From<&String> for Literal {
    fn from(s: &String) -> Self {
        Literal::Str(s.clone())
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Int(v)
    }
}

impl From<u16> for Literal {
    fn from(v: u16) -> Self {
        Literal::Int(v as i64)
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Bool(v)
    }
}

/// Build an `is_in([...])` set filter
pub fn is_in<I, S>(values: I) -> Literal
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Literal::IsIn(values.into_iter().map(Into::into).collect())
}

pub fn ne(value: impl Into<String>) -> Literal {
    Literal::Ne(value.into())
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => f.write_str(&quote(s)),
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Bool(true) => f.write_str("True"),
            Literal::Bool(false) => f.write_str("False"),
            Literal::IsIn(values) => {
                let items: Vec<String> = values.iter().map(|v| quote(v)).collect();
                write!(f, "is_in([{}])", items.join(", "))
            }
            Literal::Ne(v) => write!(f, "ne({})", quote(v)),
            Literal::NotNone => f.write_str("not_none()"),
        }
    }
}

/// One node matcher: optional type, optional binding name, attribute filters
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMatcher {
    kind: Option<NodeKind>,
    name: Option<String>,
    attrs: Vec<(String, Literal)>,
}

/// Matcher for a node of `kind`
pub fn node(kind: NodeKind) -> NodeMatcher {
    NodeMatcher {
        kind: Some(kind),
        name: None,
        attrs: Vec::new(),
    }
}

/// Back-reference to a node already bound under `name`
pub fn named(name: impl Into<String>) -> NodeMatcher {
    NodeMatcher {
        kind: None,
        name: Some(name.into()),
        attrs: Vec::new(),
    }
}

impl NodeMatcher {
    /// Bind the matched node to `name` in every result row
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<Literal>) -> Self {
        self.attrs.push((key.into(), value.into()));
        self
    }

    pub fn binding(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Display for NodeMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut args: Vec<String> = Vec::new();
        if let Some(kind) = self.kind {
            args.push(quote(kind.as_str()));
        }
        if let Some(name) = &self.name {
            args.push(format!("name={}", quote(name)));
        }
        for (key, value) in &self.attrs {
            args.push(format!("{}={}", key, value));
        }
        write!(f, "node({})", args.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Direction {
    Out,
    In,
}

#[derive(Debug, Clone, PartialEq)]
struct Hop {
    direction: Direction,
    edge: Option<EdgeKind>,
    target: NodeMatcher,
}

/// Chain of node matchers joined by directed edges
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    start: NodeMatcher,
    hops: Vec<Hop>,
    pending: Option<(Direction, Option<EdgeKind>)>,
}

impl Path {
    pub fn start(start: NodeMatcher) -> Self {
        Self {
            start,
            hops: Vec::new(),
            pending: None,
        }
    }

    /// Follow an outgoing edge; must be followed by [`Path::node`]
    pub fn out(mut self, edge: EdgeKind) -> Self {
        self.pending = Some((Direction::Out, Some(edge)));
        self
    }

    /// Follow an incoming edge; must be followed by [`Path::node`]
    pub fn in_(mut self, edge: EdgeKind) -> Self {
        self.pending = Some((Direction::In, Some(edge)));
        self
    }

    /// Follow an incoming edge of any type
    pub fn in_any(mut self) -> Self {
        self.pending = Some((Direction::In, None));
        self
    }

    /// Follow an outgoing edge of any type
    pub fn out_any(mut self) -> Self {
        self.pending = Some((Direction::Out, None));
        self
    }

    /// Target of the preceding edge step. Without a preceding step the edge
    /// defaults to an untyped outgoing one.
    pub fn node(mut self, target: NodeMatcher) -> Self {
        let (direction, edge) = self.pending.take().unwrap_or((Direction::Out, None));
        self.hops.push(Hop {
            direction,
            edge,
            target,
        });
        self
    }

    fn matchers(&self) -> impl Iterator<Item = &NodeMatcher> {
        std::iter::once(&self.start).chain(self.hops.iter().map(|h| &h.target))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start)?;
        for hop in &self.hops {
            let verb = match hop.direction {
                Direction::Out => "out",
                Direction::In => "in_",
            };
            match hop.edge {
                Some(edge) => write!(f, ".{}({})", verb, quote(edge.as_str()))?,
                None => write!(f, ".{}()", verb)?,
            }
            write!(f, ".{}", hop.target)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Required(Path),
    Optional(Path),
}

/// A complete `match(...)` query
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Match {
    clauses: Vec<Clause>,
    predicate: Option<String>,
    distinct: Option<Vec<String>>,
}

impl Match {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: Path) -> Self {
        self.clauses.push(Clause::Required(path));
        self
    }

    /// Sub-pattern whose bindings are `None` in rows where it does not match
    pub fn optional(mut self, path: Path) -> Self {
        self.clauses.push(Clause::Optional(path));
        self
    }

    /// Append `.where(<predicate>)`, e.g. `lambda a, b: a.id != b.id`
    pub fn where_(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn distinct<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.distinct = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Every binding name used in the pattern, in first-seen order
    pub fn bindings(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for clause in &self.clauses {
            let path = match clause {
                Clause::Required(p) | Clause::Optional(p) => p,
            };
            for name in path.matchers().filter_map(NodeMatcher::binding) {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .clauses
            .iter()
            .map(|c| match c {
                Clause::Required(p) => p.to_string(),
                Clause::Optional(p) => format!("optional({})", p),
            })
            .collect();
        write!(f, "match({})", parts.join(", "))?;
        if let Some(names) = &self.distinct {
            let quoted: Vec<String> = names.iter().map(|n| quote(n)).collect();
            write!(f, ".distinct([{}])", quoted.join(", "))?;
        }
        if let Some(predicate) = &self.predicate {
            write!(f, ".where({})", predicate)?;
        }
        Ok(())
    }
}
