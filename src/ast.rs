//! Parse trees and the records a parsed request is assembled from.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::token::{Token, TokenKind};
use crate::util;

/// A node in a parsed expression tree: one token plus its ordered
/// operand children. Trees are finite and acyclic; a synthetic
/// `ListExpr` node stands for any parenthesized comma-separated list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseNode {
    pub token: Token,
    pub children: Vec<ParseNode>,
}

impl ParseNode {
    pub fn new(token: Token) -> Self {
        ParseNode {
            token,
            children: Vec::new(),
        }
    }

    /// True for nodes that can evaluate to a boolean: logical
    /// operators, lambda applications, boolean literals, and function
    /// calls. Function return types are not resolved here; whether
    /// `tolower(Name)` is really boolean is for the model layer to
    /// decide.
    pub fn is_boolean_expression(&self) -> bool {
        matches!(
            self.token.kind,
            TokenKind::Logical
                | TokenKind::Lambda
                | TokenKind::LambdaNavigation
                | TokenKind::Boolean
                | TokenKind::Func
        )
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.token.kind {
            TokenKind::Integer => self.token.value.parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.token.kind {
            TokenKind::Float | TokenKind::Integer => self.token.value.parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.token.kind {
            TokenKind::Boolean => self.token.value.parse().ok(),
            _ => None,
        }
    }

    pub fn as_guid(&self) -> Option<Uuid> {
        match self.token.kind {
            TokenKind::Guid => Uuid::parse_str(&self.token.value).ok(),
            _ => None,
        }
    }

    /// The body of a string literal without its surrounding quotes.
    pub fn string_content(&self) -> Option<&str> {
        match self.token.kind {
            TokenKind::String => Some(util::strip_quotes(&self.token.value)),
            _ => None,
        }
    }

    fn fmt_at(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{}", "", self.token.value, indent = depth * 2)?;
        for child in &self.children {
            child.fmt_at(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ParseNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_at(f, 0)
    }
}

/// Sort direction of an `$orderby` item. `asc` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum OrderByDirection {
    #[default]
    Ascending,
    Descending,
}

impl OrderByDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderByDirection::Ascending => "asc",
            OrderByDirection::Descending => "desc",
        }
    }
}

impl fmt::Display for OrderByDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `$orderby` item: the field reference (verbatim, including key
/// predicates and slashes) and the direction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderByItem {
    pub field: Token,
    pub direction: OrderByDirection,
}

/// One `$compute` item: `<expression> as <field>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputeItem {
    pub field: String,
    pub expression: ParseNode,
}

/// One `$select` item as its slash-separated segments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectItem {
    pub segments: Vec<Token>,
}

/// One `$expand` item: a navigation path plus its nested options.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ExpandItem {
    pub path: Vec<Token>,
    pub filter: Option<ParseNode>,
    pub select: Option<Vec<SelectItem>>,
    pub expand: Option<Vec<ExpandItem>>,
    pub order_by: Option<Vec<OrderByItem>>,
    pub compute: Option<Vec<ComputeItem>>,
    pub search: Option<ParseNode>,
    pub levels: Option<u64>,
    pub top: Option<u64>,
    pub skip: Option<u64>,
    pub count: Option<bool>,
}

/// Every system query option parsed from one request, plus the raw
/// values of custom (non-system) options.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Query {
    pub filter: Option<ParseNode>,
    pub order_by: Option<Vec<OrderByItem>>,
    pub select: Option<Vec<SelectItem>>,
    pub expand: Option<Vec<ExpandItem>>,
    pub compute: Option<Vec<ComputeItem>>,
    pub search: Option<ParseNode>,
    pub top: Option<u64>,
    pub skip: Option<u64>,
    pub count: Option<bool>,
    pub custom: HashMap<String, String>,
}

/// Identifier attached to a path segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SegmentIdentifier {
    /// A single unkeyed value: `Employees(1)` carries `"1"`.
    Value(String),
    /// Named keys: `Products(sku='abc',vendor='x')`.
    Keys(Vec<KeyValue>),
}

impl SegmentIdentifier {
    /// The unkeyed value, when there is one.
    pub fn as_value(&self) -> Option<&str> {
        match self {
            SegmentIdentifier::Value(v) => Some(v),
            SegmentIdentifier::Keys(_) => None,
        }
    }
}

/// One `key=value` pair of a key predicate; the value is an arbitrary
/// expression (`Products(sku=concat('a','b'))`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyValue {
    pub key: String,
    pub value: ParseNode,
}

/// A resource-path segment. Segments chain through `next`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub name: String,
    pub identifier: Option<SegmentIdentifier>,
    pub next: Option<Box<Segment>>,
}

/// A fully parsed request: the resource path and its query options.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub first_segment: Option<Segment>,
    pub query: Query,
}
