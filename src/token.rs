use std::fmt;

use serde::Serialize;

/// Value carried by every synthetic list marker token.
pub const LIST_EXPR: &str = "list";

/// The closed set of token kinds produced by the tokenizers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // Structural.
    OpenParen,
    CloseParen,
    Comma,
    /// A lambda-argument separator. The raw `:` is rewritten to `,` at
    /// tokenization so the converter treats it as an argument separator,
    /// but the kind is preserved for diagnostics.
    Colon,
    Whitespace,
    /// Synthetic: element count emitted just before a `ListExpr`.
    ArgCount,
    /// Synthetic: marks a parenthesized comma-separated list.
    ListExpr,

    // Operators.
    /// `eq` `ne` `gt` `ge` `lt` `le` `and` `or` `not` `in` `has`
    Logical,
    /// `add` `sub` `mul` `div` `divby` `mod`
    Arithmetic,
    /// `=` inside key predicates
    Assignment,
    /// `/` before a property segment
    Navigation,
    /// `/` before `any(` or `all(`
    LambdaNavigation,
    /// `any` `all`
    Lambda,

    // Literals.
    Literal,
    String,
    Integer,
    Float,
    Boolean,
    Null,
    Date,
    Time,
    DateTime,
    Duration,
    Guid,
    GeographyPolygon,
    GeometryPolygon,
    /// `$it`
    It,
    Func,

    // `$search` sub-language.
    SearchLiteral,
    SearchOp,
}

/// Semantic classification attached to a token after tokenization.
/// The tokenizer always leaves this at `None`; later passes refine it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SemanticType {
    #[default]
    None,
    /// The literal applies a parenthesized key predicate,
    /// e.g. `Products` in `Products(sku='abc123')/Value`.
    KeyPredicate,
}

/// A single lexeme with its classification and byte position in the
/// original option value. The value may be rewritten during
/// tokenization (durations are stripped of their `duration'...'`
/// wrapping, doubled quotes inside strings collapse to one).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub value: String,
    pub kind: TokenKind,
    pub position: usize,
    pub semantic: SemanticType,
}

impl Token {
    pub fn new(value: impl Into<String>, kind: TokenKind, position: usize) -> Self {
        Token {
            value: value.into(),
            kind,
            position,
            semantic: SemanticType::None,
        }
    }

    /// Synthetic token carrying the element count of the upcoming list.
    pub fn arg_count(count: usize, position: usize) -> Self {
        Token::new(count.to_string(), TokenKind::ArgCount, position)
    }

    /// Synthetic list marker.
    pub fn list_expr(position: usize) -> Self {
        Token::new(LIST_EXPR, TokenKind::ListExpr, position)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{:?}]", self.value, self.kind)
    }
}
