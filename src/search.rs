//! `$search` parser: bare terms, quoted phrases, and the case-sensitive
//! `AND`/`OR`/`NOT` operators with `NOT` binding tightest.

use once_cell::sync::Lazy;

use crate::ast::ParseNode;
use crate::error::ODataError;
use crate::parser::{self, Assoc, OperatorTable};
use crate::token::{Token, TokenKind};
use crate::tokenizer::{TokenRule, Tokenizer};
use crate::ComplianceConfig;

static SEARCH_TOKENIZER: Lazy<Tokenizer> = Lazy::new(|| {
    Tokenizer::new(vec![
        TokenRule::new(r"^[ \t]+", TokenKind::Whitespace).ignore(),
        TokenRule::new(r"^\(", TokenKind::OpenParen),
        TokenRule::new(r"^\)", TokenKind::CloseParen),
        // Search operators are case-sensitive; `and` is a search term.
        TokenRule::new(r"^(AND|OR|NOT)", TokenKind::SearchOp).ahead(term_boundary),
        TokenRule::new(r#"^"[^"]*""#, TokenKind::SearchLiteral),
        TokenRule::new(r#"^[^ \t()"]+"#, TokenKind::SearchLiteral),
    ])
});

fn term_boundary(rest: &str) -> bool {
    rest.is_empty() || rest.starts_with([' ', '\t', '(', ')'])
}

static SEARCH_OPERATORS: Lazy<OperatorTable> = Lazy::new(|| {
    let mut t = OperatorTable::new();
    t.define("OR", 1, 2, Assoc::Left);
    t.define("AND", 2, 2, Assoc::Left);
    t.define("NOT", 3, 1, Assoc::Right);
    t
});

/// Tokenizes a `$search` value without parsing it; phrases keep their
/// quotes in the token value.
pub fn tokenize_search(value: &str) -> Result<Vec<Token>, ODataError> {
    SEARCH_TOKENIZER.tokenize(value)
}

pub fn parse_search(value: &str) -> Result<ParseNode, ODataError> {
    let tokens = tokenize_search(value)?;
    let postfix = parser::infix_to_postfix(&tokens, &SEARCH_OPERATORS, ComplianceConfig::STRICT)?;
    parser::postfix_to_tree(postfix, &SEARCH_OPERATORS)
}
