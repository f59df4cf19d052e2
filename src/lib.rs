//! Parser for the query portion of OData v4.01 request URLs.
//!
//! The crate turns the raw path and query string of an OData request
//! into validated syntax trees: `$filter`, `$orderby`, `$compute`,
//! `$expand`, `$select` and `$search` each get their own parser layered
//! over a shared core of
//!
//! 1. a table-driven tokenizer over the OData lexical vocabulary,
//! 2. a shunting-yard infix-to-postfix converter that understands
//!    variadic functions, lambda operators, key predicates and list
//!    expressions, and
//! 3. a postfix-to-tree builder enforcing function arities and the
//!    list-unwrapping rules.
//!
//! ```
//! use odata_parser::parse_request;
//!
//! let request = parse_request(
//!     "Products(1)",
//!     "$filter=Name eq 'Milk' and Price lt 2.55&$orderby=Name desc",
//! )
//! .unwrap();
//! let filter = request.query.filter.unwrap();
//! assert_eq!(filter.token.value, "and");
//! ```
//!
//! Parsing is synchronous and stateless per call; the shared rule and
//! operator tables are built once and read concurrently. Backend data
//! access, EDM type resolution and HTTP handling are out of scope.

mod ast;
mod compute;
mod error;
mod expand;
mod expression;
mod orderby;
mod parser;
mod path;
mod request;
mod search;
mod select;
mod token;
mod tokenizer;
mod util;

pub use ast::{
    ComputeItem, ExpandItem, KeyValue, OrderByDirection, OrderByItem, ParseNode, Query, Request,
    Segment, SegmentIdentifier, SelectItem,
};
pub use compute::{parse_compute, parse_compute_with};
pub use error::ODataError;
pub use expand::{parse_expand, parse_expand_with};
pub use expression::{define_custom_functions, CustomFunction};
pub use orderby::parse_orderby;
pub use parser::ExpressionParser;
pub use path::parse_path;
pub use search::{parse_search, tokenize_search};
pub use select::parse_select;
pub use token::{SemanticType, Token, TokenKind, LIST_EXPR};

/// Tolerance flags for deviations from the OData specification,
/// combined as a bitmask. `STRICT` tolerates nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComplianceConfig(u8);

impl ComplianceConfig {
    pub const STRICT: ComplianceConfig = ComplianceConfig(0);
    /// Accept a single trailing comma inside a list before `)`.
    pub const IGNORE_INVALID_COMMA: ComplianceConfig = ComplianceConfig(1);
    /// Accept unknown options and system keywords missing their `$`.
    pub const IGNORE_UNKNOWN_KEYWORDS: ComplianceConfig = ComplianceConfig(1 << 1);
    /// Accept duplicate option names; the first occurrence wins.
    pub const IGNORE_DUPLICATE_KEYWORDS: ComplianceConfig = ComplianceConfig(1 << 2);
    /// All tolerances at once.
    pub const IGNORE_ALL: ComplianceConfig = ComplianceConfig(0b111);

    /// True when every flag in `flags` is set on `self`.
    pub fn ignores(self, flags: ComplianceConfig) -> bool {
        flags.0 != 0 && self.0 & flags.0 == flags.0
    }
}

impl std::ops::BitOr for ComplianceConfig {
    type Output = ComplianceConfig;

    fn bitor(self, rhs: ComplianceConfig) -> ComplianceConfig {
        ComplianceConfig(self.0 | rhs.0)
    }
}

/// Parses a request from its decoded resource path and raw query
/// string, in strict compliance mode.
pub fn parse_request(path: &str, query: &str) -> Result<Request, ODataError> {
    request::parse_request_with(path, query, ComplianceConfig::STRICT)
}

/// Like [`parse_request`], with explicit compliance tolerances.
pub fn parse_request_with(
    path: &str,
    query: &str,
    config: ComplianceConfig,
) -> Result<Request, ODataError> {
    request::parse_request_with(path, query, config)
}

/// Parses a `$filter` value; the root must be a boolean expression.
pub fn parse_filter(filter: &str) -> Result<ParseNode, ODataError> {
    parse_filter_with(filter, ComplianceConfig::STRICT)
}

/// Like [`parse_filter`], with explicit compliance tolerances.
pub fn parse_filter_with(
    filter: &str,
    config: ComplianceConfig,
) -> Result<ParseNode, ODataError> {
    let mut parser = ExpressionParser::with_config(config);
    parser.expect_boolean_expr = true;
    parser.parse(filter)
}
