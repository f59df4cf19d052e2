//! `$orderby` parser.

use crate::ast::{OrderByDirection, OrderByItem};
use crate::error::ODataError;
use crate::expression;
use crate::token::{Token, TokenKind};
use crate::util;

/// Parses an `$orderby` value into ordered items. Field references are
/// kept verbatim (slashes, dots and key predicates included); the
/// optional trailing keyword selects the direction.
pub fn parse_orderby(value: &str) -> Result<Vec<OrderByItem>, ODataError> {
    let mut items = Vec::new();
    for raw in util::split_top_level(value, ',') {
        let item = raw.trim();
        if item.is_empty() {
            return Err(ODataError::InvalidOrderBy(
                "empty $orderby item".to_string(),
            ));
        }
        let (field_text, direction) = split_direction(item);
        // Tokenizing validates the field reference; `+Name` and `-Name`
        // fail here with the tokenizer's own error.
        expression::expression_tokenizer().tokenize(field_text)?;
        items.push(OrderByItem {
            field: Token::new(util::decode_x0020(field_text), TokenKind::Literal, 0),
            direction,
        });
    }
    Ok(items)
}

/// The direction is the text after the last whitespace run when it
/// spells `asc`/`desc` case-insensitively; otherwise the whole item is
/// the field, so `ProductDesc` orders ascending by `ProductDesc`.
fn split_direction(item: &str) -> (&str, OrderByDirection) {
    if let Some((field, last)) = item.rsplit_once([' ', '\t']) {
        let field = field.trim_end();
        if !field.is_empty() {
            if last.eq_ignore_ascii_case("asc") {
                return (field, OrderByDirection::Ascending);
            }
            if last.eq_ignore_ascii_case("desc") {
                return (field, OrderByDirection::Descending);
            }
        }
    }
    (item, OrderByDirection::default())
}
