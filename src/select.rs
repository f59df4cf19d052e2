//! `$select` parser. Items are split at top-level commas and into
//! slash-separated segments; beyond non-emptiness the segment text is
//! not interpreted here, that is the model layer's concern.

use crate::ast::SelectItem;
use crate::error::ODataError;
use crate::token::{Token, TokenKind};
use crate::util;

pub fn parse_select(value: &str) -> Result<Vec<SelectItem>, ODataError> {
    let mut items = Vec::new();
    for raw in util::split_top_level(value, ',') {
        let item = raw.trim();
        if item.is_empty() {
            return Err(ODataError::syntax(0, raw, "empty $select item"));
        }
        let mut segments = Vec::new();
        for segment in item.split('/') {
            if segment.is_empty() {
                return Err(ODataError::syntax(0, item, "empty $select segment"));
            }
            segments.push(Token::new(segment, TokenKind::Literal, 0));
        }
        items.push(SelectItem { segments });
    }
    Ok(items)
}
