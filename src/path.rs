//! Resource-path parser. `Employees(1)/Sales.Manager` becomes a chain
//! of segments; a parenthesized portion is parsed with the expression
//! parser so key predicates take arbitrary expression values.

use crate::ast::{KeyValue, ParseNode, Segment, SegmentIdentifier};
use crate::error::ODataError;
use crate::parser::ExpressionParser;
use crate::token::TokenKind;
use crate::util;

/// Parses a decoded resource path into a linked segment chain.
/// Returns `None` for an empty path.
pub fn parse_path(path: &str) -> Result<Option<Segment>, ODataError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(None);
    }
    let mut segments = Vec::new();
    for text in util::split_top_level(trimmed, '/') {
        segments.push(parse_segment(text.trim())?);
    }
    let mut head: Option<Box<Segment>> = None;
    for mut segment in segments.into_iter().rev() {
        segment.next = head;
        head = Some(Box::new(segment));
    }
    Ok(head.map(|boxed| *boxed))
}

fn parse_segment(text: &str) -> Result<Segment, ODataError> {
    if text.is_empty() {
        return Err(ODataError::syntax(0, text, "empty path segment"));
    }
    let Some(open) = util::find_outside_quotes(text, '(') else {
        return Ok(Segment {
            name: text.to_string(),
            identifier: None,
            next: None,
        });
    };
    if open == 0 || !text.ends_with(')') {
        return Err(ODataError::syntax(0, text, "malformed path segment"));
    }
    let name = &text[..open];
    let tree = ExpressionParser::new().parse(text)?;
    // A well-formed keyed segment parses to its name literal with the
    // predicate contents adopted as children.
    if tree.token.kind != TokenKind::Literal || tree.token.value != name {
        return Err(ODataError::syntax(0, text, "malformed path segment"));
    }
    let identifier = segment_identifier(tree.children, text)?;
    Ok(Segment {
        name: name.to_string(),
        identifier: Some(identifier),
        next: None,
    })
}

fn segment_identifier(
    children: Vec<ParseNode>,
    text: &str,
) -> Result<SegmentIdentifier, ODataError> {
    if children.is_empty() {
        return Err(ODataError::syntax(0, text, "empty key predicate"));
    }
    if children.len() == 1 && children[0].token.kind != TokenKind::Assignment {
        let child = &children[0];
        let value = child
            .string_content()
            .map(str::to_string)
            .unwrap_or_else(|| child.token.value.clone());
        return Ok(SegmentIdentifier::Value(value));
    }
    let mut keys = Vec::new();
    for child in children {
        if child.token.kind != TokenKind::Assignment || child.children.len() != 2 {
            return Err(ODataError::syntax(0, text, "malformed key predicate"));
        }
        let mut parts = child.children.into_iter();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            return Err(ODataError::syntax(0, text, "malformed key predicate"));
        };
        if key.token.kind != TokenKind::Literal {
            return Err(ODataError::syntax(0, text, "key name must be an identifier"));
        }
        keys.push(KeyValue {
            key: key.token.value,
            value,
        });
    }
    Ok(SegmentIdentifier::Keys(keys))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_segment_chain() {
        let first = parse_path("Employees(1)/Sales.Manager").unwrap().unwrap();
        assert_eq!(first.name, "Employees");
        assert_eq!(
            first.identifier.as_ref().unwrap().as_value(),
            Some("1")
        );
        let next = first.next.as_ref().unwrap();
        assert_eq!(next.name, "Sales.Manager");
        assert!(next.identifier.is_none());
        assert!(next.next.is_none());
    }

    #[test]
    fn quoted_identifier_is_unquoted() {
        let first = parse_path("Products('abc123')").unwrap().unwrap();
        assert_eq!(
            first.identifier.as_ref().unwrap().as_value(),
            Some("abc123")
        );
    }

    #[test]
    fn named_keys() {
        let first = parse_path("Products(sku='abc123',vendor='globex')")
            .unwrap()
            .unwrap();
        let Some(SegmentIdentifier::Keys(keys)) = &first.identifier else {
            panic!("expected key predicates");
        };
        assert_eq!(keys[0].key, "sku");
        assert_eq!(keys[0].value.string_content(), Some("abc123"));
        assert_eq!(keys[1].key, "vendor");
    }

    #[test]
    fn leading_slash_and_empty_paths() {
        assert!(parse_path("").unwrap().is_none());
        assert!(parse_path("/").unwrap().is_none());
        let first = parse_path("/Books").unwrap().unwrap();
        assert_eq!(first.name, "Books");
    }

    #[test]
    fn malformed_segments() {
        assert!(parse_path("Products(sku='abc'").is_err());
        assert!(parse_path("Products()").is_err());
        assert!(parse_path("(1)").is_err());
    }
}
