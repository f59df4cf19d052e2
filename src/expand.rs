//! `$expand` parser. Items are navigation paths optionally followed by
//! a parenthesized, semicolon-separated list of nested options, each
//! dispatched to the matching option parser:
//!
//! ```text
//! DirectReports($select=FirstName,LastName;$levels=4)
//! Products($filter=DiscontinuedDate eq null)
//! ```

use crate::ast::ExpandItem;
use crate::error::ODataError;
use crate::orderby;
use crate::parser::ExpressionParser;
use crate::search;
use crate::select;
use crate::token::{Token, TokenKind};
use crate::util;
use crate::{compute, ComplianceConfig};

pub fn parse_expand(value: &str) -> Result<Vec<ExpandItem>, ODataError> {
    parse_expand_with(value, ComplianceConfig::STRICT)
}

pub fn parse_expand_with(
    value: &str,
    config: ComplianceConfig,
) -> Result<Vec<ExpandItem>, ODataError> {
    let mut items = Vec::new();
    for raw in util::split_top_level(value, ',') {
        let item = raw.trim();
        if item.is_empty() {
            return Err(ODataError::syntax(0, raw, "empty $expand item"));
        }
        items.push(parse_expand_item(item, config)?);
    }
    Ok(items)
}

fn parse_expand_item(item: &str, config: ComplianceConfig) -> Result<ExpandItem, ODataError> {
    let (path_text, options_text) = match util::find_outside_quotes(item, '(') {
        None => (item, None),
        Some(open) => {
            if !item.ends_with(')') || open == 0 {
                return Err(ODataError::syntax(0, item, "malformed $expand options"));
            }
            (&item[..open], Some(&item[open + 1..item.len() - 1]))
        }
    };

    let mut expand = ExpandItem::default();
    for segment in path_text.split('/') {
        let segment = segment.trim();
        if segment.is_empty() {
            return Err(ODataError::syntax(0, item, "empty $expand path segment"));
        }
        expand
            .path
            .push(Token::new(segment, TokenKind::Literal, 0));
    }

    if let Some(options_text) = options_text {
        for option in util::split_top_level(options_text, ';') {
            let option = option.trim();
            let Some((name, value)) = option.split_once('=') else {
                return Err(ODataError::UnsupportedOption(option.to_string()));
            };
            match name.trim() {
                "$filter" => {
                    let mut parser = ExpressionParser::with_config(config);
                    parser.expect_boolean_expr = true;
                    expand.filter = Some(parser.parse(value)?);
                }
                "$select" => expand.select = Some(select::parse_select(value)?),
                "$expand" => expand.expand = Some(parse_expand_with(value, config)?),
                "$orderby" => expand.order_by = Some(orderby::parse_orderby(value)?),
                "$compute" => expand.compute = Some(compute::parse_compute_with(value, config)?),
                "$search" => expand.search = Some(search::parse_search(value)?),
                "$levels" => expand.levels = Some(parse_unsigned(name, value)?),
                "$top" => expand.top = Some(parse_unsigned(name, value)?),
                "$skip" => expand.skip = Some(parse_unsigned(name, value)?),
                "$count" => expand.count = Some(parse_boolean(name, value)?),
                other => return Err(ODataError::UnsupportedOption(other.to_string())),
            }
        }
    }
    Ok(expand)
}

pub(crate) fn parse_unsigned(name: &str, value: &str) -> Result<u64, ODataError> {
    value.trim().parse().map_err(|_| {
        ODataError::syntax(
            0,
            value,
            format!("the value of {name} must be a non-negative integer"),
        )
    })
}

pub(crate) fn parse_boolean(name: &str, value: &str) -> Result<bool, ODataError> {
    match value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ODataError::syntax(
            0,
            value,
            format!("the value of {name} must be 'true' or 'false'"),
        )),
    }
}
