//! Top-level request parser: splits the raw query string, dispatches
//! each option to its parser and enforces the compliance mode.
//!
//! Query splitting follows RFC 3986 as the OData URL conventions apply
//! it: split at `&` before decoding, each option at the first `=`, then
//! percent-decode names and values exactly once. The resource path is
//! expected to arrive already decoded, the way an HTTP framework hands
//! it over.

use std::collections::HashSet;

use tracing::debug;
use url::form_urlencoded;

use crate::ast::{Query, Request};
use crate::error::ODataError;
use crate::expand::{self, parse_boolean, parse_unsigned};
use crate::parser::ExpressionParser;
use crate::{compute, orderby, path, search, select, ComplianceConfig};

/// System query option names, without their `$` prefix. Using one of
/// these without the prefix is a compliance violation, not a custom
/// option.
const SYSTEM_KEYWORDS: [&str; 18] = [
    "apply",
    "compute",
    "count",
    "deltatoken",
    "expand",
    "filter",
    "format",
    "id",
    "index",
    "inlinecount",
    "levels",
    "orderby",
    "schemaversion",
    "search",
    "select",
    "skip",
    "skiptoken",
    "top",
];

pub fn parse_request_with(
    path: &str,
    query: &str,
    config: ComplianceConfig,
) -> Result<Request, ODataError> {
    debug!(path, "parsing request");
    let mut parsed = Query::default();
    let mut seen: HashSet<String> = HashSet::new();
    let raw_query = query.strip_prefix('?').unwrap_or(query);
    for (name, value) in form_urlencoded::parse(raw_query.as_bytes()) {
        dispatch_option(&mut parsed, &mut seen, &name, &value, config)?;
    }
    let first_segment = path::parse_path(path)?;
    Ok(Request {
        first_segment,
        query: parsed,
    })
}

fn dispatch_option(
    query: &mut Query,
    seen: &mut HashSet<String>,
    name: &str,
    value: &str,
    config: ComplianceConfig,
) -> Result<(), ODataError> {
    let supported = matches!(
        name,
        "$filter"
            | "$orderby"
            | "$select"
            | "$expand"
            | "$compute"
            | "$search"
            | "$top"
            | "$skip"
            | "$count"
    );
    if supported {
        if !seen.insert(name.to_string()) {
            if config.ignores(ComplianceConfig::IGNORE_DUPLICATE_KEYWORDS) {
                debug!(option = name, "ignoring duplicate query option");
                return Ok(());
            }
            return Err(ODataError::DuplicateOption(name.to_string()));
        }
        debug!(option = name, "parsing query option");
        match name {
            "$filter" => {
                let mut parser = ExpressionParser::with_config(config);
                parser.expect_boolean_expr = true;
                query.filter = Some(parser.parse(value)?);
            }
            "$orderby" => query.order_by = Some(orderby::parse_orderby(value)?),
            "$select" => query.select = Some(select::parse_select(value)?),
            "$expand" => query.expand = Some(expand::parse_expand_with(value, config)?),
            "$compute" => query.compute = Some(compute::parse_compute_with(value, config)?),
            "$search" => query.search = Some(search::parse_search(value)?),
            "$top" => query.top = Some(parse_unsigned(name, value)?),
            "$skip" => query.skip = Some(parse_unsigned(name, value)?),
            "$count" => query.count = Some(parse_boolean(name, value)?),
            _ => {}
        }
        return Ok(());
    }

    // Everything else: an unknown $-option, a system keyword missing
    // its prefix, or a malformed name is a violation in strict mode; a
    // plain custom option like `at=Version eq '123'` is always legal
    // and retained raw.
    let violates = name.starts_with('$')
        || SYSTEM_KEYWORDS.contains(&name)
        || !is_custom_option_name(name);
    if violates && !config.ignores(ComplianceConfig::IGNORE_UNKNOWN_KEYWORDS) {
        return Err(ODataError::UnsupportedOption(name.to_string()));
    }
    debug!(option = name, "retaining custom query option");
    query.custom.insert(name.to_string(), value.to_string());
    Ok(())
}

/// Custom option names look like identifiers; `@` leads parameter
/// aliases.
fn is_custom_option_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '@' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
}
