//! `$compute` parser: comma-separated `<expression> as <field>` items.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::ComputeItem;
use crate::error::ODataError;
use crate::parser::ExpressionParser;
use crate::util;
use crate::ComplianceConfig;

/// Computed field names are letters, optionally slash-separated
/// (`extra/newField`). Digits and underscores are not accepted.
static FIELD_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z]+(/[a-zA-Z]+)*$").expect("invalid field name pattern"));

pub fn parse_compute(value: &str) -> Result<Vec<ComputeItem>, ODataError> {
    parse_compute_with(value, ComplianceConfig::STRICT)
}

pub fn parse_compute_with(
    value: &str,
    config: ComplianceConfig,
) -> Result<Vec<ComputeItem>, ODataError> {
    let mut items = Vec::new();
    for item in util::split_top_level(value, ',') {
        let parts: Vec<&str> = item.split(" as ").collect();
        if parts.len() != 2 {
            return Err(ODataError::InvalidCompute(format!(
                "expected '<expression> as <field>', got '{}'",
                item.trim()
            )));
        }
        let expression_text = parts[0].trim();
        let field = parts[1].trim();
        if expression_text.is_empty() {
            return Err(ODataError::InvalidCompute(format!(
                "missing expression before 'as' in '{}'",
                item.trim()
            )));
        }
        if !FIELD_NAME.is_match(field) {
            return Err(ODataError::InvalidCompute(format!(
                "'{field}' is not a valid computed field name"
            )));
        }
        let expression = ExpressionParser::with_config(config)
            .parse(expression_text)
            .map_err(|e| ODataError::InvalidCompute(e.to_string()))?;
        items.push(ComputeItem {
            field: field.to_string(),
            expression,
        });
    }
    Ok(items)
}
