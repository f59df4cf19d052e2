//! Shared fixture helpers: token-sequence, postfix-queue and
//! depth-tagged tree comparisons.

#![allow(dead_code)]

use odata_parser::{CustomFunction, ExpressionParser, ODataError, ParseNode, TokenKind};

/// Expected token as `(value, kind)`.
pub type ExpectedToken = (&'static str, TokenKind);

/// Expected tree node as `(value, depth, kind)` in pre-order.
pub type ExpectedNode = (&'static str, usize, TokenKind);

pub fn assert_tokens(input: &str, expected: &[ExpectedToken]) {
    let tokens = ExpressionParser::new()
        .tokenize(input)
        .unwrap_or_else(|e| panic!("failed to tokenize '{input}': {e}"));
    let actual: Vec<(&str, TokenKind)> = tokens.iter().map(|t| (t.value.as_str(), t.kind)).collect();
    assert_eq!(actual, expected, "token mismatch for '{input}'");
}

pub fn assert_postfix(input: &str, expected: &[ExpectedToken]) {
    let parser = ExpressionParser::new();
    let tokens = parser
        .tokenize(input)
        .unwrap_or_else(|e| panic!("failed to tokenize '{input}': {e}"));
    let postfix = parser
        .infix_to_postfix(&tokens)
        .unwrap_or_else(|e| panic!("failed to convert '{input}': {e}"));
    let actual: Vec<(&str, TokenKind)> =
        postfix.iter().map(|t| (t.value.as_str(), t.kind)).collect();
    assert_eq!(actual, expected, "postfix mismatch for '{input}'");
}

fn flatten(node: &ParseNode, depth: usize, out: &mut Vec<(String, usize, TokenKind)>) {
    out.push((node.token.value.clone(), depth, node.token.kind));
    for child in &node.children {
        flatten(child, depth + 1, out);
    }
}

pub fn assert_tree_shape(input: &str, tree: &ParseNode, expected: &[ExpectedNode]) {
    let mut actual = Vec::new();
    flatten(tree, 0, &mut actual);
    let actual: Vec<(&str, usize, TokenKind)> = actual
        .iter()
        .map(|(value, depth, kind)| (value.as_str(), *depth, *kind))
        .collect();
    assert_eq!(actual, expected, "tree mismatch for '{input}':\n{tree}");
}

/// Parses with a plain (non-boolean-root) expression parser and
/// compares the pre-order depth-tagged tree shape.
pub fn assert_parses_to(input: &str, expected: &[ExpectedNode]) {
    let tree = ExpressionParser::new()
        .parse(input)
        .unwrap_or_else(|e| panic!("failed to parse '{input}': {e}"));
    assert_tree_shape(input, &tree, expected);
}

/// Registers a custom function, tolerating a previous registration by
/// another test; the catalogue is process-wide.
pub fn ensure_custom_function(name: &str, arities: &[usize]) {
    let result = odata_parser::define_custom_functions(&[CustomFunction {
        name: name.to_string(),
        arities: arities.to_vec(),
    }]);
    match result {
        Ok(()) | Err(ODataError::CustomFunctionConflict(_)) => {}
        Err(e) => panic!("failed to register custom function '{name}': {e}"),
    }
}
