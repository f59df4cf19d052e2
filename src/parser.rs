//! Infix-to-postfix conversion and postfix-to-tree building.
//!
//! The converter is a shunting-yard over an operator table (precedence,
//! associativity, operand count) shared by the expression and `$search`
//! grammars. Parenthesized lists are tracked with an explicit context
//! stack; on close they emit a synthetic `ArgCount` token followed by a
//! `ListExpr` marker, and then the owning token when the list belongs
//! to a function call, a key predicate or a lambda. The postfix stream
//! is a stable, independently testable contract.

use std::collections::{HashMap, VecDeque};

use once_cell::sync::Lazy;
use tracing::trace;

use crate::ast::ParseNode;
use crate::error::ODataError;
use crate::expression;
use crate::token::{SemanticType, Token, TokenKind};
use crate::ComplianceConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Assoc {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct OperatorDef {
    pub precedence: u8,
    pub operands: u8,
    pub assoc: Assoc,
}

pub(crate) struct OperatorTable {
    map: HashMap<&'static str, OperatorDef>,
}

impl OperatorTable {
    pub fn new() -> Self {
        OperatorTable {
            map: HashMap::new(),
        }
    }

    pub fn define(&mut self, name: &'static str, precedence: u8, operands: u8, assoc: Assoc) {
        self.map.insert(
            name,
            OperatorDef {
                precedence,
                operands,
                assoc,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&OperatorDef> {
        self.map.get(name)
    }
}

/// Expression operator precedence, low to high. Ties resolve
/// left-associatively except `not` and the key-predicate `=`.
static EXPRESSION_OPERATORS: Lazy<OperatorTable> = Lazy::new(|| {
    let mut t = OperatorTable::new();
    t.define("=", 1, 2, Assoc::Right);
    t.define("or", 2, 2, Assoc::Left);
    t.define("and", 3, 2, Assoc::Left);
    t.define("in", 4, 2, Assoc::Left);
    t.define("has", 5, 2, Assoc::Left);
    t.define("eq", 6, 2, Assoc::Left);
    t.define("ne", 6, 2, Assoc::Left);
    t.define("gt", 7, 2, Assoc::Left);
    t.define("ge", 7, 2, Assoc::Left);
    t.define("lt", 7, 2, Assoc::Left);
    t.define("le", 7, 2, Assoc::Left);
    t.define("add", 8, 2, Assoc::Left);
    t.define("sub", 8, 2, Assoc::Left);
    t.define("mul", 9, 2, Assoc::Left);
    t.define("div", 9, 2, Assoc::Left);
    t.define("divby", 9, 2, Assoc::Left);
    t.define("mod", 9, 2, Assoc::Left);
    // Both navigation kinds carry the `/` lexeme.
    t.define("/", 10, 2, Assoc::Left);
    t.define("not", 11, 1, Assoc::Right);
    t
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListOwner {
    /// Arguments of a `Func` call.
    Function,
    /// Key predicate applied to a literal: `Products(sku='abc')`.
    KeyPredicate,
    /// Lambda argument list: `any(d:...)`.
    Lambda,
    /// Right-hand side of `in`, always kept as a list.
    In,
    /// Plain parentheses: a list when it holds commas or is empty,
    /// otherwise pure grouping that leaves no trace in the output.
    Group,
}

#[derive(Debug)]
struct ListContext {
    count: usize,
    saw_comma: bool,
    owner: ListOwner,
    position: usize,
}

fn operator_def<'t>(table: &'t OperatorTable, token: &Token) -> Option<&'t OperatorDef> {
    match token.kind {
        TokenKind::Logical
        | TokenKind::Arithmetic
        | TokenKind::Assignment
        | TokenKind::Navigation
        | TokenKind::LambdaNavigation
        | TokenKind::SearchOp => table.get(&token.value),
        _ => None,
    }
}

fn is_operator_kind(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenKind::Logical
            | TokenKind::Arithmetic
            | TokenKind::Assignment
            | TokenKind::Navigation
            | TokenKind::LambdaNavigation
            | TokenKind::SearchOp
    )
}

fn is_leaf(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenKind::Literal
            | TokenKind::String
            | TokenKind::Integer
            | TokenKind::Float
            | TokenKind::Boolean
            | TokenKind::Null
            | TokenKind::Date
            | TokenKind::Time
            | TokenKind::DateTime
            | TokenKind::Duration
            | TokenKind::Guid
            | TokenKind::GeographyPolygon
            | TokenKind::GeometryPolygon
            | TokenKind::It
            | TokenKind::SearchLiteral
    )
}

/// Tokens that terminate an operand, i.e. after which a binary
/// operator, comma or closing parenthesis may legally follow.
fn ends_operand(token: &Token) -> bool {
    is_leaf(token) || token.kind == TokenKind::CloseParen
}

/// Tokens that begin an operand.
fn starts_operand(token: &Token) -> bool {
    is_leaf(token)
        || matches!(
            token.kind,
            TokenKind::OpenParen | TokenKind::Func | TokenKind::Lambda
        )
}

pub(crate) fn infix_to_postfix(
    tokens: &[Token],
    table: &OperatorTable,
    config: ComplianceConfig,
) -> Result<VecDeque<Token>, ODataError> {
    let Some(last) = tokens.last() else {
        return Err(ODataError::syntax(0, "", "empty expression"));
    };
    let mut out: VecDeque<Token> = VecDeque::with_capacity(tokens.len());
    let mut ops: Vec<Token> = Vec::new();
    let mut lists: Vec<ListContext> = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let prev = if i == 0 { None } else { Some(&tokens[i - 1]) };

        // Two operands in a row are malformed, except a literal
        // directly opening its key-predicate list.
        if starts_operand(token) && prev.is_some_and(ends_operand) {
            let applies_key_predicate = token.kind == TokenKind::OpenParen
                && prev.is_some_and(|p| p.kind == TokenKind::Literal);
            if !applies_key_predicate {
                return Err(ODataError::syntax(
                    token.position,
                    &token.value,
                    "expected an operator",
                ));
            }
        }

        match token.kind {
            TokenKind::OpenParen => {
                let owner = if prev.is_some_and(|p| p.kind == TokenKind::Literal) {
                    let lit = out.pop_back().ok_or_else(|| {
                        ODataError::syntax(token.position, "(", "misplaced key predicate")
                    })?;
                    ops.push(lit);
                    ListOwner::KeyPredicate
                } else if ops.last().is_some_and(|t| t.kind == TokenKind::Func) {
                    ListOwner::Function
                } else if ops.last().is_some_and(|t| t.kind == TokenKind::Lambda) {
                    ListOwner::Lambda
                } else if prev.is_some_and(|p| p.kind == TokenKind::Logical && p.value == "in") {
                    ListOwner::In
                } else {
                    ListOwner::Group
                };
                lists.push(ListContext {
                    count: 0,
                    saw_comma: false,
                    owner,
                    position: token.position,
                });
                ops.push(token.clone());
            }
            TokenKind::CloseParen => {
                if lists.is_empty() {
                    return Err(ODataError::syntax(
                        token.position,
                        ")",
                        "unmatched closing parenthesis",
                    ));
                }
                if prev.is_some_and(|p| operator_def(table, p).is_some()) {
                    return Err(ODataError::syntax(
                        token.position,
                        ")",
                        "missing operand before closing parenthesis",
                    ));
                }
                let trailing_comma =
                    prev.is_some_and(|p| matches!(p.kind, TokenKind::Comma | TokenKind::Colon));
                if trailing_comma && !config.ignores(ComplianceConfig::IGNORE_INVALID_COMMA) {
                    return Err(ODataError::syntax(
                        token.position,
                        ")",
                        "trailing comma before closing parenthesis",
                    ));
                }
                flush_to_open_paren(&mut ops, &mut out);
                match ops.pop() {
                    Some(t) if t.kind == TokenKind::OpenParen => {}
                    _ => {
                        return Err(ODataError::syntax(
                            token.position,
                            ")",
                            "unbalanced parenthesis",
                        ))
                    }
                }
                let mut ctx = lists.pop().ok_or_else(|| {
                    ODataError::syntax(token.position, ")", "unbalanced parenthesis")
                })?;
                if !trailing_comma && !prev.is_some_and(|p| p.kind == TokenKind::OpenParen) {
                    ctx.count += 1;
                }
                let emits_list = match ctx.owner {
                    ListOwner::Group => ctx.saw_comma || ctx.count == 0,
                    _ => true,
                };
                if emits_list {
                    out.push_back(Token::arg_count(ctx.count, token.position));
                    out.push_back(Token::list_expr(token.position));
                }
                match ctx.owner {
                    ListOwner::Function | ListOwner::Lambda => {
                        let owner_token = ops.pop().ok_or_else(|| {
                            ODataError::syntax(token.position, ")", "dangling argument list")
                        })?;
                        out.push_back(owner_token);
                    }
                    ListOwner::KeyPredicate => {
                        let mut lit = ops.pop().ok_or_else(|| {
                            ODataError::syntax(token.position, ")", "dangling key predicate")
                        })?;
                        lit.semantic = SemanticType::KeyPredicate;
                        out.push_back(lit);
                    }
                    ListOwner::In | ListOwner::Group => {}
                }
            }
            TokenKind::Comma | TokenKind::Colon => {
                if lists.is_empty() {
                    return Err(ODataError::syntax(
                        token.position,
                        &token.value,
                        "unexpected comma outside a list",
                    ));
                }
                if !prev.is_some_and(ends_operand) {
                    return Err(ODataError::syntax(
                        token.position,
                        &token.value,
                        "missing expression before comma",
                    ));
                }
                flush_to_open_paren(&mut ops, &mut out);
                if let Some(ctx) = lists.last_mut() {
                    ctx.count += 1;
                    ctx.saw_comma = true;
                }
            }
            TokenKind::Func => {
                if tokens.get(i + 1).map(|t| t.kind) != Some(TokenKind::OpenParen) {
                    return Err(ODataError::syntax(
                        token.position,
                        &token.value,
                        "function must be followed by an argument list",
                    ));
                }
                ops.push(token.clone());
            }
            TokenKind::Lambda => {
                // The tokenizer only emits Lambda with a call ahead.
                ops.push(token.clone());
            }
            _ if is_operator_kind(token) => {
                let Some(def) = operator_def(table, token).copied() else {
                    return Err(ODataError::syntax(
                        token.position,
                        &token.value,
                        "unknown operator",
                    ));
                };
                if def.operands == 2 && !prev.is_some_and(ends_operand) {
                    return Err(ODataError::syntax(
                        token.position,
                        &token.value,
                        format!("missing left operand for '{}'", token.value),
                    ));
                }
                if def.operands == 1 && prev.is_some_and(ends_operand) {
                    return Err(ODataError::syntax(
                        token.position,
                        &token.value,
                        "expected an operator",
                    ));
                }
                while let Some(top) = ops.last() {
                    let Some(top_def) = operator_def(table, top) else {
                        break;
                    };
                    let pops = top_def.precedence > def.precedence
                        || (top_def.precedence == def.precedence && def.assoc == Assoc::Left);
                    if !pops {
                        break;
                    }
                    if let Some(top) = ops.pop() {
                        out.push_back(top);
                    }
                }
                ops.push(token.clone());
            }
            _ if is_leaf(token) => out.push_back(token.clone()),
            _ => {
                return Err(ODataError::syntax(
                    token.position,
                    &token.value,
                    "unexpected token",
                ))
            }
        }
    }

    if !ends_operand(last) {
        return Err(ODataError::syntax(
            last.position,
            &last.value,
            "unexpected end of expression",
        ));
    }
    if let Some(ctx) = lists.last() {
        return Err(ODataError::syntax(
            ctx.position,
            "(",
            "unmatched opening parenthesis",
        ));
    }
    while let Some(op) = ops.pop() {
        out.push_back(op);
    }
    Ok(out)
}

fn flush_to_open_paren(ops: &mut Vec<Token>, out: &mut VecDeque<Token>) {
    while ops.last().is_some_and(is_operator_kind) {
        if let Some(op) = ops.pop() {
            out.push_back(op);
        }
    }
}

pub(crate) fn postfix_to_tree(
    mut queue: VecDeque<Token>,
    table: &OperatorTable,
) -> Result<ParseNode, ODataError> {
    let mut stack: Vec<ParseNode> = Vec::new();
    let mut pending_count: Option<usize> = None;

    while let Some(token) = queue.pop_front() {
        match token.kind {
            TokenKind::ArgCount => {
                pending_count = Some(token.value.parse().map_err(|_| {
                    ODataError::syntax(token.position, &token.value, "malformed argument count")
                })?);
            }
            TokenKind::ListExpr => {
                let count = pending_count.take().ok_or_else(|| {
                    ODataError::syntax(token.position, &token.value, "list without argument count")
                })?;
                if stack.len() < count {
                    return Err(ODataError::syntax(
                        token.position,
                        &token.value,
                        "too few list elements",
                    ));
                }
                let children: Vec<ParseNode> = stack
                    .split_off(stack.len() - count)
                    .into_iter()
                    .map(unwrap_redundant_list)
                    .collect();
                stack.push(ParseNode { token, children });
            }
            TokenKind::Func => {
                let args = pop_list(&mut stack, &token)?;
                let children = args.children;
                let arities = expression::function_arities(&token.value).ok_or_else(|| {
                    ODataError::syntax(token.position, &token.value, "unknown function")
                })?;
                if !arities.contains(&children.len()) {
                    return Err(ODataError::ArityError {
                        function: token.value.clone(),
                        got: children.len(),
                    });
                }
                let children = if token.value == "case" {
                    pair_case_arms(children)?
                } else {
                    children
                };
                stack.push(ParseNode { token, children });
            }
            TokenKind::Literal if token.semantic == SemanticType::KeyPredicate => {
                let args = pop_list(&mut stack, &token)?;
                stack.push(ParseNode {
                    token,
                    children: args.children,
                });
            }
            TokenKind::Lambda => {
                let args = pop_list(&mut stack, &token)?;
                let children = args.children;
                match (token.value.as_str(), children.len()) {
                    // any() tests for a non-empty collection.
                    ("any", 0) | ("any", 2) | ("all", 2) => {}
                    _ => {
                        return Err(ODataError::syntax(
                            token.position,
                            &token.value,
                            format!(
                                "'{}' requires a lambda variable and a boolean body",
                                token.value
                            ),
                        ))
                    }
                }
                if children.len() == 2 {
                    if children[0].token.kind != TokenKind::Literal {
                        return Err(ODataError::syntax(
                            token.position,
                            &token.value,
                            "lambda variable must be an identifier",
                        ));
                    }
                    if !children[1].is_boolean_expression() {
                        return Err(ODataError::NotBooleanExpression);
                    }
                }
                stack.push(ParseNode { token, children });
            }
            _ if is_operator_kind(&token) => {
                let Some(def) = operator_def(table, &token).copied() else {
                    return Err(ODataError::syntax(
                        token.position,
                        &token.value,
                        "unknown operator",
                    ));
                };
                if def.operands == 1 {
                    let operand = pop_operand(&mut stack, &token)?;
                    let operand = unwrap_redundant_list(operand);
                    reject_empty_list(&operand, &token)?;
                    stack.push(ParseNode {
                        token,
                        children: vec![operand],
                    });
                } else {
                    let right = pop_operand(&mut stack, &token)?;
                    let left = pop_operand(&mut stack, &token)?;
                    let left = unwrap_redundant_list(left);
                    let (left, right) = if token.kind == TokenKind::Logical && token.value == "in" {
                        // `in` always expects a list on the right.
                        if right.token.kind != TokenKind::ListExpr {
                            return Err(ODataError::syntax(
                                token.position,
                                &token.value,
                                "the right operand of 'in' must be a parenthesized list",
                            ));
                        }
                        (left, right)
                    } else {
                        let right = unwrap_redundant_list(right);
                        reject_empty_list(&left, &token)?;
                        reject_empty_list(&right, &token)?;
                        (left, right)
                    };
                    stack.push(ParseNode {
                        token,
                        children: vec![left, right],
                    });
                }
            }
            _ => stack.push(ParseNode::new(token)),
        }
    }

    let Some(root) = stack.pop() else {
        return Err(ODataError::syntax(0, "", "empty expression"));
    };
    if !stack.is_empty() {
        return Err(ODataError::syntax(
            root.token.position,
            &root.token.value,
            "expression does not reduce to a single tree",
        ));
    }
    if root.token.kind == TokenKind::ListExpr && root.children.is_empty() {
        return Err(ODataError::syntax(
            root.token.position,
            &root.token.value,
            "empty expression",
        ));
    }
    Ok(root)
}

fn pop_list(stack: &mut Vec<ParseNode>, owner: &Token) -> Result<ParseNode, ODataError> {
    match stack.pop() {
        Some(node) if node.token.kind == TokenKind::ListExpr => Ok(node),
        _ => Err(ODataError::syntax(
            owner.position,
            &owner.value,
            format!("'{}' expects an argument list", owner.value),
        )),
    }
}

fn pop_operand(stack: &mut Vec<ParseNode>, operator: &Token) -> Result<ParseNode, ODataError> {
    stack.pop().ok_or_else(|| {
        ODataError::syntax(
            operator.position,
            &operator.value,
            format!("missing operand for '{}'", operator.value),
        )
    })
}

fn reject_empty_list(node: &ParseNode, operator: &Token) -> Result<(), ODataError> {
    if node.token.kind == TokenKind::ListExpr && node.children.is_empty() {
        return Err(ODataError::syntax(
            operator.position,
            &operator.value,
            format!("empty list is not a valid operand for '{}'", operator.value),
        ));
    }
    Ok(())
}

/// `(x)` used for grouping is transparent: a single-element list in
/// operand or element position is replaced by its sole member. The `in`
/// operator bypasses this for its right-hand side.
fn unwrap_redundant_list(mut node: ParseNode) -> ParseNode {
    while node.token.kind == TokenKind::ListExpr && node.children.len() == 1 {
        match node.children.pop() {
            Some(child) => node = child,
            None => break,
        }
    }
    node
}

/// Case arms arrive as a flat selector/value sequence; regroup them
/// into two-child pair nodes and check every selector is boolean.
fn pair_case_arms(children: Vec<ParseNode>) -> Result<Vec<ParseNode>, ODataError> {
    let mut pairs = Vec::with_capacity(children.len() / 2);
    let mut arms = children.into_iter();
    while let (Some(selector), Some(value)) = (arms.next(), arms.next()) {
        if !selector.is_boolean_expression() {
            return Err(ODataError::NotBooleanExpression);
        }
        let token = Token::new(":", TokenKind::Colon, selector.token.position);
        pairs.push(ParseNode {
            token,
            children: vec![selector, value],
        });
    }
    Ok(pairs)
}

/// Parses one OData expression: tokenize, convert to postfix, build the
/// tree, then optionally require a boolean root (`$filter` mode).
#[derive(Debug, Clone)]
pub struct ExpressionParser {
    pub expect_boolean_expr: bool,
    config: ComplianceConfig,
}

impl ExpressionParser {
    pub fn new() -> Self {
        Self::with_config(ComplianceConfig::STRICT)
    }

    pub fn with_config(config: ComplianceConfig) -> Self {
        ExpressionParser {
            expect_boolean_expr: false,
            config,
        }
    }

    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>, ODataError> {
        expression::expression_tokenizer().tokenize(input)
    }

    pub fn infix_to_postfix(&self, tokens: &[Token]) -> Result<VecDeque<Token>, ODataError> {
        infix_to_postfix(tokens, &EXPRESSION_OPERATORS, self.config)
    }

    pub fn postfix_to_tree(&self, queue: VecDeque<Token>) -> Result<ParseNode, ODataError> {
        postfix_to_tree(queue, &EXPRESSION_OPERATORS)
    }

    pub fn parse(&self, input: &str) -> Result<ParseNode, ODataError> {
        trace!(input, "parsing expression");
        let tokens = self.tokenize(input)?;
        let postfix = self.infix_to_postfix(&tokens)?;
        let tree = self.postfix_to_tree(postfix)?;
        if self.expect_boolean_expr && !tree.is_boolean_expression() {
            return Err(ODataError::NotBooleanExpression);
        }
        Ok(tree)
    }
}

impl Default for ExpressionParser {
    fn default() -> Self {
        ExpressionParser::new()
    }
}
