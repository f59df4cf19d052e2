use thiserror::Error;

/// Errors produced while parsing an OData request URL or any of its
/// query options. Every ill-formed input maps to one of these variants;
/// the parsers never panic on user input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ODataError {
    /// The tokenizer found no rule matching the input at `position`.
    ///
    /// The message shape `Token '...' is invalid` is part of the public
    /// error surface; callers match on it.
    #[error("Token '{token}' is invalid at position {position}")]
    InvalidToken { position: usize, token: String },

    /// A single-quoted string literal was opened but never closed.
    #[error("Unterminated string literal at position {position}")]
    UnterminatedString { position: usize },

    /// The expression is structurally malformed: unbalanced parentheses,
    /// misplaced commas, operators without operands, adjacent operands.
    #[error("Syntax error at position {position} near '{token}': {message}")]
    SyntaxError {
        position: usize,
        token: String,
        message: String,
    },

    /// A function was applied to a number of arguments outside its
    /// declared arity set.
    #[error("Function '{function}' cannot take {got} argument(s)")]
    ArityError { function: String, got: usize },

    /// A `$filter` root or lambda body is not a boolean expression.
    #[error("Expression is not a boolean expression")]
    NotBooleanExpression,

    /// A `$compute` item does not satisfy the `<expression> as <field>`
    /// grammar. The `Invalid $compute query option` prefix is matched by
    /// callers.
    #[error("Invalid $compute query option: {0}")]
    InvalidCompute(String),

    /// A malformed `$orderby` item.
    #[error("Invalid $orderby query option: {0}")]
    InvalidOrderBy(String),

    /// An unrecognized query option in strict compliance mode.
    #[error("Unsupported query option '{0}'")]
    UnsupportedOption(String),

    /// The same query option appeared more than once in strict mode.
    #[error("Duplicate query option '{0}'")]
    DuplicateOption(String),

    /// `define_custom_functions` was called with a name that is already
    /// registered, built-in or custom.
    #[error("Custom function '{0}' is already defined")]
    CustomFunctionConflict(String),
}

impl ODataError {
    pub(crate) fn syntax(
        position: usize,
        token: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ODataError::SyntaxError {
            position,
            token: token.into(),
            message: message.into(),
        }
    }
}
