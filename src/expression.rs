//! The canonical OData expression token table and the function
//! catalogue.
//!
//! Rule order is load-bearing: the datetime patterns run before the
//! GUID pattern, which runs before the number patterns; function names
//! are recognized before operator words so `geo.intersects` is never
//! read as `ge` and `substringof` is never read as `sub`; `divby`
//! precedes `div` inside the arithmetic alternation.

use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::error::ODataError;
use crate::token::TokenKind;
use crate::tokenizer::{TokenRule, Tokenizer};

/// A function name registered by the host application.
#[derive(Debug, Clone)]
pub struct CustomFunction {
    pub name: String,
    /// Accepted argument counts, e.g. `[1]` or `[2, 3]`.
    pub arities: Vec<usize>,
}

/// Registers additional functions recognized by the expression
/// tokenizer. Registration takes the catalogue write lock, so it must
/// not race with parsing; call it during initialization.
pub fn define_custom_functions(functions: &[CustomFunction]) -> Result<(), ODataError> {
    let mut catalogue = FUNCTIONS.write().unwrap_or_else(|e| e.into_inner());
    for function in functions {
        let name = function.name.to_ascii_lowercase();
        if function.arities.is_empty() {
            return Err(ODataError::syntax(
                0,
                name,
                "custom function must declare at least one arity",
            ));
        }
        if catalogue.contains_key(&name) {
            return Err(ODataError::CustomFunctionConflict(name));
        }
        catalogue.insert(name, function.arities.clone());
    }
    Ok(())
}

/// The accepted argument counts of a known function.
pub(crate) fn function_arities(name: &str) -> Option<Vec<usize>> {
    let catalogue = FUNCTIONS.read().unwrap_or_else(|e| e.into_inner());
    catalogue.get(name).cloned()
}

fn is_known_function(name: &str) -> bool {
    let catalogue = FUNCTIONS.read().unwrap_or_else(|e| e.into_inner());
    catalogue.contains_key(&name.to_ascii_lowercase())
}

static FUNCTIONS: Lazy<RwLock<HashMap<String, Vec<usize>>>> =
    Lazy::new(|| RwLock::new(builtin_functions()));

fn builtin_functions() -> HashMap<String, Vec<usize>> {
    let mut catalogue = HashMap::new();
    let mut add = |name: &str, arities: &[usize]| {
        catalogue.insert(name.to_string(), arities.to_vec());
    };
    // String functions.
    add("contains", &[2]);
    add("startswith", &[2]);
    add("endswith", &[2]);
    add("length", &[1]);
    add("indexof", &[2]);
    add("substring", &[2, 3]);
    add("substringof", &[2]);
    add("tolower", &[1]);
    add("toupper", &[1]);
    add("trim", &[1]);
    add("concat", &[2]);
    // Date and time functions.
    add("year", &[1]);
    add("month", &[1]);
    add("day", &[1]);
    add("hour", &[1]);
    add("minute", &[1]);
    add("second", &[1]);
    add("fractionalseconds", &[1]);
    add("date", &[1]);
    add("time", &[1]);
    add("totaloffsetminutes", &[1]);
    add("totalseconds", &[1]);
    add("mindatetime", &[0]);
    add("maxdatetime", &[0]);
    add("now", &[0]);
    // Math functions.
    add("round", &[1]);
    add("floor", &[1]);
    add("ceiling", &[1]);
    // Type functions.
    add("isof", &[1, 2]);
    add("cast", &[1, 2]);
    // Geo functions.
    add("geo.distance", &[2]);
    add("geo.length", &[1]);
    add("geo.intersects", &[2]);
    // Conditional: case(bool:expr, ...) takes up to ten arms, each arm
    // contributing a selector and a value.
    add("case", &[2, 4, 6, 8, 10, 12, 14, 16, 18, 20]);
    // exists(property, bool)
    add("exists", &[2]);
    catalogue
}

/// The shared expression tokenizer; built once, read concurrently.
pub(crate) fn expression_tokenizer() -> &'static Tokenizer {
    &EXPRESSION_TOKENIZER
}

static EXPRESSION_TOKENIZER: Lazy<Tokenizer> = Lazy::new(|| {
    Tokenizer::new(vec![
        // RWS = 1*( SP / HTAB / "%20" / "%09" ); the percent forms may
        // survive a decoded query value verbatim.
        TokenRule::new(r"^([ \t]|%20|%09)+", TokenKind::Whitespace).ignore(),
        TokenRule::new(r"^\(", TokenKind::OpenParen),
        TokenRule::new(r"^\)", TokenKind::CloseParen),
        TokenRule::new(r"^,", TokenKind::Comma),
        // dateTimeOffsetValue = year "-" month "-" day "T" timeOfDayValue ( "Z" / SIGN hour ":" minute )
        TokenRule::new(
            r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:\d{2})",
            TokenKind::DateTime,
        ),
        TokenRule::new(r"^\d{4}-\d{2}-\d{2}", TokenKind::Date),
        TokenRule::new(r"^\d{2}:\d{2}:\d{2}(\.\d+)?", TokenKind::Time),
        TokenRule::new(
            r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
            TokenKind::Guid,
        ),
        // duration = [ "duration" ] SQUOTE durationValue SQUOTE
        // The prefix and quotes are stripped from the emitted value. A
        // bare quoted string matching the inner grammar is a duration,
        // not a string.
        TokenRule::new(
            r"^(duration)?'(P(\d+Y)?(\d+M)?(\d+D)?(T(\d+H)?(\d+M)?(\d+(\.\d+)?S)?)?)'",
            TokenKind::Duration,
        )
        .capture(2)
        .guard(valid_duration_value),
        // geographyPolygon = "geography" SQUOTE sridLiteral polygonLiteral SQUOTE
        TokenRule::new(
            r"^geography'SRID=\d{1,5};Polygon\(\(.+?\)\)'",
            TokenKind::GeographyPolygon,
        ),
        TokenRule::new(
            r"^geometry'SRID=\d{1,5};Polygon\(\(.+?\)\)'",
            TokenKind::GeometryPolygon,
        ),
        // string = SQUOTE *( SQUOTE-in-string / pchar-no-SQUOTE ) SQUOTE
        // where SQUOTE-in-string = SQUOTE SQUOTE.
        TokenRule::new(r"^'([^']|'')*'", TokenKind::String).map(collapse_doubled_quotes),
        TokenRule::new(r"^-?\d+\.\d+", TokenKind::Float),
        TokenRule::new(r"^-?\d+", TokenKind::Integer),
        TokenRule::new(r"^(true|false)", TokenKind::Boolean).ahead(identifier_boundary),
        TokenRule::new(r"^null", TokenKind::Null).ahead(identifier_boundary),
        TokenRule::new(r"^\$it", TokenKind::It).ahead(identifier_boundary),
        // any/all are lambda operators only when a call follows.
        TokenRule::new(r"^(?i)(any|all)", TokenKind::Lambda)
            .ahead(call_ahead)
            .map(lowercase),
        // A known function name; the catalogue lookup keeps this rule
        // from swallowing ordinary identifiers. The converter insists
        // on a following `(`.
        TokenRule::new(r"^[a-zA-Z_][a-zA-Z0-9._]*", TokenKind::Func)
            .guard(is_known_function)
            .map(lowercase),
        // Operator words need required whitespace around them so that
        // `gt2011` or `orCity` never lex as operators.
        TokenRule::new(r"^(?i)not", TokenKind::Logical)
            .behind(operator_boundary_behind)
            .ahead(rws_or_paren_ahead)
            .map(lowercase),
        TokenRule::new(r"^(?i)(eq|ne|gt|ge|lt|le|and|or|in|has)", TokenKind::Logical)
            .behind(operator_boundary_behind)
            .ahead(rws_ahead)
            .map(lowercase),
        TokenRule::new(r"^(?i)(divby|div|mod|add|sub|mul)", TokenKind::Arithmetic)
            .behind(operator_boundary_behind)
            .ahead(rws_ahead)
            .map(lowercase),
        TokenRule::new(r"^/", TokenKind::LambdaNavigation).ahead(lambda_keyword_ahead),
        TokenRule::new(r"^/", TokenKind::Navigation),
        TokenRule::new(r"^=", TokenKind::Assignment),
        // The lambda-body colon separates the variable from the body;
        // downstream it behaves as an argument separator, so the value
        // is rewritten to a comma while the kind records the colon.
        TokenRule::new(r"^:", TokenKind::Colon).map(|_| ",".to_string()),
        TokenRule::new(r"^[a-zA-Z_@][a-zA-Z0-9._]*", TokenKind::Literal),
    ])
});

fn lowercase(lexeme: &str) -> String {
    lexeme.to_ascii_lowercase()
}

/// `'ab''c'` carries one literal quote: collapse doubled quotes in the
/// body, keep the outer pair.
fn collapse_doubled_quotes(lexeme: &str) -> String {
    let body = &lexeme[1..lexeme.len() - 1];
    format!("'{}'", body.replace("''", "'"))
}

/// durationValue needs at least one unit and may not end in a dangling
/// time designator; only the seconds field takes a fraction (enforced
/// by the pattern itself).
fn valid_duration_value(value: &str) -> bool {
    !value.ends_with('T') && value.bytes().any(|b| b.is_ascii_digit())
}

fn identifier_boundary(rest: &str) -> bool {
    !rest.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn rws_ahead(rest: &str) -> bool {
    rest.is_empty()
        || rest.starts_with([' ', '\t'])
        || rest.starts_with("%20")
        || rest.starts_with("%09")
}

/// `not` tolerates a directly following `(`; the ABNF requires a space
/// but real clients omit it.
fn rws_or_paren_ahead(rest: &str) -> bool {
    rws_ahead(rest) || rest.starts_with('(')
}

fn operator_boundary_behind(prefix: &str) -> bool {
    prefix.is_empty()
        || prefix.ends_with([' ', '\t', '(', ':', ','])
        || prefix.ends_with("%20")
        || prefix.ends_with("%09")
}

/// Optional whitespace then an opening parenthesis.
fn call_ahead(rest: &str) -> bool {
    rest.trim_start_matches([' ', '\t']).starts_with('(')
}

/// `/` is lambda navigation when `any(` or `all(` follows.
fn lambda_keyword_ahead(rest: &str) -> bool {
    match rest.get(..3) {
        Some(keyword)
            if keyword.eq_ignore_ascii_case("any") || keyword.eq_ignore_ascii_case("all") =>
        {
            call_ahead(&rest[3..])
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn kinds(input: &str) -> Vec<TokenKind> {
        expression_tokenizer()
            .tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn lexes_as_single_duration(input: &str) -> bool {
        expression_tokenizer()
            .tokenize(input)
            .map(|tokens| tokens.len() == 1 && tokens[0].kind == TokenKind::Duration)
            .unwrap_or(false)
    }

    #[test]
    fn duration_grammar() {
        let cases = [
            ("duration'P12DT23H59M59.999999999999S'", true),
            ("duration'P3Y6M4DT12H30M5S'", true),
            ("duration'P23DT23H'", true),
            ("duration'P4Y'", true),
            // At least one element must be present.
            ("duration'P'", false),
            ("duration'PT0S'", true),
            ("duration'P0D'", true),
            // P1M is one month, PT1M is one minute.
            ("duration'P1M'", true),
            ("duration'PT1M'", true),
            ("duration'PT36H'", true),
            ("duration'P1DT12H'", true),
            ("duration'PT23H59M'", true),
            // Missing unit designator.
            ("duration'PT23H59'", false),
            ("duration'H0D'", false),
            ("foo", false),
            // Fractions are only valid in the seconds field.
            ("duration'P0.5Y'", false),
            ("duration'P0.5M'", false),
            ("duration'P0,5Y'", false),
        ];
        for (input, valid) in cases {
            assert_eq!(
                lexes_as_single_duration(input),
                valid,
                "duration case {input}"
            );
        }
    }

    #[test]
    fn duration_value_is_stripped() {
        let tokens = expression_tokenizer()
            .tokenize("duration'P12DT23H59M59.999999999999S'")
            .unwrap();
        assert_eq!(tokens[0].value, "P12DT23H59M59.999999999999S");
    }

    #[test]
    fn operator_prefixed_identifiers_stay_literals() {
        assert_eq!(kinds("android"), vec![TokenKind::Literal]);
        assert_eq!(kinds("notes"), vec![TokenKind::Literal]);
        assert_eq!(kinds("indexes"), vec![TokenKind::Literal]);
        assert_eq!(
            kinds("Price divby 2"),
            vec![
                TokenKind::Literal,
                TokenKind::Arithmetic,
                TokenKind::Integer
            ]
        );
    }

    #[test]
    fn operators_require_surrounding_whitespace() {
        // `gt2011` is one literal, not an operator followed by a number.
        assert_eq!(kinds("gt2011"), vec![TokenKind::Literal]);
        // `orCity` likewise.
        assert_eq!(kinds("orCity"), vec![TokenKind::Literal]);
    }

    #[test]
    fn geo_function_is_not_the_ge_operator() {
        let tokens = expression_tokenizer()
            .tokenize("geo.distance(A,B)")
            .unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Func);
        assert_eq!(tokens[0].value, "geo.distance");
    }

    #[test]
    fn case_insensitive_operators_fold_to_lowercase() {
        let tokens = expression_tokenizer().tokenize("Price ADD 2").unwrap();
        assert_eq!(tokens[1].value, "add");
        let tokens = expression_tokenizer()
            .tokenize("GEO.INTERSECTS(Position,TargetArea)")
            .unwrap();
        assert_eq!(tokens[0].value, "geo.intersects");
    }

    #[test]
    fn booleans_are_case_sensitive() {
        assert_eq!(kinds("true"), vec![TokenKind::Boolean]);
        assert_eq!(kinds("TRUE"), vec![TokenKind::Literal]);
        assert_eq!(kinds("trueValue"), vec![TokenKind::Literal]);
    }

    #[test]
    fn lambda_requires_a_call() {
        assert_eq!(
            kinds("Tags/any(d:d)"),
            vec![
                TokenKind::Literal,
                TokenKind::LambdaNavigation,
                TokenKind::Lambda,
                TokenKind::OpenParen,
                TokenKind::Literal,
                TokenKind::Colon,
                TokenKind::Literal,
                TokenKind::CloseParen,
            ]
        );
        // `any` without a call is an ordinary identifier.
        assert_eq!(kinds("anybody"), vec![TokenKind::Literal]);
    }

    #[test]
    fn doubled_quotes_collapse() {
        let tokens = expression_tokenizer().tokenize("'ab''c'").unwrap();
        assert_eq!(tokens[0].value, "'ab'c'");
        let tokens = expression_tokenizer().tokenize("''").unwrap();
        assert_eq!(tokens[0].value, "''");
    }
}
