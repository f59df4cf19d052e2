//! Generic pattern-table tokenizer.
//!
//! A tokenizer is an ordered list of rules. At each input position the
//! rules are tried in declared order and the first one whose anchored
//! pattern matches (and whose context predicates hold) wins; the scan
//! then advances past the full match. Rules flagged `ignore` advance
//! without emitting. If nothing matches, the scan fails with a
//! positional error.
//!
//! The `regex` crate has no lookaround, so contextual constraints that
//! the OData ABNF expresses as adjacent terminals — "required
//! whitespace" around operator words, the `(` that must follow a lambda
//! keyword — are explicit `ahead`/`behind` predicates evaluated against
//! the raw input surrounding the match.

use regex::Regex;
use tracing::trace;

use crate::error::ODataError;
use crate::token::{SemanticType, Token, TokenKind};

/// Predicate over the input remaining after a candidate match.
pub type AheadPredicate = fn(&str) -> bool;
/// Predicate over the input preceding a candidate match.
pub type BehindPredicate = fn(&str) -> bool;
/// Validates the extracted lexeme; a failing guard rejects the rule.
pub type LexemeGuard = fn(&str) -> bool;
/// Rewrites the extracted lexeme into the stored token value.
pub type ValueMap = fn(&str) -> String;

pub struct TokenRule {
    pattern: Regex,
    kind: TokenKind,
    ignore: bool,
    capture: Option<usize>,
    ahead: Option<AheadPredicate>,
    behind: Option<BehindPredicate>,
    guard: Option<LexemeGuard>,
    map: Option<ValueMap>,
}

impl TokenRule {
    /// Compiles a rule. Patterns are table constants; a malformed one is
    /// a programming error caught at first use, not a runtime condition.
    pub fn new(pattern: &str, kind: TokenKind) -> Self {
        debug_assert!(pattern.starts_with('^'), "token patterns must be anchored");
        TokenRule {
            pattern: Regex::new(pattern).expect("invalid token rule pattern"),
            kind,
            ignore: false,
            capture: None,
            ahead: None,
            behind: None,
            guard: None,
            map: None,
        }
    }

    /// Advance past matches without emitting a token.
    pub fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }

    /// Emit the given capture group instead of the whole match.
    pub fn capture(mut self, group: usize) -> Self {
        self.capture = Some(group);
        self
    }

    pub fn ahead(mut self, predicate: AheadPredicate) -> Self {
        self.ahead = Some(predicate);
        self
    }

    pub fn behind(mut self, predicate: BehindPredicate) -> Self {
        self.behind = Some(predicate);
        self
    }

    pub fn guard(mut self, guard: LexemeGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn map(mut self, map: ValueMap) -> Self {
        self.map = Some(map);
        self
    }
}

pub struct Tokenizer {
    rules: Vec<TokenRule>,
}

impl Tokenizer {
    pub fn new(rules: Vec<TokenRule>) -> Self {
        Tokenizer { rules }
    }

    /// Scans `input` into a token vector, or fails at the first
    /// position no rule accepts.
    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>, ODataError> {
        let mut tokens = Vec::new();
        let mut position = 0usize;
        'scan: while position < input.len() {
            let rest = &input[position..];
            for rule in &self.rules {
                let Some(found) = rule.pattern.find(rest) else {
                    continue;
                };
                // Anchored patterns only ever match at the cursor.
                if found.start() != 0 || found.as_str().is_empty() {
                    continue;
                }
                if let Some(behind) = rule.behind {
                    if !behind(&input[..position]) {
                        continue;
                    }
                }
                if let Some(ahead) = rule.ahead {
                    if !ahead(&rest[found.end()..]) {
                        continue;
                    }
                }
                let lexeme = match rule.capture {
                    None => found.as_str(),
                    Some(group) => {
                        let Some(captures) = rule.pattern.captures(rest) else {
                            continue;
                        };
                        match captures.get(group) {
                            Some(m) => m.as_str(),
                            None => continue,
                        }
                    }
                };
                if let Some(guard) = rule.guard {
                    if !guard(lexeme) {
                        continue;
                    }
                }
                if !rule.ignore {
                    let value = match rule.map {
                        Some(map) => map(lexeme),
                        None => lexeme.to_string(),
                    };
                    trace!(position, kind = ?rule.kind, value = %value, "token");
                    tokens.push(Token {
                        value,
                        kind: rule.kind,
                        position,
                        semantic: SemanticType::None,
                    });
                }
                position += found.end();
                continue 'scan;
            }
            return Err(unmatched_input(input, position));
        }
        Ok(tokens)
    }
}

/// Builds the error for input no rule accepts. A quote that opens a
/// string with content but no closing quote is reported as an
/// unterminated string; everything else, including a lone trailing
/// quote, is an invalid token carrying the offending snippet.
fn unmatched_input(input: &str, position: usize) -> ODataError {
    let rest = &input[position..];
    if let Some(body) = rest.strip_prefix('\'') {
        if !body.is_empty() && !body.contains('\'') {
            return ODataError::UnterminatedString { position };
        }
    }
    let snippet: String = rest.chars().take(32).collect();
    ODataError::InvalidToken {
        position,
        token: snippet,
    }
}
