//! List query semantics shared by both backends
//!
//! Filters follow SQL `LIKE`: `%` matches any run of characters, `_` matches
//! exactly one, and `\` makes the next character literal. `*` is accepted as
//! a synonym for `%` so `prefix*` works the same on every backend.

use crate::error::{Result, StoreError};

const ESCAPE: char = '\\';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyOne,
    AnyRun,
}

/// A validated `LIKE` pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikePattern {
    sql: String,
    tokens: Vec<Token>,
}

impl LikePattern {
    /// Pattern matching every value
    pub fn any() -> Self {
        Self {
            sql: "%".to_string(),
            tokens: vec![Token::AnyRun],
        }
    }

    /// Build a pattern from an optional user filter.
    ///
    /// Absent or empty filters match everything.
    pub fn from_filter(filter: Option<&str>) -> Result<Self> {
        let filter = match filter {
            Some(f) if !f.is_empty() => f,
            _ => return Ok(Self::any()),
        };

        let mut sql = String::with_capacity(filter.len());
        let mut tokens = Vec::with_capacity(filter.len());
        let mut chars = filter.chars();

        while let Some(c) = chars.next() {
            match c {
                ESCAPE => {
                    let escaped = chars.next().ok_or_else(|| {
                        StoreError::validation("filter must not end with an escape character")
                    })?;
                    sql.push(ESCAPE);
                    sql.push(escaped);
                    tokens.push(Token::Literal(escaped));
                }
                '%' | '*' => {
                    sql.push('%');
                    // Consecutive runs collapse into one
                    if tokens.last() != Some(&Token::AnyRun) {
                        tokens.push(Token::AnyRun);
                    }
                }
                '_' => {
                    sql.push('_');
                    tokens.push(Token::AnyOne);
                }
                other => {
                    sql.push(other);
                    tokens.push(Token::Literal(other));
                }
            }
        }

        Ok(Self { sql, tokens })
    }

    /// The pattern as bound to a relational `LIKE` parameter
    pub fn as_sql(&self) -> &str {
        &self.sql
    }

    /// Anchored, case-sensitive match of the whole value
    pub fn matches(&self, value: &str) -> bool {
        let text: Vec<char> = value.chars().collect();
        let (mut p, mut t) = (0usize, 0usize);
        // Position of the last `%` seen and the text index it resumed from
        let mut backtrack: Option<(usize, usize)> = None;

        while t < text.len() {
            match self.tokens.get(p) {
                Some(Token::Literal(c)) if *c == text[t] => {
                    p += 1;
                    t += 1;
                }
                Some(Token::AnyOne) => {
                    p += 1;
                    t += 1;
                }
                Some(Token::AnyRun) => {
                    backtrack = Some((p, t));
                    p += 1;
                }
                _ => match backtrack {
                    Some((run, resume)) => {
                        p = run + 1;
                        t = resume + 1;
                        backtrack = Some((run, resume + 1));
                    }
                    None => return false,
                },
            }
        }

        self.tokens[p..].iter().all(|token| *token == Token::AnyRun)
    }
}

impl Default for LikePattern {
    fn default() -> Self {
        Self::any()
    }
}

/// A filtered, paginated listing request.
///
/// Skip the first `offset` matches, then return at most `limit` of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub pattern: LikePattern,
    pub limit: usize,
    pub offset: usize,
}

impl ListQuery {
    pub fn new(pattern: LikePattern, limit: usize, offset: usize) -> Self {
        Self {
            pattern,
            limit,
            offset,
        }
    }

    /// Every entity up to `limit`, no filter, no offset
    pub fn first(limit: usize) -> Self {
        Self::new(LikePattern::any(), limit, 0)
    }
}
