//! Recursive-descent parser for SPDX boolean license expressions.
//!
//! Grammar (SPDX annex D, operators accepted case-insensitively and
//! canonicalized to uppercase on render):
//!
//! ```text
//! expression  = and-expr { "OR" and-expr }
//! and-expr    = with-expr { "AND" with-expr }
//! with-expr   = primary [ "WITH" idstring ]
//! primary     = "(" expression ")" | idstring [ "+" ]
//! idstring    = 1*( ALPHA / DIGIT / "-" / "." )
//! ```
//!
//! The parser is deliberately structural: it does not know the SPDX license
//! list. Validation and repair of leaf identifiers happen in
//! [`crate::license::sanitize`].

use std::fmt;

/// One node of a parsed license expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Leaf(Leaf),
    /// Two or more operands joined by AND.
    And(Vec<Expr>),
    /// Two or more operands joined by OR.
    Or(Vec<Expr>),
    /// Explicitly parenthesized subexpression, preserved for rendering.
    Group(Box<Expr>),
}

/// A leaf license reference: identifier, optional `+` suffix, optional
/// `WITH` exception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub id: String,
    pub or_later: bool,
    pub exception: Option<String>,
}

impl Expr {
    /// Visit every leaf mutably, left to right.
    pub fn for_each_leaf_mut<F: FnMut(&mut Leaf)>(&mut self, f: &mut F) {
        match self {
            Self::Leaf(leaf) => f(leaf),
            Self::And(parts) | Self::Or(parts) => {
                for part in parts {
                    part.for_each_leaf_mut(f);
                }
            }
            Self::Group(inner) => inner.for_each_leaf_mut(f),
        }
    }

    /// Render to canonical expression text: single spaces, uppercase
    /// operators, parentheses only where the source had them.
    pub fn render(&self) -> String {
        match self {
            Self::Leaf(leaf) => leaf.render(),
            Self::And(parts) => parts
                .iter()
                .map(Expr::render)
                .collect::<Vec<_>>()
                .join(" AND "),
            Self::Or(parts) => parts
                .iter()
                .map(Expr::render)
                .collect::<Vec<_>>()
                .join(" OR "),
            Self::Group(inner) => format!("({})", inner.render()),
        }
    }
}

impl Leaf {
    fn render(&self) -> String {
        let mut out = self.id.clone();
        if self.or_later {
            out.push('+');
        }
        if let Some(exception) = &self.exception {
            out.push_str(" WITH ");
            out.push_str(exception);
        }
        out
    }

    /// Original text of this leaf, for slug derivation on repair.
    pub fn source_text(&self) -> String {
        self.render()
    }
}

/// Why an expression failed to parse. Carried for diagnostics only; the
/// sanitizer repairs unparsable input instead of surfacing this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    InvalidCharacter(char),
    UnexpectedToken(String),
    UnexpectedEnd,
    TrailingTokens(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCharacter(c) => write!(f, "invalid character {c:?}"),
            Self::UnexpectedToken(t) => write!(f, "unexpected token {t:?}"),
            Self::UnexpectedEnd => write!(f, "unexpected end of expression"),
            Self::TrailingTokens(t) => write!(f, "trailing tokens starting at {t:?}"),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    And,
    Or,
    With,
    LParen,
    RParen,
}

fn lex(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            c if is_ident_char(c) || c == '+' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if is_ident_char(c) || c == '+' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match_keyword(ident));
            }
            other => return Err(ParseError::InvalidCharacter(other)),
        }
    }

    Ok(tokens)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '.'
}

fn match_keyword(ident: String) -> Token {
    if ident.eq_ignore_ascii_case("AND") {
        Token::And
    } else if ident.eq_ignore_ascii_case("OR") {
        Token::Or
    } else if ident.eq_ignore_ascii_case("WITH") {
        Token::With
    } else {
        Token::Ident(ident)
    }
}

/// Parse an SPDX boolean license expression.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = lex(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(ParseError::TrailingTokens(format!("{tok:?}"))),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut parts = vec![self.parse_and()?];
        while matches!(self.peek(), Some(Token::Or)) {
            self.next();
            parts.push(self.parse_and()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Expr::Or(parts)
        })
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut parts = vec![self.parse_with()?];
        while matches!(self.peek(), Some(Token::And)) {
            self.next();
            parts.push(self.parse_with()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Expr::And(parts)
        })
    }

    fn parse_with(&mut self) -> Result<Expr, ParseError> {
        let primary = self.parse_primary()?;
        if matches!(self.peek(), Some(Token::With)) {
            self.next();
            let exception = match self.next() {
                Some(Token::Ident(id)) => id,
                Some(tok) => return Err(ParseError::UnexpectedToken(format!("{tok:?}"))),
                None => return Err(ParseError::UnexpectedEnd),
            };
            // WITH binds to a simple license reference only.
            match primary {
                Expr::Leaf(mut leaf) if leaf.exception.is_none() => {
                    leaf.exception = Some(exception);
                    return Ok(Expr::Leaf(leaf));
                }
                _ => return Err(ParseError::UnexpectedToken("WITH".to_string())),
            }
        }
        Ok(primary)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token::RParen) => Ok(Expr::Group(Box::new(inner))),
                    Some(tok) => Err(ParseError::UnexpectedToken(format!("{tok:?}"))),
                    None => Err(ParseError::UnexpectedEnd),
                }
            }
            Some(Token::Ident(raw)) => {
                // A bare '+' or an ident with '+' anywhere but the end is not
                // a valid idstring.
                let or_later = raw.ends_with('+');
                let id = if or_later {
                    raw[..raw.len() - 1].to_string()
                } else {
                    raw.clone()
                };
                if id.is_empty() || id.contains('+') {
                    return Err(ParseError::UnexpectedToken(raw));
                }
                Ok(Expr::Leaf(Leaf {
                    id,
                    or_later,
                    exception: None,
                }))
            }
            Some(tok) => Err(ParseError::UnexpectedToken(format!("{tok:?}"))),
            None => Err(ParseError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: &str) -> Expr {
        Expr::Leaf(Leaf {
            id: id.to_string(),
            or_later: false,
            exception: None,
        })
    }

    #[test]
    fn parses_single_identifier() {
        assert_eq!(parse("MIT").unwrap(), leaf("MIT"));
    }

    #[test]
    fn parses_or_expression() {
        let expr = parse("MIT OR Apache-2.0").unwrap();
        assert_eq!(expr, Expr::Or(vec![leaf("MIT"), leaf("Apache-2.0")]));
        assert_eq!(expr.render(), "MIT OR Apache-2.0");
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse("MIT OR ISC AND Zlib").unwrap();
        assert_eq!(
            expr,
            Expr::Or(vec![leaf("MIT"), Expr::And(vec![leaf("ISC"), leaf("Zlib")])])
        );
    }

    #[test]
    fn parses_with_exception() {
        let expr = parse("GPL-2.0-only WITH Classpath-exception-2.0").unwrap();
        match expr {
            Expr::Leaf(leaf) => {
                assert_eq!(leaf.id, "GPL-2.0-only");
                assert_eq!(leaf.exception.as_deref(), Some("Classpath-exception-2.0"));
            }
            other => panic!("expected leaf, got {other:?}"),
        }
    }

    #[test]
    fn parses_or_later_suffix() {
        let expr = parse("GPL-2.0+").unwrap();
        match expr {
            Expr::Leaf(leaf) => {
                assert_eq!(leaf.id, "GPL-2.0");
                assert!(leaf.or_later);
            }
            other => panic!("expected leaf, got {other:?}"),
        }
    }

    #[test]
    fn groups_preserved_in_render() {
        let expr = parse("(MIT OR ISC) AND Zlib").unwrap();
        assert_eq!(expr.render(), "(MIT OR ISC) AND Zlib");
    }

    #[test]
    fn lowercase_operators_accepted_and_canonicalized() {
        let expr = parse("MIT or Apache-2.0").unwrap();
        assert_eq!(expr.render(), "MIT OR Apache-2.0");
    }

    #[test]
    fn rejects_free_text() {
        assert!(parse("Commercial - see LICENSE.txt").is_err());
        assert!(parse("MIT AND").is_err());
        assert!(parse("(MIT").is_err());
        assert!(parse("").is_err());
        assert!(parse("MIT, Apache-2.0").is_err());
    }

    #[test]
    fn rejects_with_on_group() {
        assert!(parse("(MIT OR ISC) WITH Classpath-exception-2.0").is_err());
    }
}
