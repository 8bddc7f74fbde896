//! Condition expressions
//!
//! Conditions are a small boolean language over signal references:
//!
//! ```text
//! wipers.front.on == true and (speed > 30 || not parked)
//! ```
//!
//! Alternate operator spellings are folded into the canonical grammar by the
//! tokenizer: `&&`/`AND` → `and`, `||`/`OR` → `or`, `!`/`NOT` → `not`,
//! `True`/`TRUE` → `true`, `False`/`FALSE` → `false`.
//!
//! Precedence, lowest first: `or`, `and`, `not`, comparison. Comparisons do
//! not chain.

use std::fmt;

use crate::error::ParseError;
use crate::value::Value;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// Boolean connective
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

impl BoolOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BoolOp::And => "and",
            BoolOp::Or => "or",
        }
    }
}

/// Compiled condition tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Comparison {
        op: CompareOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// n-ary connective, always at least two operands
    BoolOp {
        op: BoolOp,
        operands: Vec<Expression>,
    },
    Not(Box<Expression>),
    /// Signal reference, dotted paths kept whole (`wipers.front.on`)
    Identifier(String),
    Literal(Value),
}

impl Expression {
    /// Parse a condition string
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(ParseError::new(0, "Empty condition"));
        }

        let mut parser = Parser::new(tokens, source.len());
        let expr = parser.parse_expression()?;
        if let Some((offset, token)) = parser.peek_spanned() {
            return Err(ParseError::new(
                offset,
                format!("Unexpected token after expression: {}", token),
            ));
        }
        Ok(expr)
    }

    /// Distinct signal names referenced, in order of first appearance
    pub fn identifiers(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_identifiers(&mut names);
        names
    }

    fn collect_identifiers<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expression::Identifier(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            },
            Expression::Literal(_) => {},
            Expression::Not(inner) => inner.collect_identifiers(names),
            Expression::Comparison { left, right, .. } => {
                left.collect_identifiers(names);
                right.collect_identifiers(names);
            },
            Expression::BoolOp { operands, .. } => {
                for operand in operands {
                    operand.collect_identifiers(names);
                }
            },
        }
    }
}

/// Canonical rendering, fully parenthesised for nested connectives
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Identifier(name) => write!(f, "{}", name),
            Expression::Literal(value) => write!(f, "{}", value.to_literal()),
            Expression::Not(inner) => match inner.as_ref() {
                Expression::BoolOp { .. } | Expression::Comparison { .. } => {
                    write!(f, "not ({})", inner)
                },
                _ => write!(f, "not {}", inner),
            },
            Expression::Comparison { op, left, right } => {
                write_operand(f, left)?;
                write!(f, " {} ", op.as_str())?;
                write_operand(f, right)
            },
            Expression::BoolOp { op, operands } => {
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", op.as_str())?;
                    }
                    if matches!(operand, Expression::BoolOp { .. }) {
                        write!(f, "({})", operand)?;
                    } else {
                        write!(f, "{}", operand)?;
                    }
                }
                Ok(())
            },
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, operand: &Expression) -> fmt::Result {
    match operand {
        Expression::Identifier(_) | Expression::Literal(_) => write!(f, "{}", operand),
        _ => write!(f, "({})", operand),
    }
}

// ============================================================================
// Tokenizer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Identifier(String),
    Literal(Value),
    Compare(CompareOp),
    And,
    Or,
    Not,
    LeftParen,
    RightParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(name) => write!(f, "identifier '{}'", name),
            Token::Literal(value) => write!(f, "literal {}", value.to_literal()),
            Token::Compare(op) => write!(f, "'{}'", op.as_str()),
            Token::And => write!(f, "'and'"),
            Token::Or => write!(f, "'or'"),
            Token::Not => write!(f, "'not'"),
            Token::LeftParen => write!(f, "'('"),
            Token::RightParen => write!(f, "')'"),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        let token = match ch {
            c if c.is_whitespace() => continue,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '>' | '<' => {
                let or_equal = matches!(chars.peek(), Some((_, '=')));
                if or_equal {
                    chars.next();
                }
                Token::Compare(match (ch, or_equal) {
                    ('>', true) => CompareOp::Ge,
                    ('>', false) => CompareOp::Gt,
                    ('<', true) => CompareOp::Le,
                    _ => CompareOp::Lt,
                })
            },
            '=' => {
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    Token::Compare(CompareOp::Eq)
                } else {
                    return Err(ParseError::new(
                        offset,
                        "Invalid operator '=', use '==' for comparison",
                    ));
                }
            },
            '!' => {
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    Token::Compare(CompareOp::Ne)
                } else {
                    Token::Not
                }
            },
            '&' | '|' => {
                if matches!(chars.peek(), Some((_, next)) if *next == ch) {
                    chars.next();
                    if ch == '&' {
                        Token::And
                    } else {
                        Token::Or
                    }
                } else {
                    return Err(ParseError::new(
                        offset,
                        format!("Invalid operator '{}', use '{}{}'", ch, ch, ch),
                    ));
                }
            },
            '"' | '\'' => {
                let mut text = String::new();
                let mut closed = false;
                for (_, next) in chars.by_ref() {
                    if next == ch {
                        closed = true;
                        break;
                    }
                    text.push(next);
                }
                if !closed {
                    return Err(ParseError::new(offset, "Unterminated string literal"));
                }
                Token::Literal(Value::String(text))
            },
            '0'..='9' | '-' | '.' => {
                let mut number = String::new();
                number.push(ch);
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_ascii_digit() || next == '.' {
                        number.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                Token::Literal(parse_number(&number, offset)?)
            },
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::new();
                word.push(c);
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' || next == '.' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                keyword_or_identifier(word, offset)?
            },
            other => {
                return Err(ParseError::new(
                    offset,
                    format!("Invalid character '{}'", other),
                ))
            },
        };
        tokens.push((offset, token));
    }

    Ok(tokens)
}

fn parse_number(text: &str, offset: usize) -> Result<Value, ParseError> {
    let invalid = || ParseError::new(offset, format!("Invalid number '{}'", text));
    let digits = text.strip_prefix('-').unwrap_or(text);
    if !digits.chars().any(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if text.contains('.') {
        text.parse::<f64>().map(Value::Float).map_err(|_| invalid())
    } else {
        text.parse::<i64>().map(Value::Int).map_err(|_| invalid())
    }
}

fn keyword_or_identifier(word: String, offset: usize) -> Result<Token, ParseError> {
    if !word.contains('.') {
        match word.to_lowercase().as_str() {
            "and" => return Ok(Token::And),
            "or" => return Ok(Token::Or),
            "not" => return Ok(Token::Not),
            "true" => return Ok(Token::Literal(Value::Bool(true))),
            "false" => return Ok(Token::Literal(Value::Bool(false))),
            _ => {},
        }
    }

    if word.split('.').any(str::is_empty) {
        return Err(ParseError::new(
            offset,
            format!("Invalid attribute path '{}'", word),
        ));
    }
    Ok(Token::Identifier(word))
}

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    tokens: Vec<(usize, Token)>,
    current: usize,
    end_offset: usize,
}

impl Parser {
    fn new(tokens: Vec<(usize, Token)>, end_offset: usize) -> Self {
        Self {
            tokens,
            current: 0,
            end_offset,
        }
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expression, ParseError> {
        let mut operands = vec![self.parse_and()?];
        while self.match_token(&Token::Or) {
            operands.push(self.parse_and()?);
        }
        Ok(connective(BoolOp::Or, operands))
    }

    fn parse_and(&mut self) -> Result<Expression, ParseError> {
        let mut operands = vec![self.parse_unary()?];
        while self.match_token(&Token::And) {
            operands.push(self.parse_unary()?);
        }
        Ok(connective(BoolOp::And, operands))
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        if self.match_token(&Token::Not) {
            let operand = self.parse_unary()?;
            return Ok(Expression::Not(Box::new(operand)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expression, ParseError> {
        let left = self.parse_operand()?;

        let op = match self.peek() {
            Some(Token::Compare(op)) => *op,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_operand()?;

        if let Some((offset, Token::Compare(_))) = self.peek_spanned() {
            return Err(ParseError::new(
                offset,
                "Chained comparisons are not supported, combine with 'and'",
            ));
        }

        Ok(Expression::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_operand(&mut self) -> Result<Expression, ParseError> {
        let Some((offset, token)) = self.advance() else {
            return Err(ParseError::new(
                self.end_offset,
                "Unexpected end of condition",
            ));
        };

        match token {
            Token::Identifier(name) => Ok(Expression::Identifier(name)),
            Token::Literal(value) => Ok(Expression::Literal(value)),
            Token::LeftParen => {
                let expr = self.parse_expression()?;
                if !self.match_token(&Token::RightParen) {
                    let offset = self.peek_spanned().map_or(self.end_offset, |(o, _)| o);
                    return Err(ParseError::new(offset, "Expected ')' after expression"));
                }
                Ok(expr)
            },
            other => Err(ParseError::new(
                offset,
                format!("Unexpected {}", other),
            )),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current).map(|(_, token)| token)
    }

    fn peek_spanned(&self) -> Option<(usize, &Token)> {
        self.tokens
            .get(self.current)
            .map(|(offset, token)| (*offset, token))
    }

    fn advance(&mut self) -> Option<(usize, Token)> {
        let next = self.tokens.get(self.current).cloned();
        if next.is_some() {
            self.current += 1;
        }
        next
    }

    fn match_token(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.current += 1;
            return true;
        }
        false
    }
}

fn connective(op: BoolOp, mut operands: Vec<Expression>) -> Expression {
    if operands.len() == 1 {
        operands.remove(0)
    } else {
        Expression::BoolOp { op, operands }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    fn ident(name: &str) -> Box<Expression> {
        Box::new(Expression::Identifier(name.to_string()))
    }

    fn lit(value: impl Into<Value>) -> Box<Expression> {
        Box::new(Expression::Literal(value.into()))
    }

    #[test]
    fn test_dotted_comparison() {
        let expr = Expression::parse("wipers.front.on == true").unwrap();
        assert_eq!(
            expr,
            Expression::Comparison {
                op: CompareOp::Eq,
                left: ident("wipers.front.on"),
                right: lit(true),
            }
        );
    }

    #[test]
    fn test_precedence_and_binds_tighter_than_or() {
        let expr = Expression::parse("a == 1 or b == 2 and c == 3").unwrap();
        match expr {
            Expression::BoolOp {
                op: BoolOp::Or,
                operands,
            } => {
                assert_eq!(operands.len(), 2);
                assert!(matches!(
                    operands[1],
                    Expression::BoolOp {
                        op: BoolOp::And,
                        ..
                    }
                ));
            },
            other => panic!("Expected or, got {:?}", other),
        }
    }

    #[test]
    fn test_connectives_flatten() {
        let expr = Expression::parse("a and b and c").unwrap();
        match expr {
            Expression::BoolOp { op, operands } => {
                assert_eq!(op, BoolOp::And);
                assert_eq!(operands.len(), 3);
            },
            other => panic!("Expected and, got {:?}", other),
        }
    }

    #[test]
    fn test_alternate_spellings_normalise() {
        let symbolic = Expression::parse("a == True && (b != FALSE || !c)").unwrap();
        let canonical = Expression::parse("a == true and (b != false or not c)").unwrap();
        assert_eq!(symbolic, canonical);
    }

    #[test]
    fn test_literals() {
        let expr = Expression::parse("mode == 'eco' and level >= -2.5 and gear < 3").unwrap();
        assert_eq!(
            expr.to_string(),
            "mode == \"eco\" and level >= -2.5 and gear < 3"
        );
    }

    #[test]
    fn test_display_reparses_to_same_tree() {
        for source in [
            "(a == 1) == (b or c)",
            "not (x and y) or z.w != 'q'",
            "a && (b || c) && !d",
        ] {
            let expr = Expression::parse(source).unwrap();
            assert_eq!(Expression::parse(&expr.to_string()).unwrap(), expr);
        }
    }

    #[test]
    fn test_not_applies_to_comparison() {
        let expr = Expression::parse("not speed > 10").unwrap();
        assert_eq!(
            expr,
            Expression::Not(Box::new(Expression::Comparison {
                op: CompareOp::Gt,
                left: ident("speed"),
                right: lit(10i64),
            }))
        );
    }

    #[test]
    fn test_identifiers_are_distinct_and_ordered() {
        let expr = Expression::parse("b.c == 1 or a or b.c > 0").unwrap();
        assert_eq!(expr.identifiers(), vec!["b.c", "a"]);

        let constant = Expression::parse("1 == 1").unwrap();
        assert!(constant.identifiers().is_empty());
    }

    #[test]
    fn test_syntax_errors() {
        for bad in [
            "",
            "   ",
            "a = 1",
            "a == ",
            "(a == 1",
            "a == 1)",
            "a < b < c",
            "a & b",
            "a == 'open",
            "a..b == 1",
            "a. == 1",
            "a == 1 b",
            "a == #",
            "and a",
        ] {
            assert!(Expression::parse(bad).is_err(), "'{}' should not parse", bad);
        }
    }

    #[test]
    fn test_error_offset_points_at_problem() {
        let err = Expression::parse("speed = 3").unwrap_err();
        assert_eq!(err.offset, 6);
    }
}
