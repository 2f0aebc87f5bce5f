use super::lexer::{Token, TokenKind};
use super::parser::{Nesting, Parser};
use crate::error::ParseError;
use crate::ir::{BinaryOperator, Expression, UnaryOperator};

/// Parses one expression from the front of `tokens` and reports how many
/// tokens it used. Parsing stops at the first token that cannot continue the
/// expression.
pub fn parse_expression(tokens: &[Token]) -> Result<(Expression, usize), ParseError> {
    let mut parser = Parser::new(tokens);
    let expression = parser.parse_expression()?;
    Ok((expression, parser.position))
}

fn or_operator(kind: &TokenKind) -> Option<BinaryOperator> {
    matches!(kind, TokenKind::Or).then_some(BinaryOperator::Or)
}

fn and_operator(kind: &TokenKind) -> Option<BinaryOperator> {
    matches!(kind, TokenKind::And).then_some(BinaryOperator::And)
}

fn comparison_operator(kind: &TokenKind) -> Option<BinaryOperator> {
    match kind {
        TokenKind::Equal => Some(BinaryOperator::Equal),
        TokenKind::NotEqual => Some(BinaryOperator::NotEqual),
        TokenKind::Less => Some(BinaryOperator::Less),
        TokenKind::LessEqual => Some(BinaryOperator::LessEqual),
        TokenKind::Greater => Some(BinaryOperator::Greater),
        TokenKind::GreaterEqual => Some(BinaryOperator::GreaterEqual),
        _ => None,
    }
}

fn additive_operator(kind: &TokenKind) -> Option<BinaryOperator> {
    match kind {
        TokenKind::Plus => Some(BinaryOperator::Add),
        TokenKind::Minus => Some(BinaryOperator::Subtract),
        _ => None,
    }
}

fn multiplicative_operator(kind: &TokenKind) -> Option<BinaryOperator> {
    match kind {
        TokenKind::Star => Some(BinaryOperator::Multiply),
        TokenKind::Slash => Some(BinaryOperator::Divide),
        TokenKind::Mod => Some(BinaryOperator::Modulo),
        _ => None,
    }
}

type Level<'a> = fn(&mut Parser<'a>) -> Result<Expression, ParseError>;

impl<'a> Parser<'a> {
    /// `expression := or`
    pub(super) fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_or()
    }

    /// One left-associative level: `next (op next)*`.
    fn parse_binary_level(
        &mut self,
        next: Level<'a>,
        operator: fn(&TokenKind) -> Option<BinaryOperator>,
    ) -> Result<Expression, ParseError> {
        let mut left = next(self)?;

        while let Some(op) = self.peek_kind().and_then(operator) {
            self.advance(); // consume operator
            let right = next(self)?;
            left = Expression::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary_level(Self::parse_and, or_operator)
    }

    fn parse_and(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary_level(Self::parse_comparison, and_operator)
    }

    fn parse_comparison(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary_level(Self::parse_additive, comparison_operator)
    }

    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary_level(Self::parse_multiplicative, additive_operator)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary_level(Self::parse_unary, multiplicative_operator)
    }

    /// `unary := ("NO" | "-") unary | primary`
    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let op = match self.peek_kind() {
            Some(TokenKind::Not) => UnaryOperator::Not,
            Some(TokenKind::Minus) => UnaryOperator::Negate,
            _ => return self.parse_primary(),
        };
        let line = self.line();
        self.advance(); // consume operator
        let operand = self.nested(Nesting::Operator, line, Self::parse_unary)?;
        Ok(Expression::UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let expression = match self.peek_kind() {
            Some(TokenKind::Integer(n)) => Expression::Integer(*n),
            Some(TokenKind::Decimal(d)) => Expression::Decimal(*d),
            Some(TokenKind::Text(s)) => Expression::Text(s.clone()),
            Some(TokenKind::True) => Expression::Boolean(true),
            Some(TokenKind::False) => Expression::Boolean(false),
            Some(TokenKind::Identifier(name)) => Expression::Variable(name.clone()),
            Some(TokenKind::LParen) => {
                let line = self.line();
                self.advance(); // consume '('
                let inner = self.nested(Nesting::Operator, line, Self::parse_expression)?;
                self.expect(&TokenKind::RParen, "')'")?;
                return Ok(inner);
            }
            _ => return Err(self.unexpected("a number, text, variable or '('")),
        };
        self.advance();
        Ok(expression)
    }
}
