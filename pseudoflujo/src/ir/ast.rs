use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expression {
    /// 10, 42
    Integer(i64),
    /// 3.25
    Decimal(f64),
    /// "hola", "dijo ""si"""
    Text(String),
    /// VERDADERO, FALSO
    Boolean(bool),
    /// x, contador
    Variable(String),
    /// x + 1, a > b, p Y q
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    /// -x, NO p
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOperator {
    Add,          // +
    Subtract,     // -
    Multiply,     // *
    Divide,       // /
    Modulo,       // MOD
    Equal,        // =
    NotEqual,     // <>
    Less,         // <
    LessEqual,    // <=
    Greater,      // >
    GreaterEqual, // >=
    And,          // Y
    Or,           // O
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOperator {
    Negate, // -
    Not,    // NO
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "MOD",
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::And => "Y",
            Self::Or => "O",
        }
    }

    /// Binding strength, higher binds tighter. Mirrors the parser's levels.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Equal
            | Self::NotEqual
            | Self::Less
            | Self::LessEqual
            | Self::Greater
            | Self::GreaterEqual => 3,
            Self::Add | Self::Subtract => 4,
            Self::Multiply | Self::Divide | Self::Modulo => 5,
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        self.precedence() >= 4
    }

    pub fn is_comparison(&self) -> bool {
        self.precedence() == 3
    }
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Negate => "-",
            Self::Not => "NO",
        }
    }
}

/// Decimal literals always keep a fractional part so they lex back as decimals.
pub fn format_decimal(value: f64) -> String {
    let text = value.to_string();
    if text.contains('.') || !value.is_finite() {
        text
    } else {
        format!("{text}.0")
    }
}

pub fn quote_text(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

impl Expression {
    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parent: u8, right_side: bool) -> fmt::Result {
        match self {
            Expression::BinaryOp { op, .. }
                if op.precedence() < parent || (right_side && op.precedence() == parent) =>
            {
                write!(f, "({self})")
            }
            _ => write!(f, "{self}"),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Integer(n) => write!(f, "{n}"),
            Expression::Decimal(d) => write!(f, "{}", format_decimal(*d)),
            Expression::Text(s) => write!(f, "{}", quote_text(s)),
            Expression::Boolean(true) => write!(f, "VERDADERO"),
            Expression::Boolean(false) => write!(f, "FALSO"),
            Expression::Variable(name) => write!(f, "{name}"),
            Expression::BinaryOp { left, op, right } => {
                left.fmt_operand(f, op.precedence(), false)?;
                write!(f, " {} ", op.symbol())?;
                right.fmt_operand(f, op.precedence(), true)
            }
            Expression::UnaryOp { op, operand } => {
                match op {
                    UnaryOperator::Negate => write!(f, "-")?,
                    UnaryOperator::Not => write!(f, "NO ")?,
                }
                match operand.as_ref() {
                    Expression::BinaryOp { .. } => write!(f, "({operand})"),
                    _ => write!(f, "{operand}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Box<Expression> {
        Box::new(Expression::Variable(name.to_string()))
    }

    #[test]
    fn display_keeps_only_needed_parentheses() {
        let sum = Expression::BinaryOp {
            left: var("a"),
            op: BinaryOperator::Add,
            right: var("b"),
        };
        let product = Expression::BinaryOp {
            left: Box::new(sum.clone()),
            op: BinaryOperator::Multiply,
            right: var("c"),
        };
        assert_eq!(product.to_string(), "(a + b) * c");

        let right_nested = Expression::BinaryOp {
            left: var("x"),
            op: BinaryOperator::Subtract,
            right: Box::new(Expression::BinaryOp {
                left: var("y"),
                op: BinaryOperator::Subtract,
                right: var("z"),
            }),
        };
        assert_eq!(right_nested.to_string(), "x - (y - z)");
    }

    #[test]
    fn literals_render_as_source() {
        assert_eq!(Expression::Decimal(5.0).to_string(), "5.0");
        assert_eq!(Expression::Decimal(2.5).to_string(), "2.5");
        assert_eq!(Expression::Text("di \"hola\"".into()).to_string(), "\"di \"\"hola\"\"\"");
        assert_eq!(Expression::Boolean(false).to_string(), "FALSO");
        let not = Expression::UnaryOp {
            op: UnaryOperator::Not,
            operand: Box::new(Expression::BinaryOp {
                left: var("a"),
                op: BinaryOperator::Equal,
                right: var("b"),
            }),
        };
        assert_eq!(not.to_string(), "NO (a = b)");
    }
}
