use std::cmp::Ordering;

use super::environment::Environment;
use super::value::Value;
use crate::error::EvalError;
use crate::ir::{BinaryOperator, Expression, UnaryOperator};

/// Evaluates `expression` against `env`. Never mutates anything.
pub fn evaluate(expression: &Expression, env: &Environment) -> Result<Value, EvalError> {
    match expression {
        Expression::Integer(n) => Ok(Value::Integer(*n)),
        Expression::Decimal(d) => Ok(Value::Decimal(*d)),
        Expression::Text(s) => Ok(Value::Text(s.clone())),
        Expression::Boolean(b) => Ok(Value::Boolean(*b)),
        Expression::Variable(name) => env.get(name).cloned(),
        Expression::UnaryOp { op, operand } => {
            let value = evaluate(operand, env)?;
            eval_unary(*op, value)
        }
        Expression::BinaryOp { left, op, right } => {
            // Both sides always run, so a type error on the right is never
            // hidden by the left.
            let left = evaluate(left, env)?;
            let right = evaluate(right, env)?;
            eval_binary(*op, left, right)
        }
    }
}

fn mismatch(operator: &str, left: &Value, right: Option<&Value>) -> EvalError {
    EvalError::TypeMismatch {
        operator: operator.to_string(),
        left: left.type_name(),
        right: right.map(Value::type_name),
    }
}

fn eval_unary(op: UnaryOperator, value: Value) -> Result<Value, EvalError> {
    match (op, value) {
        (UnaryOperator::Negate, Value::Integer(n)) => n
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| EvalError::Overflow {
                operator: op.symbol().to_string(),
            }),
        (UnaryOperator::Negate, Value::Decimal(d)) => Ok(Value::Decimal(-d)),
        (UnaryOperator::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        (op, value) => Err(mismatch(op.symbol(), &value, None)),
    }
}

fn eval_binary(op: BinaryOperator, left: Value, right: Value) -> Result<Value, EvalError> {
    if op.is_arithmetic() {
        eval_arithmetic(op, &left, &right)
    } else if op.is_comparison() {
        eval_comparison(op, &left, &right)
    } else {
        eval_logical(op, &left, &right)
    }
}

fn eval_arithmetic(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value, EvalError> {
    use BinaryOperator::{Add, Divide, Modulo, Multiply, Subtract};

    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => {
            let (a, b) = (*a, *b);
            if matches!(op, Divide | Modulo) && b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            let result = match op {
                Add => a.checked_add(b),
                Subtract => a.checked_sub(b),
                Multiply => a.checked_mul(b),
                Divide => a.checked_div(b),
                Modulo => a.checked_rem(b),
                _ => None,
            };
            result.map(Value::Integer).ok_or_else(|| EvalError::Overflow {
                operator: op.symbol().to_string(),
            })
        }
        _ => {
            let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
                return Err(mismatch(op.symbol(), left, Some(right)));
            };
            if matches!(op, Divide | Modulo) && b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            let result = match op {
                Add => a + b,
                Subtract => a - b,
                Multiply => a * b,
                Divide => a / b,
                Modulo => a % b,
                _ => return Err(mismatch(op.symbol(), left, Some(right))),
            };
            Ok(Value::Decimal(result))
        }
    }
}

fn eval_comparison(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value, EvalError> {
    use BinaryOperator::{Equal, Greater, GreaterEqual, Less, LessEqual, NotEqual};

    let ordering = match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) if matches!(op, Equal | NotEqual) => Some(a.cmp(b)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => return Err(mismatch(op.symbol(), left, Some(right))),
        },
    };

    // NaN compares unequal to everything.
    let result = match (op, ordering) {
        (NotEqual, None) => true,
        (_, None) => false,
        (Equal, Some(o)) => o == Ordering::Equal,
        (NotEqual, Some(o)) => o != Ordering::Equal,
        (Less, Some(o)) => o == Ordering::Less,
        (LessEqual, Some(o)) => o != Ordering::Greater,
        (Greater, Some(o)) => o == Ordering::Greater,
        (GreaterEqual, Some(o)) => o != Ordering::Less,
        _ => return Err(mismatch(op.symbol(), left, Some(right))),
    };
    Ok(Value::Boolean(result))
}

fn eval_logical(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (op, left, right) {
        (BinaryOperator::And, Value::Boolean(a), Value::Boolean(b)) => Ok(Value::Boolean(*a && *b)),
        (BinaryOperator::Or, Value::Boolean(a), Value::Boolean(b)) => Ok(Value::Boolean(*a || *b)),
        _ => Err(mismatch(op.symbol(), left, Some(right))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{expression::parse_expression, lexer::tokenize};

    fn eval_in(source: &str, env: &Environment) -> Result<Value, EvalError> {
        let tokens = tokenize(source).unwrap();
        let (expression, _) = parse_expression(&tokens).unwrap();
        evaluate(&expression, env)
    }

    fn eval(source: &str) -> Result<Value, EvalError> {
        eval_in(source, &Environment::new())
    }

    #[test]
    fn integer_arithmetic() {
        assert_eq!(eval("2 + 3 * 4"), Ok(Value::Integer(14)));
        assert_eq!(eval("7 / 2"), Ok(Value::Integer(3)));
        assert_eq!(eval("-7 / 2"), Ok(Value::Integer(-3)));
        assert_eq!(eval("7 MOD 3"), Ok(Value::Integer(1)));
        assert_eq!(eval("(1 + 2) * -3"), Ok(Value::Integer(-9)));
    }

    #[test]
    fn mixed_operands_promote_to_decimal() {
        assert_eq!(eval("1 + 0.5"), Ok(Value::Decimal(1.5)));
        assert_eq!(eval("7 / 2.0"), Ok(Value::Decimal(3.5)));
        assert_eq!(eval("2 = 2.0"), Ok(Value::Boolean(true)));
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(eval("1 / 0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("1 MOD 0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("1.5 / 0.0"), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn overflow_is_reported() {
        assert_eq!(
            eval("9223372036854775807 + 1"),
            Err(EvalError::Overflow { operator: "+".into() })
        );
        assert!(matches!(
            eval("(-9223372036854775807 - 1) / -1"),
            Err(EvalError::Overflow { .. })
        ));
    }

    #[test]
    fn comparisons() {
        assert_eq!(eval("3 > 2"), Ok(Value::Boolean(true)));
        assert_eq!(eval("\"abc\" < \"abd\""), Ok(Value::Boolean(true)));
        assert_eq!(eval("VERDADERO <> FALSO"), Ok(Value::Boolean(true)));
        assert_eq!(
            eval("VERDADERO < FALSO"),
            Err(EvalError::TypeMismatch {
                operator: "<".into(),
                left: "LOGICO",
                right: Some("LOGICO")
            })
        );
        assert_eq!(
            eval("1 = \"1\""),
            Err(EvalError::TypeMismatch {
                operator: "=".into(),
                left: "ENTERO",
                right: Some("CADENA")
            })
        );
    }

    #[test]
    fn logic_needs_booleans_and_evaluates_both_sides() {
        assert_eq!(eval("VERDADERO O FALSO"), Ok(Value::Boolean(true)));
        assert_eq!(eval("NO (1 < 2) Y VERDADERO"), Ok(Value::Boolean(false)));
        assert!(matches!(eval("1 Y VERDADERO"), Err(EvalError::TypeMismatch { .. })));
        assert_eq!(
            eval("FALSO Y falta"),
            Err(EvalError::UndefinedVariable("falta".into()))
        );
        assert!(matches!(eval("NO 1"), Err(EvalError::TypeMismatch { right: None, .. })));
    }

    #[test]
    fn variables_come_from_the_environment() {
        let mut env = Environment::new();
        env.set("x", Value::Integer(5));
        assert_eq!(eval_in("x * 2", &env), Ok(Value::Integer(10)));
        assert_eq!(eval_in("y", &env), Err(EvalError::UndefinedVariable("y".into())));
        assert_eq!(env.get("x"), Ok(&Value::Integer(5)));
    }

    #[test]
    fn text_is_not_arithmetic() {
        assert!(matches!(
            eval("\"a\" + \"b\""),
            Err(EvalError::TypeMismatch { left: "CADENA", .. })
        ));
    }
}
