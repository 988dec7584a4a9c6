use super::{Interpreter, InterpreterResult};
use crate::error::{ErrorKind, RuntimeError};
use crate::object::Object;
use crate::token::{Token, TokenType};
use crate::types::ModifierSet;

/// The method an instance provides to overload `operator`.
fn operator_method(operator: TokenType) -> Option<&'static str> {
    let name = match operator {
        TokenType::Plus => "add",
        TokenType::Minus => "subtract",
        TokenType::Star => "multiply",
        TokenType::Slash => "divide",
        TokenType::EqualEqual => "equal",
        TokenType::BangEqual => "notEqual",
        TokenType::Less => "less",
        TokenType::LessEqual => "lessEqual",
        TokenType::Greater => "greater",
        TokenType::GreaterEqual => "greaterEqual",
        _ => return None,
    };
    Some(name)
}

impl Interpreter {
    pub(crate) fn binary_operation(
        &mut self,
        left: &Object,
        operator: &Token,
        right: &Object,
    ) -> InterpreterResult {
        match operator.token_type {
            TokenType::QuestionQuestion => {
                return Ok(if left.is_null() { right.clone() } else { left.clone() });
            }
            TokenType::QuestionEqual => {
                if left.is_null() || right.is_null() {
                    return Ok(Object::Null);
                }
                let equal = Token { token_type: TokenType::EqualEqual, ..operator.clone() };
                return self.binary_operation(left, &equal, right);
            }
            _ => {}
        }

        if let Some(result) = self.dispatch_operator(left, operator, right)? {
            return Ok(result);
        }

        let line = operator.line;
        match operator.token_type {
            TokenType::Plus => match (left, right) {
                (Object::Number(l), Object::Number(r)) => Ok(Object::Number(l + r)),
                (Object::String(l), Object::String(r)) => Ok(Object::String(format!("{l}{r}"))),
                _ => {
                    let l = self.stringify(left)?;
                    let r = self.stringify(right)?;
                    Ok(Object::String(format!("{l}{r}")))
                }
            },
            TokenType::Minus => numbers(left, right, line).map(|(l, r)| Object::Number(l - r)),
            TokenType::Slash => numbers(left, right, line).map(|(l, r)| Object::Number(l / r)),
            TokenType::Star => numbers(left, right, line).map(|(l, r)| Object::Number(l * r)),
            TokenType::Greater => numbers(left, right, line).map(|(l, r)| Object::Boolean(l > r)),
            TokenType::GreaterEqual => {
                numbers(left, right, line).map(|(l, r)| Object::Boolean(l >= r))
            }
            TokenType::Less => numbers(left, right, line).map(|(l, r)| Object::Boolean(l < r)),
            TokenType::LessEqual => numbers(left, right, line).map(|(l, r)| Object::Boolean(l <= r)),
            TokenType::EqualEqual => Ok(Object::Boolean(left == right)),
            TokenType::BangEqual => Ok(Object::Boolean(left != right)),
            _ => RuntimeError::err(
                ErrorKind::InvalidOperand,
                line,
                format!("Unknown binary operator '{}'.", operator.lexeme),
            ),
        }
    }

    /// Runs the overload for `operator` when either operand is an instance.
    /// The left operand is asked first. Without an overload, `==` and `!=`
    /// compare identity and `+` with a string operand concatenates; any
    /// other operator on an instance fails.
    fn dispatch_operator(
        &mut self,
        left: &Object,
        operator: &Token,
        right: &Object,
    ) -> Result<Option<Object>, RuntimeError> {
        let Some(name) = operator_method(operator.token_type) else {
            return Ok(None);
        };

        let receiver = match (left, right) {
            (Object::Instance(_), _) => left,
            (_, Object::Instance(_)) => right,
            _ => return Ok(None),
        };

        let Object::Instance(instance) = receiver else {
            return Ok(None);
        };

        let class = instance.borrow().class.clone();
        let method = class.borrow().find_method(name);
        let Some(method) = method else {
            let concatenates = operator.token_type == TokenType::Plus
                && (matches!(left, Object::String(_)) || matches!(right, Object::String(_)));
            if concatenates
                || matches!(operator.token_type, TokenType::EqualEqual | TokenType::BangEqual)
            {
                return Ok(None);
            }

            let class_name = class.borrow().name.clone();
            return RuntimeError::err(
                ErrorKind::UndefinedProperty,
                operator.line,
                format!(
                    "Class '{class_name}' does not define operator method '{name}' for '{}'.",
                    operator.lexeme
                ),
            );
        };

        if !method.modifiers.contains(ModifierSet::OPERATOR) {
            return RuntimeError::err(
                ErrorKind::ModifierViolation,
                operator.line,
                format!("Method '{name}' must be tagged 'operator' to overload '{}'.", operator.lexeme),
            );
        }

        tracing::trace!(method = name, line = operator.line, "operator overload");
        let result =
            method.bind(receiver.clone()).call(self, vec![left.clone(), right.clone()], &[], operator.line)?;
        Ok(Some(result))
    }

    /// The new value produced by a compound assignment operator applied to
    /// `current`. `++` and `--` take no right-hand side.
    pub(crate) fn apply_compound(
        &mut self,
        current: Object,
        operator: &Token,
        rhs: Option<Object>,
    ) -> InterpreterResult {
        let line = operator.line;
        let binary = |token_type: TokenType| Token { token_type, ..operator.clone() };

        match operator.token_type {
            TokenType::PlusPlus | TokenType::MinusMinus => {
                let Object::Number(n) = current else {
                    return RuntimeError::err(
                        ErrorKind::InvalidOperand,
                        line,
                        format!("Operand of '{}' must be a number.", operator.lexeme),
                    );
                };
                let delta = if operator.token_type == TokenType::PlusPlus { 1.0 } else { -1.0 };
                Ok(Object::Number(n + delta))
            }
            TokenType::StarStarEqual => {
                let rhs = rhs.unwrap_or(Object::Null);
                let (base, exponent) = numbers(&current, &rhs, line)?;
                Ok(Object::Number(base.powf(exponent)))
            }
            TokenType::PlusEqual
            | TokenType::MinusEqual
            | TokenType::StarEqual
            | TokenType::SlashEqual => {
                let token_type = match operator.token_type {
                    TokenType::PlusEqual => TokenType::Plus,
                    TokenType::MinusEqual => TokenType::Minus,
                    TokenType::StarEqual => TokenType::Star,
                    _ => TokenType::Slash,
                };
                let rhs = rhs.unwrap_or(Object::Null);
                self.binary_operation(&current, &binary(token_type), &rhs)
            }
            _ => Ok(rhs.unwrap_or(Object::Null)),
        }
    }
}

fn numbers(left: &Object, right: &Object, line: i32) -> Result<(f64, f64), RuntimeError> {
    match (left, right) {
        (Object::Number(l), Object::Number(r)) => Ok((*l, *r)),
        _ => RuntimeError::err(ErrorKind::InvalidOperand, line, "Operands must be numbers."),
    }
}
