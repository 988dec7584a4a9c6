use std::rc::Rc;

use super::{Interpreter, InterpreterResult};
use crate::array::{ArrayValue, MAX_SIZE};
use crate::ast::{Expr, ExprId};
use crate::error::{ErrorKind, RuntimeError};
use crate::func::Function;
use crate::object::Object;
use crate::token::{Token, TokenType};
use crate::types::{ModifierSet, TypeDescriptor, TypeKind};

impl Interpreter {
    pub fn evaluate_expr(&mut self, expr: &Expr) -> InterpreterResult {
        match expr {
            Expr::Literal { value } => Ok(value.clone()),
            Expr::Grouping { expr: inner } => self.evaluate_expr(inner),
            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),
            Expr::Binary { left, operator, right } => {
                let left = self.evaluate_expr(left)?;
                let right = self.evaluate_expr(right)?;
                self.binary_operation(&left, operator, &right)
            }
            Expr::Logical { left, operator, right } => {
                let left_val = self.evaluate_expr(left)?;

                if operator.token_type == TokenType::Or {
                    if left_val.is_truthy() {
                        return Ok(left_val);
                    }
                } else if !left_val.is_truthy() {
                    return Ok(left_val);
                }

                self.evaluate_expr(right)
            }
            Expr::Ternary { condition, then_branch, else_branch, .. } => {
                if self.evaluate_expr(condition)?.is_truthy() {
                    self.evaluate_expr(then_branch)
                } else {
                    self.evaluate_expr(else_branch)
                }
            }
            Expr::Variable { id, name } => self.lookup_variable(name, *id),
            Expr::This { id, keyword } => self.lookup_variable(keyword, *id),
            Expr::Value { id, keyword } => self.lookup_variable(keyword, *id),
            Expr::Assignment { id, name, operator, value } => {
                self.evaluate_assignment(*id, name, operator, value.as_deref())
            }
            Expr::Call { callee, paren, arguments, generics, null_safe } => {
                self.evaluate_call(callee, paren, arguments, generics, *null_safe)
            }
            Expr::Get { object, name, null_safe } => {
                let object = self.evaluate_expr(object)?;
                if *null_safe && object.is_null() {
                    return Ok(Object::Null);
                }
                self.get_member(&object, name, false)
            }
            Expr::StaticGet { object, name } => {
                let object = self.evaluate_expr(object)?;
                self.get_member(&object, name, true)
            }
            Expr::Set { object, name, operator, value } => {
                self.evaluate_set(object, name, operator, value.as_deref(), false)
            }
            Expr::StaticSet { object, name, operator, value } => {
                self.evaluate_set(object, name, operator, value.as_deref(), true)
            }
            Expr::Index { object, bracket, index } => {
                let target = self.evaluate_expr(object)?;
                let index = self.evaluate_expr(index)?;
                self.index_get(&target, index, bracket)
            }
            Expr::IndexSet { object, bracket, index, operator, value } => {
                self.evaluate_index_set(object, bracket, index, operator, value.as_deref())
            }
            Expr::Super { id, keyword, method } => self.evaluate_super(*id, keyword, method),
            Expr::Cast { expr, keyword, target } => {
                let value = self.evaluate_expr(expr)?;
                let target = self.evaluate_expr(target)?;
                let descriptor = self.type_argument(&target, keyword.line)?;
                self.cast(value, &descriptor, keyword.line)
            }
            Expr::Array { bracket, element_type, elements, size } => {
                self.evaluate_array(bracket, element_type.as_ref(), elements, size.as_deref())
            }
            Expr::Lambda { decl } => {
                let function = Function::user(decl, self.environment.clone(), false);
                Ok(Object::Function(Rc::new(function)))
            }
            Expr::TypeLiteral { descriptor, .. } => {
                Ok(Object::Type(self.resolve_type(descriptor, &self.environment)))
            }
            Expr::Length { keyword, expr } => match self.evaluate_expr(expr)? {
                Object::Array(array) => {
                    let len = array.borrow().len();
                    Ok(Object::Number(len as f64))
                }
                Object::String(s) => Ok(Object::Number(s.chars().count() as f64)),
                other => RuntimeError::err(
                    ErrorKind::InvalidOperand,
                    keyword.line,
                    format!("Cannot take the length of {}.", other.type_of()),
                ),
            },
            Expr::Typeof { expr, .. } => Ok(Object::Type(self.evaluate_expr(expr)?.type_of())),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> InterpreterResult {
        let value = self.evaluate_expr(right)?;
        match operator.token_type {
            TokenType::Minus => {
                if let Object::Number(n) = value {
                    Ok(Object::Number(-n))
                } else {
                    RuntimeError::err(
                        ErrorKind::InvalidOperand,
                        operator.line,
                        "Operand must be a number.",
                    )
                }
            }
            TokenType::Bang => Ok(Object::Boolean(!value.is_truthy())),
            _ => RuntimeError::err(
                ErrorKind::InvalidOperand,
                operator.line,
                format!("Unknown unary operator '{}'.", operator.lexeme),
            ),
        }
    }

    fn evaluate_assignment(
        &mut self,
        id: ExprId,
        name: &Token,
        operator: &Token,
        value: Option<&Expr>,
    ) -> InterpreterResult {
        let rhs = match value {
            Some(expr) => Some(self.evaluate_expr(expr)?),
            None => None,
        };

        let new_value = if operator.token_type == TokenType::Equal {
            rhs.unwrap_or(Object::Null)
        } else {
            // Compound operators need an existing binding to start from.
            let current = self.lookup_variable(name, id)?;
            self.apply_compound(current, operator, rhs)?
        };

        self.assign_variable(name, id, new_value.clone())?;
        Ok(new_value)
    }

    fn evaluate_call(
        &mut self,
        callee: &Expr,
        paren: &Token,
        arguments: &[Expr],
        generics: &[Expr],
        null_safe: bool,
    ) -> InterpreterResult {
        let callee = self.evaluate_expr(callee)?;
        if null_safe && callee.is_null() {
            return Ok(Object::Null);
        }

        let mut args = Vec::with_capacity(arguments.len());
        for arg in arguments {
            args.push(self.evaluate_expr(arg)?);
        }

        let mut generic_args = Vec::with_capacity(generics.len());
        for generic in generics {
            generic_args.push(self.evaluate_expr(generic)?);
        }

        match callee {
            Object::Function(function) => {
                if function.modifiers.contains(ModifierSet::OPERATOR) {
                    return RuntimeError::err(
                        ErrorKind::ModifierViolation,
                        paren.line,
                        format!(
                            "Operator method '{}' can only be invoked through its operator.",
                            function.name
                        ),
                    );
                }

                tracing::trace!(function = %function.name, line = paren.line, "call");
                function.call(self, args, &generic_args, paren.line)
            }
            Object::Class(class) => self.construct(&class, args, &generic_args, paren.line),
            _ => RuntimeError::err(
                ErrorKind::InvalidCall,
                paren.line,
                "Can only call functions and classes.",
            ),
        }
    }

    fn evaluate_set(
        &mut self,
        object: &Expr,
        name: &Token,
        operator: &Token,
        value: Option<&Expr>,
        static_access: bool,
    ) -> InterpreterResult {
        let target = self.evaluate_expr(object)?;
        let rhs = match value {
            Some(expr) => Some(self.evaluate_expr(expr)?),
            None => None,
        };

        let new_value = if operator.token_type == TokenType::Equal {
            rhs.unwrap_or(Object::Null)
        } else {
            let current = self.get_member(&target, name, static_access)?;
            self.apply_compound(current, operator, rhs)?
        };

        self.set_member(&target, name, new_value.clone(), static_access)?;
        Ok(new_value)
    }

    fn index_get(&mut self, target: &Object, index: Object, bracket: &Token) -> InterpreterResult {
        match target {
            Object::Array(array) => {
                let i = array_index(&index, bracket)?;
                let value = array.borrow().get(i, bracket.line)?;
                Ok(value)
            }
            _ => self.invoke_method(target, "getAt", vec![index], bracket.line),
        }
    }

    fn evaluate_index_set(
        &mut self,
        object: &Expr,
        bracket: &Token,
        index: &Expr,
        operator: &Token,
        value: Option<&Expr>,
    ) -> InterpreterResult {
        let target = self.evaluate_expr(object)?;
        let index = self.evaluate_expr(index)?;
        let rhs = match value {
            Some(expr) => Some(self.evaluate_expr(expr)?),
            None => None,
        };

        let new_value = if operator.token_type == TokenType::Equal {
            rhs.unwrap_or(Object::Null)
        } else {
            let current = self.index_get(&target, index.clone(), bracket)?;
            self.apply_compound(current, operator, rhs)?
        };

        match &target {
            Object::Array(array) => {
                let i = array_index(&index, bracket)?;
                array.borrow_mut().set(i, new_value.clone(), bracket.line)?;
            }
            _ => {
                self.invoke_method(&target, "setAt", vec![index, new_value.clone()], bracket.line)?;
            }
        }

        Ok(new_value)
    }

    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> InterpreterResult {
        let Some(&distance) = self.locals.get(&id) else {
            return Err(RuntimeError::undefined_variable(keyword.line, "super"));
        };

        let superclass = self.environment.borrow().get_at(distance, keyword)?;
        let superclass = match self.read_cell(superclass, keyword.line)? {
            Object::Class(c) => c,
            _ => {
                return RuntimeError::err(
                    ErrorKind::InvalidOperand,
                    keyword.line,
                    "Superclass is not a class.",
                )
            }
        };

        let this = Token::synthetic("this", keyword.line);
        let instance = self.environment.borrow().get_at(distance - 1, &this)?;
        let instance = self.read_cell(instance, keyword.line)?;

        let found = superclass.borrow().find_method(&method.lexeme);
        match found {
            Some(found) => Ok(Object::Function(found.bind(instance))),
            None => Err(RuntimeError::undefined_property(method.line, &method.lexeme)),
        }
    }

    fn evaluate_array(
        &mut self,
        bracket: &Token,
        element_type: Option<&TypeDescriptor>,
        elements: &[Expr],
        size: Option<&Expr>,
    ) -> InterpreterResult {
        let element_type = element_type.map(|t| self.resolve_type(t, &self.environment));

        if let Some(size) = size {
            let size = match self.evaluate_expr(size)? {
                Object::Number(n) if n.is_finite() && n >= 0.0 && n.round() <= MAX_SIZE as f64 => {
                    n.round() as usize
                }
                Object::Number(n) if n.is_finite() && n >= 0.0 => {
                    return RuntimeError::err(
                        ErrorKind::InvalidOperand,
                        bracket.line,
                        format!("Array size {n} exceeds the limit of {MAX_SIZE} elements."),
                    )
                }
                other => {
                    return RuntimeError::err(
                        ErrorKind::InvalidOperand,
                        bracket.line,
                        format!("Array size must be a non-negative number, got {other}."),
                    )
                }
            };
            let element_type = element_type.unwrap_or_else(TypeDescriptor::any);
            return Ok(Object::Array(ArrayValue::with_size(element_type, size).as_shared()));
        }

        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            values.push(self.evaluate_expr(element)?);
        }

        let element_type = match (element_type, values.first()) {
            (Some(t), _) => t,
            (None, Some(first)) if !first.is_null() => first.type_of(),
            _ => TypeDescriptor::any(),
        };

        for (i, value) in values.iter().enumerate() {
            if !value.conforms_to(&element_type) {
                return RuntimeError::err(
                    ErrorKind::TypeMismatch,
                    bracket.line,
                    format!(
                        "Array element {i} is {} but the array holds {element_type}.",
                        value.type_of()
                    ),
                );
            }
        }

        Ok(Object::Array(ArrayValue::new(element_type, values).as_shared()))
    }

    /// The descriptor named by a type-like value: a type literal, a class,
    /// an interface or an enum.
    pub(crate) fn type_argument(&self, value: &Object, line: i32) -> Result<TypeDescriptor, RuntimeError> {
        match value {
            Object::Type(t) => Ok(t.clone()),
            Object::Class(c) => Ok(TypeDescriptor::object(c.borrow().name.clone())),
            Object::Interface(i) => Ok(TypeDescriptor::object(i.name.clone())),
            Object::Enum(e) => Ok(TypeDescriptor::object(e.name.clone())),
            other => RuntimeError::err(
                ErrorKind::TypeMismatch,
                line,
                format!("Expected a type, got {}.", other.type_of()),
            ),
        }
    }

    fn cast(&mut self, value: Object, target: &TypeDescriptor, line: i32) -> InterpreterResult {
        if value.conforms_to(target) && !value.is_null() {
            return Ok(value);
        }

        let failure = |value: &Object| {
            RuntimeError::new(
                ErrorKind::CastFailure,
                line,
                format!("Cannot cast {} to {target}.", value.type_of()),
            )
        };

        if let Object::Instance(_) = value {
            if target.kind != TypeKind::String || target.is_array() {
                return self.cast_instance(value, target, line);
            }
        }

        if target.is_array() {
            return Err(failure(&value));
        }

        match target.kind {
            TypeKind::Number => match &value {
                Object::String(s) => s.trim().parse::<f64>().map(Object::Number).map_err(|_| {
                    RuntimeError::new(
                        ErrorKind::CastFailure,
                        line,
                        format!("Cannot cast \"{s}\" to {target}."),
                    )
                }),
                Object::Boolean(b) => Ok(Object::Number(if *b { 1.0 } else { 0.0 })),
                _ => Err(failure(&value)),
            },
            TypeKind::String => Ok(Object::String(self.stringify(&value)?)),
            TypeKind::Boolean => match &value {
                Object::Number(n) => Ok(Object::Boolean(*n != 0.0)),
                Object::String(s) if s == "true" => Ok(Object::Boolean(true)),
                Object::String(s) if s == "false" => Ok(Object::Boolean(false)),
                _ => Err(failure(&value)),
            },
            TypeKind::Any => Ok(value),
            _ => Err(failure(&value)),
        }
    }

    /// Instances convert through a `cast` method named `to<Type>`, with `[]`
    /// spelled `Array`.
    fn cast_instance(&mut self, value: Object, target: &TypeDescriptor, line: i32) -> InterpreterResult {
        let Object::Instance(instance) = &value else {
            return RuntimeError::err(ErrorKind::CastFailure, line, "Only instances have cast methods.");
        };

        let class = instance.borrow().class.clone();
        let class_name = class.borrow().name.clone();
        let method_name = cast_method_name(target);
        let method = class.borrow().find_method(&method_name);

        let Some(method) = method else {
            return RuntimeError::err(
                ErrorKind::CastFailure,
                line,
                format!("Class '{class_name}' has no cast method '{method_name}' for {target}."),
            );
        };

        if !method.modifiers.contains(ModifierSet::CAST) {
            return RuntimeError::err(
                ErrorKind::CastFailure,
                line,
                format!("Method '{method_name}' of class '{class_name}' is not tagged 'cast'."),
            );
        }

        if method.arity() != 0 {
            return RuntimeError::err(
                ErrorKind::CastFailure,
                line,
                format!("Cast method '{method_name}' of class '{class_name}' must take no parameters."),
            );
        }

        if !method.return_type.matches(target) {
            return RuntimeError::err(
                ErrorKind::CastFailure,
                line,
                format!(
                    "Cast method '{method_name}' of class '{class_name}' must return {target}, not {}.",
                    method.return_type
                ),
            );
        }

        let result = method.bind(value.clone()).call(self, vec![], &[], line)?;
        if !result.conforms_to(target) {
            return RuntimeError::err(
                ErrorKind::CastFailure,
                line,
                format!("Cast method '{method_name}' returned {} instead of {target}.", result.type_of()),
            );
        }

        Ok(result)
    }
}

fn array_index(index: &Object, bracket: &Token) -> Result<f64, RuntimeError> {
    index.number().ok_or_else(|| {
        RuntimeError::new(
            ErrorKind::InvalidOperand,
            bracket.line,
            format!("Array index must be a number, got {}.", index.type_of()),
        )
    })
}

fn cast_method_name(target: &TypeDescriptor) -> String {
    let name = target.name.replace("[]", "Array");
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("to{}{}", first.to_uppercase(), chars.as_str()),
        None => "to".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cast_method_names() {
        assert_eq!(cast_method_name(&TypeDescriptor::object("Point")), "toPoint");
        assert_eq!(cast_method_name(&TypeDescriptor::number()), "toNum");
        assert_eq!(cast_method_name(&TypeDescriptor::object("Point").array_of()), "toPointArray");
    }

    #[test]
    fn unknown_unary_operator_is_an_error() {
        let expr = Expr::Unary {
            operator: Token::new(TokenType::Plus, "+", None, 1),
            right: Box::new(Expr::boolean_literal(true)),
        };

        let err = Interpreter::new().evaluate_expr(&expr).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidOperand);
    }
}
