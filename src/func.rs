use std::fmt::{Debug, Display};
use std::rc::Rc;

use crate::ast::{FunctionDecl, Parameter, Stmt};
use crate::environment::Environment;
use crate::error::{ErrorKind, RuntimeError, Warning, WarningKind};
use crate::interpreter::{ExecutionOutcome, Interpreter};
use crate::object::Object;
use crate::property::{check_numeric_modifiers, StorageCell};
use crate::token::Token;
use crate::types::{ModifierSet, TypeDescriptor, TypeKind};
use crate::Shared;

/// A host-implemented function. Bound native methods receive their receiver
/// as the first argument, ahead of the `arity()` declared ones.
pub trait Callable: Debug {
    fn arity(&self) -> usize;
    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Object>,
        generics: &[Object],
    ) -> Result<Object, RuntimeError>;
}

#[derive(Clone)]
pub enum FunctionBody {
    User { body: Rc<Vec<Stmt>>, closure: Shared<Environment> },
    Native { callable: Rc<dyn Callable>, receiver: Option<Object> },
    Abstract,
}

#[derive(Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<Parameter>,
    pub return_type: TypeDescriptor,
    pub modifiers: ModifierSet,
    pub body: FunctionBody,
    pub is_constructor: bool,
}

impl Function {
    pub fn user(decl: &FunctionDecl, closure: Shared<Environment>, is_constructor: bool) -> Self {
        let body = match &decl.body {
            Some(body) => FunctionBody::User { body: body.clone(), closure },
            None => FunctionBody::Abstract,
        };

        Self {
            name: decl.name.lexeme.clone(),
            params: decl.params.clone(),
            return_type: decl.return_type.clone(),
            modifiers: decl.modifiers,
            body,
            is_constructor,
        }
    }

    pub fn native(name: &str, callable: Rc<dyn Callable>) -> Self {
        let params = (0..callable.arity())
            .map(|i| Parameter {
                name: Token::synthetic(&format!("arg{i}"), -1),
                declared_type: TypeDescriptor::any(),
                modifiers: ModifierSet::empty(),
            })
            .collect();

        Self {
            name: name.to_owned(),
            params,
            return_type: TypeDescriptor::any(),
            modifiers: ModifierSet::empty(),
            body: FunctionBody::Native { callable, receiver: None },
            is_constructor: false,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn has_body(&self) -> bool {
        !matches!(self.body, FunctionBody::Abstract)
    }

    pub fn param_types(&self) -> Vec<TypeDescriptor> {
        self.params.iter().map(|p| p.declared_type.clone()).collect()
    }

    pub fn signature(&self) -> TypeDescriptor {
        TypeDescriptor::function(&self.param_types(), &self.return_type)
    }

    /// A copy of this function that sees `receiver` as `this`.
    pub fn bind(&self, receiver: Object) -> Rc<Function> {
        let body = match &self.body {
            FunctionBody::User { body, closure } => {
                let scope = match &receiver {
                    Object::Instance(instance) => instance.borrow().scope_for(closure),
                    _ => None,
                };
                let enclosing = scope.unwrap_or_else(|| closure.clone());
                let env = Environment::new().with_enclosing(enclosing).as_shared();
                env.borrow_mut().define_value("this", receiver);
                FunctionBody::User { body: body.clone(), closure: env }
            }
            FunctionBody::Native { callable, .. } => {
                FunctionBody::Native { callable: callable.clone(), receiver: Some(receiver) }
            }
            FunctionBody::Abstract => FunctionBody::Abstract,
        };

        Rc::new(Self { body, ..self.clone() })
    }

    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Object>,
        generics: &[Object],
        line: i32,
    ) -> Result<Object, RuntimeError> {
        if arguments.len() != self.arity() {
            return RuntimeError::err(
                ErrorKind::ArityMismatch,
                line,
                format!("Expected {} arguments but got {}.", self.arity(), arguments.len()),
            );
        }

        match &self.body {
            FunctionBody::Native { callable, receiver } => {
                let mut arguments = arguments;
                if let Some(receiver) = receiver {
                    arguments.insert(0, receiver.clone());
                }
                callable.call(interpreter, arguments, generics)
            }
            FunctionBody::Abstract => {
                if interpreter.in_global_scope() {
                    interpreter.warn(Warning::new(
                        WarningKind::AbstractCall,
                        line,
                        format!("Function '{}' has no body; the call yields nothing.", self.name),
                    ));
                    Ok(Object::Null)
                } else {
                    RuntimeError::err(
                        ErrorKind::InvalidCall,
                        line,
                        format!("Cannot call bodyless function '{}'.", self.name),
                    )
                }
            }
            FunctionBody::User { body, closure } => {
                if !generics.is_empty() {
                    return RuntimeError::err(
                        ErrorKind::ArityMismatch,
                        line,
                        format!("Function '{}' does not take generic arguments.", self.name),
                    );
                }
                self.call_user(interpreter, body, closure, arguments, line)
            }
        }
    }

    fn call_user(
        &self,
        interpreter: &mut Interpreter,
        body: &Rc<Vec<Stmt>>,
        closure: &Shared<Environment>,
        arguments: Vec<Object>,
        line: i32,
    ) -> Result<Object, RuntimeError> {
        let environment = Environment::new().with_enclosing(closure.clone()).as_shared();

        for (param, argument) in self.params.iter().zip(arguments) {
            let declared = interpreter.resolve_type(&param.declared_type, closure);
            if !argument.conforms_to(&declared) {
                return RuntimeError::err(
                    ErrorKind::TypeMismatch,
                    line,
                    format!(
                        "Parameter '{}' of '{}' expects {declared} but got {}.",
                        param.name.lexeme,
                        self.name,
                        argument.type_of()
                    ),
                );
            }
            check_numeric_modifiers(param.modifiers, &param.name.lexeme, line, &argument)?;

            environment.borrow_mut().define(
                &param.name.lexeme,
                StorageCell::new(argument).with_modifiers(param.modifiers).with_type(Some(declared)),
            );
        }

        let outcome = interpreter.execute_block(body.iter(), environment)?;

        if self.is_constructor {
            let this = closure.borrow().get_here("this");
            return match this {
                Some(cell) => interpreter.read_cell(cell, line),
                None => Ok(Object::Null),
            };
        }

        let declared = interpreter.resolve_type(&self.return_type, closure);
        match outcome {
            ExecutionOutcome::Return(value) => {
                if !value.conforms_to(&declared) {
                    return RuntimeError::err(
                        ErrorKind::TypeMismatch,
                        line,
                        format!(
                            "Function '{}' must return {declared} but returned {}.",
                            self.name,
                            value.type_of()
                        ),
                    );
                }
                Ok(value)
            }
            _ if !matches!(declared.kind, TypeKind::Void | TypeKind::Any) => RuntimeError::err(
                ErrorKind::TypeMismatch,
                line,
                format!(
                    "Function '{}' must return {declared} but finished without a value.",
                    self.name
                ),
            ),
            _ => Ok(Object::Null),
        }
    }
}

impl Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("signature", &self.signature().name)
            .field("modifiers", &self.modifiers)
            .finish()
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.body {
            FunctionBody::Native { .. } => write!(f, "<native fn>"),
            _ => write!(f, "<fn {}>", self.name),
        }
    }
}
