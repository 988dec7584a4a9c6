use std::rc::Rc;

use super::{ExecutionOutcome, Interpreter};
use crate::ast::{Expr, PropertyDecl, Stmt};
use crate::environment::Environment;
use crate::error::{ErrorKind, RuntimeError};
use crate::func::Function;
use crate::object::Object;
use crate::property::{check_declared_type, check_numeric_modifiers, ComputedProperty, StorageCell};
use crate::token::{Token, TokenType};
use crate::types::{ModifierSet, TypeDescriptor};
use crate::Shared;

type StmtResult = Result<ExecutionOutcome, RuntimeError>;

impl Interpreter {
    pub(crate) fn evaluate_stmt(&mut self, stmt: &Stmt) -> StmtResult {
        match stmt {
            Stmt::Expression { expr } => {
                self.evaluate_expr(expr)?;
            }
            Stmt::Var { name, modifiers, declared_type, initializer } => {
                self.declare_variable(name, *modifiers, declared_type.as_ref(), initializer.as_ref())?
            }
            Stmt::Property { decl } => {
                let cell = self.property_cell(decl, self.environment.clone(), true);
                self.define_checked(&decl.name, cell)?;
            }
            Stmt::Function { decl } => {
                // The closure is the scope the function is declared in, not the
                // one it is later called from.
                let function = Function::user(decl, self.environment.clone(), false);
                let cell = StorageCell::new(Object::Function(Rc::new(function)))
                    .with_modifiers(decl.modifiers);
                self.define_checked(&decl.name, cell)?;
            }
            Stmt::Class { decl } => self.declare_class(decl)?,
            Stmt::Interface { decl } => self.declare_interface(decl)?,
            Stmt::Enum { name, elements } => self.declare_enum(name, elements),
            Stmt::Block { statements } => {
                let new_env = Environment::new().with_enclosing(self.environment.clone()).as_shared();
                return self.execute_block(statements, new_env);
            }
            Stmt::If { condition, then_branch, else_branch } => {
                if self.evaluate_expr(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(stmt) = else_branch {
                    return self.execute(stmt);
                }
            }
            Stmt::While { condition, body, increment, per_iteration } => {
                return self.handle_while_stmt(condition, body, increment.as_ref(), per_iteration);
            }
            Stmt::When { condition, body, finally } => {
                while !self.evaluate_expr(condition)?.is_truthy() {
                    match self.execute(body)? {
                        ExecutionOutcome::Break => break,
                        ExecutionOutcome::Normal | ExecutionOutcome::Continue => {}
                        outcome => return Ok(outcome),
                    }
                }

                if let Some(finally) = finally {
                    return self.execute(finally);
                }
            }
            Stmt::Switch { keyword, value, cases, default } => {
                return self.handle_switch_stmt(keyword, value, cases, default.as_deref());
            }
            Stmt::Try { body, catch_name, handler } => {
                return match self.execute(body) {
                    Ok(outcome) => Ok(outcome),
                    Err(e) => {
                        tracing::debug!(kind = ?e.kind, line = e.line, "caught runtime error");
                        let env = Environment::new().with_enclosing(self.environment.clone()).as_shared();
                        if let Some(name) = catch_name {
                            env.borrow_mut().define_value(&name.lexeme, Object::String(e.message));
                        }
                        self.execute_block(handler, env)
                    }
                };
            }
            Stmt::Test { keyword, name, body } => {
                let name = match self.evaluate_expr(name)? {
                    Object::String(s) => s,
                    _ => {
                        return RuntimeError::err(
                            ErrorKind::TypeMismatch,
                            keyword.line,
                            "Test name must be a string.",
                        )
                    }
                };

                let passed = match self.execute(body)? {
                    ExecutionOutcome::Expect(value) => value.is_truthy(),
                    ExecutionOutcome::Return(_) => {
                        return RuntimeError::err(
                            ErrorKind::InvalidCall,
                            keyword.line,
                            "Cannot return from a test.",
                        )
                    }
                    _ => true,
                };

                let verdict = if passed { "passed" } else { "failed" };
                println!("Test {name} {verdict}");
            }
            Stmt::Expect { value, .. } => {
                let value = self.evaluate_expr(value)?;
                return Ok(ExecutionOutcome::Expect(value));
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate_expr(expr)?,
                    None => Object::Null,
                };

                return Ok(ExecutionOutcome::Return(value));
            }
            Stmt::Break { .. } => return Ok(ExecutionOutcome::Break),
            Stmt::Continue { .. } => return Ok(ExecutionOutcome::Continue),
            Stmt::Module { name, .. } => {
                tracing::debug!(module = %name.lexeme, "module");
            }
        };

        Ok(ExecutionOutcome::Normal)
    }

    fn declare_variable(
        &mut self,
        name: &Token,
        modifiers: ModifierSet,
        declared_type: Option<&TypeDescriptor>,
        initializer: Option<&Expr>,
    ) -> Result<(), RuntimeError> {
        let value = match initializer {
            Some(expr) => self.evaluate_expr(expr)?,
            None => Object::Null,
        };

        let declared_type = declared_type.map(|t| self.resolve_type(t, &self.environment));
        if initializer.is_some() {
            check_declared_type(declared_type.as_ref(), &name.lexeme, name.line, &value)?;
            check_numeric_modifiers(modifiers, &name.lexeme, name.line, &value)?;
        }

        let cell = StorageCell::new(value).with_modifiers(modifiers).with_type(declared_type);
        self.define_checked(name, cell)
    }

    /// Defines `name` in the current scope, refusing static bindings at the
    /// outermost scope.
    fn define_checked(&mut self, name: &Token, cell: StorageCell) -> Result<(), RuntimeError> {
        if cell.is_static() && self.in_global_scope() {
            return RuntimeError::err(
                ErrorKind::ModifierViolation,
                name.line,
                format!("Static variable '{}' is not allowed in the global scope.", name.lexeme),
            );
        }

        self.environment.borrow_mut().define(&name.lexeme, cell);
        Ok(())
    }

    /// A computed cell whose accessors close over `closure`. Class members
    /// keep their declared type unresolved until an instance binds the
    /// generic templates.
    pub(crate) fn property_cell(
        &self,
        decl: &PropertyDecl,
        closure: Shared<Environment>,
        resolve: bool,
    ) -> StorageCell {
        let getter = Rc::new(Function::user(&decl.getter, closure.clone(), false));
        let setter = decl.setter.as_ref().map(|s| Rc::new(Function::user(s, closure.clone(), false)));
        let declared_type = if resolve {
            self.resolve_type(&decl.declared_type, &closure)
        } else {
            decl.declared_type.clone()
        };

        StorageCell::computed(ComputedProperty::new(
            &decl.name.lexeme,
            getter,
            setter,
            decl.modifiers,
            Some(declared_type),
        ))
    }

    fn handle_while_stmt(
        &mut self,
        condition: &Expr,
        body: &Stmt,
        increment: Option<&Expr>,
        per_iteration: &[Token],
    ) -> StmtResult {
        while self.evaluate_expr(condition)?.is_truthy() {
            let outcome = if per_iteration.is_empty() {
                self.execute(body)?
            } else {
                self.execute_iteration(body, per_iteration)?
            };

            match outcome {
                ExecutionOutcome::Break => break,
                ExecutionOutcome::Normal | ExecutionOutcome::Continue => {}
                outcome => return Ok(outcome),
            }

            if let Some(increment) = increment {
                self.evaluate_expr(increment)?;
            }
        }

        Ok(ExecutionOutcome::Normal)
    }

    /// Runs one loop iteration in a scope holding fresh copies of the loop
    /// variables, so closures created in the body capture this iteration's
    /// values. The copies are written back before the increment runs.
    fn execute_iteration(&mut self, body: &Stmt, loop_vars: &[Token]) -> StmtResult {
        let outer = self.environment.clone();
        let iteration = Environment::new().with_enclosing(outer.clone()).as_shared();

        for var in loop_vars {
            let cell = outer.borrow().get_here(&var.lexeme);
            if let Some(cell) = cell {
                iteration.borrow_mut().define(&var.lexeme, cell);
            }
        }

        let outcome = self.execute_block(std::iter::once(body), iteration.clone())?;

        for var in loop_vars {
            let cell = iteration.borrow().get_here(&var.lexeme);
            if let Some(cell) = cell {
                outer.borrow_mut().define(&var.lexeme, cell);
            }
        }

        Ok(outcome)
    }

    fn handle_switch_stmt(
        &mut self,
        keyword: &Token,
        value: &Expr,
        cases: &[(Expr, Stmt)],
        default: Option<&Stmt>,
    ) -> StmtResult {
        let value = self.evaluate_expr(value)?;
        let equal = Token { token_type: TokenType::EqualEqual, ..keyword.clone() };

        let mut selected = default;
        for (case, body) in cases {
            let candidate = self.evaluate_expr(case)?;
            if self.binary_operation(&value, &equal, &candidate)?.is_truthy() {
                selected = Some(body);
                break;
            }
        }

        let Some(body) = selected else {
            return Ok(ExecutionOutcome::Normal);
        };

        match self.execute(body)? {
            ExecutionOutcome::Break => Ok(ExecutionOutcome::Normal),
            outcome => Ok(outcome),
        }
    }
}
