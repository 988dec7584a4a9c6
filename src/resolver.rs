use std::collections::HashMap;

use thiserror::Error;

use crate::ast::{ClassDecl, Expr, ExprId, FunctionDecl, InterfaceDecl, PropertyDecl, Stmt};
use crate::class::CONSTRUCTOR;
use crate::interpreter::Interpreter;
use crate::token::Token;

#[derive(Debug, Clone, PartialEq, Copy)]
enum FunctionType {
    None,
    Function,
    Constructor,
    Method,
    Accessor,
}

#[derive(Debug, Clone, PartialEq, Copy)]
enum ClassType {
    None,
    Class,
    SubClass,
    Interface,
}

/// The constructs a `break`, `continue` or `expect` may appear in. Function
/// bodies start a fresh context.
#[derive(Debug, Clone, Copy, Default)]
struct Context {
    loops: usize,
    switches: usize,
    tests: usize,
}

/// Resolver uses static analysis to bind local variables to the correct
/// environment.
pub struct Resolver<'i> {
    interpreter: &'i mut Interpreter,
    scopes: Vec<HashMap<String, bool>>,
    current_function: FunctionType,
    current_class: ClassType,
    context: Context,
    module: Option<Token>,
}

impl<'i> Resolver<'i> {
    pub fn new(interpreter: &'i mut Interpreter) -> Self {
        Self {
            interpreter,
            scopes: vec![],
            current_function: FunctionType::None,
            current_class: ClassType::None,
            context: Context::default(),
            module: None,
        }
    }

    /// Resolves a whole compilation unit. An error abandons the top-level
    /// statement it occurs in; resolution carries on with the next one.
    pub fn resolve(&mut self, statements: &[Stmt]) -> Result<(), Vec<ResolverError>> {
        let mut errors = vec![];

        for stmt in statements {
            if let Err(e) = self.resolve_stmt(stmt) {
                tracing::debug!(line = e.token.line, "resolver error");
                errors.push(e);
                self.scopes.clear();
                self.current_function = FunctionType::None;
                self.current_class = ClassType::None;
                self.context = Context::default();
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl<'a> Resolver<'a> {
    fn resolve_stmt(&mut self, input: &Stmt) -> Result<(), ResolverError> {
        match input {
            Stmt::Block { statements } => {
                self.begin_scope();
                self.resolve_all(statements)?;
                self.end_scope();

                Ok(())
            }
            Stmt::Var { name, initializer, .. } => {
                // We use a 3 step process, so users can't use the same variable in
                // variable definition: declare -> initialize -> define
                self.declare(name)?;
                if let Some(initializer) = initializer {
                    self.resolve_expr(initializer)?;
                }
                self.define(name);
                Ok(())
            }
            Stmt::Property { decl } => {
                self.declare(&decl.name)?;
                self.define(&decl.name);
                self.resolve_property(decl)
            }
            Stmt::Function { decl } => {
                // Unlike variables, we declare and define functions before processing
                // their body. This way, functions can recursively call themselves.
                self.declare(&decl.name)?;
                self.define(&decl.name);

                self.resolve_function(decl, FunctionType::Function)
            }
            Stmt::Class { decl } => self.resolve_class(decl),
            Stmt::Interface { decl } => self.resolve_interface(decl),
            Stmt::Enum { name, .. } => {
                self.declare(name)?;
                self.define(name);
                Ok(())
            }
            Stmt::Expression { expr } => self.resolve_expr(expr),
            Stmt::If { condition, then_branch, else_branch } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;
                if let Some(stmt) = else_branch {
                    self.resolve_stmt(stmt)?;
                }
                Ok(())
            }
            Stmt::While { condition, body, increment, per_iteration } => {
                self.resolve_expr(condition)?;
                if let Some(increment) = increment {
                    self.resolve_expr(increment)?;
                }

                // Loop variables get a scope of their own for every iteration.
                let iteration_scope = !per_iteration.is_empty();
                if iteration_scope {
                    self.begin_scope();
                    for name in per_iteration {
                        self.declare(name)?;
                        self.define(name);
                    }
                }

                self.context.loops += 1;
                self.resolve_stmt(body)?;
                self.context.loops -= 1;

                if iteration_scope {
                    self.end_scope();
                }
                Ok(())
            }
            Stmt::When { condition, body, finally } => {
                self.resolve_expr(condition)?;
                self.context.loops += 1;
                self.resolve_stmt(body)?;
                self.context.loops -= 1;
                if let Some(finally) = finally {
                    self.resolve_stmt(finally)?;
                }
                Ok(())
            }
            Stmt::Switch { value, cases, default, .. } => {
                self.resolve_expr(value)?;
                self.context.switches += 1;
                for (case, body) in cases {
                    self.resolve_expr(case)?;
                    self.resolve_stmt(body)?;
                }
                if let Some(default) = default {
                    self.resolve_stmt(default)?;
                }
                self.context.switches -= 1;
                Ok(())
            }
            Stmt::Try { body, catch_name, handler } => {
                self.resolve_stmt(body)?;

                self.begin_scope();
                if let Some(name) = catch_name {
                    self.declare(name)?;
                    self.define(name);
                }
                self.resolve_all(handler)?;
                self.end_scope();
                Ok(())
            }
            Stmt::Test { name, body, .. } => {
                self.resolve_expr(name)?;
                self.context.tests += 1;
                self.resolve_stmt(body)?;
                self.context.tests -= 1;
                Ok(())
            }
            Stmt::Expect { keyword, value } => {
                if self.context.tests == 0 {
                    return ResolverError::new(keyword, "Can't use 'expect' outside of a test.");
                }
                self.resolve_expr(value)
            }
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    return ResolverError::new(keyword, "Can't return from top-level code.");
                }

                if let Some(expr) = value {
                    // A constructor always hands back the new instance
                    if self.current_function == FunctionType::Constructor {
                        return ResolverError::new(
                            keyword,
                            "Can't return a value from a constructor.",
                        );
                    }
                    self.resolve_expr(expr)?;
                }
                Ok(())
            }
            Stmt::Break { token } => {
                if self.context.loops == 0 && self.context.switches == 0 {
                    return ResolverError::new(token, "Can't use 'break' outside of a loop or switch.");
                }
                Ok(())
            }
            Stmt::Continue { token } => {
                if self.context.loops == 0 {
                    return ResolverError::new(token, "Can't use 'continue' outside of a loop.");
                }
                Ok(())
            }
            Stmt::Module { name, .. } => {
                if let Some(existing) = &self.module {
                    let message =
                        format!("Module '{}' is already declared for this file.", existing.lexeme);
                    return ResolverError::new(name, message);
                }
                self.module = Some(name.clone());
                Ok(())
            }
        }
    }

    fn resolve_class(&mut self, decl: &ClassDecl) -> Result<(), ResolverError> {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(&decl.name)?;
        self.define(&decl.name);

        if let Some(superclass) = &decl.superclass {
            // Make sure super class has a different name!
            if let Expr::Variable { name: super_name, .. } = superclass {
                if super_name.lexeme == decl.name.lexeme {
                    return ResolverError::new(super_name, "A class can't inherit from itself.");
                }
            }

            self.current_class = ClassType::SubClass;
            self.resolve_expr(superclass)?;
        }

        for interface in &decl.interfaces {
            self.resolve_expr(interface)?;
        }

        // The class scope holds `super` and the generic templates; field
        // initializers are evaluated in it.
        self.begin_scope();
        self.insert_defined("super");
        for template in &decl.templates {
            self.declare(template)?;
            self.define(template);
        }

        for field in &decl.fields {
            match field {
                Stmt::Var { initializer: Some(initializer), .. } => self.resolve_expr(initializer)?,
                Stmt::Property { decl } => {
                    self.begin_scope();
                    self.insert_defined("this");
                    self.resolve_property(decl)?;
                    self.end_scope();
                }
                _ => {}
            }
        }

        self.begin_scope();
        self.insert_defined("this");

        for method in &decl.methods {
            let func_type = if method.name.lexeme == CONSTRUCTOR {
                FunctionType::Constructor
            } else {
                FunctionType::Method
            };

            self.resolve_function(method, func_type)?;
        }

        self.end_scope();
        self.end_scope();

        self.current_class = enclosing_class;
        Ok(())
    }

    fn resolve_interface(&mut self, decl: &InterfaceDecl) -> Result<(), ResolverError> {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Interface;

        self.declare(&decl.name)?;
        self.define(&decl.name);

        for field in &decl.fields {
            if let Stmt::Var { initializer: Some(initializer), .. } = field {
                self.resolve_expr(initializer)?;
            }
        }

        self.begin_scope();
        self.insert_defined("this");
        for field in &decl.fields {
            if let Stmt::Property { decl } = field {
                self.resolve_property(decl)?;
            }
        }
        for method in &decl.methods {
            self.resolve_function(method, FunctionType::Method)?;
        }
        self.end_scope();

        self.current_class = enclosing_class;
        Ok(())
    }

    fn resolve_property(&mut self, decl: &PropertyDecl) -> Result<(), ResolverError> {
        self.resolve_function(&decl.getter, FunctionType::Accessor)?;
        if let Some(setter) = &decl.setter {
            self.resolve_function(setter, FunctionType::Accessor)?;
        }
        Ok(())
    }

    fn resolve_function(&mut self, decl: &FunctionDecl, func_type: FunctionType) -> Result<(), ResolverError> {
        let Some(body) = &decl.body else {
            return Ok(());
        };

        let enclosing_func = self.current_function;
        let enclosing_context = std::mem::take(&mut self.context);
        self.current_function = func_type;

        self.begin_scope();
        for param in &decl.params {
            self.declare(&param.name)?;
            self.define(&param.name);
        }

        self.resolve_all(body.iter())?;
        self.end_scope();

        self.current_function = enclosing_func;
        self.context = enclosing_context;
        Ok(())
    }
}

impl<'a> Resolver<'a> {
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) -> Result<(), ResolverError> {
        let Some(scope) = self.scopes.last_mut() else {
            return Ok(());
        };

        if scope.contains_key(&name.lexeme) {
            return ResolverError::new(name, "Already a variable with this name in this scope.");
        }

        scope.insert(name.lexeme.clone(), false);
        Ok(())
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn insert_defined(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_owned(), true);
        }
    }

    fn resolve_all<I, R>(&mut self, statements: I) -> Result<(), ResolverError>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<Stmt>,
    {
        for stmt in statements {
            self.resolve_stmt(stmt.as_ref())?;
        }

        Ok(())
    }
}

impl<'a> Resolver<'a> {
    fn resolve_expr(&mut self, input: &Expr) -> Result<(), ResolverError> {
        match input {
            Expr::Variable { id, name } => {
                if let Some(false) = self.scopes.last().and_then(|scope| scope.get(&name.lexeme)) {
                    return ResolverError::new(
                        name,
                        "Can't read local variable in its own initializer.",
                    );
                }

                self.resolve_local(*id, name);
                Ok(())
            }
            Expr::Assignment { id, name, value, .. } => {
                if let Some(value) = value {
                    self.resolve_expr(value)?;
                }
                self.resolve_local(*id, name);
                Ok(())
            }
            Expr::Super { id, keyword, .. } => match self.current_class {
                ClassType::None => {
                    ResolverError::new(keyword, "Can't use 'super' outside of a class.")
                }
                ClassType::Interface => {
                    ResolverError::new(keyword, "Can't use 'super' in an interface.")
                }
                ClassType::Class => {
                    ResolverError::new(keyword, "Can't use 'super' in a class with no superclass.")
                }
                ClassType::SubClass => self.resolve_required(*id, keyword, "Can't use 'super' here."),
            },
            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    return ResolverError::new(keyword, "Can't use 'this' outside of a class.");
                }
                self.resolve_required(*id, keyword, "Can't use 'this' outside of a method.")
            }
            Expr::Value { id, keyword } => {
                if self.current_function != FunctionType::Accessor {
                    return ResolverError::new(
                        keyword,
                        "Can't use 'value' outside of a property accessor.",
                    );
                }
                self.resolve_required(*id, keyword, "Can't use 'value' here.")
            }
            Expr::Lambda { decl } => self.resolve_function(decl, FunctionType::Function),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)
            }
            Expr::Ternary { condition, then_branch, else_branch, .. } => {
                self.resolve_expr(condition)?;
                self.resolve_expr(then_branch)?;
                self.resolve_expr(else_branch)
            }
            Expr::Call { callee, arguments, generics, .. } => {
                self.resolve_expr(callee)?;
                for arg in arguments.iter().chain(generics) {
                    self.resolve_expr(arg)?;
                }
                Ok(())
            }
            Expr::Get { object, .. } | Expr::StaticGet { object, .. } => self.resolve_expr(object),
            Expr::Set { object, value, .. } | Expr::StaticSet { object, value, .. } => {
                self.resolve_expr(object)?;
                if let Some(value) = value {
                    self.resolve_expr(value)?;
                }
                Ok(())
            }
            Expr::Index { object, index, .. } => {
                self.resolve_expr(object)?;
                self.resolve_expr(index)
            }
            Expr::IndexSet { object, index, value, .. } => {
                self.resolve_expr(object)?;
                self.resolve_expr(index)?;
                if let Some(value) = value {
                    self.resolve_expr(value)?;
                }
                Ok(())
            }
            Expr::Cast { expr, target, .. } => {
                self.resolve_expr(expr)?;
                self.resolve_expr(target)
            }
            Expr::Array { elements, size, .. } => {
                for element in elements {
                    self.resolve_expr(element)?;
                }
                if let Some(size) = size {
                    self.resolve_expr(size)?;
                }
                Ok(())
            }
            Expr::Grouping { expr }
            | Expr::Length { expr, .. }
            | Expr::Typeof { expr, .. }
            | Expr::Unary { right: expr, .. } => self.resolve_expr(expr),
            Expr::Literal { .. } | Expr::TypeLiteral { .. } => Ok(()),
        }
    }

    /// Records how many scopes out `name` lives. Names found in no scope are
    /// left for the globals.
    fn resolve_local(&mut self, id: ExprId, name: &Token) -> bool {
        for (i, scope) in self.scopes.iter().enumerate().rev() {
            if scope.contains_key(&name.lexeme) {
                self.interpreter.resolve(id, self.scopes.len() - i - 1);
                return true;
            }
        }

        false
    }

    fn resolve_required(&mut self, id: ExprId, name: &Token, message: &str) -> Result<(), ResolverError> {
        if self.resolve_local(id, name) {
            Ok(())
        } else {
            ResolverError::new(name, message)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {}] Error at '{}': {}", .token.line, .token.lexeme, .msg)]
pub struct ResolverError {
    pub token: Token,
    pub msg: String,
}

impl ResolverError {
    pub fn new<T>(token: &Token, msg: impl AsRef<str>) -> Result<T, Self> {
        Err(Self { token: token.clone(), msg: msg.as_ref().to_owned() })
    }
}
