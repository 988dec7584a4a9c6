mod class;
mod expr;
mod ops;
mod stmt;

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{ExprId, Stmt};
use crate::class::ClassDescriptor;
use crate::environment::Environment;
use crate::error::{RuntimeError, Warning};
use crate::func::{Callable, Function};
use crate::native;
use crate::object::Object;
use crate::property::{CellValue, ComputedProperty, StorageCell, WriteOutcome};
use crate::token::Token;
use crate::types::{ModifierSet, TypeDescriptor, TypeKind};
use crate::{Shared, SharedErrorReporter};

type InterpreterResult = Result<Object, RuntimeError>;

/// How a statement finished. Everything but `Normal` unwinds until a
/// construct that understands it consumes it.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Normal,
    Return(Object),
    Break,
    Continue,
    Expect(Object),
}

pub struct Interpreter {
    pub globals: Shared<Environment>,
    environment: Shared<Environment>,
    locals: HashMap<ExprId, usize>, // expression id -> depth
    error_reporter: Option<SharedErrorReporter>,
    warnings: Vec<Warning>,
    object_class: Shared<ClassDescriptor>,
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Environment::new().as_shared();
        let environment = globals.clone();
        let object_class = native::object_class(globals.clone()).as_shared();

        let mut interpreter = Self {
            globals,
            environment,
            locals: HashMap::new(),
            error_reporter: None,
            warnings: vec![],
            object_class,
        };

        let object = Object::Class(interpreter.object_class.clone());
        interpreter.globals.borrow_mut().define(
            "Object",
            StorageCell::new(object).with_modifiers(ModifierSet::CONST),
        );
        native::register_globals(&mut interpreter);

        interpreter
    }

    pub fn with_error_reporting(self, error_reporter: SharedErrorReporter) -> Self {
        Self { error_reporter: Some(error_reporter), ..self }
    }

    /// Binds a host function into the global environment.
    pub fn define_native(&mut self, name: &str, callable: Rc<dyn Callable>, modifiers: ModifierSet) {
        let function = Object::Function(Rc::new(Function::native(name, callable)));
        self.globals.borrow_mut().define(name, StorageCell::new(function).with_modifiers(modifiers));
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Reads a global binding, running its getter if it is computed.
    pub fn global(&mut self, name: &str) -> Option<Object> {
        let cell = self.globals.borrow().get_here(name)?;
        self.read_cell(cell, 0).ok()
    }
}

impl Interpreter {
    pub fn interpret(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            if let Err(e) = self.execute(stmt) {
                self.runtime_error(e);
                return;
            }
        }
    }

    pub fn execute(&mut self, stmt: &Stmt) -> Result<ExecutionOutcome, RuntimeError> {
        self.evaluate_stmt(stmt)
    }

    /// Runs `statements` in `environment` and restores the previous
    /// environment afterwards, whatever the outcome.
    pub fn execute_block<I, R>(
        &mut self,
        statements: I,
        environment: Shared<Environment>,
    ) -> Result<ExecutionOutcome, RuntimeError>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<Stmt>,
    {
        self.in_environment(environment, |interpreter| {
            for s in statements {
                match interpreter.execute(s.as_ref())? {
                    ExecutionOutcome::Normal => {}
                    outcome => return Ok(outcome),
                }
            }
            Ok(ExecutionOutcome::Normal)
        })
    }

    pub(crate) fn in_environment<T>(
        &mut self,
        environment: Shared<Environment>,
        f: impl FnOnce(&mut Self) -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        let previous = std::mem::replace(&mut self.environment, environment);
        let result = f(self);
        self.environment = previous;
        result
    }

    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    pub fn in_global_scope(&self) -> bool {
        self.environment.borrow().is_global()
    }

    pub fn warn(&mut self, warning: Warning) {
        tracing::debug!(line = warning.line, kind = ?warning.kind, "{}", warning.message);
        if let Some(reporter) = &self.error_reporter {
            reporter.borrow_mut().warning(&warning);
        }
        self.warnings.push(warning);
    }

    fn runtime_error(&self, e: RuntimeError) {
        tracing::debug!(kind = ?e.kind, line = e.line, "runtime error");
        if let Some(reporter) = &self.error_reporter {
            reporter.borrow_mut().runtime_error(&e);
        }
    }
}

impl Interpreter {
    /// Substitutes bound generic template names in an object type. Names
    /// bound to nothing concrete stay as they are.
    pub fn resolve_type(&self, ty: &TypeDescriptor, env: &Shared<Environment>) -> TypeDescriptor {
        if ty.kind != TypeKind::Object || ty.is_null() || ty.is_function() {
            return ty.clone();
        }

        let base = ty.base();
        let lookup = Token::synthetic(&base.name, -1);
        let bound = match env.borrow().get(&lookup) {
            Ok(StorageCell { value: CellValue::Plain(Object::Type(bound)), .. }) => bound,
            _ => return ty.clone(),
        };

        (0..ty.dimensions()).fold(bound, |t, _| t.array_of())
    }

    pub fn read_cell(&mut self, cell: StorageCell, line: i32) -> InterpreterResult {
        match cell.value {
            CellValue::Plain(value) => Ok(value),
            CellValue::Computed(property) => ComputedProperty::read(&property, self, line),
        }
    }

    fn finish_write(&mut self, outcome: WriteOutcome, value: Object, line: i32) -> Result<(), RuntimeError> {
        match outcome {
            WriteOutcome::Stored => Ok(()),
            WriteOutcome::Computed(property) => ComputedProperty::write(&property, self, value, line),
        }
    }

    fn lookup_variable(&mut self, name: &Token, id: ExprId) -> InterpreterResult {
        let cell = match self.locals.get(&id) {
            Some(&distance) => self.environment.borrow().get_at(distance, name)?,
            None => self.globals.borrow().get(name)?,
        };

        self.read_cell(cell, name.line)
    }

    fn assign_variable(&mut self, name: &Token, id: ExprId, value: Object) -> Result<(), RuntimeError> {
        let outcome = match self.locals.get(&id) {
            Some(&distance) => self.environment.borrow_mut().assign_at(distance, name, value.clone())?,
            None => self.globals.borrow_mut().assign(name, value.clone())?,
        };

        self.finish_write(outcome, value, name.line)
    }

    /// The textual form of a value. Instances go through their `toString`.
    pub fn stringify(&mut self, value: &Object) -> Result<String, RuntimeError> {
        match value {
            Object::Instance(instance) => {
                let method = instance.borrow().class.borrow().find_method("toString");
                match method {
                    Some(method) => {
                        let text = method.bind(value.clone()).call(self, vec![], &[], 0)?;
                        Ok(text.to_string())
                    }
                    None => Ok(value.to_string()),
                }
            }
            Object::Array(array) => {
                let elements = array.borrow().elements().to_vec();
                let mut parts = Vec::with_capacity(elements.len());
                for element in &elements {
                    parts.push(self.stringify(element)?);
                }
                Ok(format!("[{}]", parts.join(", ")))
            }
            _ => Ok(value.to_string()),
        }
    }
}
