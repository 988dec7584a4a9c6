use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{ErrorKind, RuntimeError};
use crate::object::Object;
use crate::property::{StorageCell, WriteOutcome};
use crate::token::Token;
use crate::Shared;

/// One lexical scope. Scopes chain outward to the global environment, which
/// is the only one without an enclosing scope.
#[derive(Debug, Default)]
pub struct Environment {
    pub enclosing: Option<Shared<Environment>>,
    values: HashMap<String, StorageCell>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(self, enclosing: Shared<Environment>) -> Self {
        Self { enclosing: Some(enclosing), ..self }
    }

    pub fn as_shared(self) -> Shared<Self> {
        Rc::new(RefCell::new(self))
    }

    /// A sibling scope holding copies of this scope's bindings, chained to
    /// the same enclosing scope.
    pub fn fork(&self) -> Self {
        Self { enclosing: self.enclosing.clone(), values: self.values.clone() }
    }

    pub fn is_global(&self) -> bool {
        self.enclosing.is_none()
    }

    /// Binds `name` in this scope, replacing whatever was there.
    pub fn define(&mut self, name: &str, cell: StorageCell) {
        self.values.insert(name.to_owned(), cell);
    }

    pub fn define_value(&mut self, name: &str, value: Object) {
        self.define(name, StorageCell::new(value));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Looks `name` up in this scope only.
    pub fn get_here(&self, name: &str) -> Option<StorageCell> {
        self.values.get(name).cloned()
    }

    pub fn get(&self, name: &Token) -> Result<StorageCell, RuntimeError> {
        if let Some(cell) = self.values.get(&name.lexeme) {
            return Ok(cell.clone());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow().get(name),
            None => Err(RuntimeError::undefined_variable(name.line, &name.lexeme)),
        }
    }

    pub fn get_at(&self, distance: usize, name: &Token) -> Result<StorageCell, RuntimeError> {
        let found = if distance == 0 {
            self.get_here(&name.lexeme)
        } else {
            self.ancestor(distance).and_then(|env| {
                let cell = env.borrow().get_here(&name.lexeme);
                cell
            })
        };

        found.ok_or_else(|| RuntimeError::undefined_variable(name.line, &name.lexeme))
    }

    pub fn assign(&mut self, name: &Token, value: Object) -> Result<WriteOutcome, RuntimeError> {
        if !self.values.contains_key(&name.lexeme) {
            return match &self.enclosing {
                Some(enclosing) => enclosing.borrow_mut().assign(name, value),
                None => Err(RuntimeError::undefined_variable(name.line, &name.lexeme)),
            };
        }

        self.write_here(name, value)
    }

    pub fn assign_at(
        &mut self,
        distance: usize,
        name: &Token,
        value: Object,
    ) -> Result<WriteOutcome, RuntimeError> {
        if distance == 0 {
            return self.write_here(name, value);
        }

        let Some(ancestor) = self.ancestor(distance) else {
            return Err(RuntimeError::undefined_variable(name.line, &name.lexeme));
        };

        let outcome = ancestor.borrow_mut().write_here(name, value);
        outcome
    }

    fn write_here(&mut self, name: &Token, value: Object) -> Result<WriteOutcome, RuntimeError> {
        let is_global = self.is_global();
        let Some(cell) = self.values.get_mut(&name.lexeme) else {
            return Err(RuntimeError::undefined_variable(name.line, &name.lexeme));
        };

        if is_global && cell.is_static() {
            return RuntimeError::err(
                ErrorKind::ModifierViolation,
                name.line,
                format!("Static variable '{}' is not allowed in the global scope.", name.lexeme),
            );
        }

        cell.write(&name.lexeme, name.line, value)
    }

    pub fn ancestor(&self, distance: usize) -> Option<Shared<Environment>> {
        let mut env = self.enclosing.clone()?;

        for _ in 1..distance {
            let parent = env.borrow().enclosing.clone()?;
            env = parent;
        }

        Some(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::CellValue;
    use crate::types::{ModifierSet, TypeDescriptor};

    fn token(name: &str) -> Token {
        Token::synthetic(name, 1)
    }

    fn plain(cell: StorageCell) -> Object {
        match cell.value {
            CellValue::Plain(value) => value,
            CellValue::Computed(_) => panic!("expected a plain cell"),
        }
    }

    #[test]
    fn lookup_walks_outward() {
        let globals = Environment::new().as_shared();
        globals.borrow_mut().define_value("a", Object::Number(1.0));
        let inner = Environment::new().with_enclosing(globals.clone()).as_shared();

        let cell = inner.borrow().get(&token("a")).unwrap();
        assert_eq!(plain(cell), Object::Number(1.0));
        assert!(inner.borrow().get(&token("b")).is_err());
    }

    #[test]
    fn get_at_jumps_to_ancestor() {
        let outer = Environment::new().as_shared();
        outer.borrow_mut().define_value("x", Object::String("outer".into()));
        let middle = Environment::new().with_enclosing(outer).as_shared();
        middle.borrow_mut().define_value("x", Object::String("middle".into()));
        let inner = Environment::new().with_enclosing(middle).as_shared();

        let cell = inner.borrow().get_at(2, &token("x")).unwrap();
        assert_eq!(plain(cell), Object::String("outer".into()));
        let cell = inner.borrow().get_at(1, &token("x")).unwrap();
        assert_eq!(plain(cell), Object::String("middle".into()));
        assert!(inner.borrow().get_at(0, &token("x")).is_err());
    }

    #[test]
    fn const_cells_reject_assignment() {
        let env = Environment::new().as_shared();
        env.borrow_mut()
            .define("y", StorageCell::new(Object::Number(5.0)).with_modifiers(ModifierSet::CONST));

        let err = env.borrow_mut().assign(&token("y"), Object::Number(6.0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConstantViolation);
        assert!(err.message.contains('y'));

        let cell = env.borrow().get(&token("y")).unwrap();
        assert_eq!(plain(cell), Object::Number(5.0));
    }

    #[test]
    fn define_overwrites_even_const() {
        let mut env = Environment::new();
        env.define("y", StorageCell::new(Object::Number(5.0)).with_modifiers(ModifierSet::CONST));
        env.define_value("y", Object::Number(7.0));
        assert_eq!(plain(env.get_here("y").unwrap()), Object::Number(7.0));
    }

    #[test]
    fn typed_cells_check_assignments() {
        let env = Environment::new().as_shared();
        env.borrow_mut().define(
            "n",
            StorageCell::new(Object::Number(1.0)).with_type(Some(TypeDescriptor::number())),
        );

        let err = env.borrow_mut().assign(&token("n"), Object::String("one".into())).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
        assert!(env.borrow_mut().assign(&token("n"), Object::Number(2.0)).is_ok());
    }

    #[test]
    fn range_modifiers_are_enforced() {
        let env = Environment::new().as_shared();
        env.borrow_mut().define(
            "u",
            StorageCell::new(Object::Number(1.0)).with_modifiers(ModifierSet::UNSIGNED),
        );
        env.borrow_mut()
            .define("b", StorageCell::new(Object::Number(1.0)).with_modifiers(ModifierSet::BYTE));

        let err = env.borrow_mut().assign(&token("u"), Object::Number(-1.0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ModifierViolation);
        let err = env.borrow_mut().assign(&token("b"), Object::Number(256.0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ModifierViolation);
        assert!(env.borrow_mut().assign(&token("b"), Object::Number(255.0)).is_ok());
    }

    #[test]
    fn static_cells_are_rejected_globally() {
        let env = Environment::new().as_shared();
        env.borrow_mut()
            .define("s", StorageCell::new(Object::Null).with_modifiers(ModifierSet::STATIC));

        let err = env.borrow_mut().assign(&token("s"), Object::Number(1.0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ModifierViolation);
    }
}
