use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{ErrorKind, RuntimeError};
use crate::func::Function;
use crate::interpreter::Interpreter;
use crate::object::Object;
use crate::types::{ModifierSet, TypeDescriptor};
use crate::Shared;

#[derive(Debug, Clone)]
pub enum CellValue {
    Plain(Object),
    Computed(Shared<ComputedProperty>),
}

/// A named slot: the value plus the rules that govern writing to it.
#[derive(Debug, Clone)]
pub struct StorageCell {
    pub value: CellValue,
    pub modifiers: ModifierSet,
    pub declared_type: Option<TypeDescriptor>,
}

/// What a write did. A computed cell leaves the work to its setter, which
/// needs the interpreter and therefore runs at the call site.
#[derive(Debug)]
pub enum WriteOutcome {
    Stored,
    Computed(Shared<ComputedProperty>),
}

impl StorageCell {
    pub fn new(value: Object) -> Self {
        Self { value: CellValue::Plain(value), modifiers: ModifierSet::empty(), declared_type: None }
    }

    pub fn computed(property: ComputedProperty) -> Self {
        Self {
            modifiers: property.modifiers,
            declared_type: property.declared_type.clone(),
            value: CellValue::Computed(Rc::new(RefCell::new(property))),
        }
    }

    pub fn with_modifiers(self, modifiers: ModifierSet) -> Self {
        Self { modifiers, ..self }
    }

    pub fn with_type(self, declared_type: Option<TypeDescriptor>) -> Self {
        Self { declared_type, ..self }
    }

    pub fn is_const(&self) -> bool {
        self.modifiers.is_const()
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.is_static()
    }

    /// Checks `value` against the declared type and the numeric range
    /// modifiers of this cell.
    pub fn check_value(&self, name: &str, line: i32, value: &Object) -> Result<(), RuntimeError> {
        check_declared_type(self.declared_type.as_ref(), name, line, value)?;
        check_numeric_modifiers(self.modifiers, name, line, value)
    }

    /// The single write path shared by variables, instance fields and
    /// static fields.
    pub fn write(&mut self, name: &str, line: i32, value: Object) -> Result<WriteOutcome, RuntimeError> {
        if self.is_const() {
            return RuntimeError::err(
                ErrorKind::ConstantViolation,
                line,
                format!("Cannot reassign constant '{name}'."),
            );
        }

        if let CellValue::Computed(property) = &self.value {
            return Ok(WriteOutcome::Computed(property.clone()));
        }

        self.check_value(name, line, &value)?;
        self.value = CellValue::Plain(value);
        Ok(WriteOutcome::Stored)
    }
}

pub fn check_declared_type(
    declared: Option<&TypeDescriptor>,
    name: &str,
    line: i32,
    value: &Object,
) -> Result<(), RuntimeError> {
    match declared {
        Some(declared) if !value.conforms_to(declared) => RuntimeError::err(
            ErrorKind::TypeMismatch,
            line,
            format!("Cannot assign {} to '{name}' of type {declared}.", value.type_of()),
        ),
        _ => Ok(()),
    }
}

pub fn check_numeric_modifiers(
    modifiers: ModifierSet,
    name: &str,
    line: i32,
    value: &Object,
) -> Result<(), RuntimeError> {
    let Some(n) = value.number() else {
        return Ok(());
    };

    if modifiers.contains(ModifierSet::UNSIGNED) && n < 0.0 {
        return RuntimeError::err(
            ErrorKind::ModifierViolation,
            line,
            format!("Unsigned '{name}' cannot hold negative value {n}."),
        );
    }

    if modifiers.contains(ModifierSet::BYTE) && !(0.0..=255.0).contains(&n) {
        return RuntimeError::err(
            ErrorKind::ModifierViolation,
            line,
            format!("Byte '{name}' must be within 0-255, got {n}."),
        );
    }

    Ok(())
}

/// A member backed by accessor functions. Both accessors receive the
/// implicit `value` parameter: the getter sees the cached value, the setter
/// the incoming one.
#[derive(Debug, Clone)]
pub struct ComputedProperty {
    pub name: String,
    pub getter: Rc<Function>,
    pub setter: Option<Rc<Function>>,
    pub modifiers: ModifierSet,
    pub declared_type: Option<TypeDescriptor>,
    pub cache: Object,
}

impl ComputedProperty {
    pub fn new(
        name: &str,
        getter: Rc<Function>,
        setter: Option<Rc<Function>>,
        modifiers: ModifierSet,
        declared_type: Option<TypeDescriptor>,
    ) -> Self {
        Self { name: name.to_owned(), getter, setter, modifiers, declared_type, cache: Object::Null }
    }

    /// A copy whose accessors see `receiver` as `this`, with its own cache.
    pub fn bind(&self, receiver: &Object) -> Self {
        Self {
            getter: self.getter.bind(receiver.clone()),
            setter: self.setter.as_ref().map(|s| s.bind(receiver.clone())),
            cache: self.cache.clone(),
            ..self.clone()
        }
    }

    pub fn read(
        property: &Shared<Self>,
        interpreter: &mut Interpreter,
        line: i32,
    ) -> Result<Object, RuntimeError> {
        let (getter, cache, declared_type, name) = {
            let p = property.borrow();
            (p.getter.clone(), p.cache.clone(), p.declared_type.clone(), p.name.clone())
        };

        let value = getter.call(interpreter, vec![cache], &[], line)?;
        check_declared_type(declared_type.as_ref(), &name, line, &value)?;
        Ok(value)
    }

    pub fn write(
        property: &Shared<Self>,
        interpreter: &mut Interpreter,
        value: Object,
        line: i32,
    ) -> Result<(), RuntimeError> {
        let (setter, declared_type, modifiers, name) = {
            let p = property.borrow();
            (p.setter.clone(), p.declared_type.clone(), p.modifiers, p.name.clone())
        };

        let Some(setter) = setter else {
            return RuntimeError::err(
                ErrorKind::ModifierViolation,
                line,
                format!("Cannot assign to read-only property '{name}'."),
            );
        };

        check_declared_type(declared_type.as_ref(), &name, line, &value)?;
        check_numeric_modifiers(modifiers, &name, line, &value)?;

        let result = setter.call(interpreter, vec![value.clone()], &[], line)?;
        property.borrow_mut().cache = if result.is_null() { value } else { result };
        Ok(())
    }
}
