use std::fmt::Display;

use crate::error::{ErrorKind, RuntimeError};
use crate::object::Object;
use crate::types::{TypeDescriptor, TypeKind};
use crate::Shared;

/// Largest number of slots a sized array literal may request.
pub const MAX_SIZE: usize = 1 << 24;

/// A fixed-size, homogeneous sequence.
#[derive(Debug, Clone)]
pub struct ArrayValue {
    pub element_type: TypeDescriptor,
    elements: Vec<Object>,
}

impl ArrayValue {
    pub fn new(element_type: TypeDescriptor, elements: Vec<Object>) -> Self {
        Self { element_type, elements }
    }

    /// An array of `size` slots, each holding the default for `element_type`.
    pub fn with_size(element_type: TypeDescriptor, size: usize) -> Self {
        let elements = vec![default_value(&element_type); size];
        Self { element_type, elements }
    }

    pub fn as_shared(self) -> Shared<Self> {
        std::rc::Rc::new(std::cell::RefCell::new(self))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[Object] {
        &self.elements
    }

    pub fn type_descriptor(&self) -> TypeDescriptor {
        self.element_type.array_of()
    }

    pub fn get(&self, index: f64, line: i32) -> Result<Object, RuntimeError> {
        let i = self.check_index(index, line)?;
        Ok(self.elements[i].clone())
    }

    pub fn set(&mut self, index: f64, value: Object, line: i32) -> Result<(), RuntimeError> {
        let i = self.check_index(index, line)?;

        if !value.conforms_to(&self.element_type) {
            return RuntimeError::err(
                ErrorKind::TypeMismatch,
                line,
                format!(
                    "Cannot store {} in an array of {}.",
                    value.type_of(),
                    self.type_descriptor()
                ),
            );
        }

        self.elements[i] = value;
        Ok(())
    }

    fn check_index(&self, index: f64, line: i32) -> Result<usize, RuntimeError> {
        let index = index.round();
        if !index.is_finite() || index < 0.0 || index >= self.elements.len() as f64 {
            return RuntimeError::err(
                ErrorKind::IndexOutOfBounds,
                line,
                format!("Index {index} out of bounds for array of size {}.", self.elements.len()),
            );
        }

        Ok(index as usize)
    }
}

pub fn default_value(descriptor: &TypeDescriptor) -> Object {
    if descriptor.is_array() {
        return Object::Null;
    }

    match descriptor.kind {
        TypeKind::Number => Object::Number(0.0),
        TypeKind::String => Object::String(String::new()),
        TypeKind::Boolean => Object::Boolean(false),
        _ => Object::Null,
    }
}

impl Display for ArrayValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.elements.iter().map(|e| e.to_string()).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(n: usize) -> ArrayValue {
        ArrayValue::new(
            TypeDescriptor::number(),
            (0..n).map(|i| Object::Number(i as f64)).collect(),
        )
    }

    #[test]
    fn indices_inside_bounds_succeed() {
        let mut array = numbers(3);
        for i in 0..3 {
            assert_eq!(array.get(i as f64, 1).unwrap(), Object::Number(i as f64));
            assert!(array.set(i as f64, Object::Number(9.0), 1).is_ok());
        }
    }

    #[test]
    fn indices_outside_bounds_fail() {
        let mut array = numbers(3);
        for index in [-1.0, 3.0, 5.0] {
            let err = array.get(index, 1).unwrap_err();
            assert_eq!(err.kind, ErrorKind::IndexOutOfBounds);
            assert_eq!(array.set(index, Object::Number(0.0), 1).unwrap_err().kind, err.kind);
        }

        let err = array.get(5.0, 1).unwrap_err();
        assert!(err.message.contains('5') && err.message.contains('3'));
    }

    #[test]
    fn non_finite_indices_fail() {
        let mut array = numbers(2);
        for index in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(array.get(index, 1).unwrap_err().kind, ErrorKind::IndexOutOfBounds);
            let err = array.set(index, Object::Number(1.0), 1).unwrap_err();
            assert_eq!(err.kind, ErrorKind::IndexOutOfBounds);
        }
        assert_eq!(array.get(0.0, 1).unwrap(), Object::Number(0.0));
    }

    #[test]
    fn index_is_rounded() {
        let array = numbers(3);
        assert_eq!(array.get(1.4, 1).unwrap(), Object::Number(1.0));
        assert_eq!(array.get(1.6, 1).unwrap(), Object::Number(2.0));
    }

    #[test]
    fn set_checks_element_type() {
        let mut array = numbers(2);
        let err = array.set(0.0, Object::String("x".into()), 1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn sized_arrays_are_defaulted() {
        let array = ArrayValue::with_size(TypeDescriptor::string(), 2);
        assert_eq!(array.to_string(), "[, ]");
        let array = ArrayValue::with_size(TypeDescriptor::number(), 3);
        assert_eq!(array.to_string(), "[0, 0, 0]");
    }
}
