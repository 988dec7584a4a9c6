use std::collections::HashMap;
use std::rc::Rc;

use crate::class::ClassDescriptor;
use crate::error::{ErrorKind, RuntimeError};
use crate::func::Function;
use crate::property::StorageCell;

/// A named set of required methods and fields, checked against a class when
/// the class is declared.
#[derive(Debug)]
pub struct InterfaceDescriptor {
    pub name: String,
    pub methods: HashMap<String, Rc<Function>>,
    pub fields: HashMap<String, StorageCell>,
}

impl InterfaceDescriptor {
    pub fn new(
        name: impl AsRef<str>,
        methods: HashMap<String, Rc<Function>>,
        fields: HashMap<String, StorageCell>,
    ) -> Self {
        Self { name: name.as_ref().to_owned(), methods, fields }
    }

    /// The body this interface supplies for a bodyless class method. The
    /// interface method must have a body and the same modifiers, parameter
    /// types and return type.
    pub fn default_for(&self, method: &Function) -> Option<Rc<Function>> {
        self.methods
            .get(&method.name)
            .filter(|candidate| {
                candidate.has_body()
                    && candidate.modifiers.signature() == method.modifiers.signature()
                    && candidate.param_types() == method.param_types()
                    && candidate.return_type == method.return_type
            })
            .cloned()
    }

    /// Defaults a class picks up without declaring them.
    pub fn defaults(&self) -> impl Iterator<Item = (&String, &Rc<Function>)> {
        self.methods.iter().filter(|(_, m)| m.has_body())
    }

    pub fn check_conformance(&self, class: &ClassDescriptor, line: i32) -> Result<(), RuntimeError> {
        let violation = |message: String| {
            RuntimeError::err(ErrorKind::InterfaceConformanceViolation, line, message)
        };

        let mut method_names: Vec<&String> = self.methods.keys().collect();
        method_names.sort();
        for name in method_names {
            let required = &self.methods[name];
            let Some(method) = class.find_method(name) else {
                return violation(format!(
                    "Class '{}' does not implement method '{name}' required by interface '{}'.",
                    class.name, self.name
                ));
            };

            if method.modifiers.signature() != required.modifiers.signature() {
                return violation(format!(
                    "Method '{name}' of class '{}' must have modifiers '{}' as declared by interface '{}'.",
                    class.name,
                    required.modifiers.signature(),
                    self.name
                ));
            }

            if method.arity() != required.arity() {
                return violation(format!(
                    "Method '{name}' of class '{}' must take {} parameters as declared by interface '{}'.",
                    class.name,
                    required.arity(),
                    self.name
                ));
            }
        }

        let mut field_names: Vec<&String> = self.fields.keys().collect();
        field_names.sort();
        for name in field_names {
            let required = &self.fields[name];
            let Some(field) = class.find_field(name) else {
                return violation(format!(
                    "Class '{}' does not declare field '{name}' required by interface '{}'.",
                    class.name, self.name
                ));
            };

            if field.modifiers.signature() != required.modifiers.signature() {
                return violation(format!(
                    "Field '{name}' of class '{}' must have modifiers '{}' as declared by interface '{}'.",
                    class.name,
                    required.modifiers.signature(),
                    self.name
                ));
            }
        }

        Ok(())
    }
}
