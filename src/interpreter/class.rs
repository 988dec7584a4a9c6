use std::collections::HashMap;
use std::rc::Rc;

use super::{Interpreter, InterpreterResult};
use crate::ast::{ClassDecl, InterfaceDecl, Stmt};
use crate::class::{ClassDescriptor, Instance, CONSTRUCTOR};
use crate::enumeration::EnumDescriptor;
use crate::environment::Environment;
use crate::error::{ErrorKind, RuntimeError, Warning, WarningKind};
use crate::func::Function;
use crate::interface::InterfaceDescriptor;
use crate::object::Object;
use crate::property::{
    check_declared_type, check_numeric_modifiers, CellValue, StorageCell, WriteOutcome,
};
use crate::token::Token;
use crate::types::{ModifierSet, TypeDescriptor};
use crate::Shared;

impl Interpreter {
    pub(crate) fn declare_class(&mut self, decl: &ClassDecl) -> Result<(), RuntimeError> {
        let name = &decl.name;

        let superclass = match &decl.superclass {
            Some(expr) => match self.evaluate_expr(expr)? {
                Object::Class(class) if Rc::ptr_eq(&class, &self.object_class) => {
                    return RuntimeError::err(
                        ErrorKind::Generic,
                        name.line,
                        "Classes automatically inherit from Object.",
                    );
                }
                Object::Class(class) => class,
                _ => {
                    return RuntimeError::err(
                        ErrorKind::TypeMismatch,
                        name.line,
                        "Superclass must be a class.",
                    )
                }
            },
            None => self.object_class.clone(),
        };

        let mut interfaces = Vec::with_capacity(decl.interfaces.len());
        for expr in &decl.interfaces {
            match self.evaluate_expr(expr)? {
                Object::Interface(interface) => interfaces.push(interface),
                other => {
                    return RuntimeError::err(
                        ErrorKind::TypeMismatch,
                        name.line,
                        format!("Class '{}' can only implement interfaces, not {}.", name.lexeme, other),
                    )
                }
            }
        }

        self.environment.borrow_mut().define_value(&name.lexeme, Object::Null);

        let class_env = Environment::new().with_enclosing(self.environment.clone()).as_shared();
        class_env.borrow_mut().define_value("super", Object::Class(superclass.clone()));
        for template in &decl.templates {
            class_env.borrow_mut().define_value(&template.lexeme, Object::Type(TypeDescriptor::any()));
        }

        let mut class = ClassDescriptor::new(&name.lexeme, Some(superclass), class_env.clone());
        class.templates = decl.templates.iter().map(|t| t.lexeme.clone()).collect();

        for method in &decl.methods {
            let function =
                Function::user(method, class_env.clone(), method.name.lexeme == CONSTRUCTOR);
            check_method_shape(&function, &name.lexeme, method.name.line)?;

            let function = if function.has_body() {
                Rc::new(function)
            } else {
                let default = interfaces.iter().find_map(|i| i.default_for(&function));
                match default {
                    Some(default) => default,
                    None => {
                        return RuntimeError::err(
                            ErrorKind::InterfaceConformanceViolation,
                            method.name.line,
                            format!(
                                "Method '{}' of class '{}' has no body and no interface provides a matching one.",
                                function.name, name.lexeme
                            ),
                        )
                    }
                }
            };

            class.methods.insert(function.name.clone(), function);
        }

        for interface in &interfaces {
            for (method_name, default) in interface.defaults() {
                if class.find_method(method_name).is_none() {
                    class.methods.insert(method_name.clone(), default.clone());
                }
            }
        }

        class.fields = self.in_environment(class_env.clone(), |interpreter| {
            interpreter.class_fields(&decl.fields, &class_env)
        })?;
        class.interfaces = interfaces;

        for interface in &class.interfaces {
            interface.check_conformance(&class, name.line)?;
        }

        let class = class.as_shared();
        bind_static_properties(&class);

        tracing::debug!(class = %name.lexeme, "declared class");
        self.environment
            .borrow_mut()
            .define(&name.lexeme, StorageCell::new(Object::Class(class)));
        Ok(())
    }

    /// Evaluates member initializers in the class scope. Static members have
    /// their types resolved now; instance members keep template names until
    /// construction.
    fn class_fields(
        &mut self,
        fields: &[Stmt],
        class_env: &Shared<Environment>,
    ) -> Result<HashMap<String, StorageCell>, RuntimeError> {
        let mut cells = HashMap::new();

        for field in fields {
            match field {
                Stmt::Var { name, modifiers, declared_type, initializer } => {
                    let value = match initializer {
                        Some(expr) => self.evaluate_expr(expr)?,
                        None => Object::Null,
                    };

                    let resolved = declared_type.as_ref().map(|t| self.resolve_type(t, class_env));
                    if initializer.is_some() {
                        check_declared_type(resolved.as_ref(), &name.lexeme, name.line, &value)?;
                        check_numeric_modifiers(*modifiers, &name.lexeme, name.line, &value)?;
                    }

                    let declared_type = if modifiers.is_static() { resolved } else { declared_type.clone() };
                    let cell =
                        StorageCell::new(value).with_modifiers(*modifiers).with_type(declared_type);
                    cells.insert(name.lexeme.clone(), cell);
                }
                Stmt::Property { decl } => {
                    let cell = self.property_cell(decl, class_env.clone(), decl.modifiers.is_static());
                    cells.insert(decl.name.lexeme.clone(), cell);
                }
                _ => {}
            }
        }

        Ok(cells)
    }

    pub(crate) fn declare_interface(&mut self, decl: &InterfaceDecl) -> Result<(), RuntimeError> {
        let env = self.environment.clone();

        let methods = decl
            .methods
            .iter()
            .map(|m| (m.name.lexeme.clone(), Rc::new(Function::user(m, env.clone(), false))))
            .collect();

        let mut fields = HashMap::new();
        for field in &decl.fields {
            match field {
                Stmt::Var { name, modifiers, declared_type, initializer } => {
                    let value = match initializer {
                        Some(expr) => self.evaluate_expr(expr)?,
                        None => Object::Null,
                    };
                    let cell = StorageCell::new(value)
                        .with_modifiers(*modifiers)
                        .with_type(declared_type.clone());
                    fields.insert(name.lexeme.clone(), cell);
                }
                Stmt::Property { decl } => {
                    let cell = self.property_cell(decl, env.clone(), true);
                    fields.insert(decl.name.lexeme.clone(), cell);
                }
                _ => {}
            }
        }

        let interface = InterfaceDescriptor::new(&decl.name.lexeme, methods, fields);
        self.environment
            .borrow_mut()
            .define(&decl.name.lexeme, StorageCell::new(Object::Interface(Rc::new(interface))));
        Ok(())
    }

    pub(crate) fn declare_enum(&mut self, name: &Token, elements: &[Token]) {
        let elements = elements.iter().map(|e| e.lexeme.clone()).collect();
        let descriptor = EnumDescriptor::new(&name.lexeme, elements);
        self.environment.borrow_mut().define(
            &name.lexeme,
            StorageCell::new(Object::Enum(Rc::new(descriptor))).with_modifiers(ModifierSet::CONST),
        );
    }

    /// Instantiates `class`: binds its generic templates, gives the instance
    /// its own copy of every non-static field and runs the constructor.
    pub(crate) fn construct(
        &mut self,
        class: &Shared<ClassDescriptor>,
        arguments: Vec<Object>,
        generics: &[Object],
        line: i32,
    ) -> InterpreterResult {
        let (name, templates, class_env, fields, constructor) = {
            let c = class.borrow();
            (c.name.clone(), c.templates.clone(), c.environment.clone(), c.instance_fields(), c.constructor())
        };

        if generics.len() != templates.len() {
            return RuntimeError::err(
                ErrorKind::ArityMismatch,
                line,
                format!(
                    "Class '{name}' expects {} generic arguments but got {}.",
                    templates.len(),
                    generics.len()
                ),
            );
        }

        let template_scope = if templates.is_empty() {
            None
        } else {
            let scope = class_env.borrow().fork().as_shared();
            for (template, argument) in templates.iter().zip(generics) {
                let bound = self.type_argument(argument, line)?;
                scope.borrow_mut().define_value(template, Object::Type(bound));
            }
            Some(scope)
        };

        let instance = Instance::new(class.clone(), HashMap::new())
            .with_template_scope(template_scope.clone())
            .as_shared();
        let receiver = Object::Instance(instance.clone());

        let mut own_fields = HashMap::with_capacity(fields.len());
        for (field_name, (cell, env)) in fields {
            let env = match &template_scope {
                Some(scope) if Rc::ptr_eq(&env, &class_env) => scope.clone(),
                _ => env,
            };
            let declared = cell.declared_type.as_ref().map(|t| self.resolve_type(t, &env));
            let computed = match &cell.value {
                CellValue::Computed(property) => Some(property.clone()),
                CellValue::Plain(_) => None,
            };
            let cell = match computed {
                Some(property) => {
                    let mut bound = property.borrow().bind(&receiver);
                    bound.declared_type = declared;
                    StorageCell::computed(bound)
                }
                None => cell.with_type(declared),
            };
            own_fields.insert(field_name, cell);
        }
        instance.borrow_mut().fields = own_fields;

        match constructor {
            Some(constructor) => {
                constructor.bind(receiver).call(self, arguments, &[], line)
            }
            None if !arguments.is_empty() => RuntimeError::err(
                ErrorKind::ArityMismatch,
                line,
                format!("Expected 0 arguments but got {}.", arguments.len()),
            ),
            None => Ok(receiver),
        }
    }

    /// Reads `name` from an instance, class or enum. `static_access` is set
    /// for `Target::name`.
    pub(crate) fn get_member(&mut self, object: &Object, name: &Token, static_access: bool) -> InterpreterResult {
        match object {
            Object::Instance(instance) => {
                if static_access {
                    return static_on_instance(name);
                }

                let own = instance.borrow().fields.get(&name.lexeme).cloned();
                if let Some(cell) = own {
                    return self.read_cell(cell, name.line);
                }

                let class = instance.borrow().class.clone();
                if let Some(owner) = ClassDescriptor::field_owner(&class, &name.lexeme) {
                    let cell = owner.borrow().fields.get(&name.lexeme).cloned();
                    if let Some(cell) = cell {
                        self.static_through_instance(name);
                        return self.read_cell(cell, name.line);
                    }
                }

                let method = class.borrow().find_method(&name.lexeme);
                match method {
                    Some(method) if method.modifiers.is_static() => {
                        self.static_through_instance(name);
                        Ok(Object::Function(method.bind(Object::Class(class))))
                    }
                    Some(method) => Ok(Object::Function(method.bind(object.clone()))),
                    None => Err(RuntimeError::undefined_property(name.line, &name.lexeme)),
                }
            }
            Object::Class(class) => {
                if let Some(owner) = ClassDescriptor::field_owner(class, &name.lexeme) {
                    let cell = owner.borrow().fields.get(&name.lexeme).cloned();
                    if let Some(cell) = cell {
                        if !cell.is_static() {
                            self.instance_member_through_class(class, name, static_access)?;
                        }
                        return self.read_cell(cell, name.line);
                    }
                }

                let method = class.borrow().find_method(&name.lexeme);
                match method {
                    Some(method) if method.modifiers.is_static() => {
                        Ok(Object::Function(method.bind(object.clone())))
                    }
                    Some(method) => {
                        self.instance_member_through_class(class, name, static_access)?;
                        Ok(Object::Function(method.bind(object.clone())))
                    }
                    None => Err(RuntimeError::undefined_property(name.line, &name.lexeme)),
                }
            }
            Object::Enum(descriptor) => match descriptor.ordinal(&name.lexeme) {
                Some(ordinal) => Ok(Object::Number(ordinal as f64)),
                None => RuntimeError::err(
                    ErrorKind::UndefinedProperty,
                    name.line,
                    format!("Enum '{}' has no element '{}'.", descriptor.name, name.lexeme),
                ),
            },
            _ => RuntimeError::err(
                ErrorKind::InvalidOperand,
                name.line,
                "Only instances, classes and enums have properties.",
            ),
        }
    }

    pub(crate) fn set_member(
        &mut self,
        object: &Object,
        name: &Token,
        value: Object,
        static_access: bool,
    ) -> Result<(), RuntimeError> {
        match object {
            Object::Instance(instance) => {
                if static_access {
                    return static_on_instance(name);
                }

                let own = instance.borrow().fields.get(&name.lexeme).cloned();
                if let Some(mut cell) = own {
                    // The write checks the value's type, which may borrow this
                    // very instance, so the cell is updated outside the map.
                    let outcome = cell.write(&name.lexeme, name.line, value.clone())?;
                    if let WriteOutcome::Stored = outcome {
                        instance.borrow_mut().fields.insert(name.lexeme.clone(), cell);
                    }
                    return self.finish_write(outcome, value, name.line);
                }

                let class = instance.borrow().class.clone();
                match ClassDescriptor::field_owner(&class, &name.lexeme) {
                    Some(owner) => {
                        self.static_through_instance(name);
                        self.write_class_field(&owner, name, value)
                    }
                    None => Err(RuntimeError::undefined_property(name.line, &name.lexeme)),
                }
            }
            Object::Class(class) => match ClassDescriptor::field_owner(class, &name.lexeme) {
                Some(owner) => {
                    let is_static = owner
                        .borrow()
                        .fields
                        .get(&name.lexeme)
                        .map(|cell| cell.is_static())
                        .unwrap_or(false);

                    if !is_static {
                        return RuntimeError::err(
                            ErrorKind::ModifierViolation,
                            name.line,
                            format!(
                                "Cannot assign instance field '{}' through class '{}'.",
                                name.lexeme,
                                class.borrow().name
                            ),
                        );
                    }

                    self.write_class_field(&owner, name, value)
                }
                None => Err(RuntimeError::undefined_property(name.line, &name.lexeme)),
            },
            Object::Enum(descriptor) => RuntimeError::err(
                ErrorKind::ConstantViolation,
                name.line,
                format!("Cannot assign to element '{}' of enum '{}'.", name.lexeme, descriptor.name),
            ),
            _ => RuntimeError::err(ErrorKind::InvalidOperand, name.line, "Only instances have fields."),
        }
    }

    fn write_class_field(
        &mut self,
        owner: &Shared<ClassDescriptor>,
        name: &Token,
        value: Object,
    ) -> Result<(), RuntimeError> {
        let cell = owner.borrow().fields.get(&name.lexeme).cloned();
        let Some(mut cell) = cell else {
            return Err(RuntimeError::undefined_property(name.line, &name.lexeme));
        };

        let outcome = cell.write(&name.lexeme, name.line, value.clone())?;
        if let WriteOutcome::Stored = outcome {
            owner.borrow_mut().fields.insert(name.lexeme.clone(), cell);
        }
        self.finish_write(outcome, value, name.line)
    }

    /// Calls method `name` on `target`, used for `[]` on non-array values.
    pub(crate) fn invoke_method(
        &mut self,
        target: &Object,
        name: &str,
        arguments: Vec<Object>,
        line: i32,
    ) -> InterpreterResult {
        let Object::Instance(instance) = target else {
            return RuntimeError::err(
                ErrorKind::InvalidOperand,
                line,
                format!("Only arrays and instances defining '{name}' can be indexed."),
            );
        };

        let class = instance.borrow().class.clone();
        let method = class.borrow().find_method(name);
        match method {
            Some(method) => method.bind(target.clone()).call(self, arguments, &[], line),
            None => RuntimeError::err(
                ErrorKind::UndefinedProperty,
                line,
                format!("Class '{}' does not define '{name}' and cannot be indexed.", class.borrow().name),
            ),
        }
    }

    fn static_through_instance(&mut self, name: &Token) {
        self.warn(Warning::new(
            WarningKind::StaticContext,
            name.line,
            format!("Static member '{}' accessed through an instance.", name.lexeme),
        ));
    }

    /// `Class::member` may only reach static members. A plain `Class.member`
    /// on an instance member is allowed with a warning.
    fn instance_member_through_class(
        &mut self,
        class: &Shared<ClassDescriptor>,
        name: &Token,
        static_access: bool,
    ) -> Result<(), RuntimeError> {
        let class_name = class.borrow().name.clone();
        if static_access {
            return RuntimeError::err(
                ErrorKind::ModifierViolation,
                name.line,
                format!("Cannot access non-static member '{}' through '{class_name}::'.", name.lexeme),
            );
        }

        self.warn(Warning::new(
            WarningKind::StaticContext,
            name.line,
            format!("Instance member '{}' accessed through class '{class_name}'.", name.lexeme),
        ));
        Ok(())
    }
}

fn static_on_instance<T>(name: &Token) -> Result<T, RuntimeError> {
    RuntimeError::err(
        ErrorKind::InvalidOperand,
        name.line,
        format!("Cannot use '::{}' on an instance; use the class name.", name.lexeme),
    )
}

fn check_method_shape(function: &Function, class_name: &str, line: i32) -> Result<(), RuntimeError> {
    if function.modifiers.contains(ModifierSet::OPERATOR) && function.arity() != 2 {
        return RuntimeError::err(
            ErrorKind::ModifierViolation,
            line,
            format!(
                "Operator method '{}' of class '{class_name}' must take exactly two parameters.",
                function.name
            ),
        );
    }

    if function.modifiers.contains(ModifierSet::CAST) && function.arity() != 0 {
        return RuntimeError::err(
            ErrorKind::ModifierViolation,
            line,
            format!("Cast method '{}' of class '{class_name}' must take no parameters.", function.name),
        );
    }

    Ok(())
}

/// Static computed properties see the class itself as `this`.
fn bind_static_properties(class: &Shared<ClassDescriptor>) {
    let receiver = Object::Class(class.clone());
    let mut class = class.borrow_mut();

    for cell in class.fields.values_mut() {
        if !cell.is_static() {
            continue;
        }

        if let CellValue::Computed(property) = &cell.value {
            let bound = property.borrow().bind(&receiver);
            *cell = StorageCell::computed(bound);
        }
    }
}
