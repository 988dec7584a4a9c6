use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::rc::Rc;

use crate::environment::Environment;
use crate::func::Function;
use crate::interface::InterfaceDescriptor;
use crate::property::StorageCell;
use crate::Shared;

pub const CONSTRUCTOR: &str = "constructor";

pub struct ClassDescriptor {
    pub name: String,
    pub superclass: Option<Shared<ClassDescriptor>>,
    pub methods: HashMap<String, Rc<Function>>,
    pub fields: HashMap<String, StorageCell>,
    /// The scope holding `super` and the generic template names.
    pub environment: Shared<Environment>,
    pub templates: Vec<String>,
    pub interfaces: Vec<Rc<InterfaceDescriptor>>,
}

impl ClassDescriptor {
    pub fn new(
        name: impl AsRef<str>,
        superclass: Option<Shared<ClassDescriptor>>,
        environment: Shared<Environment>,
    ) -> Self {
        Self {
            name: name.as_ref().to_owned(),
            superclass,
            methods: HashMap::new(),
            fields: HashMap::new(),
            environment,
            templates: vec![],
            interfaces: vec![],
        }
    }

    pub fn as_shared(self) -> Shared<Self> {
        Rc::new(RefCell::new(self))
    }

    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }

        self.superclass.as_ref().and_then(|s| s.borrow().find_method(name))
    }

    pub fn find_field(&self, name: &str) -> Option<StorageCell> {
        if let Some(field) = self.fields.get(name) {
            return Some(field.clone());
        }

        self.superclass.as_ref().and_then(|s| s.borrow().find_field(name))
    }

    /// The class in the chain of `class` that declares field `name`.
    pub fn field_owner(class: &Shared<ClassDescriptor>, name: &str) -> Option<Shared<ClassDescriptor>> {
        let mut current = class.clone();
        loop {
            if current.borrow().fields.contains_key(name) {
                return Some(current);
            }

            let parent = current.borrow().superclass.clone()?;
            current = parent;
        }
    }

    pub fn constructor(&self) -> Option<Rc<Function>> {
        self.find_method(CONSTRUCTOR)
    }

    pub fn arity(&self) -> usize {
        self.constructor().map(|c| c.arity()).unwrap_or(0)
    }

    /// Whether this class is `name`, descends from it, or implements an
    /// interface called `name` somewhere in its chain.
    pub fn is_a(&self, name: &str) -> bool {
        if self.name == name || self.interfaces.iter().any(|i| i.name == name) {
            return true;
        }

        self.superclass.as_ref().map(|s| s.borrow().is_a(name)).unwrap_or(false)
    }

    /// Every non-static field an instance of this class owns, inherited ones
    /// included, paired with the scope of the class declaring it. A subclass
    /// field shadows a same-named superclass field.
    pub fn instance_fields(&self) -> HashMap<String, (StorageCell, Shared<Environment>)> {
        let mut fields =
            self.superclass.as_ref().map(|s| s.borrow().instance_fields()).unwrap_or_default();

        for (name, cell) in &self.fields {
            if !cell.is_static() {
                fields.insert(name.clone(), (cell.clone(), self.environment.clone()));
            }
        }

        fields
    }
}

impl Debug for ClassDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name)
            .field("superclass", &self.superclass.as_ref().map(|s| s.borrow().name.clone()))
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("templates", &self.templates)
            .finish()
    }
}

impl Display for ClassDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

pub struct Instance {
    pub class: Shared<ClassDescriptor>,
    pub fields: HashMap<String, StorageCell>,
    /// Copy of the class scope with this instance's generic arguments bound.
    pub template_scope: Option<Shared<Environment>>,
}

impl Instance {
    pub fn new(class: Shared<ClassDescriptor>, fields: HashMap<String, StorageCell>) -> Self {
        Self { class, fields, template_scope: None }
    }

    pub fn with_template_scope(self, template_scope: Option<Shared<Environment>>) -> Self {
        Self { template_scope, ..self }
    }

    /// The scope a method closing over `closure` runs under for this
    /// instance. Only methods declared by the generic class itself see the
    /// instance's template bindings.
    pub fn scope_for(&self, closure: &Shared<Environment>) -> Option<Shared<Environment>> {
        let scope = self.template_scope.as_ref()?;
        Rc::ptr_eq(&self.class.borrow().environment, closure).then(|| scope.clone())
    }

    pub fn as_shared(self) -> Shared<Self> {
        Rc::new(RefCell::new(self))
    }

    pub fn class_name(&self) -> String {
        self.class.borrow().name.clone()
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class_name())
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Display for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} instance", self.class.borrow())
    }
}
