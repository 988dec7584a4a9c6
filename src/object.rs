use std::fmt::Display;
use std::rc::Rc;

use crate::array::ArrayValue;
use crate::class::{ClassDescriptor, Instance};
use crate::enumeration::EnumDescriptor;
use crate::func::Function;
use crate::interface::InterfaceDescriptor;
use crate::types::{TypeDescriptor, TypeKind};
use crate::Shared;

#[derive(Debug, Clone)]
pub enum Object {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Function(Rc<Function>),
    Class(Shared<ClassDescriptor>),
    Instance(Shared<Instance>),
    Array(Shared<ArrayValue>),
    Enum(Rc<EnumDescriptor>),
    Interface(Rc<InterfaceDescriptor>),
    Type(TypeDescriptor),
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(left), Self::Boolean(right)) => left == right,
            (Self::Number(left), Self::Number(right)) => left == right,
            (Self::String(left), Self::String(right)) => left == right,
            (Self::Function(left), Self::Function(right)) => Rc::ptr_eq(left, right),
            (Self::Class(left), Self::Class(right)) => Rc::ptr_eq(left, right),
            (Self::Instance(left), Self::Instance(right)) => Rc::ptr_eq(left, right),
            (Self::Array(left), Self::Array(right)) => Rc::ptr_eq(left, right),
            (Self::Enum(left), Self::Enum(right)) => Rc::ptr_eq(left, right),
            (Self::Interface(left), Self::Interface(right)) => Rc::ptr_eq(left, right),
            (Self::Type(left), Self::Type(right)) => left == right,
            _ => false,
        }
    }
}

impl Object {
    pub fn number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn string(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Null | Self::Boolean(false))
    }

    /// The runtime descriptor of this value.
    pub fn type_of(&self) -> TypeDescriptor {
        match self {
            Self::Null => TypeDescriptor::null(),
            Self::Boolean(_) => TypeDescriptor::boolean(),
            Self::Number(_) => TypeDescriptor::number(),
            Self::String(_) => TypeDescriptor::string(),
            Self::Function(f) => f.signature(),
            Self::Class(_) | Self::Enum(_) | Self::Interface(_) | Self::Type(_) => {
                TypeDescriptor::type_value()
            }
            Self::Instance(i) => TypeDescriptor::object(i.borrow().class_name()),
            Self::Array(a) => a.borrow().type_descriptor(),
        }
    }

    /// Whether this value may be stored in a slot declared as `declared`.
    /// Instances also conform to the names of their ancestors and of the
    /// interfaces those classes implement.
    pub fn conforms_to(&self, declared: &TypeDescriptor) -> bool {
        if self.type_of().matches(declared) {
            return true;
        }

        match self {
            Self::Instance(instance) if declared.kind == TypeKind::Object && !declared.is_array() => {
                instance.borrow().class.borrow().is_a(&declared.name)
            }
            _ => false,
        }
    }
}

impl Display for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Null => write!(f, "nil"),
            Self::Function(func) => write!(f, "{func}"),
            Self::Class(c) => write!(f, "{}", c.borrow().name),
            Self::Instance(i) => write!(f, "{}", i.borrow()),
            Self::Array(a) => write!(f, "{}", a.borrow()),
            Self::Enum(e) => write!(f, "enum {}", e.name),
            Self::Interface(i) => write!(f, "interface {}", i.name),
            Self::Type(t) => write!(f, "{t}"),
        }
    }
}
