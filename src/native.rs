use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::class::ClassDescriptor;
use crate::environment::Environment;
use crate::error::{ErrorKind, RuntimeError};
use crate::func::{Callable, Function};
use crate::interpreter::Interpreter;
use crate::object::Object;
use crate::types::ModifierSet;
use crate::Shared;

#[derive(Debug)]
struct Clock;

impl Callable for Clock {
    fn arity(&self) -> usize {
        0
    }

    fn call(
        &self,
        _interpreter: &mut Interpreter,
        _arguments: Vec<Object>,
        _generics: &[Object],
    ) -> Result<Object, RuntimeError> {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| RuntimeError::new(ErrorKind::Generic, -1, e.to_string()))?;

        Ok(Object::Number(since_epoch.as_millis() as f64 / 1000.0))
    }
}

#[derive(Debug)]
struct Print {
    newline: bool,
}

impl Callable for Print {
    fn arity(&self) -> usize {
        1
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Object>,
        _generics: &[Object],
    ) -> Result<Object, RuntimeError> {
        let text = match arguments.first() {
            Some(value) => interpreter.stringify(value)?,
            None => String::new(),
        };

        if self.newline {
            println!("{text}");
        } else {
            print!("{text}");
            let _ = std::io::stdout().flush();
        }

        Ok(Object::Null)
    }
}

#[derive(Debug)]
struct ErrorOutput;

impl Callable for ErrorOutput {
    fn arity(&self) -> usize {
        1
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Object>,
        _generics: &[Object],
    ) -> Result<Object, RuntimeError> {
        if let Some(value) = arguments.first() {
            let text = interpreter.stringify(value)?;
            eprintln!("{text}");
        }
        Ok(Object::Null)
    }
}

/// `Object.toString`. The receiver arrives as the first argument.
#[derive(Debug)]
struct ObjectToString;

impl Callable for ObjectToString {
    fn arity(&self) -> usize {
        0
    }

    fn call(
        &self,
        _interpreter: &mut Interpreter,
        arguments: Vec<Object>,
        _generics: &[Object],
    ) -> Result<Object, RuntimeError> {
        let text = match arguments.first() {
            Some(Object::Instance(instance)) => format!("{} instance", instance.borrow().class_name()),
            Some(other) => other.to_string(),
            None => "Object".to_owned(),
        };
        Ok(Object::String(text))
    }
}

/// The root of every class hierarchy.
pub fn object_class(globals: Shared<Environment>) -> ClassDescriptor {
    let mut class = ClassDescriptor::new("Object", None, globals);
    let to_string = Function::native("toString", Rc::new(ObjectToString));
    class.methods.insert("toString".to_owned(), Rc::new(to_string));
    class
}

pub fn register_globals(interpreter: &mut Interpreter) {
    interpreter.define_native("clock", Rc::new(Clock), ModifierSet::CONST);
    interpreter.define_native("print", Rc::new(Print { newline: false }), ModifierSet::CONST);
    interpreter.define_native("println", Rc::new(Print { newline: true }), ModifierSet::CONST);
    interpreter.define_native("error", Rc::new(ErrorOutput), ModifierSet::CONST);
}
