#![allow(clippy::new_without_default)]

mod array;
mod ast;
mod class;
mod enumeration;
mod environment;
mod error;
mod func;
mod interface;
mod interpreter;
mod native;
mod object;
mod parser;
mod property;
mod resolver;
mod scanner;
mod token;
mod types;

pub mod prelude {
    pub use crate::array::ArrayValue;
    pub use crate::ast::*;
    pub use crate::class::*;
    pub use crate::enumeration::EnumDescriptor;
    pub use crate::environment::Environment;
    pub use crate::error::*;
    pub use crate::func::*;
    pub use crate::interface::InterfaceDescriptor;
    pub use crate::interpreter::*;
    pub use crate::object::*;
    pub use crate::parser::*;
    pub use crate::property::*;
    pub use crate::resolver::{Resolver, ResolverError};
    pub use crate::scanner::*;
    pub use crate::token::*;
    pub use crate::types::*;
    pub use crate::Shared;
}

use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::rc::Rc;

use error::{RuntimeError, Warning};
use prelude::{Interpreter, Parser, Resolver};
use resolver::ResolverError;

pub type Shared<T> = Rc<RefCell<T>>;
pub type SharedErrorReporter = Shared<ErrorReporter>;

pub struct Lox {
    interpreter: Interpreter,
    error_reporter: SharedErrorReporter,
}

impl Lox {
    pub fn new() -> Self {
        let error_reporter = Rc::new(RefCell::new(ErrorReporter::default()));

        Self {
            interpreter: Interpreter::new().with_error_reporting(error_reporter.clone()),
            error_reporter,
        }
    }

    pub fn had_error(&self) -> bool {
        self.error_reporter.borrow().had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.error_reporter.borrow().had_runtime_error
    }

    pub fn interpreter(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }
}

impl Lox {
    pub fn run_file(&mut self, filename: impl AsRef<std::path::Path>) -> Result<(), anyhow::Error> {
        let filename = filename.as_ref();
        let content = std::fs::read_to_string(filename)
            .map_err(|e| anyhow::anyhow!("could not read {}: {e}", filename.display()))?;
        tracing::debug!(file = %filename.display(), "running script");
        self.run(&content)
    }

    /// Reads and runs one line at a time. Bindings survive between lines;
    /// errors are reported and forgotten.
    pub fn run_prompt(&mut self) -> Result<(), anyhow::Error> {
        let stdin = std::io::stdin();
        let mut lines = stdin.lock().lines();

        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next() else {
                break;
            };

            self.run(&line?)?;
            self.error_reporter.borrow_mut().reset();
        }

        Ok(())
    }

    pub fn run(&mut self, input: &str) -> Result<(), anyhow::Error> {
        let mut scanner = scanner::Scanner::new(input);

        let tokens = match scanner.scan_tokens() {
            Ok(tokens) => tokens,
            Err(errors) => {
                let mut reporter = self.error_reporter.borrow_mut();
                errors.iter().for_each(|e| reporter.static_error(e));
                return Ok(());
            }
        };

        let mut parser = Parser::new(tokens);
        let statements = match parser.parse() {
            Ok(stmts) => stmts,
            Err(errors) => {
                let mut reporter = self.error_reporter.borrow_mut();
                errors.iter().for_each(|e| reporter.static_error(e));
                return Ok(());
            }
        };

        let mut resolver = Resolver::new(&mut self.interpreter);
        if let Err(errors) = resolver.resolve(&statements) {
            let mut reporter = self.error_reporter.borrow_mut();
            for e in errors {
                reporter.resolver_error(&e);
            }
            return Ok(());
        }

        self.interpreter.interpret(&statements);

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ErrorReporter {
    pub had_error: bool,
    pub had_runtime_error: bool,
}

impl ErrorReporter {
    /// Scanner and parser errors already carry their line and location.
    pub fn static_error(&mut self, e: &dyn std::error::Error) {
        eprintln!("{e}");
        self.had_error = true;
    }

    pub fn runtime_error(&mut self, e: &RuntimeError) {
        eprintln!("{e}");
        self.had_runtime_error = true;
    }

    pub fn resolver_error(&mut self, e: &ResolverError) {
        eprintln!("{e}");
        self.had_error = true;
    }

    pub fn warning(&mut self, w: &Warning) {
        eprintln!("{w}");
    }

    fn reset(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }
}
