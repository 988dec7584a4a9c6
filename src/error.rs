use std::fmt::Display;

use thiserror::Error;

/// Classifies user-visible runtime failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UndefinedVariable,
    UndefinedProperty,
    ConstantViolation,
    TypeMismatch,
    ArityMismatch,
    InterfaceConformanceViolation,
    ModifierViolation,
    IndexOutOfBounds,
    InvalidOperand,
    InvalidCall,
    CastFailure,
    Generic,
}

/// A user-level error. It unwinds evaluation until a `try` statement or the
/// top-level interpret loop picks it up.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}] {message}")]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub line: i32,
    pub message: String,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, line: i32, message: impl Into<String>) -> Self {
        Self { kind, line, message: message.into() }
    }

    pub fn err<T>(kind: ErrorKind, line: i32, message: impl Into<String>) -> Result<T, Self> {
        Err(Self::new(kind, line, message))
    }

    pub fn undefined_variable(line: i32, name: &str) -> Self {
        Self::new(ErrorKind::UndefinedVariable, line, format!("Undefined variable '{name}'."))
    }

    pub fn undefined_property(line: i32, name: &str) -> Self {
        Self::new(ErrorKind::UndefinedProperty, line, format!("Undefined property '{name}'."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    AbstractCall,
    StaticContext,
}

/// A diagnostic that is reported but never interrupts execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub kind: WarningKind,
    pub line: i32,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, line: i32, message: impl Into<String>) -> Self {
        Self { kind, line, message: message.into() }
    }
}

impl Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[line {}] Warning: {}", self.line, self.message)
    }
}
