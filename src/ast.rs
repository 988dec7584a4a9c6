use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::object::Object;
use crate::token::Token;
use crate::types::{ModifierSet, TypeDescriptor};

static NEXT_EXPR_ID: AtomicUsize = AtomicUsize::new(0);

/// Identifies an expression node that can be bound by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(usize);

impl ExprId {
    pub fn next() -> Self {
        Self(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug)]
pub enum Expr {
    Literal {
        value: Object,
    },
    Grouping {
        expr: Box<Expr>,
    },
    Unary {
        operator: Token,
        right: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Ternary {
        condition: Box<Expr>,
        question: Token,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Variable {
        id: ExprId,
        name: Token,
    },
    /// `=`, a compound operator, or `++`/`--` (which carry no value).
    Assignment {
        id: ExprId,
        name: Token,
        operator: Token,
        value: Option<Box<Expr>>,
    },
    Call {
        callee: Box<Expr>,
        paren: Token,
        arguments: Vec<Expr>,
        generics: Vec<Expr>,
        null_safe: bool,
    },
    Get {
        object: Box<Expr>,
        name: Token,
        null_safe: bool,
    },
    StaticGet {
        object: Box<Expr>,
        name: Token,
    },
    Set {
        object: Box<Expr>,
        name: Token,
        operator: Token,
        value: Option<Box<Expr>>,
    },
    StaticSet {
        object: Box<Expr>,
        name: Token,
        operator: Token,
        value: Option<Box<Expr>>,
    },
    Index {
        object: Box<Expr>,
        bracket: Token,
        index: Box<Expr>,
    },
    IndexSet {
        object: Box<Expr>,
        bracket: Token,
        index: Box<Expr>,
        operator: Token,
        value: Option<Box<Expr>>,
    },
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },
    This {
        id: ExprId,
        keyword: Token,
    },
    Value {
        id: ExprId,
        keyword: Token,
    },
    Cast {
        expr: Box<Expr>,
        keyword: Token,
        target: Box<Expr>,
    },
    /// `[a, b]`, `[type: a, b]` or `[type; size]`.
    Array {
        bracket: Token,
        element_type: Option<TypeDescriptor>,
        elements: Vec<Expr>,
        size: Option<Box<Expr>>,
    },
    Lambda {
        decl: Rc<FunctionDecl>,
    },
    TypeLiteral {
        keyword: Token,
        descriptor: TypeDescriptor,
    },
    Length {
        keyword: Token,
        expr: Box<Expr>,
    },
    Typeof {
        keyword: Token,
        expr: Box<Expr>,
    },
}

impl Expr {
    pub fn boolean_literal(v: bool) -> Expr {
        Expr::Literal { value: Object::Boolean(v) }
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: Token,
    pub declared_type: TypeDescriptor,
    pub modifiers: ModifierSet,
}

#[derive(Debug)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Parameter>,
    pub return_type: TypeDescriptor,
    pub modifiers: ModifierSet,
    /// `None` for a bodyless declaration such as `fun f();`.
    pub body: Option<Rc<Vec<Stmt>>>,
}

#[derive(Debug)]
pub struct PropertyDecl {
    pub name: Token,
    pub modifiers: ModifierSet,
    pub declared_type: TypeDescriptor,
    pub getter: Rc<FunctionDecl>,
    pub setter: Option<Rc<FunctionDecl>>,
}

#[derive(Debug)]
pub struct ClassDecl {
    pub name: Token,
    pub superclass: Option<Expr>,
    pub interfaces: Vec<Expr>,
    pub templates: Vec<Token>,
    /// `Stmt::Var` and `Stmt::Property` members.
    pub fields: Vec<Stmt>,
    pub methods: Vec<Rc<FunctionDecl>>,
}

#[derive(Debug)]
pub struct InterfaceDecl {
    pub name: Token,
    pub fields: Vec<Stmt>,
    pub methods: Vec<Rc<FunctionDecl>>,
}

#[derive(Debug)]
pub enum Stmt {
    Expression {
        expr: Expr,
    },
    Var {
        name: Token,
        modifiers: ModifierSet,
        declared_type: Option<TypeDescriptor>,
        initializer: Option<Expr>,
    },
    Property {
        decl: Rc<PropertyDecl>,
    },
    Function {
        decl: Rc<FunctionDecl>,
    },
    Class {
        decl: Rc<ClassDecl>,
    },
    Interface {
        decl: Rc<InterfaceDecl>,
    },
    Enum {
        name: Token,
        elements: Vec<Token>,
    },
    Block {
        statements: Vec<Stmt>,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    /// Desugared `for` loops carry their increment and the loop variables
    /// that every iteration gets a fresh copy of.
    While {
        condition: Expr,
        body: Box<Stmt>,
        increment: Option<Expr>,
        per_iteration: Vec<Token>,
    },
    When {
        condition: Expr,
        body: Box<Stmt>,
        finally: Option<Box<Stmt>>,
    },
    Switch {
        keyword: Token,
        value: Expr,
        cases: Vec<(Expr, Stmt)>,
        default: Option<Box<Stmt>>,
    },
    Try {
        body: Box<Stmt>,
        catch_name: Option<Token>,
        handler: Vec<Stmt>,
    },
    Test {
        keyword: Token,
        name: Expr,
        body: Box<Stmt>,
    },
    Expect {
        keyword: Token,
        value: Expr,
    },
    Return {
        keyword: Token,
        value: Option<Expr>,
    },
    Break {
        token: Token,
    },
    Continue {
        token: Token,
    },
    Module {
        keyword: Token,
        name: Token,
    },
}

impl AsRef<Stmt> for Stmt {
    fn as_ref(&self) -> &Stmt {
        self
    }
}
