use std::rc::Rc;

use thiserror::Error;

use crate::ast::{ClassDecl, Expr, ExprId, FunctionDecl, InterfaceDecl, Parameter, PropertyDecl, Stmt};
use crate::object::Object;
use crate::token::{Token, TokenType};
use crate::types::{ModifierSet, TypeDescriptor};

const MAX_ARGUMENTS: usize = 255;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {}] Error {}: {}", .token.line, location(.token), .message)]
pub struct ParserError {
    pub token: Token,
    pub message: String,
}

fn location(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        "at end".to_owned()
    } else {
        format!("at '{}'", token.lexeme)
    }
}

/// Class and interface bodies share one member grammar.
#[derive(Default)]
struct Members {
    fields: Vec<Stmt>,
    methods: Vec<Rc<FunctionDecl>>,
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<ParserError>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0, errors: vec![] }
    }

    /// Parses every declaration, synchronizing at statement boundaries after
    /// an error so that later errors are reported too.
    pub fn parse(&mut self) -> Result<Vec<Stmt>, Vec<ParserError>> {
        let mut statements = vec![];
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        if self.errors.is_empty() {
            Ok(statements)
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let result = self.declaration_inner();

        if result.is_none() {
            self.synchronize();
            return None;
        }

        result
    }

    fn declaration_inner(&mut self) -> Option<Stmt> {
        let modifiers = self.modifiers();

        if self.match_tt(&[TokenType::Var]) {
            self.var_declaration(modifiers, None)
        } else if self.check(&TokenType::Fun) && self.check_next(&TokenType::Identifier) {
            self.advance();
            let decl = self.function("function", modifiers)?;
            Some(Stmt::Function { decl: Rc::new(decl) })
        } else if self.match_tt(&[TokenType::Class]) {
            self.class_declaration()
        } else if self.match_tt(&[TokenType::Interface]) {
            self.interface_declaration()
        } else if self.match_tt(&[TokenType::Enum]) {
            self.enum_declaration()
        } else if self.peek().token_type.is_type_keyword() {
            self.typed_declaration(modifiers)
        } else if !modifiers.is_empty() && self.check(&TokenType::Identifier) {
            self.var_declaration(modifiers, None)
        } else if !modifiers.is_empty() {
            self.error(self.peek().clone(), "Expect declaration after modifiers.");
            None
        } else {
            self.statement()
        }
    }

    fn modifiers(&mut self) -> ModifierSet {
        let mut modifiers = ModifierSet::empty();
        while let Some(modifier) = ModifierSet::from_token_type(self.peek().token_type) {
            self.advance();
            modifiers |= modifier;
        }
        modifiers
    }

    fn var_declaration(
        &mut self,
        modifiers: ModifierSet,
        declared_type: Option<TypeDescriptor>,
    ) -> Option<Stmt> {
        let name = self.consume(TokenType::Identifier, "Expect variable name.")?;
        self.finish_var(name, modifiers, declared_type)
    }

    fn finish_var(
        &mut self,
        name: Token,
        modifiers: ModifierSet,
        declared_type: Option<TypeDescriptor>,
    ) -> Option<Stmt> {
        let initializer =
            if self.match_tt(&[TokenType::Equal]) { Some(self.expression()?) } else { None };

        self.consume(TokenType::Semicolon, "Expect ';' after variable declaration.")?;

        Some(Stmt::Var { name, modifiers, declared_type, initializer })
    }

    /// `<type> name = value;` or a computed property `<type> name { get {..} }`.
    fn typed_declaration(&mut self, modifiers: ModifierSet) -> Option<Stmt> {
        let (declared_type, type_modifiers) = self.type_annotation()?;
        let modifiers = modifiers | type_modifiers;
        let name = self.consume(TokenType::Identifier, "Expect name after type.")?;

        if self.match_tt(&[TokenType::LeftBrace]) {
            let decl = self.property(name, modifiers, declared_type)?;
            return Some(Stmt::Property { decl: Rc::new(decl) });
        }

        self.finish_var(name, modifiers, Some(declared_type))
    }

    fn property(
        &mut self,
        name: Token,
        modifiers: ModifierSet,
        declared_type: TypeDescriptor,
    ) -> Option<PropertyDecl> {
        let mut getter = None;
        let mut setter = None;

        while !self.check(&TokenType::RightBrace) && !self.is_at_end() {
            let accessor = self.consume(TokenType::Identifier, "Expect 'get' or 'set'.")?;
            self.consume(TokenType::LeftBrace, "Expect '{' before accessor body.")?;
            let body = self.block()?;

            let decl = Rc::new(FunctionDecl {
                name: accessor.clone(),
                params: vec![Parameter {
                    name: Token::synthetic("value", accessor.line),
                    declared_type: TypeDescriptor::any(),
                    modifiers: ModifierSet::empty(),
                }],
                return_type: TypeDescriptor::any(),
                modifiers,
                body: Some(Rc::new(body)),
            });

            let kind = accessor.lexeme.clone();
            match kind.as_str() {
                "get" if getter.is_none() => getter = Some(decl),
                "set" if setter.is_none() => setter = Some(decl),
                "get" | "set" => self.error(accessor, "Accessor is already defined."),
                _ => self.error(accessor, "Expect 'get' or 'set'."),
            }
        }

        self.consume(TokenType::RightBrace, "Expect '}' after property accessors.")?;

        let Some(getter) = getter else {
            self.error(name, "Property must define a getter.");
            return None;
        };

        Some(PropertyDecl { name, modifiers, declared_type, getter, setter })
    }

    fn type_annotation(&mut self) -> Option<(TypeDescriptor, ModifierSet)> {
        let token = self.advance();
        let mut modifiers = ModifierSet::empty();

        let mut descriptor = match token.token_type {
            TokenType::NumType => TypeDescriptor::number(),
            TokenType::StringType => TypeDescriptor::string(),
            TokenType::BoolType => TypeDescriptor::boolean(),
            TokenType::VoidType => TypeDescriptor::void(),
            TokenType::AnyType => TypeDescriptor::any(),
            TokenType::TypeType => TypeDescriptor::type_value(),
            TokenType::ByteType => {
                modifiers |= ModifierSet::BYTE;
                TypeDescriptor::number()
            }
            TokenType::ObjType => {
                if self.match_tt(&[TokenType::Fun]) {
                    self.function_type()?
                } else {
                    let name = self.consume(TokenType::Identifier, "Expect class name after 'obj'.")?;
                    TypeDescriptor::object(name.lexeme)
                }
            }
            _ => {
                self.error(token, "Expect type.");
                return None;
            }
        };

        while self.check(&TokenType::LeftBracket) && self.check_next(&TokenType::RightBracket) {
            self.advance();
            self.advance();
            descriptor = descriptor.array_of();
        }

        Some((descriptor, modifiers))
    }

    /// `fun(T1, T2): R`, after `obj fun`.
    fn function_type(&mut self) -> Option<TypeDescriptor> {
        self.consume(TokenType::LeftParen, "Expect '(' in function type.")?;
        let mut params = vec![];
        if !self.check(&TokenType::RightParen) {
            loop {
                params.push(self.type_annotation()?.0);
                if !self.match_tt(&[TokenType::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after parameter types.")?;
        self.consume(TokenType::Colon, "Expect ':' before return type.")?;
        let (return_type, _) = self.type_annotation()?;

        Some(TypeDescriptor::function(&params, &return_type))
    }

    fn function(&mut self, kind: &str, modifiers: ModifierSet) -> Option<FunctionDecl> {
        let name = self.consume(TokenType::Identifier, &format!("Expect {kind} name."))?;
        self.consume(TokenType::LeftParen, &format!("Expect '(' after {kind} name."))?;
        self.function_rest(name, kind, modifiers, true)
    }

    /// Parameters, return type and body; the opening parenthesis is already
    /// consumed.
    fn function_rest(
        &mut self,
        name: Token,
        kind: &str,
        modifiers: ModifierSet,
        allow_bodyless: bool,
    ) -> Option<FunctionDecl> {
        let mut params = vec![];
        if !self.check(&TokenType::RightParen) {
            loop {
                if params.len() >= MAX_ARGUMENTS {
                    self.error(self.peek().clone(), "Can't have more than 255 parameters.");
                }

                params.push(self.parameter()?);
                if !self.match_tt(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        self.consume(TokenType::RightParen, "Expect ')' after parameters.")?;

        let return_type = if self.match_tt(&[TokenType::Arrow]) {
            self.type_annotation()?.0
        } else {
            TypeDescriptor::any()
        };

        let body = if allow_bodyless && self.match_tt(&[TokenType::Semicolon]) {
            None
        } else {
            self.consume(TokenType::LeftBrace, &format!("Expect '{{' before {kind} body."))?;
            Some(Rc::new(self.block()?))
        };

        Some(FunctionDecl { name, params, return_type, modifiers, body })
    }

    fn parameter(&mut self) -> Option<Parameter> {
        let mut modifiers = self.modifiers();
        let declared_type = if self.peek().token_type.is_type_keyword() {
            let (declared_type, type_modifiers) = self.type_annotation()?;
            modifiers |= type_modifiers;
            declared_type
        } else {
            TypeDescriptor::any()
        };

        let name = self.consume(TokenType::Identifier, "Expect parameter name.")?;
        Some(Parameter { name, declared_type, modifiers })
    }

    fn class_declaration(&mut self) -> Option<Stmt> {
        let name = self.consume(TokenType::Identifier, "Expect class name.")?;

        let superclass = if self.match_tt(&[TokenType::LeftArrow]) {
            let name = self.consume(TokenType::Identifier, "Expect superclass name.")?;
            Some(Expr::Variable { id: ExprId::next(), name })
        } else {
            None
        };

        let mut interfaces = vec![];
        if self.match_tt(&[TokenType::Arrow]) {
            loop {
                let name = self.consume(TokenType::Identifier, "Expect interface name.")?;
                interfaces.push(Expr::Variable { id: ExprId::next(), name });
                if !self.match_tt(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        let mut templates = vec![];
        if self.match_tt(&[TokenType::Colon]) {
            self.consume(TokenType::Less, "Expect '<' before template names.")?;
            loop {
                templates.push(self.consume(TokenType::Identifier, "Expect template name.")?);
                if !self.match_tt(&[TokenType::Comma]) {
                    break;
                }
            }
            self.consume(TokenType::Greater, "Expect '>' after template names.")?;
        }

        self.consume(TokenType::LeftBrace, "Expect '{' before class body.")?;
        let Members { fields, methods } = self.members("class")?;

        let decl = ClassDecl { name, superclass, interfaces, templates, fields, methods };
        Some(Stmt::Class { decl: Rc::new(decl) })
    }

    fn interface_declaration(&mut self) -> Option<Stmt> {
        let name = self.consume(TokenType::Identifier, "Expect interface name.")?;
        self.consume(TokenType::LeftBrace, "Expect '{' before interface body.")?;
        let Members { fields, methods } = self.members("interface")?;

        Some(Stmt::Interface { decl: Rc::new(InterfaceDecl { name, fields, methods }) })
    }

    fn members(&mut self, kind: &str) -> Option<Members> {
        let mut members = Members::default();

        while !self.check(&TokenType::RightBrace) && !self.is_at_end() {
            let modifiers = self.modifiers();

            if self.match_tt(&[TokenType::Method]) {
                members.methods.push(Rc::new(self.function("method", modifiers)?));
            } else if self.match_tt(&[TokenType::Var]) {
                members.fields.push(self.var_declaration(modifiers, None)?);
            } else if self.peek().token_type.is_type_keyword() {
                members.fields.push(self.typed_declaration(modifiers)?);
            } else if !modifiers.is_empty() && self.check(&TokenType::Identifier) {
                members.fields.push(self.var_declaration(modifiers, None)?);
            } else {
                self.error(self.peek().clone(), &format!("Expect method or field in {kind} body."));
                return None;
            }
        }

        self.consume(TokenType::RightBrace, &format!("Expect '}}' after {kind} body."))?;
        Some(members)
    }

    fn enum_declaration(&mut self) -> Option<Stmt> {
        let name = self.consume(TokenType::Identifier, "Expect enum name.")?;
        self.consume(TokenType::LeftBrace, "Expect '{' before enum body.")?;

        let mut elements = vec![];
        while !self.check(&TokenType::RightBrace) {
            elements.push(self.consume(TokenType::Identifier, "Expect enum element name.")?);
            if !self.match_tt(&[TokenType::Comma]) {
                break;
            }
        }

        self.consume(TokenType::RightBrace, "Expect '}' after enum elements.")?;
        Some(Stmt::Enum { name, elements })
    }

    fn statement(&mut self) -> Option<Stmt> {
        if self.match_tt(&[TokenType::If]) {
            self.if_statement()
        } else if self.match_tt(&[TokenType::While]) {
            self.while_statement()
        } else if self.match_tt(&[TokenType::For]) {
            self.for_statement()
        } else if self.match_tt(&[TokenType::When]) {
            self.when_statement()
        } else if self.match_tt(&[TokenType::Switch]) {
            self.switch_statement()
        } else if self.match_tt(&[TokenType::Try]) {
            self.try_statement()
        } else if self.match_tt(&[TokenType::Test]) {
            self.test_statement()
        } else if self.match_tt(&[TokenType::Expect]) {
            let keyword = self.previous();
            let value = self.expression()?;
            self.consume(TokenType::Semicolon, "Expect ';' after expectation.")?;
            Some(Stmt::Expect { keyword, value })
        } else if self.match_tt(&[TokenType::Return]) {
            self.return_statement()
        } else if self.match_tt(&[TokenType::Break]) {
            let token = self.previous();
            self.consume(TokenType::Semicolon, "Expect ';' after 'break'.")?;
            Some(Stmt::Break { token })
        } else if self.match_tt(&[TokenType::Continue]) {
            let token = self.previous();
            self.consume(TokenType::Semicolon, "Expect ';' after 'continue'.")?;
            Some(Stmt::Continue { token })
        } else if self.match_tt(&[TokenType::Module]) {
            let keyword = self.previous();
            let name = self.consume(TokenType::Identifier, "Expect module name.")?;
            self.consume(TokenType::Semicolon, "Expect ';' after module name.")?;
            Some(Stmt::Module { keyword, name })
        } else if self.match_tt(&[TokenType::LeftBrace]) {
            Some(Stmt::Block { statements: self.block()? })
        } else {
            self.expression_statement()
        }
    }

    fn parenthesized(&mut self, after: &str) -> Option<Expr> {
        self.consume(TokenType::LeftParen, &format!("Expect '(' after '{after}'."))?;
        let expr = self.expression()?;
        self.consume(TokenType::RightParen, &format!("Expect ')' after '{after}' expression."))?;
        Some(expr)
    }

    fn if_statement(&mut self) -> Option<Stmt> {
        let condition = self.parenthesized("if")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch =
            if self.match_tt(&[TokenType::Else]) { Some(Box::new(self.statement()?)) } else { None };

        Some(Stmt::If { condition, then_branch, else_branch })
    }

    fn return_statement(&mut self) -> Option<Stmt> {
        let keyword = self.previous();
        let value = if !self.check(&TokenType::Semicolon) { Some(self.expression()?) } else { None };

        self.consume(TokenType::Semicolon, "Expect ';' after return value.")?;
        Some(Stmt::Return { keyword, value })
    }

    fn while_statement(&mut self) -> Option<Stmt> {
        let condition = self.parenthesized("while")?;
        let body = Box::new(self.statement()?);
        Some(Stmt::While { condition, body, increment: None, per_iteration: vec![] })
    }

    fn when_statement(&mut self) -> Option<Stmt> {
        let condition = self.parenthesized("when")?;
        let body = Box::new(self.statement()?);
        let finally =
            if self.match_tt(&[TokenType::Finally]) { Some(Box::new(self.statement()?)) } else { None };

        Some(Stmt::When { condition, body, finally })
    }

    fn for_statement(&mut self) -> Option<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_tt(&[TokenType::Semicolon]) {
            None
        } else if self.check(&TokenType::Var)
            || self.peek().token_type.is_type_keyword()
            || self.peek().token_type.is_modifier()
        {
            Some(self.declaration_inner()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(&TokenType::Semicolon) {
            self.expression()?
        } else {
            Expr::boolean_literal(true)
        };
        self.consume(TokenType::Semicolon, "Expect ';' after loop condition.")?;

        let increment =
            if !self.check(&TokenType::RightParen) { Some(self.expression()?) } else { None };
        self.consume(TokenType::RightParen, "Expect ')' after for clauses.")?;

        let body = Box::new(self.statement()?);

        // Every iteration gets its own copy of the variables the initializer
        // declares.
        let per_iteration = match &initializer {
            Some(Stmt::Var { name, .. }) => vec![name.clone()],
            _ => vec![],
        };

        let body = Stmt::While { condition, body, increment, per_iteration };

        match initializer {
            Some(initializer) => Some(Stmt::Block { statements: vec![initializer, body] }),
            None => Some(body),
        }
    }

    fn switch_statement(&mut self) -> Option<Stmt> {
        let keyword = self.previous();
        let value = self.parenthesized("switch")?;
        self.consume(TokenType::LeftBrace, "Expect '{' before switch body.")?;

        let mut cases = vec![];
        let mut default = None;
        while !self.check(&TokenType::RightBrace) && !self.is_at_end() {
            if self.match_tt(&[TokenType::Case]) {
                let case = self.parenthesized("case")?;
                cases.push((case, self.statement()?));
            } else if self.match_tt(&[TokenType::Default]) {
                if default.is_some() {
                    self.error(self.previous(), "Switch already has a default branch.");
                }
                default = Some(Box::new(self.statement()?));
            } else {
                self.error(self.peek().clone(), "Expect 'case' or 'default'.");
                return None;
            }
        }

        self.consume(TokenType::RightBrace, "Expect '}' after switch body.")?;
        Some(Stmt::Switch { keyword, value, cases, default })
    }

    fn try_statement(&mut self) -> Option<Stmt> {
        let body = Box::new(self.statement()?);
        self.consume(TokenType::Catch, "Expect 'catch' after try body.")?;

        let catch_name = if self.match_tt(&[TokenType::LeftParen]) {
            let name = self.consume(TokenType::Identifier, "Expect error name.")?;
            self.consume(TokenType::RightParen, "Expect ')' after error name.")?;
            Some(name)
        } else {
            None
        };

        self.consume(TokenType::LeftBrace, "Expect '{' before catch body.")?;
        let handler = self.block()?;

        Some(Stmt::Try { body, catch_name, handler })
    }

    fn test_statement(&mut self) -> Option<Stmt> {
        let keyword = self.previous();
        let name = self.parenthesized("test")?;
        let body = Box::new(self.statement()?);
        Some(Stmt::Test { keyword, name, body })
    }

    fn block(&mut self) -> Option<Vec<Stmt>> {
        let mut statements = vec![];

        while !self.check(&TokenType::RightBrace) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(TokenType::RightBrace, "Expect '}' after block.")?;
        Some(statements)
    }

    fn expression_statement(&mut self) -> Option<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after expression.")?;
        Some(Stmt::Expression { expr })
    }

    fn expression(&mut self) -> Option<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Option<Expr> {
        let expr = self.cast()?;

        if self.match_tt(&[
            TokenType::Equal,
            TokenType::PlusEqual,
            TokenType::MinusEqual,
            TokenType::StarEqual,
            TokenType::SlashEqual,
            TokenType::StarStarEqual,
        ]) {
            let operator = self.previous();
            let value = self.assignment()?;
            return Some(self.assignment_target(expr, operator, Some(Box::new(value))));
        }

        if self.match_tt(&[TokenType::PlusPlus, TokenType::MinusMinus]) {
            let operator = self.previous();
            return Some(self.assignment_target(expr, operator, None));
        }

        Some(expr)
    }

    fn assignment_target(&mut self, target: Expr, operator: Token, value: Option<Box<Expr>>) -> Expr {
        match target {
            Expr::Variable { name, .. } => Expr::Assignment { id: ExprId::next(), name, operator, value },
            Expr::Get { object, name, null_safe: false } => Expr::Set { object, name, operator, value },
            Expr::StaticGet { object, name } => Expr::StaticSet { object, name, operator, value },
            Expr::Index { object, bracket, index } => {
                Expr::IndexSet { object, bracket, index, operator, value }
            }
            target => {
                // Report the error but keep parsing; the statement is still
                // well-formed.
                self.error(operator, "Invalid assignment target.");
                target
            }
        }
    }

    fn cast(&mut self) -> Option<Expr> {
        let mut expr = self.ternary()?;

        while self.match_tt(&[TokenType::As]) {
            let keyword = self.previous();
            let target = self.call()?;
            expr = Expr::Cast { expr: Box::new(expr), keyword, target: Box::new(target) };
        }

        Some(expr)
    }

    fn ternary(&mut self) -> Option<Expr> {
        let condition = self.or()?;

        if self.match_tt(&[TokenType::Question]) {
            let question = self.previous();
            let then_branch = self.assignment()?;
            self.consume(TokenType::Colon, "Expect ':' in conditional expression.")?;
            let else_branch = self.ternary()?;
            return Some(Expr::Ternary {
                condition: Box::new(condition),
                question,
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            });
        }

        Some(condition)
    }

    fn or(&mut self) -> Option<Expr> {
        let mut expr = self.and()?;

        while self.match_tt(&[TokenType::Or]) {
            let operator = self.previous();
            let right = self.and()?;
            expr = Expr::Logical { left: Box::new(expr), operator, right: Box::new(right) };
        }

        Some(expr)
    }

    fn and(&mut self) -> Option<Expr> {
        let mut expr = self.equality()?;

        while self.match_tt(&[TokenType::And]) {
            let operator = self.previous();
            let right = self.equality()?;
            expr = Expr::Logical { left: Box::new(expr), operator, right: Box::new(right) };
        }

        Some(expr)
    }

    fn binary(
        &mut self,
        operators: &[TokenType],
        operand: fn(&mut Self) -> Option<Expr>,
    ) -> Option<Expr> {
        let mut expr = operand(self)?;

        while self.match_tt(operators) {
            let operator = self.previous();
            let right = operand(self)?;
            expr = Expr::Binary { left: Box::new(expr), operator, right: Box::new(right) };
        }

        Some(expr)
    }

    fn equality(&mut self) -> Option<Expr> {
        self.binary(
            &[
                TokenType::BangEqual,
                TokenType::EqualEqual,
                TokenType::QuestionEqual,
                TokenType::QuestionQuestion,
            ],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Option<Expr> {
        self.binary(
            &[TokenType::GreaterEqual, TokenType::Greater, TokenType::LessEqual, TokenType::Less],
            Self::term,
        )
    }

    fn term(&mut self) -> Option<Expr> {
        self.binary(&[TokenType::Minus, TokenType::Plus], Self::factor)
    }

    fn factor(&mut self) -> Option<Expr> {
        self.binary(&[TokenType::Slash, TokenType::Star], Self::unary)
    }

    fn unary(&mut self) -> Option<Expr> {
        if self.match_tt(&[TokenType::Bang, TokenType::Minus]) {
            let operator = self.previous();
            let right = self.unary()?;
            return Some(Expr::Unary { operator, right: Box::new(right) });
        }

        self.call()
    }

    fn call(&mut self) -> Option<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.match_tt(&[TokenType::LeftParen]) {
                expr = self.finish_call(expr, vec![], false)?;
            } else if self.check(&TokenType::Colon) && self.check_next(&TokenType::Less) {
                self.advance();
                self.advance();
                let generics = self.generic_arguments()?;
                self.consume(TokenType::LeftParen, "Expect '(' after generic arguments.")?;
                expr = self.finish_call(expr, generics, false)?;
            } else if self.match_tt(&[TokenType::Dot]) {
                let name = self.consume(TokenType::Identifier, "Expect property name after '.'.")?;
                expr = Expr::Get { object: Box::new(expr), name, null_safe: false };
            } else if self.match_tt(&[TokenType::QuestionDot]) {
                let name = self.consume(TokenType::Identifier, "Expect property name after '?.'.")?;
                expr = Expr::Get { object: Box::new(expr), name, null_safe: true };
                if self.match_tt(&[TokenType::LeftParen]) {
                    expr = self.finish_call(expr, vec![], true)?;
                }
            } else if self.match_tt(&[TokenType::ColonColon]) {
                let name = self.consume(TokenType::Identifier, "Expect member name after '::'.")?;
                expr = Expr::StaticGet { object: Box::new(expr), name };
            } else if self.match_tt(&[TokenType::LeftBracket]) {
                let bracket = self.previous();
                let index = self.expression()?;
                self.consume(TokenType::RightBracket, "Expect ']' after index.")?;
                expr = Expr::Index { object: Box::new(expr), bracket, index: Box::new(index) };
            } else {
                break;
            }
        }

        Some(expr)
    }

    fn generic_arguments(&mut self) -> Option<Vec<Expr>> {
        let mut generics = vec![];
        loop {
            generics.push(self.primary()?);
            if !self.match_tt(&[TokenType::Comma]) {
                break;
            }
        }
        self.consume(TokenType::Greater, "Expect '>' after generic arguments.")?;
        Some(generics)
    }

    fn finish_call(&mut self, callee: Expr, generics: Vec<Expr>, null_safe: bool) -> Option<Expr> {
        let mut arguments = vec![];

        if !self.check(&TokenType::RightParen) {
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    // Just report the error, but don't return None yet
                    self.error(self.peek().clone(), "Can't have more than 255 arguments.");
                }

                arguments.push(self.expression()?);

                if !self.match_tt(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        let paren = self.consume(TokenType::RightParen, "Expect ')' after arguments.")?;
        Some(Expr::Call { callee: Box::new(callee), paren, arguments, generics, null_safe })
    }

    fn primary(&mut self) -> Option<Expr> {
        if self.match_tt(&[TokenType::False]) {
            return Some(Expr::boolean_literal(false));
        }
        if self.match_tt(&[TokenType::True]) {
            return Some(Expr::boolean_literal(true));
        }
        if self.match_tt(&[TokenType::Nil]) {
            return Some(Expr::Literal { value: Object::Null });
        }
        if self.match_tt(&[TokenType::Number, TokenType::StringLiteral]) {
            let token = self.previous();
            return match token.literal.clone() {
                Some(value) => Some(Expr::Literal { value }),
                None => {
                    self.error(token, "Expect literal value.");
                    None
                }
            };
        }
        if self.match_tt(&[TokenType::This]) {
            return Some(Expr::This { id: ExprId::next(), keyword: self.previous() });
        }
        if self.match_tt(&[TokenType::Value]) {
            return Some(Expr::Value { id: ExprId::next(), keyword: self.previous() });
        }
        if self.match_tt(&[TokenType::Super]) {
            let keyword = self.previous();
            self.consume(TokenType::Dot, "Expect '.' after 'super'.")?;
            let method = self.consume(TokenType::Identifier, "Expect superclass method name.")?;
            return Some(Expr::Super { id: ExprId::next(), keyword, method });
        }
        if self.match_tt(&[TokenType::Identifier]) {
            return Some(Expr::Variable { id: ExprId::next(), name: self.previous() });
        }
        if self.match_tt(&[TokenType::LeftParen]) {
            let expr = self.expression()?;
            self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
            return Some(Expr::Grouping { expr: Box::new(expr) });
        }
        if self.match_tt(&[TokenType::LeftBracket]) {
            return self.array_literal();
        }
        if self.match_tt(&[TokenType::Fun]) {
            let keyword = self.previous();
            self.consume(TokenType::LeftParen, "Expect '(' after 'fun'.")?;
            let name = Token::synthetic("lambda", keyword.line);
            let decl = self.function_rest(name, "lambda", ModifierSet::empty(), false)?;
            return Some(Expr::Lambda { decl: Rc::new(decl) });
        }
        if self.match_tt(&[TokenType::Typeof]) {
            let keyword = self.previous();
            let expr = self.parenthesized("typeof")?;
            return Some(Expr::Typeof { keyword, expr: Box::new(expr) });
        }
        if self.match_tt(&[TokenType::Length]) {
            let keyword = self.previous();
            let expr = self.parenthesized("length")?;
            return Some(Expr::Length { keyword, expr: Box::new(expr) });
        }
        if self.peek().token_type.is_type_keyword() {
            let keyword = self.peek().clone();
            let (descriptor, _) = self.type_annotation()?;
            return Some(Expr::TypeLiteral { keyword, descriptor });
        }

        self.error(self.peek().clone(), "Expect expression.");
        None
    }

    /// `[a, b]`, `[type: a, b]` or `[type; size]`; the `[` is consumed.
    fn array_literal(&mut self) -> Option<Expr> {
        let bracket = self.previous();

        let mut element_type = None;
        if self.peek().token_type.is_type_keyword() {
            let (descriptor, _) = self.type_annotation()?;
            if self.match_tt(&[TokenType::Semicolon]) {
                let size = self.expression()?;
                self.consume(TokenType::RightBracket, "Expect ']' after array size.")?;
                return Some(Expr::Array {
                    bracket,
                    element_type: Some(descriptor),
                    elements: vec![],
                    size: Some(Box::new(size)),
                });
            }
            self.consume(TokenType::Colon, "Expect ':' or ';' after array element type.")?;
            element_type = Some(descriptor);
        }

        let mut elements = vec![];
        if !self.check(&TokenType::RightBracket) {
            loop {
                elements.push(self.expression()?);
                if !self.match_tt(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        self.consume(TokenType::RightBracket, "Expect ']' after array elements.")?;
        Some(Expr::Array { bracket, element_type, elements, size: None })
    }

    /// Return the next token if its `token_type` matches the given type as input.
    /// Otherwise, record the error and return `None`.
    fn consume(&mut self, token_type: TokenType, message: &str) -> Option<Token> {
        if self.check(&token_type) {
            return Some(self.advance());
        }

        self.error(self.peek().clone(), message);
        None
    }

    fn error(&mut self, token: Token, message: &str) {
        self.errors.push(ParserError { token, message: message.to_owned() });
    }

    fn match_tt(&mut self, types: &[TokenType]) -> bool {
        for tt in types {
            if self.check(tt) {
                self.advance();
                return true;
            }
        }

        false
    }

    /// Check to see if the next token's type matches the given `token_type`.
    fn check(&self, token_type: &TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == *token_type
    }

    fn check_next(&self, token_type: &TokenType) -> bool {
        self.tokens.get(self.current + 1).map(|t| t.token_type == *token_type).unwrap_or(false)
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::EOF
    }

    fn peek(&self) -> &Token {
        // The scanner always terminates the stream with EOF.
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> Token {
        self.tokens[self.current.saturating_sub(1)].clone()
    }

    fn synchronize(&mut self) {
        self.advance();

        // Move and discard tokens until we find a statement boundary
        while !self.is_at_end() {
            if self.previous().token_type == TokenType::Semicolon {
                return;
            }

            match self.peek().token_type {
                TokenType::Class
                | TokenType::Interface
                | TokenType::Enum
                | TokenType::Fun
                | TokenType::Var
                | TokenType::Const
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::When
                | TokenType::Switch
                | TokenType::Try
                | TokenType::Test
                | TokenType::Return => return,
                _ => {}
            }

            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;

    fn parse(source: &str) -> Result<Vec<Stmt>, Vec<ParserError>> {
        let tokens = Scanner::new(source).scan_tokens().unwrap();
        Parser::new(tokens).parse()
    }

    #[test]
    fn for_loops_carry_their_loop_variable() {
        let stmts = parse("for (var i = 0; i < 3; i++) {}").unwrap();
        let Stmt::Block { statements } = &stmts[0] else { panic!("expected a block") };
        let Stmt::While { per_iteration, increment, .. } = &statements[1] else {
            panic!("expected a while loop")
        };
        assert_eq!(per_iteration[0].lexeme, "i");
        assert!(increment.is_some());
    }

    #[test]
    fn typed_declarations() {
        let stmts = parse("byte b = 3; num[] xs = [1, 2];").unwrap();
        let Stmt::Var { modifiers, declared_type, .. } = &stmts[0] else { panic!() };
        assert!(modifiers.contains(ModifierSet::BYTE));
        assert_eq!(declared_type.as_ref().unwrap(), &TypeDescriptor::number());
        let Stmt::Var { declared_type, .. } = &stmts[1] else { panic!() };
        assert_eq!(declared_type.as_ref().unwrap(), &TypeDescriptor::number().array_of());
    }

    #[test]
    fn class_header() {
        let stmts =
            parse("class Box <- Base -> Shape, Named :<T> { obj T item; method get() -> obj T { return this.item; } }")
                .unwrap();
        let Stmt::Class { decl } = &stmts[0] else { panic!() };
        assert!(decl.superclass.is_some());
        assert_eq!(decl.interfaces.len(), 2);
        assert_eq!(decl.templates[0].lexeme, "T");
        assert_eq!(decl.methods.len(), 1);
    }

    #[test]
    fn compound_assignment_targets() {
        let stmts = parse("a.b += 1; c[0]++; K::n = 2;").unwrap();
        assert!(matches!(&stmts[0], Stmt::Expression { expr: Expr::Set { .. } }));
        assert!(matches!(&stmts[1], Stmt::Expression { expr: Expr::IndexSet { value: None, .. } }));
        assert!(matches!(&stmts[2], Stmt::Expression { expr: Expr::StaticSet { .. } }));
    }

    #[test]
    fn errors_are_collected_after_synchronizing() {
        let errors = parse("var = 1;\nvar b = ;\nvar c = 3;").unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].to_string(), "[line 1] Error at '=': Expect variable name.");
        assert_eq!(errors[1].token.line, 2);
    }
}
