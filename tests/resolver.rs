use pretty_assertions::assert_eq;
use tlox::prelude::*;

fn parse(source: &str) -> Vec<Stmt> {
    let tokens = Scanner::new(source).scan_tokens().expect("failed to scan the source");
    Parser::new(tokens).parse().expect("failed to parse the source")
}

fn resolve_errors(source: &str) -> Vec<String> {
    let statements = parse(source);
    let mut interpreter = Interpreter::new();

    match Resolver::new(&mut interpreter).resolve(&statements) {
        Ok(()) => vec![],
        Err(errors) => errors.into_iter().map(|e| e.msg).collect(),
    }
}

fn assert_resolver_error(source: &str, expected: &str) {
    assert_eq!(resolve_errors(source), vec![expected.to_string()], "source: {source}");
}

#[test]
fn valid_program_resolves() {
    let errors = resolve_errors(
        r#"
        class A {
            var x = 1;
            method constructor() { this.x = 2; }
            method get() { return this.x; }
        }
        class B <- A {
            method get() { return super.get() + 1; }
        }
        for (var i = 0; i < 3; i++) {
            if (i == 1) continue;
            switch (i) { case (2) break; }
        }
        test ("t") expect true;
        "#,
    );
    assert!(errors.is_empty(), "{errors:?}");
}

#[test]
fn local_read_in_own_initializer() {
    assert_resolver_error("{ var a = a; }", "Can't read local variable in its own initializer.");
}

#[test]
fn duplicate_local() {
    assert_resolver_error("{ var a = 1; var a = 2; }", "Already a variable with this name in this scope.");
}

#[test]
fn globals_may_be_redeclared() {
    assert!(resolve_errors("var a = 1; var a = 2;").is_empty());
}

#[test]
fn top_level_return() {
    assert_resolver_error("return 1;", "Can't return from top-level code.");
}

#[test]
fn constructor_return_value() {
    assert_resolver_error(
        "class A { method constructor() { return 1; } }",
        "Can't return a value from a constructor.",
    );
    assert!(resolve_errors("class A { method constructor() { return; } }").is_empty());
}

#[test]
fn loop_signals_outside_loops() {
    assert_resolver_error("break;", "Can't use 'break' outside of a loop or switch.");
    assert_resolver_error("continue;", "Can't use 'continue' outside of a loop.");
    assert_resolver_error(
        "switch (1) { case (1) continue; }",
        "Can't use 'continue' outside of a loop.",
    );
    assert_resolver_error(
        "while (true) { fun f() { break; } }",
        "Can't use 'break' outside of a loop or switch.",
    );
}

#[test]
fn expect_outside_test() {
    assert_resolver_error("expect true;", "Can't use 'expect' outside of a test.");
    assert_resolver_error(
        r#"test ("t") { fun f() { expect true; } }"#,
        "Can't use 'expect' outside of a test.",
    );
}

#[test]
fn this_outside_method() {
    assert_resolver_error("println(this);", "Can't use 'this' outside of a class.");
    assert_resolver_error("class A { var x = this; }", "Can't use 'this' outside of a method.");
}

#[test]
fn super_misuse() {
    assert_resolver_error("super.m();", "Can't use 'super' outside of a class.");
    assert_resolver_error(
        "class A { method m() { return super.m(); } }",
        "Can't use 'super' in a class with no superclass.",
    );
    assert_resolver_error(
        "interface I { method m() { return super.m(); } }",
        "Can't use 'super' in an interface.",
    );
}

#[test]
fn self_inheritance() {
    assert_resolver_error("class A <- A { }", "A class can't inherit from itself.");
}

#[test]
fn value_outside_accessor() {
    assert_resolver_error("var v = value;", "Can't use 'value' outside of a property accessor.");
    assert!(resolve_errors("var backing = 0; num p { get { return backing; } set { backing = value; } }")
        .is_empty());
}

#[test]
fn module_declared_twice() {
    assert_resolver_error("module a; module b;", "Module 'a' is already declared for this file.");
}

#[test]
fn errors_are_collected_per_statement() {
    let errors = resolve_errors("return 1; break; var ok = 1;");
    assert_eq!(errors.len(), 2);
}

#[test]
fn closures_bind_at_declaration() {
    let statements = parse(
        r#"
        var a = "global";
        var first;
        var second;
        {
            fun show() { return a; }
            first = show();
            var a = "block";
            second = show();
        }
        "#,
    );

    let mut interpreter = Interpreter::new();
    Resolver::new(&mut interpreter).resolve(&statements).expect("failed to resolve");
    for stmt in &statements {
        interpreter.execute(stmt).expect("runtime error");
    }

    assert_eq!(interpreter.global("first"), Some(Object::String("global".into())));
    assert_eq!(interpreter.global("second"), Some(Object::String("global".into())));
}
