use pretty_assertions::assert_eq;
use tlox::prelude::*;

fn parse(source: &str) -> Vec<Stmt> {
    let tokens = Scanner::new(source).scan_tokens().expect("failed to scan the source");
    Parser::new(tokens).parse().expect("failed to parse the source")
}

fn make_expression(source: &'static str) -> Expr {
    let stmt = parse(source).pop().expect("no statement was created");

    match stmt {
        Stmt::Expression { expr } => expr,
        _ => panic!("statement is not an expression"),
    }
}

/// Resolves and runs `source`, stopping at the first runtime error.
fn run(source: &str) -> (Interpreter, Result<(), RuntimeError>) {
    let statements = parse(source);
    let mut interpreter = Interpreter::new();
    Resolver::new(&mut interpreter).resolve(&statements).expect("failed to resolve the source");

    let result = statements.iter().try_for_each(|stmt| interpreter.execute(stmt).map(|_| ()));
    (interpreter, result)
}

fn run_ok(source: &str) -> Interpreter {
    let (interpreter, result) = run(source);
    if let Err(e) = result {
        panic!("unexpected runtime error: {e}");
    }
    interpreter
}

fn run_err(source: &str) -> RuntimeError {
    run(source).1.expect_err("expected a runtime error")
}

macro_rules! assert_literal {
    ($source:literal, $expected:expr, $lit_type:path) => {
        let mut ipr = Interpreter::new();
        let expr = make_expression($source);
        let res = ipr.evaluate_expr(&expr);
        assert!(res.is_ok(), "{:?}", res);
        assert_eq!(res.unwrap(), $lit_type($expected));
    };
}

macro_rules! assert_number {
    ($source:literal, $expected:expr) => {
        assert_literal!($source, $expected, Object::Number);
    };
}

macro_rules! assert_string {
    ($source:literal, $expected:expr) => {
        assert_literal!($source, $expected, Object::String);
    };
}

macro_rules! assert_boolean {
    ($source:literal, $expected:expr) => {
        assert_literal!($source, $expected, Object::Boolean);
    };
}

macro_rules! assert_global {
    ($interpreter:expr, $name:literal, $expected:expr) => {
        assert_eq!($interpreter.global($name), Some($expected), "global '{}'", $name);
    };
}

#[test]
fn unary_minus() {
    assert_number!("-3.14;", -3.14);
}

#[test]
fn unary_bang() {
    assert_boolean!("!true;", false);
    assert_boolean!("!nil;", true);
}

#[test]
fn binary_arithmetic() {
    assert_number!("10 + 20;", 30.0);
    assert_number!("10 - 20;", -10.0);
    assert_number!("10 * 20;", 200.0);
    assert_number!("10 / 20;", 0.5);
}

#[test]
fn binary_plus_strings() {
    assert_string!(r#" "Hello " + "World!"; "#, "Hello World!".to_string());
    assert_string!(r#" "n = " + 3; "#, "n = 3".to_string());
}

#[test]
fn binary_comparisons() {
    assert_boolean!("10 > 20;", false);
    assert_boolean!("20 >= 20;", true);
    assert_boolean!("10 < 20;", true);
    assert_boolean!("20 <= 10;", false);
    assert_boolean!("10 == 10;", true);
    assert_boolean!("10 != 10;", false);
}

#[test]
fn null_coalescing_operators() {
    assert_number!("nil ?? 3;", 3.0);
    assert_number!("7 ?? 3;", 7.0);
    assert_boolean!("2 ?= 2;", true);

    let mut ipr = Interpreter::new();
    let res = ipr.evaluate_expr(&make_expression("1 ?= nil;")).unwrap();
    assert_eq!(res, Object::Null);
}

#[test]
fn ternary_and_length() {
    assert_string!(r#"1 < 2 ? "yes" : "no";"#, "yes".to_string());
    assert_number!(r#"length("four");"#, 4.0);
}

#[test]
fn comparing_strings_is_an_error() {
    let mut ipr = Interpreter::new();
    let err = ipr.evaluate_expr(&make_expression(r#""a" < "b";"#)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidOperand);
}

#[test]
fn typeof_yields_a_type_value() {
    let mut ipr = Interpreter::new();
    match ipr.evaluate_expr(&make_expression("typeof(3.0);")).unwrap() {
        Object::Type(t) => assert_eq!(t.kind, TypeKind::Number),
        other => panic!("expected a type, got {other}"),
    }
}

#[test]
fn compound_assignment() {
    let ipr = &mut run_ok("var x = 1; x += 2;");
    assert_global!(ipr, "x", Object::Number(3.0));

    let ipr = &mut run_ok("var y = 2; y **= 3; y--; var s = \"a\"; s += 1;");
    assert_global!(ipr, "y", Object::Number(7.0));
    assert_global!(ipr, "s", Object::String("a1".into()));
}

#[test]
fn compound_assignment_needs_a_binding() {
    let err = run_err("missing += 1;");
    assert_eq!(err.kind, ErrorKind::UndefinedVariable);
}

#[test]
fn const_rejects_reassignment() {
    let (mut ipr, result) = run("const y = 5; y = 6;");
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ConstantViolation);
    assert!(err.message.contains('y'));
    assert_global!(ipr, "y", Object::Number(5.0));
}

#[test]
fn natives_are_const() {
    let err = run_err("clock = 1;");
    assert_eq!(err.kind, ErrorKind::ConstantViolation);
}

#[test]
fn typed_declarations_are_checked() {
    assert_eq!(run_err(r#"num n = "a";"#).kind, ErrorKind::TypeMismatch);
    assert_eq!(run_err(r#"num n = 1; n = "a";"#).kind, ErrorKind::TypeMismatch);
    assert_eq!(run_err("unsigned num u = 1; u = -1;").kind, ErrorKind::ModifierViolation);
    assert_eq!(run_err("byte b = 300;").kind, ErrorKind::ModifierViolation);
    assert_eq!(run_err("static var s = 1;").kind, ErrorKind::ModifierViolation);
}

#[test]
fn function_signatures_are_checked() {
    assert_eq!(run_err("fun h(a) {} h();").kind, ErrorKind::ArityMismatch);
    assert_eq!(run_err(r#"fun f(num n) {} f("x");"#).kind, ErrorKind::TypeMismatch);
    assert_eq!(run_err(r#"fun f() -> num { return "x"; } f();"#).kind, ErrorKind::TypeMismatch);

    let err = run_err("fun g() -> num { } g();");
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    assert!(err.message.contains("without a value"));

    let ipr = &mut run_ok("fun v() -> void { } var r = v();");
    assert_global!(ipr, "r", Object::Null);
}

#[test]
fn bodyless_call_at_global_scope_warns() {
    let ipr = &mut run_ok("fun f(); var r = f();");
    assert_global!(ipr, "r", Object::Null);
    assert_eq!(ipr.warnings().len(), 1);
    assert_eq!(ipr.warnings()[0].kind, WarningKind::AbstractCall);

    let err = run_err("fun f(); fun g() { return f(); } g();");
    assert_eq!(err.kind, ErrorKind::InvalidCall);
}

#[test]
fn closures_capture_each_iteration() {
    let ipr = &mut run_ok(
        r#"
        var fns = [any; 3];
        for (var i = 0; i < 3; i++) {
            fns[i] = fun () { return i; };
        }
        var a = fns[0]();
        var b = fns[1]();
        var c = fns[2]();
        "#,
    );

    assert_global!(ipr, "a", Object::Number(0.0));
    assert_global!(ipr, "b", Object::Number(1.0));
    assert_global!(ipr, "c", Object::Number(2.0));
}

#[test]
fn loop_signals() {
    let ipr = &mut run_ok(
        r#"
        var total = 0;
        for (var i = 0; i < 10; i++) {
            if (i == 2) continue;
            if (i == 5) break;
            total += i;
        }
        var n = 0;
        when (n >= 3) n++; finally n = n * 10;
        "#,
    );

    assert_global!(ipr, "total", Object::Number(8.0));
    assert_global!(ipr, "n", Object::Number(30.0));
}

#[test]
fn switch_picks_the_first_match() {
    let ipr = &mut run_ok(
        r#"
        fun pick(n) {
            var r = "other";
            switch (n) {
                case (1) r = "one";
                case (2) { r = "two"; break; }
                default r = "default";
            }
            return r;
        }
        var a = pick(1);
        var b = pick(2);
        var c = pick(3);
        "#,
    );

    assert_global!(ipr, "a", Object::String("one".into()));
    assert_global!(ipr, "b", Object::String("two".into()));
    assert_global!(ipr, "c", Object::String("default".into()));
}

#[test]
fn try_binds_the_error_message() {
    let ipr = &mut run_ok(
        r#"
        var msg;
        try {
            var xs = [1];
            xs[3];
        } catch (e) {
            msg = e;
        }
        "#,
    );

    match ipr.global("msg") {
        Some(Object::String(msg)) => assert!(msg.contains("out of bounds"), "{msg}"),
        other => panic!("expected a message, got {other:?}"),
    }
}

#[test]
fn inherited_constructor() {
    let ipr = &mut run_ok(
        r#"
        class A {
            var made = false;
            method constructor() -> void { this.made = true; }
        }
        class B <- A { }
        var b = B();
        var made = b.made;
        "#,
    );

    assert_global!(ipr, "made", Object::Boolean(true));
    match ipr.global("b") {
        Some(Object::Instance(instance)) => {
            let class = instance.borrow().class.clone();
            assert_eq!(class.borrow().name, "B");
            assert!(class.borrow().find_method("constructor").is_some());
            assert!(class.borrow().is_a("A"));
        }
        other => panic!("expected an instance, got {other:?}"),
    }
}

#[test]
fn explicit_object_superclass_is_rejected() {
    let err = run_err("class A <- Object { }");
    assert!(err.message.contains("automatically inherit"));
}

#[test]
fn array_out_of_bounds() {
    let err = run_err("var arr = [1,2,3]; arr[5];");
    assert_eq!(err.kind, ErrorKind::IndexOutOfBounds);
    assert!(err.message.contains('5') && err.message.contains('3'), "{}", err.message);
}

#[test]
fn non_finite_index_is_out_of_bounds() {
    let err = run_err("var a = [7, 8]; var x = a[0/0];");
    assert_eq!(err.kind, ErrorKind::IndexOutOfBounds);

    let err = run_err("var a = [7, 8]; a[0/0] = 1;");
    assert_eq!(err.kind, ErrorKind::IndexOutOfBounds);
}

#[test]
fn oversized_arrays_are_rejected() {
    let err = run_err("var a = [num; 10000000000000000000];");
    assert_eq!(err.kind, ErrorKind::InvalidOperand);

    let err = run_err("var a = [num; 1/0];");
    assert_eq!(err.kind, ErrorKind::InvalidOperand);

    let ipr = &mut run_ok(
        r#"
        var msg;
        try { var a = [num; 10000000000000000000]; } catch (e) { msg = e; }
        "#,
    );
    match ipr.global("msg") {
        Some(Object::String(msg)) => assert!(msg.contains("exceeds"), "{msg}"),
        other => panic!("expected a message, got {other:?}"),
    }
}

#[test]
fn arrays_are_typed() {
    let ipr = &mut run_ok("var xs = [1, 2]; xs[1] += 5; var second = xs[1]; var zeros = [num; 2]; var z = zeros[0];");
    assert_global!(ipr, "second", Object::Number(7.0));
    assert_global!(ipr, "z", Object::Number(0.0));

    assert_eq!(run_err(r#"var xs = [1, "a"];"#).kind, ErrorKind::TypeMismatch);
    assert_eq!(run_err(r#"var xs = [1]; xs[0] = "a";"#).kind, ErrorKind::TypeMismatch);
}

#[test]
fn indexing_instances_calls_get_at_and_set_at() {
    let ipr = &mut run_ok(
        r#"
        class Pair {
            var left = 0;
            var right = 0;
            method getAt(i) { if (i == 0) return this.left; return this.right; }
            method setAt(i, v) { if (i == 0) this.left = v; else this.right = v; }
        }
        var p = Pair();
        p[1] = 9;
        var r = p[1];
        "#,
    );

    assert_global!(ipr, "r", Object::Number(9.0));
}

#[test]
fn missing_interface_method_fails_at_declaration() {
    let (mut ipr, result) = run(
        r#"
        interface Shape { method area() -> num; }
        class Square -> Shape { }
        var after = 1;
        "#,
    );

    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InterfaceConformanceViolation);
    assert!(err.message.contains("area"));
    assert_eq!(ipr.global("after"), None);
}

#[test]
fn interface_defaults_fill_bodyless_methods() {
    let ipr = &mut run_ok(
        r#"
        interface Greeter {
            method name() -> string;
            method greet() -> string { return "Hello, " + this.name(); }
        }
        class English -> Greeter {
            method name() -> string { return "world"; }
        }
        var text = English().greet();
        "#,
    );

    assert_global!(ipr, "text", Object::String("Hello, world".into()));
}

#[test]
fn interface_modifiers_must_match() {
    let err = run_err(
        r#"
        interface Counter { static method count(); }
        class C -> Counter { method count() { return 1; } }
        "#,
    );
    assert_eq!(err.kind, ErrorKind::InterfaceConformanceViolation);
}

const VEC: &str = r#"
    class Vec {
        var x = 0;
        method constructor(x) { this.x = x; }
        operator method add(a, b) {
            if (typeof(b) == num) return Vec(a.x + b);
            return Vec(a.x + b.x);
        }
    }
"#;

#[test]
fn operator_overload_dispatch() {
    let source = format!("{VEC} var s = Vec(1) + Vec(2); var t = Vec(1) + 5; var sx = s.x; var tx = t.x;");
    let ipr = &mut run_ok(&source);

    assert_global!(ipr, "sx", Object::Number(3.0));
    assert_global!(ipr, "tx", Object::Number(6.0));
}

#[test]
fn operator_overload_receives_operands_in_order() {
    let ipr = &mut run_ok(
        r#"
        class Tag {
            operator method add(a, b) { return "" + typeof(a) + "," + typeof(b); }
        }
        var left = 5 + Tag();
        var right = Tag() + 5;
        "#,
    );

    assert_global!(ipr, "left", Object::String("num,Tag".into()));
    assert_global!(ipr, "right", Object::String("Tag,num".into()));
}

#[test]
fn instances_without_an_operator_method() {
    assert_eq!(run_err("class P { } P() + 5;").kind, ErrorKind::UndefinedProperty);
    assert_eq!(run_err("class P { } 5 + P();").kind, ErrorKind::UndefinedProperty);
    assert_eq!(run_err("class P { } P() < P();").kind, ErrorKind::UndefinedProperty);

    let err = run_err("class P { } P() * 2;");
    assert!(err.message.contains("multiply"), "{}", err.message);

    let ipr = &mut run_ok(
        r#"
        class P { }
        var p = P();
        var same = p == p;
        var different = P() != P();
        var text = "p: " + p;
        "#,
    );
    assert_global!(ipr, "same", Object::Boolean(true));
    assert_global!(ipr, "different", Object::Boolean(true));
    assert_global!(ipr, "text", Object::String("p: P instance".into()));
}

#[test]
fn operator_methods_cannot_be_called_directly() {
    let source = format!("{VEC} var a = Vec(1); a.add(a, a);");
    assert_eq!(run_err(&source).kind, ErrorKind::ModifierViolation);
}

#[test]
fn operator_methods_need_two_parameters() {
    let err = run_err("class V { operator method add(a) { return a; } }");
    assert_eq!(err.kind, ErrorKind::ModifierViolation);
}

#[test]
fn static_members() {
    let ipr = &mut run_ok(
        r#"
        class Counter {
            static var count = 0;
            method bump() { Counter::count += 1; }
        }
        var c = Counter();
        c.bump();
        c.bump();
        var n = Counter::count;
        var through_instance = c.count;
        "#,
    );

    assert_global!(ipr, "n", Object::Number(2.0));
    assert_global!(ipr, "through_instance", Object::Number(2.0));
    assert!(ipr.warnings().iter().any(|w| w.kind == WarningKind::StaticContext));
}

#[test]
fn static_qualified_access_needs_static_members() {
    let err = run_err("class C { method m() { } } C::m;");
    assert_eq!(err.kind, ErrorKind::ModifierViolation);

    let err = run_err("class C { var v = 1; } C.v = 2;");
    assert_eq!(err.kind, ErrorKind::ModifierViolation);
}

#[test]
fn computed_properties() {
    let ipr = &mut run_ok(
        r#"
        class Temperature {
            var celsius = 0;
            num fahrenheit {
                get { return this.celsius * 9 / 5 + 32; }
                set { this.celsius = (value - 32) * 5 / 9; }
            }
        }
        var t = Temperature();
        t.fahrenheit = 212;
        var c = t.celsius;
        var f = t.fahrenheit;
        num answer { get { return 42; } }
        var a = answer;
        "#,
    );

    assert_global!(ipr, "c", Object::Number(100.0));
    assert_global!(ipr, "f", Object::Number(212.0));
    assert_global!(ipr, "a", Object::Number(42.0));
}

#[test]
fn read_only_properties_reject_writes() {
    let err = run_err("num answer { get { return 42; } } answer = 1;");
    assert_eq!(err.kind, ErrorKind::ModifierViolation);
}

#[test]
fn generic_templates_bind_at_construction() {
    let source = r#"
        class Box :<T> {
            obj T item;
            method constructor(obj T item) { this.item = item; }
            method get() -> obj T { return this.item; }
        }
    "#;

    let ipr = &mut run_ok(&format!("{source} var b = Box:<num>(3); var v = b.get();"));
    assert_global!(ipr, "v", Object::Number(3.0));

    let err = run_err(&format!(r#"{source} Box:<num>("x");"#));
    assert_eq!(err.kind, ErrorKind::TypeMismatch);

    let err = run_err(&format!("{source} Box(3);"));
    assert_eq!(err.kind, ErrorKind::ArityMismatch);
}

#[test]
fn each_instance_keeps_its_own_type_arguments() {
    let source = r#"
        class Box :<T> {
            obj T item;
            method constructor(obj T item) { this.item = item; }
            method get() -> obj T { return this.item; }
            method put(obj T item) { this.item = item; }
        }
        var b = Box:<num>(3);
        var s = Box:<string>("hi");
        var got = b.get();
        var text = s.get();
        b.put(4);
        var updated = b.get();
    "#;

    let ipr = &mut run_ok(source);
    assert_global!(ipr, "got", Object::Number(3.0));
    assert_global!(ipr, "text", Object::String("hi".into()));
    assert_global!(ipr, "updated", Object::Number(4.0));

    let err = run_err(&format!(r#"{source} b.put("x");"#));
    assert_eq!(err.kind, ErrorKind::TypeMismatch);

    let err = run_err(&format!(r#"{source} b.item = "x";"#));
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
}

#[test]
fn casts() {
    let ipr = &mut run_ok(
        r#"
        var n = "42" as num;
        var s = 3 as string;
        class Meters {
            var amount = 0;
            method constructor(amount) { this.amount = amount; }
            cast method toNum() -> num { return this.amount; }
        }
        var m = Meters(7) as num;
        "#,
    );

    assert_global!(ipr, "n", Object::Number(42.0));
    assert_global!(ipr, "s", Object::String("3".into()));
    assert_global!(ipr, "m", Object::Number(7.0));

    assert_eq!(run_err(r#""abc" as num;"#).kind, ErrorKind::CastFailure);

    let err = run_err("class P { method toNum() -> num { return 1; } } P() as num;");
    assert_eq!(err.kind, ErrorKind::CastFailure);
    assert!(err.message.contains("cast"));
}

#[test]
fn enums_evaluate_to_ordinals() {
    let ipr = &mut run_ok("enum Color { Red, Green, Blue } var g = Color.Green;");
    assert_global!(ipr, "g", Object::Number(1.0));

    let err = run_err("enum Color { Red } Color.Red = 3;");
    assert_eq!(err.kind, ErrorKind::ConstantViolation);
}

#[test]
fn null_safe_access() {
    let ipr = &mut run_ok("var a; var b = a?.x; var c = a?.m();");
    assert_global!(ipr, "b", Object::Null);
    assert_global!(ipr, "c", Object::Null);
}

#[test]
fn default_to_string() {
    let ipr = &mut run_ok(
        r#"
        class Plain { }
        class Named { method toString() -> string { return "named"; } }
        var a = "" + Plain();
        var b = "" + Named();
        "#,
    );

    assert_global!(ipr, "a", Object::String("Plain instance".into()));
    assert_global!(ipr, "b", Object::String("named".into()));
}
