use kix::ast::{Expr, Stmt};
use kix::config::{Config, UnusedVariables};
use kix::diagnostics::Diagnostics;
use kix::parser::parse;
use kix::resolver::{resolve, Locals, Resolved};
use kix::scanner::scan;

fn resolve_source(source: &str, config: Config) -> (Vec<Stmt>, Locals, Vec<String>, bool) {
    let mut diags = Diagnostics::new();
    let tokens = scan(source, &mut diags);
    let statements = parse(tokens, &mut diags);
    assert!(!diags.had_error(), "syntax errors: {:?}", diags.reports());

    let locals = resolve(&statements, &config, &mut diags);
    let messages = diags.reports().iter().map(|r| r.to_string()).collect();

    (statements, locals, messages, diags.had_error())
}

fn off() -> Config {
    Config {
        unused_variables: UnusedVariables::Off,
        ..Config::default()
    }
}

#[test]
fn self_reference_in_initializer() {
    let (_, _, messages, had_error) = resolve_source("{ var a = a; }", off());

    assert!(had_error);
    assert_eq!(
        messages,
        vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
    );
}

#[test]
fn global_self_reference_is_allowed() {
    let (_, _, messages, had_error) = resolve_source("var a = a;", off());
    assert!(!had_error);
    assert!(messages.is_empty());
}

#[test]
fn duplicate_declaration_in_one_scope() {
    let (_, _, messages, had_error) = resolve_source("{ var a = 1; var a = 2; print a; }", off());

    assert!(had_error);
    assert_eq!(
        messages,
        vec!["[line 1] Error at 'a': Variable with this name already declared in this scope."]
    );
}

#[test]
fn shadowing_in_nested_scope_is_fine() {
    let (_, _, messages, had_error) =
        resolve_source("{ var a = 1; { var a = 2; print a; } print a; }", off());

    assert!(!had_error);
    assert!(messages.is_empty());
}

#[test]
fn return_outside_function() {
    let (_, _, messages, had_error) = resolve_source("return 1;", off());

    assert!(had_error);
    assert_eq!(
        messages,
        vec!["[line 1] Error at 'return': Can't return from outside function."]
    );
}

#[test]
fn addresses_record_distance_and_slot() {
    let source = "{ var a = 1; var b = 2; { var c = 3; print b; print c; } }";
    let (statements, locals, _, _) = resolve_source(source, off());

    let Stmt::Block(outer) = &statements[0] else {
        panic!("expected block");
    };
    let Stmt::Block(inner) = &outer[2] else {
        panic!("expected inner block");
    };

    let id_of = |stmt: &Stmt| match stmt {
        Stmt::Print(Expr::Variable { id, .. }) => *id,
        other => panic!("expected print of variable, got {:?}", other),
    };

    assert_eq!(
        locals.get(&id_of(&inner[1])),
        Some(&Resolved {
            distance: 1,
            slot: 1
        })
    );
    assert_eq!(
        locals.get(&id_of(&inner[2])),
        Some(&Resolved {
            distance: 0,
            slot: 0
        })
    );
}

#[test]
fn parameters_take_the_first_slots() {
    let source = "fun f(x, y) { var z = y; return z + x; }";
    let (_, locals, _, _) = resolve_source(source, off());

    let mut addresses: Vec<Resolved> = locals.values().copied().collect();
    addresses.sort_by_key(|r| (r.distance, r.slot));

    assert_eq!(
        addresses,
        vec![
            Resolved { distance: 0, slot: 0 }, // x
            Resolved { distance: 0, slot: 1 }, // y
            Resolved { distance: 0, slot: 2 }, // z
        ]
    );
}

#[test]
fn globals_are_not_recorded() {
    let (_, locals, _, _) = resolve_source("var g = 1; fun f() { return g; } print g;", off());
    assert!(locals.is_empty());
}

#[test]
fn unused_local_is_a_warning_by_default() {
    let (_, _, messages, had_error) = resolve_source("{ var unused = 1; }", Config::default());

    assert!(!had_error);
    assert_eq!(
        messages,
        vec!["[line 1] Warning at 'unused': Variable defined but not used."]
    );
}

#[test]
fn unused_local_can_be_an_error() {
    let config = Config {
        unused_variables: UnusedVariables::Error,
        ..Config::default()
    };
    let (_, _, messages, had_error) = resolve_source("{ var unused = 1; }", config);

    assert!(had_error);
    assert_eq!(
        messages,
        vec!["[line 1] Error at 'unused': Variable defined but not used."]
    );
}

#[test]
fn assignment_alone_does_not_count_as_use() {
    let (_, _, messages, _) = resolve_source("{ var a; a = 1; }", Config::default());
    assert_eq!(messages.len(), 1);
}

#[test]
fn unused_parameters_are_reported() {
    let (_, _, messages, _) = resolve_source("fun f(a) { return 1; }", Config::default());
    assert_eq!(
        messages,
        vec!["[line 1] Warning at 'a': Variable defined but not used."]
    );
}

#[test]
fn function_bindings_are_exempt_unless_configured() {
    let source = "{ fun helper() {} }";

    let (_, _, messages, _) = resolve_source(source, Config::default());
    assert!(messages.is_empty());

    let config = Config {
        check_function_bindings: true,
        ..Config::default()
    };
    let (_, _, messages, _) = resolve_source(source, config);
    assert_eq!(
        messages,
        vec!["[line 1] Warning at 'helper': Variable defined but not used."]
    );
}
