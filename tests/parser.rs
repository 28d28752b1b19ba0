use kix::ast::{Expr, Stmt};
use kix::ast_printer::AstPrinter;
use kix::diagnostics::Diagnostics;
use kix::parser::Parser;
use kix::scanner::scan;

fn parse_source(source: &str) -> (Vec<Stmt>, Diagnostics) {
    let mut diags = Diagnostics::new();
    let tokens = scan(source, &mut diags);
    let statements = Parser::new(tokens, &mut diags).parse();
    (statements, diags)
}

fn printed(source: &str) -> String {
    let (statements, diags) = parse_source(source);
    assert!(!diags.had_error(), "unexpected errors: {:?}", diags.reports());
    AstPrinter::print_program(&statements)
}

fn messages(diags: &Diagnostics) -> Vec<String> {
    diags.reports().iter().map(|r| r.to_string()).collect()
}

#[test]
fn precedence_and_left_associativity() {
    assert_eq!(printed("1 + 2 * 3 - 4;"), "(; (- (+ 1.0 (* 2.0 3.0)) 4.0))");
    assert_eq!(printed("8 / 4 / 2;"), "(; (/ (/ 8.0 4.0) 2.0))");
    assert_eq!(printed("!-x == y < z;"), "(; (== (! (- x)) (< y z)))");
}

#[test]
fn logical_operators_bind_looser_than_equality() {
    assert_eq!(
        printed("a or b and c == d;"),
        "(; (or a (and b (== c d))))"
    );
}

#[test]
fn ternary_is_right_associative() {
    assert_eq!(printed("a ? b : c ? d : e;"), "(; (?: a b (?: c d e)))");
    assert_eq!(printed("x = c ? 1 : 2;"), "(; (= x (?: c 1.0 2.0)))");
}

#[test]
fn chained_calls() {
    assert_eq!(printed("f(1)(2, 3)();"), "(; (call (call (call f 1.0) 2.0 3.0)))");
}

#[test]
fn for_loop_is_desugared_to_while() {
    assert_eq!(
        printed("for (var i = 0; i < 3; i = i + 1) print i;"),
        "(block (var i 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0))))))"
    );
}

#[test]
fn for_loop_defaults() {
    assert_eq!(
        printed("for (;;) print 1;"),
        "(block (null) (while true (block (print 1.0) (; nil))))"
    );
}

#[test]
fn function_declaration_and_return() {
    assert_eq!(
        printed("fun add(a, b) { return a + b; } fun f() { return; }"),
        "(fun add (a b) (return (+ a b)))\n(fun f () (return))"
    );
}

#[test]
fn if_else_and_var_without_initializer() {
    assert_eq!(
        printed("var x; if (x) print 1; else print 2;"),
        "(var x)\n(if-else x (print 1.0) (print 2.0))"
    );
}

#[test]
fn invalid_assignment_target_is_not_fatal() {
    let (statements, diags) = parse_source("1 + 2 = 3; print 4;");

    assert_eq!(
        messages(&diags),
        vec!["[line 1] Error at '=': Invalid assignment target."]
    );
    // Both statements survive.
    assert_eq!(statements.len(), 2);
    assert!(matches!(&statements[1], Stmt::Print(Expr::Literal(_))));
}

#[test]
fn multiple_errors_are_reported_after_synchronizing() {
    let (statements, diags) = parse_source("var = 1;\nprint (;\nprint 3;");

    assert_eq!(
        messages(&diags),
        vec![
            "[line 1] Error at '=': Expect variable name.",
            "[line 2] Error at ';': Expect expression.",
        ]
    );
    assert_eq!(statements.len(), 3);
    assert_eq!(statements[0], Stmt::Null);
    assert_eq!(statements[1], Stmt::Null);
    assert!(matches!(statements[2], Stmt::Print(_)));
}

#[test]
fn error_at_end_of_input() {
    let (_, diags) = parse_source("print 1");
    assert_eq!(
        messages(&diags),
        vec!["[line 1] Error at end: Expect ';' after value."]
    );
}

#[test]
fn missing_colon_in_ternary() {
    let (_, diags) = parse_source("print a ? b;");
    assert_eq!(
        messages(&diags),
        vec!["[line 1] Error at ';': Expect ':' in conditional expression."]
    );
}

#[test]
fn too_many_arguments_is_reported_but_parsed() {
    let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
    let source = format!("f({});", args.join(", "));
    let (statements, diags) = parse_source(&source);

    assert_eq!(diags.reports().len(), 1);
    assert!(messages(&diags)[0].ends_with("Can't have more than 255 arguments."));

    match &statements[0] {
        Stmt::Expression(Expr::Call { arguments, .. }) => assert_eq!(arguments.len(), 256),
        other => panic!("expected call, got {:?}", other),
    }
}

#[test]
fn too_many_parameters_is_reported_but_parsed() {
    let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
    let source = format!("fun f({}) {{}}", params.join(", "));
    let (statements, diags) = parse_source(&source);

    assert_eq!(diags.reports().len(), 1);
    assert!(messages(&diags)[0].ends_with("Can't have more than 255 parameters."));
    assert!(matches!(&statements[0], Stmt::Function(decl) if decl.params.len() == 256));
}

#[test]
fn expression_ids_are_unique_and_continue_from_base() {
    let mut diags = Diagnostics::new();
    let tokens = scan("a = b; c;", &mut diags);
    let mut parser = Parser::with_id_base(tokens, 10, &mut diags);
    let statements = parser.parse();

    // a, b, the assignment, c
    assert_eq!(parser.next_id(), 14);

    match &statements[0] {
        Stmt::Expression(Expr::Assign { id, value, .. }) => {
            let Expr::Variable { id: inner, .. } = value.as_ref() else {
                panic!("expected variable");
            };
            assert_ne!(id, inner);
        }
        other => panic!("expected assignment, got {:?}", other),
    }
}
