use devcon_ast::ast::Expr;
use devcon_parse::parse_str;

#[test]
fn function_literal_with_params_and_body() {
    let p = parse_str("add = (a, b) { print(a); a + b; };").unwrap();
    let Expr::Assign { name, value, .. } = &p.stmts[0] else {
        panic!("expected assignment");
    };
    assert_eq!(name.text, "add");
    let Expr::Func { params, body, .. } = &**value else {
        panic!("expected function literal");
    };
    let names: Vec<_> = params.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(names, ["a", "b"]);
    assert_eq!(body.len(), 2);
}

#[test]
fn zero_and_one_param_functions() {
    let p = parse_str("f = () { 1; }; g = (x) { x; };").unwrap();
    for stmt in &p.stmts {
        let Expr::Assign { value, .. } = stmt else {
            panic!("expected assignment");
        };
        assert!(matches!(**value, Expr::Func { .. }));
    }
}

#[test]
fn parenthesized_identifier_is_not_a_function() {
    let p = parse_str("(x);").unwrap();
    assert!(matches!(p.stmts[0], Expr::Paren { .. }));
}

#[test]
fn immediately_invoked_function() {
    let p = parse_str("(n) { n; }(5);").unwrap();
    let Expr::Call { callee, args, .. } = &p.stmts[0] else {
        panic!("expected call");
    };
    assert_eq!(args.len(), 1);
    assert!(matches!(**callee, Expr::Func { .. }));
}

#[test]
fn assignment_inside_body() {
    let p = parse_str("f = () { x = 10; x; };").unwrap();
    let Expr::Assign { value, .. } = &p.stmts[0] else {
        panic!("expected assignment");
    };
    let Expr::Func { body, .. } = &**value else {
        panic!("expected function literal");
    };
    assert!(matches!(&body[0], Expr::Assign { name, .. } if name.text == "x"));
}

#[test]
fn function_body_statements_need_semicolons() {
    assert!(parse_str("f = () { 1 };").is_err());
}
