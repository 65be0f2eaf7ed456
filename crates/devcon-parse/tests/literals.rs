use devcon_ast::ast::{Expr, Lit};
use devcon_parse::parse_str;

#[test]
fn ints_longs_floats_chars_strings_keywords() {
    let p = parse_str(r#"123; 9L; 12.3; 'h'; "hi\n\"there\""; true; false; null;"#).unwrap();
    let take = |i: usize| -> &Expr { &p.stmts[i] };

    assert!(matches!(take(0), Expr::Lit(Lit::Int(123), _)));
    assert!(matches!(take(1), Expr::Lit(Lit::Long(9), _)));
    assert!(matches!(take(2), Expr::Lit(Lit::Float(f), _) if (*f - 12.3).abs() < 1e-9));
    assert!(matches!(take(3), Expr::Lit(Lit::Char('h'), _)));
    assert!(matches!(take(4), Expr::Lit(Lit::Str(s), _) if s == "hi\n\"there\""));
    assert!(matches!(take(5), Expr::Lit(Lit::Bool(true), _)));
    assert!(matches!(take(6), Expr::Lit(Lit::Bool(false), _)));
    assert!(matches!(take(7), Expr::Lit(Lit::Null, _)));
}

#[test]
fn empty_program() {
    let p = parse_str("  // nothing here\n").unwrap();
    assert!(p.stmts.is_empty());
}

#[test]
fn undefined_identifier_is_not_a_parse_error() {
    let p = parse_str("nope;").unwrap();
    assert!(matches!(&p.stmts[0], Expr::Var(id) if id.text == "nope"));
}
