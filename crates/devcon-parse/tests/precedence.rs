use devcon_ast::ast::{BinOp, Expr, UnOp};
use devcon_parse::parse_str;

fn binop(e: &Expr) -> BinOp {
    match e {
        Expr::Binary { op, .. } => *op,
        _ => panic!("expected binary, got {e:?}"),
    }
}

#[test]
fn mul_binds_tighter_than_add() {
    let p = parse_str("1 + 2 * 3;").unwrap();
    let Expr::Binary { op, rhs, .. } = &p.stmts[0] else {
        panic!("expected binary");
    };
    assert_eq!(*op, BinOp::Add);
    assert_eq!(binop(rhs), BinOp::Mul);
}

#[test]
fn logical_ops_lowest() {
    let p = parse_str("a < b && c == d || e;").unwrap();
    let Expr::Binary { op, lhs, .. } = &p.stmts[0] else {
        panic!("expected binary");
    };
    assert_eq!(*op, BinOp::Or);
    let Expr::Binary { op, lhs, rhs, .. } = &**lhs else {
        panic!("expected &&");
    };
    assert_eq!(*op, BinOp::And);
    assert_eq!(binop(lhs), BinOp::Lt);
    assert_eq!(binop(rhs), BinOp::Eq);
}

#[test]
fn subtraction_is_left_associative() {
    let p = parse_str("10 - 3 - 2;").unwrap();
    let Expr::Binary { lhs, .. } = &p.stmts[0] else {
        panic!("expected binary");
    };
    assert_eq!(binop(lhs), BinOp::Sub);
}

#[test]
fn unary_minus_applies_to_call_result() {
    let p = parse_str("-f(1);").unwrap();
    let Expr::Unary { op, expr, .. } = &p.stmts[0] else {
        panic!("expected unary");
    };
    assert_eq!(*op, UnOp::Neg);
    assert!(matches!(**expr, Expr::Call { .. }));
}
