use devcon_ast::ast::{BinOp, Expr, Lit};
use devcon_ast::span::Span;
use devcon_parse::{parse_str, parse_tokens, tokenize, ParseError, SyntaxError, Tok, TokKind};

fn tok(kind: TokKind, start: u32, end: u32) -> Tok {
    Tok {
        kind,
        span: Span::new(start, end),
    }
}

#[test]
fn lexed_tokens_parse_like_source() {
    let src = "x = 1 + 2; f(x);";
    let from_tokens = parse_tokens(tokenize(src).unwrap()).unwrap();
    let from_source = parse_str(src).unwrap();
    assert_eq!(from_tokens.stmts.len(), 2);
    assert_eq!(
        format!("{:?}", from_tokens.stmts),
        format!("{:?}", from_source.stmts)
    );
}

#[test]
fn hand_built_tokens_without_eof() {
    // `1 * 2;`
    let toks = vec![
        tok(TokKind::Int(1), 0, 1),
        tok(TokKind::Star, 2, 3),
        tok(TokKind::Int(2), 4, 5),
        tok(TokKind::Semicolon, 5, 6),
    ];
    let p = parse_tokens(toks).unwrap();
    let Expr::Binary { lhs, op, rhs, .. } = &p.stmts[0] else {
        panic!("expected a binary expression");
    };
    assert_eq!(*op, BinOp::Mul);
    assert!(matches!(**lhs, Expr::Lit(Lit::Int(1), _)));
    assert!(matches!(**rhs, Expr::Lit(Lit::Int(2), _)));
}

#[test]
fn truncated_token_stream_reports_end_of_input() {
    let toks = vec![tok(TokKind::Int(1), 0, 1), tok(TokKind::Plus, 2, 3)];
    let err = parse_tokens(toks).unwrap_err();
    let SyntaxError::Parse(ParseError::Unexpected { found, .. }) = err else {
        panic!("expected an unexpected-token error, got {err}");
    };
    assert_eq!(found, "end of input");
}
