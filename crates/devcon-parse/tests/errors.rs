use devcon_parse::{parse_str, LexError, ParseError, SyntaxError};

#[test]
fn missing_operand_is_parse_error() {
    let err = parse_str("1 + ;").unwrap_err();
    match err {
        SyntaxError::Parse(ParseError::Unexpected {
            expected,
            found,
            span,
        }) => {
            assert_eq!(expected, "expression");
            assert_eq!(found, "`;`");
            assert_eq!(span.start, 4);
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn missing_semicolon_is_error() {
    let err = parse_str("x = 1").unwrap_err().to_string();
    assert!(err.contains("expected `;`"), "{err}");
    assert!(err.contains("end of input"), "{err}");
}

#[test]
fn lex_errors_surface_through_parse() {
    let err = parse_str("x = \"open;").unwrap_err();
    assert_eq!(
        err,
        SyntaxError::Lex(LexError::UnterminatedString { pos: 4 })
    );
}

#[test]
fn dangling_dot_needs_identifier() {
    let err = parse_str(".;").unwrap_err().to_string();
    assert!(err.contains("expected identifier"), "{err}");
}

#[test]
fn assignment_target_must_be_identifier() {
    let err = parse_str("a.b = 1;").unwrap_err().to_string();
    assert!(err.contains("expected `;`, found `=`"), "{err}");
}
