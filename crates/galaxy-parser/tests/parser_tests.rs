//! Parser tests for the mission language.
//!
//! Covers: the catalog mission programs, declarations, control flow,
//! precedence, arrow functions and object literals, automatic semicolon
//! insertion, specific error codes, error recovery, and determinism.

use galaxy_lexer::Lexer;
use galaxy_parser::{parse_source, ParseResult, Parser, MAX_NESTING};
use galaxy_types::ast::*;
use galaxy_types::{ErrorCode, SourceFile};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn parse(source: &str) -> ParseResult {
    let sf = SourceFile::new("mission.js", source);
    let lex = Lexer::new(&sf).lex();
    Parser::new(lex.tokens, &sf).parse()
}

/// Parse source and return the program, panicking if there are errors.
fn parse_ok(source: &str) -> Program {
    let result = parse(source);
    if result.errors.has_errors() {
        for e in &result.errors.errors {
            eprintln!("  ERROR: {} ({})", e.message, e.code);
        }
        panic!("unexpected parse errors (see above)");
    }
    result.program.expect("no program returned")
}

fn error_codes(source: &str) -> Vec<ErrorCode> {
    parse(source).errors.errors.iter().map(|e| e.code).collect()
}

/// The expression of a single expression statement.
fn expr(source: &str) -> Expr {
    let prog = parse_ok(source);
    match prog.body.into_iter().next() {
        Some(Stmt::Expr(ExprStmt { expr, .. })) => expr,
        other => panic!("expected expression statement, got {other:?}"),
    }
}

fn ident_name(e: &Expr) -> &str {
    match &e.kind {
        ExprKind::Identifier(name) => name,
        other => panic!("expected identifier, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Mission programs
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_observable_mission_program() {
    let prog = parse_ok(
        r#"
const results = [];
const numbers$ = new Observable(subscriber => {
  subscriber.next(1);
  subscriber.next(2);
  subscriber.next(3);
  subscriber.complete();
});
numbers$.subscribe(value => results.push(value));
return results;
"#,
    );
    assert_eq!(prog.body.len(), 4);
    let Stmt::VarDecl(decl) = &prog.body[1] else {
        panic!("expected declaration");
    };
    assert_eq!(decl.kind, DeclKind::Const);
    let init = decl.declarators[0].init.as_ref().unwrap();
    let ExprKind::New { callee, args } = &init.kind else {
        panic!("expected new expression, got {:?}", init.kind);
    };
    assert_eq!(ident_name(callee), "Observable");
    let ExprKind::Function(f) = &args[0].kind else {
        panic!("expected arrow producer");
    };
    assert!(f.is_arrow);
    assert_eq!(f.params[0].name, "subscriber");
    let FunctionBody::Block(body) = &f.body else {
        panic!("expected block body");
    };
    assert_eq!(body.stmts.len(), 4);
    assert!(matches!(&prog.body[3], Stmt::Return(ReturnStmt { value: Some(_), .. })));
}

#[test]
fn test_pipe_program_without_semicolons() {
    let prog = parse_ok(
        "import { of } from 'rxjs'\nimport { filter } from 'rxjs/operators'\nconst xs = of(1, 2, 3, 4, 5)\nreturn xs.pipe(filter(n => n % 2 === 0))",
    );
    assert_eq!(prog.body.len(), 4);
    let Stmt::Import(import) = &prog.body[1] else {
        panic!("expected import");
    };
    assert_eq!(import.names[0].name, "filter");
    assert_eq!(import.source, "rxjs/operators");
}

// ─────────────────────────────────────────────────────────────────────
// Declarations & statements
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_multiple_declarators() {
    let prog = parse_ok("let a = 1, b, c = a + 1;");
    let Stmt::VarDecl(decl) = &prog.body[0] else {
        panic!("expected declaration");
    };
    assert_eq!(decl.kind, DeclKind::Let);
    assert_eq!(decl.declarators.len(), 3);
    assert!(decl.declarators[1].init.is_none());
}

#[test]
fn test_function_declaration() {
    let prog = parse_ok("function double(n) { return n * 2 }");
    let Stmt::Function(f) = &prog.body[0] else {
        panic!("expected function declaration");
    };
    assert_eq!(f.name.as_ref().map(|n| n.name.as_str()), Some("double"));
    assert!(!f.is_arrow);
}

#[test]
fn test_if_else_chain() {
    let prog = parse_ok("if (a) { x = 1 } else if (b) x = 2; else { x = 3 }");
    let Stmt::If(outer) = &prog.body[0] else {
        panic!("expected if");
    };
    let Some(else_branch) = &outer.else_branch else {
        panic!("expected else");
    };
    assert!(matches!(**else_branch, Stmt::If(_)));
}

#[test]
fn test_classic_for_loop() {
    let prog = parse_ok("for (let i = 0; i < 3; i++) { results.push(i) }");
    let Stmt::For(f) = &prog.body[0] else {
        panic!("expected for");
    };
    assert!(matches!(f.init.as_deref(), Some(Stmt::VarDecl(_))));
    assert!(f.condition.is_some());
    assert!(matches!(
        f.update.as_ref().map(|u| &u.kind),
        Some(ExprKind::Update { prefix: false, .. })
    ));
}

#[test]
fn test_empty_for_header() {
    let prog = parse_ok("for (;;) { break }");
    let Stmt::For(f) = &prog.body[0] else {
        panic!("expected for");
    };
    assert!(f.init.is_none() && f.condition.is_none() && f.update.is_none());
}

#[test]
fn test_for_of_loop() {
    let prog = parse_ok("for (const v of [1, 2]) total += v");
    let Stmt::ForOf(f) = &prog.body[0] else {
        panic!("expected for-of");
    };
    assert_eq!(f.binding.name, "v");
    assert_eq!(f.kind, DeclKind::Const);
}

#[test]
fn test_while_with_continue() {
    let prog = parse_ok("while (i < 10) { i++; if (i % 2) continue; n++ }");
    assert!(matches!(&prog.body[0], Stmt::While(_)));
}

#[test]
fn test_return_followed_by_newline_returns_nothing() {
    let prog = parse_ok("return\n[1, 2]");
    assert!(matches!(&prog.body[0], Stmt::Return(ReturnStmt { value: None, .. })));
    assert_eq!(prog.body.len(), 2);
}

#[test]
fn test_throw_statement() {
    let prog = parse_ok("throw 'boom'");
    assert!(matches!(&prog.body[0], Stmt::Throw(_)));
}

// ─────────────────────────────────────────────────────────────────────
// Expressions
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_multiplicative_binds_tighter() {
    // a + b * c  ==>  a + (b * c)
    let e = expr("a + b * c");
    let ExprKind::Binary { op, right, .. } = &e.kind else {
        panic!("expected binary");
    };
    assert_eq!(*op, BinOp::Add);
    assert!(matches!(right.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
}

#[test]
fn test_strict_equality_below_modulo() {
    // n % 2 === 0  ==>  (n % 2) === 0
    let e = expr("n % 2 === 0");
    let ExprKind::Binary { op, left, .. } = &e.kind else {
        panic!("expected binary");
    };
    assert_eq!(*op, BinOp::StrictEq);
    assert!(matches!(left.kind, ExprKind::Binary { op: BinOp::Mod, .. }));
}

#[test]
fn test_logical_precedence() {
    // a || b && c  ==>  a || (b && c)
    let e = expr("a || b && c");
    let ExprKind::Logical { op, right, .. } = &e.kind else {
        panic!("expected logical");
    };
    assert_eq!(*op, LogicalOp::Or);
    assert!(matches!(right.kind, ExprKind::Logical { op: LogicalOp::And, .. }));
}

#[test]
fn test_conditional_is_right_associative() {
    let e = expr("a ? 1 : b ? 2 : 3");
    let ExprKind::Conditional { alternate, .. } = &e.kind else {
        panic!("expected conditional");
    };
    assert!(matches!(alternate.kind, ExprKind::Conditional { .. }));
}

#[test]
fn test_assignment_is_right_associative() {
    let e = expr("a = b += 2");
    let ExprKind::Assign { op, value, .. } = &e.kind else {
        panic!("expected assignment");
    };
    assert_eq!(*op, AssignOp::Assign);
    assert!(matches!(value.kind, ExprKind::Assign { op: AssignOp::AddAssign, .. }));
}

#[test]
fn test_unary_and_typeof() {
    let e = expr("typeof -x");
    let ExprKind::Unary { op, operand } = &e.kind else {
        panic!("expected unary");
    };
    assert_eq!(*op, UnaryOp::TypeOf);
    assert!(matches!(operand.kind, ExprKind::Unary { op: UnaryOp::Neg, .. }));
}

#[test]
fn test_member_call_chain() {
    // of(1).pipe(map(f)).subscribe(g)
    let e = expr("of(1).pipe(map(f)).subscribe(g)");
    let ExprKind::Call { callee, args } = &e.kind else {
        panic!("expected call");
    };
    assert_eq!(args.len(), 1);
    let ExprKind::Member { property, object } = &callee.kind else {
        panic!("expected member");
    };
    assert!(matches!(property, MemberProperty::Named(n) if n.name == "subscribe"));
    assert!(matches!(object.kind, ExprKind::Call { .. }));
}

#[test]
fn test_computed_member_and_keyword_property() {
    let e = expr("xs[i + 1].new");
    let ExprKind::Member { object, property } = &e.kind else {
        panic!("expected member");
    };
    assert!(matches!(property, MemberProperty::Named(n) if n.name == "new"));
    assert!(matches!(
        object.kind,
        ExprKind::Member { property: MemberProperty::Computed(_), .. }
    ));
}

#[test]
fn test_new_without_arguments() {
    let e = expr("new Observable");
    assert!(matches!(&e.kind, ExprKind::New { args, .. } if args.is_empty()));
}

#[test]
fn test_arrow_forms() {
    let e = expr("(a, b) => a + b");
    let ExprKind::Function(f) = &e.kind else {
        panic!("expected arrow");
    };
    assert_eq!(f.params.len(), 2);
    assert!(matches!(f.body, FunctionBody::Expr(_)));

    let e = expr("() => { return 1 }");
    let ExprKind::Function(f) = &e.kind else {
        panic!("expected arrow");
    };
    assert!(f.params.is_empty());
    assert!(matches!(f.body, FunctionBody::Block(_)));
}

#[test]
fn test_parenthesized_expression_is_not_arrow() {
    let e = expr("(a + b) * c");
    assert!(matches!(e.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
}

#[test]
fn test_object_literal_forms() {
    let e = expr("({ next, error: e => log(e), complete() { done = true }, 'quoted key': 1 })");
    let ExprKind::Object(props) = &e.kind else {
        panic!("expected object, got {:?}", e.kind);
    };
    let keys: Vec<&str> = props.iter().map(|p| p.key.name.as_str()).collect();
    assert_eq!(keys, vec!["next", "error", "complete", "quoted key"]);
    assert!(matches!(props[0].value.kind, ExprKind::Identifier(ref n) if n == "next"));
    assert!(matches!(props[2].value.kind, ExprKind::Function(ref f) if !f.is_arrow));
}

#[test]
fn test_template_literal() {
    let e = expr("`value: ${v} of ${n}`");
    let ExprKind::Template { quasis, exprs } = &e.kind else {
        panic!("expected template");
    };
    assert_eq!(quasis, &vec!["value: ".to_string(), " of ".to_string(), String::new()]);
    assert_eq!(exprs.len(), 2);
}

#[test]
fn test_postfix_increment_not_across_newline() {
    // `a\n++b` is `a; ++b`
    let prog = parse_ok("a\n++b");
    assert_eq!(prog.body.len(), 2);
    let Stmt::Expr(second) = &prog.body[1] else {
        panic!("expected expression statement");
    };
    assert!(matches!(second.expr.kind, ExprKind::Update { prefix: true, .. }));
}

// ─────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_const_requires_initializer() {
    assert_eq!(error_codes("const x;"), vec![ErrorCode::MISSING_INITIALIZER]);
}

#[test]
fn test_jump_outside_loop() {
    assert_eq!(error_codes("break"), vec![ErrorCode::ILLEGAL_JUMP]);
    assert_eq!(error_codes("if (x) { continue }"), vec![ErrorCode::ILLEGAL_JUMP]);
    // A function body does not inherit the loop around it.
    assert_eq!(
        error_codes("while (x) { const f = () => { break } }"),
        vec![ErrorCode::ILLEGAL_JUMP]
    );
    assert!(error_codes("for (const x of xs) { if (x) { break } }").is_empty());
}

#[test]
fn test_invalid_assignment_target() {
    assert_eq!(error_codes("1 = x"), vec![ErrorCode::INVALID_ASSIGNMENT_TARGET]);
    assert_eq!(error_codes("f()++"), vec![ErrorCode::INVALID_ASSIGNMENT_TARGET]);
}

#[test]
fn test_duplicate_parameter() {
    assert_eq!(error_codes("(a, a) => a"), vec![ErrorCode::DUPLICATE_PARAMETER]);
}

#[test]
fn test_unclosed_call() {
    let codes = error_codes("of(1, 2");
    assert_eq!(codes.first(), Some(&ErrorCode::UNCLOSED_DELIMITER));
}

#[test]
fn test_missing_semicolon_on_same_line() {
    assert_eq!(error_codes("const a = 1 const b = 2"), vec![ErrorCode::UNEXPECTED_TOKEN]);
}

#[test]
fn test_reserved_word_as_name() {
    let result = parse("const new = 1");
    assert!(result.errors.has_errors());
    assert!(result.errors.errors[0].message.contains("reserved word"));
}

#[test]
fn test_nesting_limit() {
    let source = format!("{}1{}", "(".repeat(MAX_NESTING as usize + 5), ")".repeat(MAX_NESTING as usize + 5));
    assert!(error_codes(&source).contains(&ErrorCode::NESTING_LIMIT_EXCEEDED));
}

#[test]
fn test_error_recovery_continues_to_next_statement() {
    let result = parse("const a = ;\nconst b = 2\nconst c = ;\nreturn [b]");
    assert_eq!(result.errors.total_errors, 2);
    let prog = result.program.unwrap();
    assert!(prog.body.iter().any(|s| matches!(s, Stmt::Return(_))));
}

#[test]
fn test_stray_closing_brace() {
    let result = parse("const a = 1 }");
    assert!(result.errors.errors[0].suggestion.is_some());
}

#[test]
fn test_error_has_position_and_source_line() {
    let result = parse("const xs = [];\nxs.push(1,;");
    let err = result.errors.first().unwrap();
    assert_eq!(err.span.start_line, 2);
    assert_eq!(err.source_line, "xs.push(1,;");
}

#[test]
fn test_parse_source_reports_lexer_errors_only() {
    let sf = SourceFile::new("mission.js", "const a = 'unterminated\nconst b = ;");
    let result = parse_source(&sf);
    assert!(result.program.is_none());
    assert_eq!(result.errors.errors[0].code, ErrorCode::UNTERMINATED_STRING);
    assert_eq!(result.errors.total_errors, 1);
}

#[test]
fn test_into_program() {
    let sf = SourceFile::new("mission.js", "return [1]");
    assert!(parse_source(&sf).into_program().is_ok());
    let bad = SourceFile::new("mission.js", "return [1");
    assert!(parse_source(&bad).into_program().is_err());
}

// ─────────────────────────────────────────────────────────────────────
// Determinism
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_determinism_100_iterations() {
    let source = "const r = [];\nof(1, 2, 3).pipe(map(x => x * 2), take(2)).subscribe({ next(v) { r.push(v) } });\nreturn r";
    let first = parse_ok(source);
    for _ in 0..100 {
        assert_eq!(parse_ok(source), first);
    }
}
