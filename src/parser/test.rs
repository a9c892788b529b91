use super::Parser;
use crate::ast::{Expr, Spanned, Stmt, TypeName};
use crate::error::{CompileError, ErrorKind};
use crate::lexer::TokenStream;

fn parse(source: &str) -> Vec<Spanned<Stmt>> {
    let tokens = TokenStream::new(source).expect("lexing failed");
    Parser::new(tokens)
        .parse_program()
        .unwrap_or_else(|err| panic!("parse failed: {}\n{}", err, err.snippet(source)))
}

fn parse_err(source: &str) -> CompileError {
    let tokens = TokenStream::new(source).expect("lexing failed");
    match Parser::new(tokens).parse_program() {
        Ok(nodes) => panic!("expected a parse error, got {:?}", nodes),
        Err(err) => err,
    }
}

/// Renders the first statement's expression with full parenthesization.
fn expr_text(source: &str) -> String {
    let nodes = parse(source);
    match &nodes[0].0 {
        Stmt::Expr((expr, _)) => expr.to_string(),
        other => panic!("expected an expression statement, got {:?}", other),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    assert_eq!(expr_text("a + b * c;"), "(a + (b * c))");
}

#[test]
fn parentheses_override_precedence() {
    assert_eq!(expr_text("(a + b) * c;"), "((a + b) * c)");
    assert_eq!(expr_text("(2*(1+2));"), "(2 * (1 + 2))");
}

#[test]
fn right_operands_swallow_the_rest_of_the_chain() {
    // each level's right operand re-enters the top of the chain
    assert_eq!(expr_text("1 - 2 - 3;"), "(1 - (2 - 3))");
    assert_eq!(expr_text("a < b < c;"), "(a < (b < c))");
}

#[test]
fn a_right_operand_crosses_precedence_levels() {
    // the rhs of `+` re-enters the whole chain, so the comparison and the
    // logical tail end up inside it
    assert_eq!(expr_text("a + 1 < b && c;"), "(a + (1 < (b && c)))");
}

#[test]
fn adjacent_signs_fold_into_literals() {
    assert_eq!(expr_text("-1-21.2;"), "(-1 - -21.2)");
    assert_eq!(expr_text("+1 *  (   2    +3.0);"), "(1 * (2 + 3))");
}

#[test]
fn detached_signs_stay_unary() {
    assert_eq!(expr_text("- 1;"), "(-1)");
    assert_eq!(expr_text("-(1);"), "(-1)");
}

#[test]
fn prefix_and_postfix_steps() {
    assert_eq!(expr_text("++v;"), "(++v)");
    assert_eq!(expr_text("v--;"), "(v--)");
}

#[test]
fn call_arguments_parse_in_order() {
    let nodes = parse("foo(1, 12.1, id1, -1.2, (1+2));");
    let Stmt::Expr((Expr::Call { callee, args }, _)) = &nodes[0].0 else {
        panic!("expected a call");
    };
    assert_eq!(callee, "foo");
    assert_eq!(args.len(), 5);
    assert_eq!(args[3].0, Expr::Number { value: -1.2, is_float: true });
}

#[test]
fn empty_argument_lists_are_fine() {
    let nodes = parse("foo();");
    let Stmt::Expr((Expr::Call { args, .. }, _)) = &nodes[0].0 else {
        panic!("expected a call");
    };
    assert!(args.is_empty());
}

#[test]
fn trailing_commas_are_rejected() {
    let err = parse_err("foo(1,);");
    assert_eq!(err.kind, ErrorKind::Syntax);
}

#[test]
fn ternary_sits_above_the_binary_chain() {
    assert_eq!(expr_text("a < b ? x : y;"), "((a < b) ? x : y)");
    assert_eq!(expr_text("c ? 1 : d ? 2 : 3;"), "(c ? 1 : (d ? 2 : 3))");
}

#[test]
fn bitwise_operators_parse_at_term_level() {
    assert_eq!(expr_text("a & b + c;"), "(a & (b + c))");
    assert_eq!(expr_text("a ^ b | c;"), "(a ^ (b | c))");
}

#[test]
fn method_and_field_postfix() {
    assert_eq!(expr_text("v.scale(2.0);"), "v.scale(2)");
    assert_eq!(expr_text("v.len;"), "v.len");
}

#[test]
fn assignment_versus_expression_statement() {
    let nodes = parse("v = 1;\nv + 1;");
    assert!(matches!(nodes[0].0, Stmt::Assign { ref name, .. } if name == "v"));
    assert!(matches!(nodes[1].0, Stmt::Expr((Expr::Binary { .. }, _))));
}

#[test]
fn equality_comparison_is_not_assignment() {
    let nodes = parse("v == 1;");
    assert!(matches!(nodes[0].0, Stmt::Expr((Expr::Binary { .. }, _))));
}

#[test]
fn function_definitions_carry_typed_parameters() {
    let nodes = parse("fn f(int a, b) -> double { return a; }");
    let Stmt::Function { proto, body } = &nodes[0].0 else {
        panic!("expected a function");
    };
    assert_eq!(proto.name, "f");
    assert_eq!(proto.params[0].ty, TypeName::Int);
    // unannotated parameters default to double
    assert_eq!(proto.params[1].ty, TypeName::Double);
    assert_eq!(proto.return_type, TypeName::Double);
    assert_eq!(body.statements.len(), 1);
}

#[test]
fn return_type_defaults_to_void() {
    let nodes = parse("fn f() { }");
    let Stmt::Function { proto, .. } = &nodes[0].0 else {
        panic!("expected a function");
    };
    assert_eq!(proto.return_type, TypeName::Void);
}

#[test]
fn a_semicolon_after_the_signature_is_a_prototype() {
    let nodes = parse("fn ext(int x) -> int;");
    let Stmt::Prototype(proto) = &nodes[0].0 else {
        panic!("expected a prototype");
    };
    assert_eq!(proto.name, "ext");
    assert!(!proto.is_variadic);
}

#[test]
fn ellipsis_marks_a_variadic_signature() {
    let nodes = parse("fn printf(str fmt, ...) -> int;");
    let Stmt::Prototype(proto) = &nodes[0].0 else {
        panic!("expected a prototype");
    };
    assert!(proto.is_variadic);
    assert_eq!(proto.params.len(), 1);
}

#[test]
fn if_chains_collect_their_branches() {
    let nodes = parse("if (a) { x = 1; } else if (b) { x = 2; } else { x = 3; }");
    let Stmt::If {
        else_ifs,
        else_block,
        ..
    } = &nodes[0].0
    else {
        panic!("expected an if");
    };
    assert_eq!(else_ifs.len(), 1);
    assert!(else_block.is_some());
}

#[test]
fn else_requires_a_block_or_another_if() {
    let err = parse_err("if (a) { x = 1; } else x = 2;");
    assert_eq!(err.kind, ErrorKind::Syntax);
    assert!(err.message.contains("after 'else'"));
}

#[test]
fn blocks_may_be_a_single_expression_statement() {
    let nodes = parse("if (a) b + 1;");
    let Stmt::If { primary, .. } = &nodes[0].0 else {
        panic!("expected an if");
    };
    assert_eq!(primary.body.statements.len(), 1);
}

#[test]
fn loop_statements_parse() {
    let nodes = parse(
        "while (a < 10) { a = a + 1; }\n\
         do { a = a - 1; } while (a > 0);\n\
         for (i = 0; i < 3; i++) { foo(); }",
    );
    assert!(matches!(nodes[0].0, Stmt::While { .. }));
    assert!(matches!(nodes[1].0, Stmt::DoWhile { .. }));
    let Stmt::For { init, step, .. } = &nodes[2].0 else {
        panic!("expected a for loop");
    };
    assert!(matches!(init.as_deref(), Some((Stmt::Assign { .. }, _))));
    assert!(step.is_some());
}

#[test]
fn for_init_and_step_are_optional() {
    let nodes = parse("for (; a; ) { foo(); }");
    let Stmt::For { init, step, .. } = &nodes[0].0 else {
        panic!("expected a for loop");
    };
    assert!(init.is_none());
    assert!(step.is_none());
}

#[test]
fn for_init_may_be_a_declaration() {
    let nodes = parse("for (int i = 0; i < 2; i++) { foo(); }");
    let Stmt::For { init, .. } = &nodes[0].0 else {
        panic!("expected a for loop");
    };
    assert!(matches!(
        init.as_deref(),
        Some((Stmt::Declaration { .. }, _))
    ));
}

#[test]
fn declarations_with_and_without_initializers() {
    let nodes = parse("int x = 5;\ndouble y;\nconst int LIMIT = 10;");
    assert!(matches!(
        &nodes[0].0,
        Stmt::Declaration { init: Some(_), is_const: false, .. }
    ));
    assert!(matches!(
        &nodes[1].0,
        Stmt::Declaration { init: None, .. }
    ));
    assert!(matches!(
        &nodes[2].0,
        Stmt::Declaration { is_const: true, .. }
    ));
}

#[test]
fn return_with_and_without_a_value() {
    let nodes = parse("fn f() -> int { return 1; }\nfn g() { return; }");
    let Stmt::Function { body, .. } = &nodes[0].0 else {
        panic!()
    };
    assert!(matches!(body.statements[0].0, Stmt::Return(Some(_))));
    let Stmt::Function { body, .. } = &nodes[1].0 else {
        panic!()
    };
    assert!(matches!(body.statements[0].0, Stmt::Return(None)));
}

#[test]
fn missing_semicolon_is_a_syntax_error() {
    let err = parse_err("a + b");
    assert_eq!(err.kind, ErrorKind::Syntax);
    assert!(err.message.contains("';'"));
}

#[test]
fn spans_cover_the_whole_statement() {
    let source = "int x = 5;";
    let nodes = parse(source);
    assert_eq!(nodes[0].1, 0..source.len());
}
