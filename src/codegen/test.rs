use super::Codegen;
use crate::error::{CompileError, ErrorKind};
use crate::ir::Module;
use crate::lexer::TokenStream;
use crate::parser::Parser;

fn compile(source: &str) -> Result<Module, CompileError> {
    let tokens = TokenStream::new(source)?;
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program()?;
    let mut codegen = Codegen::new("test");
    codegen.generate_program(&program)?;
    codegen.finish()
}

fn compile_ok(source: &str) -> Module {
    match compile(source) {
        Ok(module) => module,
        Err(err) => panic!("compilation failed: {}\n{}", err, err.snippet(source)),
    }
}

fn compile_err(source: &str) -> CompileError {
    match compile(source) {
        Ok(module) => panic!("expected an error, got:\n{}", module),
        Err(err) => err,
    }
}

fn function_text(module: &Module, name: &str) -> String {
    module
        .get_function(name)
        .unwrap_or_else(|| panic!("no function '{}'", name))
        .to_string()
}

#[test]
fn globals_and_const_globals() {
    let module = compile_ok("int counter = 3;\nconst double RATE = 2.5;");
    let printed = module.to_string();
    assert!(printed.contains("@counter = global i32 3"));
    assert!(printed.contains("@RATE = constant double 2.5"));
}

#[test]
fn global_initializer_must_be_constant() {
    let err = compile_err("fn f() -> int { return 1; }\nint x = f();");
    assert_eq!(err.kind, ErrorKind::Semantic);
    assert!(err.message.contains("constant"));
}

#[test]
fn global_redeclaration_is_rejected() {
    let err = compile_err("int x = 1;\nint x = 2;");
    assert!(err.message.contains("redeclaration of global 'x'"));
}

#[test]
fn assigning_a_const_global_is_rejected() {
    let err = compile_err("const int LIMIT = 10;\nfn f() { LIMIT = 2; }");
    assert!(err.message.contains("cannot assign to constant global 'LIMIT'"));
}

#[test]
fn local_redeclaration_in_one_scope_is_rejected() {
    let err = compile_err("fn f() { int x = 1; int x = 2; }");
    assert!(err.message.contains("redeclaration of 'x'"));
}

#[test]
fn inner_scopes_may_shadow() {
    compile_ok("fn f() -> int { int x = 1; if (true) { int x = 2; x = 3; } return x; }");
}

#[test]
fn unknown_variable_is_rejected() {
    let err = compile_err("fn f() -> int { return y; }");
    assert!(err.message.contains("unknown variable name 'y'"));
}

#[test]
fn assignment_needs_a_declaration() {
    let err = compile_err("fn f() { y = 1; }");
    assert!(err.message.contains("cannot assign to undeclared name 'y'"));
}

#[test]
fn missing_return_in_a_value_function() {
    let err = compile_err("fn f() -> int { int x = 1; }");
    assert!(err.message.contains("missing return statement in function 'f'"));
}

#[test]
fn void_functions_return_implicitly() {
    let module = compile_ok("fn f() { print(1.0); }");
    let printed = function_text(&module, "f");
    assert!(printed.contains("ret void"));
}

#[test]
fn return_value_coerces_to_the_signature() {
    let module = compile_ok("fn f() -> double { return 1; }");
    assert!(function_text(&module, "f").contains("sitofp i32 1 to double"));
}

#[test]
fn call_arguments_coerce_to_parameter_types() {
    let module = compile_ok("print(1);");
    let printed = function_text(&module, "main");
    assert!(printed.contains("sitofp i32 1 to double"));
    assert!(printed.contains("call void @print(double"));
}

#[test]
fn arity_mismatch_is_rejected() {
    let err = compile_err("fn g(int x) -> int { return x; }\nfn f() -> int { return g(1, 2); }");
    assert!(err.message.contains("expects 1 argument, got 2"));
}

#[test]
fn variadic_calls_accept_a_tail() {
    let module = compile_ok("printf(\"%d %d\\n\", 1, 2);");
    let printed = function_text(&module, "main");
    assert!(printed.contains("call i32 @printf(ptr @.str0, i32 1, i32 2)"));
}

#[test]
fn variadic_calls_still_need_the_fixed_part() {
    let err = compile_err("printf();");
    assert!(err.message.contains("at least 1 argument"));
}

#[test]
fn calls_may_precede_the_definition() {
    compile_ok("fn f() -> int { return g(); }\nfn g() -> int { return 1; }");
}

#[test]
fn unknown_callee_is_rejected() {
    let err = compile_err("fn f() { ghost(); }");
    assert!(err.message.contains("call to unknown function 'ghost'"));
}

#[test]
fn bodiless_prototypes_become_declarations() {
    let module = compile_ok("fn ext(int x) -> int;\nfn f() -> int { return ext(1); }");
    assert!(module.to_string().contains("declare i32 @ext(i32 %x)"));
}

#[test]
fn duplicate_definitions_are_rejected() {
    let err = compile_err("fn f() { }\nfn f() { }");
    assert!(err.message.contains("function 'f' is already defined"));
}

#[test]
fn conflicting_signatures_are_rejected() {
    let err = compile_err("fn f(int x) -> int;\nfn f() -> int { return 1; }");
    assert!(err.message.contains("conflicting declarations for function 'f'"));
}

#[test]
fn duplicate_parameter_names_are_rejected() {
    let err = compile_err("fn f(int a, int a) -> int { return a; }");
    assert!(err.message.contains("duplicate parameter name 'a'"));
}

#[test]
fn loose_statements_form_a_synthesized_main() {
    let module = compile_ok("int x = 0;\nx = 5;\nprint(2.0);");
    let printed = function_text(&module, "main");
    assert!(printed.contains("define void @main()"));
    assert!(printed.contains("store i32"));
    assert!(printed.contains("call void @print(double 2.0)"));
}

#[test]
fn loose_statements_conflict_with_an_explicit_main() {
    let err = compile_err("fn main() { }\nprint(1.0);");
    assert!(err.message.contains("'main' is already defined"));
}

#[test]
fn conditions_must_be_boolean() {
    let err = compile_err("fn f() { if (1) { print(1.0); } }");
    assert!(err.message.contains("condition must be a boolean, found int"));
}

#[test]
fn if_over_both_arms_returning_leaves_no_fallthrough() {
    let module =
        compile_ok("fn f(bool c) -> int { if (c) { return 1; } else { return 2; } }");
    let printed = function_text(&module, "f");
    assert!(printed.contains("br i1"));
    assert!(printed.contains("unreachable"));
}

#[test]
fn ternary_merges_through_a_phi() {
    let module = compile_ok("fn pick(bool c) -> int { return c ? 1 : 2; }");
    let printed = function_text(&module, "pick");
    assert!(printed.contains("phi i32"));
    assert!(printed.contains("selthen0"));
}

#[test]
fn ternary_arms_promote_to_a_common_type() {
    let module = compile_ok("fn pick(bool c) -> double { return c ? 1 : 2.0; }");
    let printed = function_text(&module, "pick");
    assert!(printed.contains("phi double"));
    assert!(printed.contains("sitofp"));
}

#[test]
fn while_loops_test_before_the_body() {
    let module = compile_ok(
        "fn f() -> int { int x = 0; while (x < 5) { x = x + 1; } return x; }",
    );
    let printed = function_text(&module, "f");
    assert!(printed.contains("loopcond"));
    assert!(printed.contains("icmp slt i32"));
}

#[test]
fn do_while_tests_after_the_body() {
    let module = compile_ok(
        "fn f() -> int { int x = 0; do { x = x + 1; } while (x < 5); return x; }",
    );
    let printed = function_text(&module, "f");
    assert!(printed.contains("loopbody"));
    // the body block conditionally branches back to itself
    assert!(printed.contains("label %loopbody0"));
}

#[test]
fn for_loops_carry_the_induction_variable_in_a_phi() {
    let module = compile_ok("fn f() { for (i = 0; i < 3; i++) { print(1.0); } }");
    let printed = function_text(&module, "f");
    assert!(printed.contains("forcond"));
    assert!(printed.contains("phi i32"));
    // two incoming edges: the seed and the back edge
    assert_eq!(printed.matches('[').count(), 2);
}

#[test]
fn a_postfix_step_advances_the_induction_variable_once() {
    let module = compile_ok("fn f() { for (i = 0; i < 3; i++) { print(1.0); } }");
    let printed = function_text(&module, "f");
    // one add feeds both the back edge and the (discarded) old value
    assert_eq!(printed.matches("add i32").count(), 1);
}

#[test]
fn branch_writes_spill_the_induction_variable() {
    let module = compile_ok(
        "fn f(bool c) { for (i = 0; i < 10; i++) { if (c) { i = i + 1; } } }",
    );
    let printed = function_text(&module, "f");
    // a conditional write cannot live in a loop phi; the variable gets a slot
    assert!(printed.contains("alloca i32"));
    assert!(!printed.contains("phi"));
}

#[test]
fn spilled_loops_still_step_without_an_explicit_step() {
    let module = compile_ok(
        "fn f(bool c) { for (i = 0; i < 10; ) { if (c) { i = i + 2; } } }",
    );
    let printed = function_text(&module, "f");
    assert!(printed.contains("alloca i32"));
    assert!(printed.contains("add i32"));
}

#[test]
fn induction_variables_do_not_escape_the_loop() {
    let err =
        compile_err("fn f() -> int { for (i = 0; i < 3; i++) { print(1.0); } return i; }");
    assert!(err.message.contains("unknown variable name 'i'"));
}

#[test]
fn for_loops_accept_a_declared_init() {
    let module =
        compile_ok("fn f() { int i = 0; for (i = 10; i > 0; i--) { print(1.0); } }");
    // init assigns an existing slot, so the header has no phi
    assert!(!function_text(&module, "f").contains("phi"));
}

#[test]
fn byte_operands_allow_bitwise_operators() {
    let module = compile_ok("fn f(byte a, byte b) -> byte { return a & b; }");
    assert!(function_text(&module, "f").contains("and i8"));
}

#[test]
fn byte_bitwise_against_a_double_is_rejected() {
    let err = compile_err("fn f(byte b, double d) -> double { return b & d; }");
    assert!(err.message.contains("operator '&' is not defined between byte and double"));
}

#[test]
fn int_operands_reject_bitwise_operators() {
    let err = compile_err("fn f(int a, int b) -> int { return a & b; }");
    assert!(err.message.contains("operator '&' is not defined between int and int"));
}

#[test]
fn division_follows_operand_signedness() {
    let module = compile_ok(
        "fn b(byte x, byte y) -> byte { return x / y; }\n\
         fn i(int x, int y) -> int { return x / y; }\n\
         fn d(double x, double y) -> double { return x / y; }",
    );
    assert!(function_text(&module, "b").contains("udiv i8"));
    assert!(function_text(&module, "i").contains("sdiv i32"));
    assert!(function_text(&module, "d").contains("fdiv double"));
}

#[test]
fn comparison_predicates_respect_type() {
    let module = compile_ok(
        "fn b(byte x, byte y) -> bool { return x <= y; }\n\
         fn i(int x, int y) -> bool { return x <= y; }\n\
         fn d(double x, double y) -> bool { return x <= y; }",
    );
    assert!(function_text(&module, "b").contains("icmp ule i8"));
    assert!(function_text(&module, "i").contains("icmp sle i32"));
    assert!(function_text(&module, "d").contains("fcmp ole double"));
}

#[test]
fn mixed_operands_promote_before_the_operation() {
    let module = compile_ok("fn f(int x, double y) -> double { return x + y; }");
    let printed = function_text(&module, "f");
    assert!(printed.contains("sitofp i32"));
    assert!(printed.contains("fadd double"));
}

#[test]
fn logical_not_is_not_supported() {
    let err = compile_err("fn f(bool b) -> bool { return !b; }");
    assert!(err.message.contains("operator '!' is not defined for bool"));
}

#[test]
fn increment_writes_back_to_the_slot() {
    let module = compile_ok("fn f() -> int { int x = 1; x++; return x; }");
    let printed = function_text(&module, "f");
    assert!(printed.contains("add i32"));
    // initializer store plus the write-back
    assert!(printed.matches("store i32").count() >= 2);
}

#[test]
fn method_calls_desugar_to_plain_calls() {
    let module = compile_ok(
        "fn scale(double x, double k) -> double { return x * k; }\n\
         fn f(double v) -> double { return v.scale(2.0); }",
    );
    assert!(function_text(&module, "f").contains("call double @scale(double"));
}

#[test]
fn field_access_is_rejected() {
    let err = compile_err("fn f(double x) { x.len; }");
    assert!(err.message.contains("double has no field 'len'"));
}

#[test]
fn string_literals_become_interned_globals() {
    let module = compile_ok("printf(\"a\");\nprintf(\"a\");");
    let printed = module.to_string();
    assert!(printed.contains("@.str0 = constant str \"a\""));
    assert!(!printed.contains("@.str1"));
}

#[test]
fn local_declarations_default_to_zero() {
    let module = compile_ok("fn f() -> int { int x; return x; }");
    assert!(function_text(&module, "f").contains("store i32 0"));
}

#[test]
fn const_locals_are_rejected() {
    let err = compile_err("fn f() { const int x = 1; }");
    assert!(err.message.contains("const is only valid on global declarations"));
}

#[test]
fn void_declarations_are_rejected() {
    let err = compile_err("fn f() { void x; }");
    assert!(err.message.contains("cannot declare 'x' as void"));
}

#[test]
fn boolean_mixes_with_numbers_are_rejected() {
    let err = compile_err("fn f(bool b) -> int { return b + 1; }");
    assert!(err.message.contains("operator '+' is not defined between bool and int"));
}
