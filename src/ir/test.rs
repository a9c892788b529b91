use super::builder::IRBuilder;
use super::verify::{verify_function, verify_module};
use super::*;

fn straight_line_function() -> IRBuilder {
    let mut builder = IRBuilder::new("test");
    builder.start_function(
        "add_one",
        vec![("x".to_string(), IRType::I32)],
        IRType::I32,
    );
    let dest = builder.new_register();
    builder.add_instruction(Instruction::Add {
        dest: dest.clone(),
        lhs: Value::Argument("x".to_string()),
        rhs: Value::Constant(Constant::Int(1)),
        ty: IRType::I32,
        span: 0..0,
    });
    builder.set_terminator(Terminator::Ret {
        value: Some(Value::Register(dest)),
        span: 0..0,
    });
    builder
}

#[test]
fn well_formed_function_verifies() {
    let builder = straight_line_function();
    assert!(verify_function(builder.current_function_ref()).is_ok());
}

#[test]
fn registers_restart_per_function() {
    let mut builder = IRBuilder::new("test");
    builder.start_function("a", Vec::new(), IRType::Void);
    assert_eq!(builder.new_register(), "%0");
    assert_eq!(builder.new_register(), "%1");
    builder.set_terminator(Terminator::Ret {
        value: None,
        span: 0..0,
    });
    builder.start_function("b", Vec::new(), IRType::Void);
    assert_eq!(builder.new_register(), "%0");
}

#[test]
fn labels_are_unique_across_a_function() {
    let mut builder = IRBuilder::new("test");
    builder.start_function("f", Vec::new(), IRType::Void);
    let a = builder.new_label("then");
    let b = builder.new_label("then");
    assert_ne!(a, b);
}

#[test]
fn entry_alloca_stays_ahead_of_ordinary_instructions() {
    let mut builder = IRBuilder::new("test");
    builder.start_function("f", Vec::new(), IRType::Void);
    let first = builder.entry_alloca(IRType::I32, 0..0);
    builder.add_instruction(Instruction::Store {
        value: Value::Constant(Constant::Int(5)),
        ptr: Value::Register(first.clone()),
        ty: IRType::I32,
        span: 0..0,
    });
    // a later declaration still lands in the alloca group at the top
    let second = builder.entry_alloca(IRType::F64, 0..0);

    let entry = &builder.current_function_ref().blocks[0];
    assert!(matches!(&entry.instructions[0], Instruction::Alloca { dest, .. } if *dest == first));
    assert!(matches!(&entry.instructions[1], Instruction::Alloca { dest, .. } if *dest == second));
    assert!(matches!(&entry.instructions[2], Instruction::Store { .. }));
}

#[test]
fn string_literals_are_interned() {
    let mut builder = IRBuilder::new("test");
    let a = builder.add_global_string("hello");
    let b = builder.add_global_string("world");
    let c = builder.add_global_string("hello");
    assert_eq!(a, c);
    assert_ne!(a, b);
}

#[test]
fn terminator_is_write_once() {
    let mut builder = IRBuilder::new("test");
    builder.start_function("f", Vec::new(), IRType::Void);
    builder.set_terminator(Terminator::Ret {
        value: None,
        span: 0..0,
    });
    builder.set_terminator(Terminator::Unreachable { span: 0..0 });
    let entry = &builder.current_function_ref().blocks[0];
    assert!(matches!(entry.terminator, Some(Terminator::Ret { .. })));
}

#[test]
fn unterminated_block_is_rejected() {
    let mut builder = IRBuilder::new("test");
    builder.start_function("f", Vec::new(), IRType::Void);
    let errs = verify_function(builder.current_function_ref()).unwrap_err();
    assert!(errs.iter().any(|e| e.contains("no terminator")));
}

#[test]
fn use_before_definition_is_rejected() {
    let mut builder = IRBuilder::new("test");
    builder.start_function("f", Vec::new(), IRType::I32);
    builder.set_terminator(Terminator::Ret {
        value: Some(Value::Register("%9".to_string())),
        span: 0..0,
    });
    let errs = verify_function(builder.current_function_ref()).unwrap_err();
    assert!(errs.iter().any(|e| e.contains("undefined value %9")));
}

#[test]
fn repeated_uses_of_an_undefined_value_report_once() {
    let mut builder = IRBuilder::new("test");
    builder.start_function("f", Vec::new(), IRType::Void);
    for dest in ["%1", "%2"] {
        builder.add_instruction(Instruction::Add {
            dest: dest.to_string(),
            lhs: Value::Register("%9".to_string()),
            rhs: Value::Constant(Constant::Int(1)),
            ty: IRType::I32,
            span: 0..0,
        });
    }
    builder.set_terminator(Terminator::Ret {
        value: None,
        span: 0..0,
    });
    let errs = verify_function(builder.current_function_ref()).unwrap_err();
    assert_eq!(
        errs.iter()
            .filter(|e| e.contains("undefined value %9"))
            .count(),
        1
    );
}

#[test]
fn double_definition_is_rejected() {
    let mut builder = IRBuilder::new("test");
    builder.start_function("f", Vec::new(), IRType::Void);
    for _ in 0..2 {
        builder.add_instruction(Instruction::Add {
            dest: "%0".to_string(),
            lhs: Value::Constant(Constant::Int(1)),
            rhs: Value::Constant(Constant::Int(2)),
            ty: IRType::I32,
            span: 0..0,
        });
    }
    builder.set_terminator(Terminator::Ret {
        value: None,
        span: 0..0,
    });
    let errs = verify_function(builder.current_function_ref()).unwrap_err();
    assert!(errs.iter().any(|e| e.contains("defined more than once")));
}

#[test]
fn definition_on_one_path_only_is_rejected() {
    let mut builder = IRBuilder::new("test");
    builder.start_function("f", vec![("c".to_string(), IRType::I1)], IRType::I32);
    let then_block = builder.create_block("then".to_string());
    let cont_block = builder.create_block("cont".to_string());
    builder.set_terminator(Terminator::CondBr {
        cond: Value::Argument("c".to_string()),
        then_label: "then".to_string(),
        else_label: "cont".to_string(),
        span: 0..0,
    });

    builder.set_current_block(then_block);
    builder.add_instruction(Instruction::Add {
        dest: "%0".to_string(),
        lhs: Value::Constant(Constant::Int(1)),
        rhs: Value::Constant(Constant::Int(2)),
        ty: IRType::I32,
        span: 0..0,
    });
    builder.set_terminator(Terminator::Br {
        label: "cont".to_string(),
        span: 0..0,
    });

    // %0 is only defined when the branch was taken
    builder.set_current_block(cont_block);
    builder.set_terminator(Terminator::Ret {
        value: Some(Value::Register("%0".to_string())),
        span: 0..0,
    });

    let errs = verify_function(builder.current_function_ref()).unwrap_err();
    assert!(errs.iter().any(|e| e.contains("undefined value %0")));
}

#[test]
fn phi_merge_across_a_diamond_verifies() {
    let mut builder = IRBuilder::new("test");
    builder.start_function("f", vec![("c".to_string(), IRType::I1)], IRType::I32);
    let then_block = builder.create_block("then".to_string());
    let else_block = builder.create_block("else".to_string());
    let cont_block = builder.create_block("cont".to_string());
    builder.set_terminator(Terminator::CondBr {
        cond: Value::Argument("c".to_string()),
        then_label: "then".to_string(),
        else_label: "else".to_string(),
        span: 0..0,
    });

    builder.set_current_block(then_block);
    builder.add_instruction(Instruction::Add {
        dest: "%0".to_string(),
        lhs: Value::Constant(Constant::Int(1)),
        rhs: Value::Constant(Constant::Int(2)),
        ty: IRType::I32,
        span: 0..0,
    });
    builder.set_terminator(Terminator::Br {
        label: "cont".to_string(),
        span: 0..0,
    });

    builder.set_current_block(else_block);
    builder.set_terminator(Terminator::Br {
        label: "cont".to_string(),
        span: 0..0,
    });

    builder.set_current_block(cont_block);
    builder.add_instruction(Instruction::Phi {
        dest: "%1".to_string(),
        ty: IRType::I32,
        incoming: vec![
            (Value::Register("%0".to_string()), "then".to_string()),
            (Value::Constant(Constant::Int(0)), "else".to_string()),
        ],
        span: 0..0,
    });
    builder.set_terminator(Terminator::Ret {
        value: Some(Value::Register("%1".to_string())),
        span: 0..0,
    });

    assert!(verify_function(builder.current_function_ref()).is_ok());
}

#[test]
fn phi_edge_from_unknown_block_is_rejected() {
    let mut builder = IRBuilder::new("test");
    builder.start_function("f", Vec::new(), IRType::I32);
    builder.add_instruction(Instruction::Phi {
        dest: "%0".to_string(),
        ty: IRType::I32,
        incoming: vec![(Value::Constant(Constant::Int(1)), "nowhere".to_string())],
        span: 0..0,
    });
    builder.set_terminator(Terminator::Ret {
        value: Some(Value::Register("%0".to_string())),
        span: 0..0,
    });
    let errs = verify_function(builder.current_function_ref()).unwrap_err();
    assert!(errs.iter().any(|e| e.contains("unknown block 'nowhere'")));
}

#[test]
fn ret_typing_matches_the_signature() {
    let mut builder = IRBuilder::new("test");
    builder.start_function("f", Vec::new(), IRType::Void);
    builder.set_terminator(Terminator::Ret {
        value: Some(Value::Constant(Constant::Int(1))),
        span: 0..0,
    });
    let errs = verify_function(builder.current_function_ref()).unwrap_err();
    assert!(errs.iter().any(|e| e.contains("declared void")));
}

#[test]
fn branch_to_unknown_block_is_rejected() {
    let mut builder = IRBuilder::new("test");
    builder.start_function("f", Vec::new(), IRType::Void);
    builder.set_terminator(Terminator::Br {
        label: "missing".to_string(),
        span: 0..0,
    });
    let errs = verify_function(builder.current_function_ref()).unwrap_err();
    assert!(errs.iter().any(|e| e.contains("unknown block 'missing'")));
}

#[test]
fn module_rejects_calls_to_unknown_functions() {
    let mut builder = IRBuilder::new("test");
    builder.start_function("f", Vec::new(), IRType::Void);
    builder.add_instruction(Instruction::Call {
        dest: None,
        func: "ghost".to_string(),
        args: Vec::new(),
        ty: IRType::Void,
        span: 0..0,
    });
    builder.set_terminator(Terminator::Ret {
        value: None,
        span: 0..0,
    });
    let module = builder.finish();
    let errs = verify_module(&module).unwrap_err();
    assert!(errs.iter().any(|e| e.contains("unknown function 'ghost'")));
}

#[test]
fn module_rejects_unknown_globals() {
    let mut builder = IRBuilder::new("test");
    builder.start_function("f", Vec::new(), IRType::I32);
    let dest = builder.new_register();
    builder.add_instruction(Instruction::Load {
        dest: dest.clone(),
        ptr: Value::Global("missing".to_string()),
        ty: IRType::I32,
        span: 0..0,
    });
    builder.set_terminator(Terminator::Ret {
        value: Some(Value::Register(dest)),
        span: 0..0,
    });
    let module = builder.finish();
    let errs = verify_module(&module).unwrap_err();
    assert!(errs.iter().any(|e| e.contains("unknown global @missing")));
}

#[test]
fn module_display_covers_globals_and_strings() {
    let mut builder = IRBuilder::new("test");
    builder.add_global(GlobalVar {
        name: "counter".to_string(),
        ty: IRType::I32,
        init: Constant::Int(0),
        is_constant: false,
    });
    builder.add_global_string("hi");
    let module = builder.finish();
    let printed = module.to_string();
    assert!(printed.contains("@counter"));
    assert!(printed.contains("@.str0"));
    assert!(printed.contains("hi"));
}
