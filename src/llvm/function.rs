use crate::ir::{IRType, Instruction, Terminator, Value};
use crate::llvm::LLVMCodegen;

use inkwell::basic_block::BasicBlock;
use inkwell::values::PhiValue;

use std::collections::HashMap;

impl<'ctx> LLVMCodegen<'ctx> {
    pub fn codegen_function(&mut self, function: &crate::ir::Function) -> Result<(), String> {
        let llvm_function = self.declare_function(function);
        self.current_function = Some(llvm_function);
        self.value_map.clear();

        for (i, (param_name, _)) in function.params.iter().enumerate() {
            if let Some(param_value) = llvm_function.get_nth_param(i as u32) {
                param_value.set_name(param_name);
                self.value_map.insert(param_name.clone(), param_value);
            }
        }

        // blocks first so forward branches resolve
        let mut block_map: HashMap<String, BasicBlock<'ctx>> = HashMap::new();
        for ir_block in &function.blocks {
            let bb = self
                .context
                .append_basic_block(llvm_function, &ir_block.label);
            block_map.insert(ir_block.label.clone(), bb);
        }

        // phi incoming values may come from blocks generated later, so the
        // nodes are created empty and filled in a second pass
        let mut phi_nodes: Vec<(PhiValue<'ctx>, IRType, Vec<(Value, String)>)> = Vec::new();

        for ir_block in &function.blocks {
            let bb = block_map[&ir_block.label];
            self.builder.position_at_end(bb);

            for instr in &ir_block.instructions {
                if let Instruction::Phi {
                    dest, ty, incoming, ..
                } = instr
                {
                    let phi_type = self.get_llvm_type(ty);
                    let phi = self.builder.build_phi(phi_type, dest).unwrap();
                    phi_nodes.push((phi, *ty, incoming.clone()));
                    self.value_map.insert(dest.clone(), phi.as_basic_value());
                } else {
                    self.codegen_instruction(instr);
                }
            }

            let term = ir_block
                .terminator
                .as_ref()
                .unwrap_or_else(|| panic!("block {} has no terminator", ir_block.label));
            self.codegen_terminator(term, &function.return_type, &block_map);
        }

        for (phi, ty, incoming) in phi_nodes {
            for (value, label) in incoming {
                let val = self.codegen_value(&value, &ty);
                let bb = block_map
                    .get(&label)
                    .unwrap_or_else(|| panic!("phi incoming block {} not found", label));
                phi.add_incoming(&[(&val, *bb)]);
            }
        }

        self.current_function = None;
        if llvm_function.verify(true) {
            Ok(())
        } else {
            Err(format!("function '{}' verification failed", function.name))
        }
    }

    fn codegen_terminator(
        &mut self,
        term: &Terminator,
        return_type: &IRType,
        block_map: &HashMap<String, BasicBlock<'ctx>>,
    ) {
        match term {
            Terminator::Ret {
                value: Some(val), ..
            } => {
                let ret_val = self.codegen_value(val, return_type);
                self.builder.build_return(Some(&ret_val)).unwrap();
            }
            Terminator::Ret { value: None, .. } => {
                self.builder.build_return(None).unwrap();
            }
            Terminator::Br { label, .. } => {
                let target = block_map
                    .get(label)
                    .unwrap_or_else(|| panic!("branch target {} not found", label));
                self.builder.build_unconditional_branch(*target).unwrap();
            }
            Terminator::CondBr {
                cond,
                then_label,
                else_label,
                ..
            } => {
                let cond_val = self.codegen_value(cond, &IRType::I1);
                let then_bb = block_map
                    .get(then_label)
                    .unwrap_or_else(|| panic!("branch target {} not found", then_label));
                let else_bb = block_map
                    .get(else_label)
                    .unwrap_or_else(|| panic!("branch target {} not found", else_label));
                self.builder
                    .build_conditional_branch(cond_val.into_int_value(), *then_bb, *else_bb)
                    .unwrap();
            }
            Terminator::Unreachable { .. } => {
                self.builder.build_unreachable().unwrap();
            }
        }
    }
}
