use crate::ir::{FCmpCond, ICmpCond, IRType, Instruction};
use crate::llvm::LLVMCodegen;

use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum};

impl<'ctx> LLVMCodegen<'ctx> {
    pub fn codegen_instruction(&mut self, instr: &Instruction) {
        use Instruction::*;
        match instr {
            Alloca { dest, ty, .. } => {
                let alloca_type = self.get_llvm_type(ty);
                let alloca = self.builder.build_alloca(alloca_type, dest).unwrap();
                self.store_value(dest.clone(), alloca.into());
            }

            Load { dest, ptr, ty, .. } => {
                let ptr_val = self.codegen_value(ptr, &IRType::Ptr);
                let load_type = self.get_llvm_type(ty);
                let loaded = self
                    .builder
                    .build_load(load_type, ptr_val.into_pointer_value(), dest)
                    .unwrap();
                self.store_value(dest.clone(), loaded);
            }

            Store { value, ptr, ty, .. } => {
                let val = self.codegen_value(value, ty);
                let ptr_val = self.codegen_value(ptr, &IRType::Ptr);
                self.builder
                    .build_store(ptr_val.into_pointer_value(), val)
                    .unwrap();
            }

            Add {
                dest, lhs, rhs, ty, ..
            } => {
                let lhs_val = self.codegen_value(lhs, ty);
                let rhs_val = self.codegen_value(rhs, ty);
                let res: BasicValueEnum = if ty.is_float() {
                    self.builder
                        .build_float_add(lhs_val.into_float_value(), rhs_val.into_float_value(), dest)
                        .unwrap()
                        .into()
                } else {
                    self.builder
                        .build_int_add(lhs_val.into_int_value(), rhs_val.into_int_value(), dest)
                        .unwrap()
                        .into()
                };
                self.store_value(dest.clone(), res);
            }

            Sub {
                dest, lhs, rhs, ty, ..
            } => {
                let lhs_val = self.codegen_value(lhs, ty);
                let rhs_val = self.codegen_value(rhs, ty);
                let res: BasicValueEnum = if ty.is_float() {
                    self.builder
                        .build_float_sub(lhs_val.into_float_value(), rhs_val.into_float_value(), dest)
                        .unwrap()
                        .into()
                } else {
                    self.builder
                        .build_int_sub(lhs_val.into_int_value(), rhs_val.into_int_value(), dest)
                        .unwrap()
                        .into()
                };
                self.store_value(dest.clone(), res);
            }

            Mul {
                dest, lhs, rhs, ty, ..
            } => {
                let lhs_val = self.codegen_value(lhs, ty);
                let rhs_val = self.codegen_value(rhs, ty);
                let res: BasicValueEnum = if ty.is_float() {
                    self.builder
                        .build_float_mul(lhs_val.into_float_value(), rhs_val.into_float_value(), dest)
                        .unwrap()
                        .into()
                } else {
                    self.builder
                        .build_int_mul(lhs_val.into_int_value(), rhs_val.into_int_value(), dest)
                        .unwrap()
                        .into()
                };
                self.store_value(dest.clone(), res);
            }

            Div {
                dest,
                lhs,
                rhs,
                ty,
                signed,
                ..
            } => {
                let lhs_val = self.codegen_value(lhs, ty);
                let rhs_val = self.codegen_value(rhs, ty);
                let res: BasicValueEnum = if ty.is_float() {
                    self.builder
                        .build_float_div(lhs_val.into_float_value(), rhs_val.into_float_value(), dest)
                        .unwrap()
                        .into()
                } else if *signed {
                    self.builder
                        .build_int_signed_div(lhs_val.into_int_value(), rhs_val.into_int_value(), dest)
                        .unwrap()
                        .into()
                } else {
                    self.builder
                        .build_int_unsigned_div(lhs_val.into_int_value(), rhs_val.into_int_value(), dest)
                        .unwrap()
                        .into()
                };
                self.store_value(dest.clone(), res);
            }

            And {
                dest, lhs, rhs, ty, ..
            } => {
                let lhs_val = self.codegen_value(lhs, ty);
                let rhs_val = self.codegen_value(rhs, ty);
                let res = self
                    .builder
                    .build_and(lhs_val.into_int_value(), rhs_val.into_int_value(), dest)
                    .unwrap();
                self.store_value(dest.clone(), res.into());
            }

            Or {
                dest, lhs, rhs, ty, ..
            } => {
                let lhs_val = self.codegen_value(lhs, ty);
                let rhs_val = self.codegen_value(rhs, ty);
                let res = self
                    .builder
                    .build_or(lhs_val.into_int_value(), rhs_val.into_int_value(), dest)
                    .unwrap();
                self.store_value(dest.clone(), res.into());
            }

            Xor {
                dest, lhs, rhs, ty, ..
            } => {
                let lhs_val = self.codegen_value(lhs, ty);
                let rhs_val = self.codegen_value(rhs, ty);
                let res = self
                    .builder
                    .build_xor(lhs_val.into_int_value(), rhs_val.into_int_value(), dest)
                    .unwrap();
                self.store_value(dest.clone(), res.into());
            }

            ICmp {
                dest,
                cond,
                lhs,
                rhs,
                ty,
                ..
            } => {
                let lhs_val = self.codegen_value(lhs, ty);
                let rhs_val = self.codegen_value(rhs, ty);
                let predicate = match cond {
                    ICmpCond::Eq => inkwell::IntPredicate::EQ,
                    ICmpCond::Ne => inkwell::IntPredicate::NE,
                    ICmpCond::Slt => inkwell::IntPredicate::SLT,
                    ICmpCond::Sle => inkwell::IntPredicate::SLE,
                    ICmpCond::Sgt => inkwell::IntPredicate::SGT,
                    ICmpCond::Sge => inkwell::IntPredicate::SGE,
                    ICmpCond::Ult => inkwell::IntPredicate::ULT,
                    ICmpCond::Ule => inkwell::IntPredicate::ULE,
                    ICmpCond::Ugt => inkwell::IntPredicate::UGT,
                    ICmpCond::Uge => inkwell::IntPredicate::UGE,
                };
                let res = self
                    .builder
                    .build_int_compare(
                        predicate,
                        lhs_val.into_int_value(),
                        rhs_val.into_int_value(),
                        dest,
                    )
                    .unwrap();
                self.store_value(dest.clone(), res.into());
            }

            FCmp {
                dest,
                cond,
                lhs,
                rhs,
                ..
            } => {
                let lhs_val = self.codegen_value(lhs, &IRType::F64);
                let rhs_val = self.codegen_value(rhs, &IRType::F64);
                let predicate = match cond {
                    FCmpCond::Oeq => inkwell::FloatPredicate::OEQ,
                    FCmpCond::One => inkwell::FloatPredicate::ONE,
                    FCmpCond::Olt => inkwell::FloatPredicate::OLT,
                    FCmpCond::Ole => inkwell::FloatPredicate::OLE,
                    FCmpCond::Ogt => inkwell::FloatPredicate::OGT,
                    FCmpCond::Oge => inkwell::FloatPredicate::OGE,
                };
                let res = self
                    .builder
                    .build_float_compare(
                        predicate,
                        lhs_val.into_float_value(),
                        rhs_val.into_float_value(),
                        dest,
                    )
                    .unwrap();
                self.store_value(dest.clone(), res.into());
            }

            Call {
                dest, func, args, ..
            } => {
                let func_val = *self
                    .function_value_map
                    .get(func)
                    .unwrap_or_else(|| panic!("function {} not declared", func));
                let llvm_args: Vec<BasicMetadataValueEnum> = args
                    .iter()
                    .map(|(value, ty)| self.codegen_value(value, ty).into())
                    .collect();
                let call_site = self
                    .builder
                    .build_call(func_val, &llvm_args, dest.as_deref().unwrap_or(""))
                    .unwrap();
                if let Some(dest_name) = dest {
                    if let Some(return_value) = call_site.try_as_basic_value().left() {
                        self.store_value(dest_name.clone(), return_value);
                    }
                }
            }

            Phi { .. } => {
                unreachable!("phi nodes are created by the block pass")
            }

            Trunc {
                dest,
                value,
                from_ty,
                to_ty,
                ..
            } => {
                let val = self.codegen_value(value, from_ty);
                let target = self.get_llvm_type(to_ty).into_int_type();
                let res = self
                    .builder
                    .build_int_truncate(val.into_int_value(), target, dest)
                    .unwrap();
                self.store_value(dest.clone(), res.into());
            }

            ZExt {
                dest,
                value,
                from_ty,
                to_ty,
                ..
            } => {
                let val = self.codegen_value(value, from_ty);
                let target = self.get_llvm_type(to_ty).into_int_type();
                let res = self
                    .builder
                    .build_int_z_extend(val.into_int_value(), target, dest)
                    .unwrap();
                self.store_value(dest.clone(), res.into());
            }

            SExt {
                dest,
                value,
                from_ty,
                to_ty,
                ..
            } => {
                let val = self.codegen_value(value, from_ty);
                let target = self.get_llvm_type(to_ty).into_int_type();
                let res = self
                    .builder
                    .build_int_s_extend(val.into_int_value(), target, dest)
                    .unwrap();
                self.store_value(dest.clone(), res.into());
            }

            FpToSi {
                dest,
                value,
                from_ty,
                to_ty,
                ..
            } => {
                let val = self.codegen_value(value, from_ty);
                let target = self.get_llvm_type(to_ty).into_int_type();
                let res = self
                    .builder
                    .build_float_to_signed_int(val.into_float_value(), target, dest)
                    .unwrap();
                self.store_value(dest.clone(), res.into());
            }

            SiToFp {
                dest,
                value,
                from_ty,
                to_ty,
                ..
            } => {
                let val = self.codegen_value(value, from_ty);
                let target = self.get_llvm_type(to_ty).into_float_type();
                let res = self
                    .builder
                    .build_signed_int_to_float(val.into_int_value(), target, dest)
                    .unwrap();
                self.store_value(dest.clone(), res.into());
            }
        }
    }
}
