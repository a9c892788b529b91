use super::{Binding, Codegen};
use crate::ast::{BinOp, Expr, Fixity, Spanned, UnOp};
use crate::error::{CompileError, Result};
use crate::ir::{Constant, Instruction, Value};
use crate::types::{promote, LangType};

use std::ops::Range;

impl Codegen {
    /// Emits code for an expression and hands back the value together with
    /// its language-level type.
    pub fn gen_expr(&mut self, expr: &Spanned<Expr>) -> Result<(Value, LangType)> {
        let (node, span) = expr;
        match node {
            Expr::Number { value, is_float } => {
                if *is_float {
                    Ok((Value::Constant(Constant::Float(*value)), LangType::DOUBLE))
                } else {
                    Ok((
                        Value::Constant(Constant::Int(*value as i64)),
                        LangType::INTEGER,
                    ))
                }
            }
            Expr::Bool(b) => Ok((Value::Constant(Constant::Bool(*b)), LangType::BOOLEAN)),
            Expr::Str(content) => {
                let name = self.builder.add_global_string(content);
                Ok((Value::Global(name), LangType::STR))
            }
            Expr::Ident(name) => self.gen_ident(name, span),
            Expr::Binary { op, lhs, rhs } => self.gen_binary(*op, lhs, rhs, span),
            Expr::Unary {
                op,
                fixity,
                operand,
            } => self.gen_unary(*op, *fixity, operand, span),
            Expr::Call { callee, args } => self.gen_call(callee, args, span),
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => self.gen_ternary(cond, then_expr, else_expr, span),
            Expr::Method {
                receiver,
                name,
                args,
            } => {
                // `recv.name(args)` is plain `name(recv, args)`
                let mut full_args = Vec::with_capacity(args.len() + 1);
                full_args.push((**receiver).clone());
                full_args.extend(args.iter().cloned());
                self.gen_call(name, &full_args, span)
            }
            Expr::Field { receiver, name } => {
                let (_, rty) = self.gen_expr(receiver)?;
                Err(CompileError::semantic(
                    format!("{} has no field '{}'", rty, name),
                    span.clone(),
                ))
            }
        }
    }

    fn gen_ident(&mut self, name: &str, span: &Range<usize>) -> Result<(Value, LangType)> {
        if let Some(binding) = self.ctx.symbols.lookup(name).cloned() {
            return match binding {
                Binding::Slot { ptr, ty } => {
                    let dest = self.builder.new_register();
                    self.builder.add_instruction(Instruction::Load {
                        dest: dest.clone(),
                        ptr,
                        ty: ty.machine_type(),
                        span: span.clone(),
                    });
                    Ok((Value::Register(dest), ty))
                }
                Binding::Induction { value, ty } => Ok((value, ty)),
            };
        }
        if let Some(info) = self.ctx.globals.get(name).copied() {
            let dest = self.builder.new_register();
            self.builder.add_instruction(Instruction::Load {
                dest: dest.clone(),
                ptr: Value::Global(name.to_string()),
                ty: info.ty.machine_type(),
                span: span.clone(),
            });
            return Ok((Value::Register(dest), info.ty));
        }
        Err(CompileError::semantic(
            format!("unknown variable name '{}'", name),
            span.clone(),
        ))
    }

    fn gen_binary(
        &mut self,
        op: BinOp,
        lhs: &Spanned<Expr>,
        rhs: &Spanned<Expr>,
        span: &Range<usize>,
    ) -> Result<(Value, LangType)> {
        let (lv, lt) = self.gen_expr(lhs)?;
        let (rv, rt) = self.gen_expr(rhs)?;

        if !lt.supports_binary(op, &rt) {
            return Err(CompileError::semantic(
                format!("operator '{}' is not defined between {} and {}", op, lt, rt),
                span.clone(),
            ));
        }

        let common = promote(lt, rt, span)?;
        let lv = lt.emit_coercion(&mut self.builder, lv, common, span.clone())?;
        let rv = rt.emit_coercion(&mut self.builder, rv, common, span.clone())?;
        let result = common.emit_binary(&mut self.builder, op, lv, rv, span.clone())?;

        let result_ty = if op.is_comparison() {
            LangType::BOOLEAN
        } else {
            common
        };
        Ok((result, result_ty))
    }

    fn gen_unary(
        &mut self,
        op: UnOp,
        fixity: Fixity,
        operand: &Spanned<Expr>,
        span: &Range<usize>,
    ) -> Result<(Value, LangType)> {
        // ++/-- need the operand's storage to write the stepped value back
        let (value, ty, storage) = match &operand.0 {
            Expr::Ident(name) => match self.ctx.symbols.lookup(name).cloned() {
                Some(Binding::Slot { ptr, ty }) => {
                    let dest = self.builder.new_register();
                    self.builder.add_instruction(Instruction::Load {
                        dest: dest.clone(),
                        ptr: ptr.clone(),
                        ty: ty.machine_type(),
                        span: operand.1.clone(),
                    });
                    (Value::Register(dest), ty, Some(ptr))
                }
                Some(Binding::Induction { value, ty }) => (value, ty, None),
                None => match self.ctx.globals.get(name).copied() {
                    Some(info) => {
                        if info.is_constant
                            && matches!(op, UnOp::Increment | UnOp::Decrement)
                        {
                            return Err(CompileError::semantic(
                                format!("cannot modify constant global '{}'", name),
                                span.clone(),
                            ));
                        }
                        let dest = self.builder.new_register();
                        self.builder.add_instruction(Instruction::Load {
                            dest: dest.clone(),
                            ptr: Value::Global(name.to_string()),
                            ty: info.ty.machine_type(),
                            span: operand.1.clone(),
                        });
                        (
                            Value::Register(dest),
                            info.ty,
                            Some(Value::Global(name.to_string())),
                        )
                    }
                    None => {
                        return Err(CompileError::semantic(
                            format!("unknown variable name '{}'", name),
                            operand.1.clone(),
                        ));
                    }
                },
            },
            _ => {
                let (value, ty) = self.gen_expr(operand)?;
                (value, ty, None)
            }
        };

        if !ty.supports_unary(op) {
            return Err(CompileError::semantic(
                format!("operator '{}' is not defined for {}", op, ty),
                span.clone(),
            ));
        }

        // an induction binding has no slot; one stepped value both rebinds
        // the name and decides the expression result by fixity
        if matches!(op, UnOp::Increment | UnOp::Decrement) {
            if let Expr::Ident(name) = &operand.0 {
                if let Some(Binding::Induction { value: old, ty }) =
                    self.ctx.symbols.lookup(name).cloned()
                {
                    let stepped = ty.emit_unary(
                        &mut self.builder,
                        op,
                        old.clone(),
                        None,
                        Fixity::Prefix,
                        span.clone(),
                    )?;
                    self.ctx.symbols.rebind(
                        name,
                        Binding::Induction {
                            value: stepped.clone(),
                            ty,
                        },
                    );
                    return Ok((
                        match fixity {
                            Fixity::Prefix => stepped,
                            Fixity::Postfix => old,
                        },
                        ty,
                    ));
                }
            }
        }

        let result = ty.emit_unary(&mut self.builder, op, value, storage, fixity, span.clone())?;
        Ok((result, ty))
    }

    pub(super) fn gen_call(
        &mut self,
        callee: &str,
        args: &[Spanned<Expr>],
        span: &Range<usize>,
    ) -> Result<(Value, LangType)> {
        let Some(proto) = self.ctx.prototypes.get(callee).cloned() else {
            return Err(CompileError::semantic(
                format!("call to unknown function '{}'", callee),
                span.clone(),
            ));
        };

        let fixed = proto.params.len();
        let arity_ok = if proto.is_variadic {
            args.len() >= fixed
        } else {
            args.len() == fixed
        };
        if !arity_ok {
            return Err(CompileError::semantic(
                format!(
                    "function '{}' expects {}{} argument{}, got {}",
                    callee,
                    if proto.is_variadic { "at least " } else { "" },
                    fixed,
                    if fixed == 1 { "" } else { "s" },
                    args.len()
                ),
                span.clone(),
            ));
        }

        let mut call_args = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let (value, vty) = self.gen_expr(arg)?;
            match proto.params.get(i) {
                Some(param) => {
                    let pty = LangType::from_name(param.ty);
                    let coerced =
                        vty.emit_coercion(&mut self.builder, value, pty, arg.1.clone())?;
                    call_args.push((coerced, pty.machine_type()));
                }
                // variadic tail: pass through unchanged
                None => call_args.push((value, vty.machine_type())),
            }
        }

        let ret = LangType::from_name(proto.return_type);
        let dest = if ret == LangType::VOID {
            None
        } else {
            Some(self.builder.new_register())
        };
        self.builder.add_instruction(Instruction::Call {
            dest: dest.clone(),
            func: callee.to_string(),
            args: call_args,
            ty: ret.machine_type(),
            span: span.clone(),
        });

        match dest {
            Some(reg) => Ok((Value::Register(reg), ret)),
            None => Ok((Value::Constant(Constant::Null), ret)),
        }
    }

    /// Stores (or rebinds) `value` into `name`. Produces the stored value,
    /// already coerced to the destination type.
    pub(super) fn gen_assignment(
        &mut self,
        name: &str,
        name_span: &Range<usize>,
        value: &Spanned<Expr>,
    ) -> Result<(Value, LangType)> {
        let (v, vty) = self.gen_expr(value)?;

        if let Some(binding) = self.ctx.symbols.lookup(name).cloned() {
            return match binding {
                Binding::Slot { ptr, ty } => {
                    let coerced = vty.emit_coercion(&mut self.builder, v, ty, value.1.clone())?;
                    self.builder.add_instruction(Instruction::Store {
                        value: coerced.clone(),
                        ptr,
                        ty: ty.machine_type(),
                        span: name_span.clone(),
                    });
                    Ok((coerced, ty))
                }
                Binding::Induction { ty, .. } => {
                    let coerced = vty.emit_coercion(&mut self.builder, v, ty, value.1.clone())?;
                    self.ctx.symbols.rebind(
                        name,
                        Binding::Induction {
                            value: coerced.clone(),
                            ty,
                        },
                    );
                    Ok((coerced, ty))
                }
            };
        }

        if let Some(info) = self.ctx.globals.get(name).copied() {
            if info.is_constant {
                return Err(CompileError::semantic(
                    format!("cannot assign to constant global '{}'", name),
                    name_span.clone(),
                ));
            }
            let coerced = vty.emit_coercion(&mut self.builder, v, info.ty, value.1.clone())?;
            self.builder.add_instruction(Instruction::Store {
                value: coerced.clone(),
                ptr: Value::Global(name.to_string()),
                ty: info.ty.machine_type(),
                span: name_span.clone(),
            });
            return Ok((coerced, info.ty));
        }

        Err(CompileError::semantic(
            format!("cannot assign to undeclared name '{}'", name),
            name_span.clone(),
        ))
    }
}
