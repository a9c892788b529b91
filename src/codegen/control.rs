use super::{Binding, Codegen};
use crate::ast::{Block, CondBranch, Expr, Fixity, Spanned, Stmt, UnOp};
use crate::error::{CompileError, Result};
use crate::ir::{Instruction, Terminator, Value};
use crate::types::{promote, LangType};

use std::ops::Range;

impl Codegen {
    /// A condition must already be boolean; there is no implicit test
    /// against zero.
    pub(super) fn gen_condition(&mut self, cond: &Spanned<Expr>) -> Result<Value> {
        let (value, ty) = self.gen_expr(cond)?;
        if ty != LangType::BOOLEAN {
            return Err(CompileError::semantic(
                format!("condition must be a boolean, found {}", ty),
                cond.1.clone(),
            ));
        }
        Ok(value)
    }

    /// If/else-if chain. All arms branch to one merge block; when every
    /// arm produces a value of the same type the chain itself is a value,
    /// merged with a phi. A missing else contributes a zero of that type
    /// along the fall-through edge.
    pub(super) fn gen_if(
        &mut self,
        primary: &CondBranch,
        else_ifs: &[CondBranch],
        else_block: Option<&Block>,
        span: &Range<usize>,
    ) -> Result<Option<(Value, LangType)>> {
        let merge_label = self.builder.new_label("ifcont");
        let merge_block = self.builder.create_block(merge_label.clone());

        let mut edges: Vec<(Option<(Value, LangType)>, String)> = Vec::new();
        let mut fallthrough_label: Option<String> = None;

        let count = 1 + else_ifs.len();
        for (i, branch) in std::iter::once(primary).chain(else_ifs).enumerate() {
            let cond = self.gen_condition(&branch.cond)?;
            let cond_label = self.builder.current_block_label();

            let then_label = self.builder.new_label("then");
            let then_block = self.builder.create_block(then_label.clone());

            let is_last = i + 1 == count;
            let (next_label, next_block) = if !is_last {
                let label = self.builder.new_label("elif");
                let block = self.builder.create_block(label.clone());
                (label, Some(block))
            } else if else_block.is_some() {
                let label = self.builder.new_label("else");
                let block = self.builder.create_block(label.clone());
                (label, Some(block))
            } else {
                fallthrough_label = Some(cond_label);
                (merge_label.clone(), None)
            };

            self.builder.set_terminator(Terminator::CondBr {
                cond,
                then_label,
                else_label: next_label,
                span: span.clone(),
            });

            self.builder.set_current_block(then_block);
            let value = self.gen_block(&branch.body)?;
            if !self.builder.is_terminated() {
                edges.push((value, self.builder.current_block_label()));
                self.builder.set_terminator(Terminator::Br {
                    label: merge_label.clone(),
                    span: span.clone(),
                });
            }

            if let Some(block) = next_block {
                self.builder.set_current_block(block);
            }
        }

        if let Some(block) = else_block {
            let value = self.gen_block(block)?;
            if !self.builder.is_terminated() {
                edges.push((value, self.builder.current_block_label()));
                self.builder.set_terminator(Terminator::Br {
                    label: merge_label.clone(),
                    span: span.clone(),
                });
            }
        }

        self.builder.set_current_block(merge_block);

        // every arm ended in a return: nothing reaches the merge
        if edges.is_empty() && fallthrough_label.is_none() {
            self.builder.set_terminator(Terminator::Unreachable {
                span: span.clone(),
            });
            return Ok(None);
        }

        let merged_ty = match edges.first() {
            Some((Some((_, ty)), _)) => *ty,
            _ => return Ok(None),
        };
        let uniform = edges
            .iter()
            .all(|(v, _)| matches!(v, Some((_, ty)) if *ty == merged_ty));
        if !uniform {
            return Ok(None);
        }

        let mut incoming: Vec<(Value, String)> = edges
            .into_iter()
            .map(|(v, label)| (v.expect("checked above").0, label))
            .collect();
        if let Some(label) = fallthrough_label {
            incoming.push((Value::Constant(merged_ty.zero()), label));
        }

        let dest = self.builder.new_register();
        self.builder.add_instruction(Instruction::Phi {
            dest: dest.clone(),
            ty: merged_ty.machine_type(),
            incoming,
            span: span.clone(),
        });
        Ok(Some((Value::Register(dest), merged_ty)))
    }

    /// `cond ? a : b` with both arms evaluated lazily in their own blocks
    /// and merged through a phi. Arm coercions to the common type are
    /// emitted inside the owning arm.
    pub(super) fn gen_ternary(
        &mut self,
        cond: &Spanned<Expr>,
        then_expr: &Spanned<Expr>,
        else_expr: &Spanned<Expr>,
        span: &Range<usize>,
    ) -> Result<(Value, LangType)> {
        let cond_value = self.gen_condition(cond)?;

        let then_label = self.builder.new_label("selthen");
        let then_block = self.builder.create_block(then_label.clone());
        let else_label = self.builder.new_label("selelse");
        let else_block = self.builder.create_block(else_label.clone());
        let merge_label = self.builder.new_label("selcont");
        let merge_block = self.builder.create_block(merge_label.clone());

        self.builder.set_terminator(Terminator::CondBr {
            cond: cond_value,
            then_label,
            else_label,
            span: span.clone(),
        });

        // the common type is known only after both arms are generated, so
        // coercion and the branch out are added by revisiting the arm ends
        self.builder.set_current_block(then_block);
        let (tv, tt) = self.gen_expr(then_expr)?;
        let then_end = self.builder.current_block_index();

        self.builder.set_current_block(else_block);
        let (ev, et) = self.gen_expr(else_expr)?;
        let else_end = self.builder.current_block_index();

        let common = promote(tt, et, span)?;

        self.builder.set_current_block(then_end);
        let tv = tt.emit_coercion(&mut self.builder, tv, common, then_expr.1.clone())?;
        let then_edge = self.builder.current_block_label();
        self.builder.set_terminator(Terminator::Br {
            label: merge_label.clone(),
            span: span.clone(),
        });

        self.builder.set_current_block(else_end);
        let ev = et.emit_coercion(&mut self.builder, ev, common, else_expr.1.clone())?;
        let else_edge = self.builder.current_block_label();
        self.builder.set_terminator(Terminator::Br {
            label: merge_label,
            span: span.clone(),
        });

        self.builder.set_current_block(merge_block);
        let dest = self.builder.new_register();
        self.builder.add_instruction(Instruction::Phi {
            dest: dest.clone(),
            ty: common.machine_type(),
            incoming: vec![(tv, then_edge), (ev, else_edge)],
            span: span.clone(),
        });
        Ok((Value::Register(dest), common))
    }

    pub(super) fn gen_while(
        &mut self,
        cond: &Spanned<Expr>,
        body: &Block,
        span: &Range<usize>,
    ) -> Result<()> {
        let cond_label = self.builder.new_label("loopcond");
        let cond_block = self.builder.create_block(cond_label.clone());
        let body_label = self.builder.new_label("loopbody");
        let body_block = self.builder.create_block(body_label.clone());
        let after_label = self.builder.new_label("afterloop");
        let after_block = self.builder.create_block(after_label.clone());

        self.builder.set_terminator(Terminator::Br {
            label: cond_label.clone(),
            span: span.clone(),
        });

        self.builder.set_current_block(cond_block);
        let cond_value = self.gen_condition(cond)?;
        self.builder.set_terminator(Terminator::CondBr {
            cond: cond_value,
            then_label: body_label,
            else_label: after_label,
            span: span.clone(),
        });

        self.builder.set_current_block(body_block);
        self.gen_block(body)?;
        if !self.builder.is_terminated() {
            self.builder.set_terminator(Terminator::Br {
                label: cond_label,
                span: span.clone(),
            });
        }

        self.builder.set_current_block(after_block);
        Ok(())
    }

    /// Body first, trailing check: the body always runs at least once.
    pub(super) fn gen_do_while(
        &mut self,
        body: &Block,
        cond: &Spanned<Expr>,
        span: &Range<usize>,
    ) -> Result<()> {
        let body_label = self.builder.new_label("loopbody");
        let body_block = self.builder.create_block(body_label.clone());
        let after_label = self.builder.new_label("afterloop");
        let after_block = self.builder.create_block(after_label.clone());

        self.builder.set_terminator(Terminator::Br {
            label: body_label.clone(),
            span: span.clone(),
        });

        self.builder.set_current_block(body_block);
        self.gen_block(body)?;
        if !self.builder.is_terminated() {
            let cond_value = self.gen_condition(cond)?;
            self.builder.set_terminator(Terminator::CondBr {
                cond: cond_value,
                then_label: body_label,
                else_label: after_label,
                span: span.clone(),
            });
        }

        self.builder.set_current_block(after_block);
        Ok(())
    }

    pub(super) fn gen_for(
        &mut self,
        init: Option<&Spanned<Stmt>>,
        cond: &Spanned<Expr>,
        step: Option<&Spanned<Expr>>,
        body: &Block,
        span: &Range<usize>,
    ) -> Result<()> {
        // the induction variable, if any, is scoped to the loop
        self.ctx.symbols.enter_scope();
        let result = self.gen_for_parts(init, cond, step, body, span);
        self.ctx.symbols.exit_scope();
        result
    }

    /// `for (init; cond; step)`. An init of the form `name = expr` that
    /// introduces a fresh name becomes a loop-carried phi in the header:
    /// seeded from the preheader, re-seeded with the step result along the
    /// back edge. Any other init just runs once in the preheader.
    fn gen_for_parts(
        &mut self,
        init: Option<&Spanned<Stmt>>,
        cond: &Spanned<Expr>,
        step: Option<&Spanned<Expr>>,
        body: &Block,
        span: &Range<usize>,
    ) -> Result<()> {
        let mut seed: Option<(Value, LangType, String)> = None;
        if let Some(init_stmt) = init {
            match &init_stmt.0 {
                Stmt::Assign { name, value, .. }
                    if self.ctx.symbols.lookup(name).is_none()
                        && !self.ctx.globals.contains_key(name) =>
                {
                    let (v, ty) = self.gen_expr(value)?;
                    seed = Some((v, ty, name.clone()));
                }
                _ => {
                    self.gen_statement(init_stmt)?;
                }
            }
        }

        // a body or step that writes the variable from inside a branch arm
        // or nested loop cannot carry it as one loop phi: the write's block
        // would not dominate the back edge. Such a variable gets a slot.
        let mut slot_induction: Option<(Value, LangType, String)> = None;
        let spill = seed.as_ref().is_some_and(|(_, _, name)| {
            writes_under_branch(name, body)
                || step.is_some_and(|expr| expr_steps_in_arm(name, &expr.0))
        });
        if spill {
            let (value, ty, name) = seed.take().expect("checked above");
            let slot = self.builder.entry_alloca(ty.machine_type(), span.clone());
            self.builder.add_instruction(Instruction::Store {
                value,
                ptr: Value::Register(slot.clone()),
                ty: ty.machine_type(),
                span: span.clone(),
            });
            let ptr = Value::Register(slot);
            self.ctx.symbols.insert(
                &name,
                Binding::Slot {
                    ptr: ptr.clone(),
                    ty,
                },
            );
            slot_induction = Some((ptr, ty, name));
        }

        let preheader = self.builder.current_block_label();
        let cond_label = self.builder.new_label("forcond");
        let cond_block = self.builder.create_block(cond_label.clone());
        let body_label = self.builder.new_label("forbody");
        let body_block = self.builder.create_block(body_label.clone());
        let after_label = self.builder.new_label("afterfor");
        let after_block = self.builder.create_block(after_label.clone());

        self.builder.set_terminator(Terminator::Br {
            label: cond_label.clone(),
            span: span.clone(),
        });
        self.builder.set_current_block(cond_block);

        let mut phi: Option<(String, LangType, String)> = None;
        if let Some((value, ty, name)) = seed {
            let phi_reg = self.builder.new_register();
            self.builder.add_instruction(Instruction::Phi {
                dest: phi_reg.clone(),
                ty: ty.machine_type(),
                incoming: vec![(value, preheader)],
                span: span.clone(),
            });
            self.ctx.symbols.insert(
                &name,
                Binding::Induction {
                    value: Value::Register(phi_reg.clone()),
                    ty,
                },
            );
            phi = Some((phi_reg, ty, name));
        }

        let cond_value = self.gen_condition(cond)?;
        self.builder.set_terminator(Terminator::CondBr {
            cond: cond_value,
            then_label: body_label,
            else_label: after_label,
            span: span.clone(),
        });

        self.builder.set_current_block(body_block);
        self.gen_block(body)?;

        if !self.builder.is_terminated() {
            let before_step = phi.as_ref().and_then(|(_, _, name)| {
                match self.ctx.symbols.lookup(name) {
                    Some(Binding::Induction { value, .. }) => Some(value.clone()),
                    _ => None,
                }
            });
            let step_value = match step {
                Some(expr) => Some(self.gen_expr(expr)?),
                None => match &phi {
                    // no step written: advance the induction variable by one
                    Some((_, ty, name)) => {
                        let (current, _) = self.gen_expr(&(
                            Expr::Ident(name.clone()),
                            span.clone(),
                        ))?;
                        let stepped = ty.emit_unary(
                            &mut self.builder,
                            UnOp::Increment,
                            current,
                            None,
                            Fixity::Prefix,
                            span.clone(),
                        )?;
                        Some((stepped, *ty))
                    }
                    None => {
                        if let Some((ptr, ty, name)) = slot_induction.clone() {
                            let (current, _) =
                                self.gen_expr(&(Expr::Ident(name), span.clone()))?;
                            ty.emit_unary(
                                &mut self.builder,
                                UnOp::Increment,
                                current,
                                Some(ptr),
                                Fixity::Prefix,
                                span.clone(),
                            )?;
                        }
                        None
                    }
                },
            };

            match &phi {
                Some((phi_reg, ty, name)) => {
                    // a step like `i++` rebinds the induction variable; the
                    // back edge must carry the rebound value, not the step
                    // expression's result (postfix yields the old value)
                    let (sv, sty) = match self.ctx.symbols.lookup(name).cloned() {
                        Some(Binding::Induction { value, ty: bty })
                            if before_step.as_ref() != Some(&value) =>
                        {
                            (value, bty)
                        }
                        _ => step_value.expect("induction loop always steps"),
                    };
                    let seeded =
                        sty.emit_coercion(&mut self.builder, sv, *ty, span.clone())?;
                    let back_edge = self.builder.current_block_label();
                    self.builder.set_terminator(Terminator::Br {
                        label: cond_label,
                        span: span.clone(),
                    });
                    self.builder
                        .add_phi_incoming(cond_block, phi_reg, seeded, back_edge);
                }
                None => {
                    self.builder.set_terminator(Terminator::Br {
                        label: cond_label,
                        span: span.clone(),
                    });
                }
            }
        }

        self.builder.set_current_block(after_block);
        Ok(())
    }
}

/// Does the expression step `name` with `++`/`--` anywhere inside?
fn expr_steps(name: &str, expr: &Expr) -> bool {
    match expr {
        Expr::Unary { op, operand, .. } => {
            (matches!(op, UnOp::Increment | UnOp::Decrement)
                && matches!(&operand.0, Expr::Ident(n) if n == name))
                || expr_steps(name, &operand.0)
        }
        Expr::Binary { lhs, rhs, .. } => expr_steps(name, &lhs.0) || expr_steps(name, &rhs.0),
        Expr::Ternary {
            cond,
            then_expr,
            else_expr,
        } => {
            expr_steps(name, &cond.0)
                || expr_steps(name, &then_expr.0)
                || expr_steps(name, &else_expr.0)
        }
        Expr::Call { args, .. } => args.iter().any(|a| expr_steps(name, &a.0)),
        Expr::Method { receiver, args, .. } => {
            expr_steps(name, &receiver.0) || args.iter().any(|a| expr_steps(name, &a.0))
        }
        Expr::Field { receiver, .. } => expr_steps(name, &receiver.0),
        Expr::Number { .. } | Expr::Str(_) | Expr::Bool(_) | Expr::Ident(_) => false,
    }
}

/// Steps of `name` inside a ternary arm, whose block does not dominate
/// the code after the merge.
fn expr_steps_in_arm(name: &str, expr: &Expr) -> bool {
    match expr {
        Expr::Ternary {
            cond,
            then_expr,
            else_expr,
        } => {
            expr_steps_in_arm(name, &cond.0)
                || expr_steps(name, &then_expr.0)
                || expr_steps(name, &else_expr.0)
        }
        Expr::Unary { operand, .. } => expr_steps_in_arm(name, &operand.0),
        Expr::Binary { lhs, rhs, .. } => {
            expr_steps_in_arm(name, &lhs.0) || expr_steps_in_arm(name, &rhs.0)
        }
        Expr::Call { args, .. } => args.iter().any(|a| expr_steps_in_arm(name, &a.0)),
        Expr::Method { receiver, args, .. } => {
            expr_steps_in_arm(name, &receiver.0)
                || args.iter().any(|a| expr_steps_in_arm(name, &a.0))
        }
        Expr::Field { receiver, .. } => expr_steps_in_arm(name, &receiver.0),
        Expr::Number { .. } | Expr::Str(_) | Expr::Bool(_) | Expr::Ident(_) => false,
    }
}

/// Any write to `name` (assignment or step) anywhere in the statement.
fn stmt_writes(name: &str, stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Assign {
            name: n, value, ..
        } => n.as_str() == name || expr_steps(name, &value.0),
        Stmt::Expr(e) => expr_steps(name, &e.0),
        Stmt::Declaration { init, .. } => {
            init.as_ref().is_some_and(|e| expr_steps(name, &e.0))
        }
        Stmt::Return(e) => e.as_ref().is_some_and(|e| expr_steps(name, &e.0)),
        Stmt::If {
            primary,
            else_ifs,
            else_block,
        } => {
            std::iter::once(primary)
                .chain(else_ifs)
                .any(|b| expr_steps(name, &b.cond.0) || block_writes(name, &b.body))
                || else_block.as_ref().is_some_and(|b| block_writes(name, b))
        }
        Stmt::While { cond, body } | Stmt::DoWhile { cond, body } => {
            expr_steps(name, &cond.0) || block_writes(name, body)
        }
        Stmt::For {
            init,
            cond,
            step,
            body,
        } => {
            init.as_deref().is_some_and(|(s, _)| stmt_writes(name, s))
                || expr_steps(name, &cond.0)
                || step.as_ref().is_some_and(|e| expr_steps(name, &e.0))
                || block_writes(name, body)
        }
        Stmt::Function { .. } | Stmt::Prototype(_) => false,
    }
}

fn block_writes(name: &str, block: &Block) -> bool {
    block.statements.iter().any(|(s, _)| stmt_writes(name, s))
}

/// True when the loop body writes `name` somewhere control-dependent: in
/// a nested statement's branches or inside a ternary arm. Straight-line
/// writes at the top level of the body rebind cleanly and stay out.
fn writes_under_branch(name: &str, body: &Block) -> bool {
    body.statements.iter().any(|(stmt, _)| match stmt {
        Stmt::Assign { value, .. } => expr_steps_in_arm(name, &value.0),
        Stmt::Expr(e) => expr_steps_in_arm(name, &e.0),
        Stmt::Declaration { init, .. } => {
            init.as_ref().is_some_and(|e| expr_steps_in_arm(name, &e.0))
        }
        Stmt::Return(e) => e.as_ref().is_some_and(|e| expr_steps_in_arm(name, &e.0)),
        Stmt::If { .. } | Stmt::While { .. } | Stmt::DoWhile { .. } | Stmt::For { .. } => {
            stmt_writes(name, stmt)
        }
        Stmt::Function { .. } | Stmt::Prototype(_) => false,
    })
}
