use super::{Binding, Codegen};
use crate::ast::{Block, Expr, Prototype, Spanned, Stmt, TypeName};
use crate::error::{CompileError, Result};
use crate::ir::{self, Constant, Instruction, Terminator, Value};
use crate::types::{LangType, TypeKind};

use std::ops::Range;

impl Codegen {
    /// Generates one function body. The prototype has already been
    /// registered; the generated IR is verified before we move on, so a
    /// lowering bug surfaces at the function that produced it.
    pub(super) fn gen_function(
        &mut self,
        proto: &Prototype,
        body: &Block,
        span: &Range<usize>,
    ) -> Result<()> {
        if !self.generated.insert(proto.name.clone()) {
            return Err(CompileError::semantic(
                format!("function '{}' is already defined", proto.name),
                span.clone(),
            ));
        }
        if proto.is_variadic {
            return Err(CompileError::semantic(
                format!("variadic function '{}' cannot have a body", proto.name),
                span.clone(),
            ));
        }

        let return_ty = LangType::from_name(proto.return_type);
        let machine_params = proto
            .params
            .iter()
            .map(|p| (p.name.clone(), LangType::from_name(p.ty).machine_type()))
            .collect();
        self.builder
            .start_function(&proto.name, machine_params, return_ty.machine_type());
        self.current_return = Some(return_ty);

        self.ctx.symbols.enter_scope();
        let result = self.gen_function_body(proto, body, return_ty, span);
        self.ctx.symbols.exit_scope();
        self.current_return = None;
        result?;

        ir::verify::verify_function(self.builder.current_function_ref()).map_err(|errs| {
            CompileError::semantic(
                format!(
                    "internal consistency check failed for '{}': {}",
                    proto.name,
                    errs.join("; ")
                ),
                span.clone(),
            )
        })
    }

    fn gen_function_body(
        &mut self,
        proto: &Prototype,
        body: &Block,
        return_ty: LangType,
        span: &Range<usize>,
    ) -> Result<()> {
        // parameters are spilled to entry slots so they are addressable
        for param in &proto.params {
            let ty = LangType::from_name(param.ty);
            if ty == LangType::VOID {
                return Err(CompileError::semantic(
                    format!("parameter '{}' cannot be void", param.name),
                    span.clone(),
                ));
            }
            let slot = self.builder.entry_alloca(ty.machine_type(), span.clone());
            self.builder.add_instruction(Instruction::Store {
                value: Value::Argument(param.name.clone()),
                ptr: Value::Register(slot.clone()),
                ty: ty.machine_type(),
                span: span.clone(),
            });
            if !self.ctx.symbols.insert(
                &param.name,
                Binding::Slot {
                    ptr: Value::Register(slot),
                    ty,
                },
            ) {
                return Err(CompileError::semantic(
                    format!("duplicate parameter name '{}'", param.name),
                    span.clone(),
                ));
            }
        }

        self.gen_block(body)?;

        if !self.builder.is_terminated() {
            if return_ty == LangType::VOID {
                self.builder.set_terminator(Terminator::Ret {
                    value: None,
                    span: span.clone(),
                });
            } else {
                return Err(CompileError::semantic(
                    format!("missing return statement in function '{}'", proto.name),
                    span.clone(),
                ));
            }
        }
        Ok(())
    }

    /// A block opens its own scope; its value is the value of the last
    /// statement generated, when that statement has one.
    pub(super) fn gen_block(&mut self, block: &Block) -> Result<Option<(Value, LangType)>> {
        self.ctx.symbols.enter_scope();
        let result = self.gen_statements(&block.statements);
        self.ctx.symbols.exit_scope();
        result
    }

    fn gen_statements(
        &mut self,
        statements: &[Spanned<Stmt>],
    ) -> Result<Option<(Value, LangType)>> {
        let mut last = None;
        for stmt in statements {
            if self.builder.is_terminated() {
                // everything after a return is unreachable
                break;
            }
            last = self.gen_statement(stmt)?;
        }
        Ok(last)
    }

    pub(super) fn gen_statement(
        &mut self,
        stmt: &Spanned<Stmt>,
    ) -> Result<Option<(Value, LangType)>> {
        let (node, span) = stmt;
        match node {
            Stmt::Expr(expr) => {
                let (value, ty) = self.gen_expr(expr)?;
                Ok(if ty == LangType::VOID {
                    None
                } else {
                    Some((value, ty))
                })
            }
            Stmt::Assign {
                name,
                name_span,
                value,
            } => self.gen_assignment(name, name_span, value).map(Some),
            Stmt::Declaration {
                name,
                ty,
                init,
                is_const,
            } => {
                self.gen_local_declaration(name, *ty, init.as_ref(), *is_const, span)?;
                Ok(None)
            }
            Stmt::Prototype(proto) => {
                self.register_prototype(proto, span)?;
                Ok(None)
            }
            Stmt::Function { proto, .. } => Err(CompileError::semantic(
                format!("function '{}' cannot be defined inside a function", proto.name),
                span.clone(),
            )),
            Stmt::If {
                primary,
                else_ifs,
                else_block,
            } => self.gen_if(primary, else_ifs, else_block.as_ref(), span),
            Stmt::While { cond, body } => {
                self.gen_while(cond, body, span)?;
                Ok(None)
            }
            Stmt::DoWhile { body, cond } => {
                self.gen_do_while(body, cond, span)?;
                Ok(None)
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                self.gen_for(init.as_deref(), cond, step.as_ref(), body, span)?;
                Ok(None)
            }
            Stmt::Return(value) => {
                self.gen_return(value.as_ref(), span)?;
                Ok(None)
            }
        }
    }

    fn gen_local_declaration(
        &mut self,
        name: &str,
        ty_name: TypeName,
        init: Option<&Spanned<Expr>>,
        is_const: bool,
        span: &Range<usize>,
    ) -> Result<()> {
        let ty = LangType::from_name(ty_name);
        if ty == LangType::VOID {
            return Err(CompileError::semantic(
                format!("cannot declare '{}' as void", name),
                span.clone(),
            ));
        }
        if is_const {
            return Err(CompileError::semantic(
                "const is only valid on global declarations".to_string(),
                span.clone(),
            ));
        }

        let value = match init {
            Some(expr) => {
                let (v, vty) = self.gen_expr(expr)?;
                vty.emit_coercion(&mut self.builder, v, ty, expr.1.clone())?
            }
            None => Value::Constant(ty.zero()),
        };

        let slot = self.builder.entry_alloca(ty.machine_type(), span.clone());
        self.builder.add_instruction(Instruction::Store {
            value,
            ptr: Value::Register(slot.clone()),
            ty: ty.machine_type(),
            span: span.clone(),
        });
        if !self.ctx.symbols.insert(
            name,
            Binding::Slot {
                ptr: Value::Register(slot),
                ty,
            },
        ) {
            return Err(CompileError::semantic(
                format!("redeclaration of '{}' in the same scope", name),
                span.clone(),
            ));
        }
        Ok(())
    }

    /// Globals live outside any function, so their initializers must fold
    /// to constants at compile time.
    pub(super) fn gen_global_declaration(
        &mut self,
        name: &str,
        ty_name: TypeName,
        init: Option<&Spanned<Expr>>,
        is_const: bool,
        span: &Range<usize>,
    ) -> Result<()> {
        let ty = LangType::from_name(ty_name);
        if ty == LangType::VOID {
            return Err(CompileError::semantic(
                format!("cannot declare '{}' as void", name),
                span.clone(),
            ));
        }
        if self.ctx.globals.contains_key(name) {
            return Err(CompileError::semantic(
                format!("redeclaration of global '{}'", name),
                span.clone(),
            ));
        }

        let constant = match init {
            None => ty.zero(),
            Some(expr) => fold_global_init(&expr.0, ty, &expr.1)?,
        };

        self.ctx.globals.insert(
            name.to_string(),
            super::GlobalInfo {
                ty,
                is_constant: is_const,
            },
        );
        self.builder.add_global(ir::GlobalVar {
            name: name.to_string(),
            ty: ty.machine_type(),
            init: constant,
            is_constant: is_const,
        });
        Ok(())
    }

    fn gen_return(&mut self, value: Option<&Spanned<Expr>>, span: &Range<usize>) -> Result<()> {
        let return_ty = self.current_return.expect("return outside a function");
        match (value, return_ty == LangType::VOID) {
            (None, true) => {
                self.builder.set_terminator(Terminator::Ret {
                    value: None,
                    span: span.clone(),
                });
                Ok(())
            }
            (None, false) => Err(CompileError::semantic(
                format!("return without a value in a function returning {}", return_ty),
                span.clone(),
            )),
            (Some(expr), true) => Err(CompileError::semantic(
                "cannot return a value from a void function".to_string(),
                expr.1.clone(),
            )),
            (Some(expr), false) => {
                let (v, vty) = self.gen_expr(expr)?;
                let coerced = vty.emit_coercion(&mut self.builder, v, return_ty, expr.1.clone())?;
                self.builder.set_terminator(Terminator::Ret {
                    value: Some(coerced),
                    span: span.clone(),
                });
                Ok(())
            }
        }
    }
}

fn fold_global_init(expr: &Expr, ty: LangType, span: &Range<usize>) -> Result<Constant> {
    match expr {
        Expr::Number { value, is_float: _ } => match ty.kind {
            TypeKind::Double => Ok(Constant::Float(*value)),
            TypeKind::Byte | TypeKind::Char | TypeKind::Integer => {
                Ok(Constant::Int(value.trunc() as i64))
            }
            _ => Err(CompileError::semantic(
                format!("cannot initialize {} from a numeric literal", ty),
                span.clone(),
            )),
        },
        Expr::Bool(b) => {
            if ty.kind == TypeKind::Boolean {
                Ok(Constant::Bool(*b))
            } else {
                Err(CompileError::semantic(
                    format!("cannot initialize {} from a boolean literal", ty),
                    span.clone(),
                ))
            }
        }
        Expr::Str(_) => Err(CompileError::semantic(
            "global string initializers are not supported".to_string(),
            span.clone(),
        )),
        _ => Err(CompileError::semantic(
            "global initializer must be a constant literal".to_string(),
            span.clone(),
        )),
    }
}
