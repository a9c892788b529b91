use crate::ast::{Param, Prototype, Spanned, Stmt, TypeName};
use crate::error::{CompileError, Result};
use crate::ir::{self, IRBuilder};
use crate::types::LangType;

use std::collections::{HashMap, HashSet};
use std::ops::Range;

pub mod control;
pub mod expr;
pub mod function;

#[cfg(test)]
pub mod test;

/// Where a name lives. Locals and parameters are alloca-backed slots;
/// a for-loop induction variable is bound directly to its SSA value.
#[derive(Debug, Clone)]
pub enum Binding {
    Slot { ptr: ir::Value, ty: LangType },
    Induction { value: ir::Value, ty: LangType },
}

impl Binding {
    pub fn lang_type(&self) -> LangType {
        match self {
            Binding::Slot { ty, .. } | Binding::Induction { ty, .. } => *ty,
        }
    }
}

/// Lexically scoped name bindings: a stack of frames, innermost last.
#[derive(Debug, Default)]
pub struct SymbolTable {
    scopes: Vec<HashMap<String, Binding>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable { scopes: Vec::new() }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn exit_scope(&mut self) {
        self.scopes.pop().expect("scope stack underflow");
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Inserts into the innermost frame. Returns false when the name is
    /// already bound there (redeclaration); shadowing outer frames is fine.
    pub fn insert(&mut self, name: &str, binding: Binding) -> bool {
        let frame = self.scopes.last_mut().expect("no open scope");
        if frame.contains_key(name) {
            return false;
        }
        frame.insert(name.to_string(), binding);
        true
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Replaces the innermost binding of `name`. Returns false when the
    /// name is unbound.
    pub fn rebind(&mut self, name: &str, binding: Binding) -> bool {
        for frame in self.scopes.iter_mut().rev() {
            if let Some(slot) = frame.get_mut(name) {
                *slot = binding;
                return true;
            }
        }
        false
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GlobalInfo {
    pub ty: LangType,
    pub is_constant: bool,
}

/// Per-compilation-unit state, threaded explicitly through generation.
#[derive(Debug, Default)]
pub struct ModuleContext {
    pub globals: HashMap<String, GlobalInfo>,
    pub prototypes: HashMap<String, Prototype>,
    pub symbols: SymbolTable,
}

pub struct Codegen {
    pub builder: IRBuilder,
    pub ctx: ModuleContext,
    generated: HashSet<String>,
    current_return: Option<LangType>,
    main_body: Vec<Spanned<Stmt>>,
}

impl Codegen {
    pub fn new(module_name: &str) -> Self {
        let mut codegen = Codegen {
            builder: IRBuilder::new(module_name),
            ctx: ModuleContext {
                globals: HashMap::new(),
                prototypes: HashMap::new(),
                symbols: SymbolTable::new(),
            },
            generated: HashSet::new(),
            current_return: None,
            main_body: Vec::new(),
        };
        codegen.register_builtins();
        codegen
    }

    /// The minimal set of externally provided functions.
    fn register_builtins(&mut self) {
        self.ctx.prototypes.insert(
            "print".to_string(),
            Prototype {
                name: "print".to_string(),
                params: vec![Param {
                    name: "value".to_string(),
                    ty: TypeName::Double,
                }],
                return_type: TypeName::Void,
                is_variadic: false,
            },
        );
        self.ctx.prototypes.insert(
            "printf".to_string(),
            Prototype {
                name: "printf".to_string(),
                params: vec![Param {
                    name: "format".to_string(),
                    ty: TypeName::Str,
                }],
                return_type: TypeName::Int,
                is_variadic: true,
            },
        );
    }

    /// Generates a whole unit. Prototypes are registered up front so calls
    /// may precede definitions; loose top-level statements are gathered
    /// into a synthesized void `main`.
    pub fn generate_program(&mut self, nodes: &[Spanned<Stmt>]) -> Result<()> {
        for (stmt, span) in nodes {
            match stmt {
                Stmt::Prototype(proto) => self.register_prototype(proto, span)?,
                Stmt::Function { proto, .. } => self.register_prototype(proto, span)?,
                _ => {}
            }
        }

        for node in nodes {
            let (stmt, span) = node;
            match stmt {
                Stmt::Prototype(_) => {}
                Stmt::Function { proto, body } => self.gen_function(proto, body, span)?,
                Stmt::Declaration {
                    name,
                    ty,
                    init,
                    is_const,
                } => self.gen_global_declaration(name, *ty, init.as_ref(), *is_const, span)?,
                _ => self.main_body.push(node.clone()),
            }
        }

        if !self.main_body.is_empty() {
            let proto = Prototype {
                name: "main".to_string(),
                params: Vec::new(),
                return_type: TypeName::Void,
                is_variadic: false,
            };
            let span = self.main_body[0].1.clone();
            self.register_prototype(&proto, &span)?;
            let body = crate::ast::Block {
                statements: std::mem::take(&mut self.main_body),
            };
            self.gen_function(&proto, &body, &span)?;
        }

        Ok(())
    }

    pub(super) fn register_prototype(
        &mut self,
        proto: &Prototype,
        span: &Range<usize>,
    ) -> Result<()> {
        if let Some(existing) = self.ctx.prototypes.get(&proto.name) {
            if existing != proto {
                return Err(CompileError::semantic(
                    format!("conflicting declarations for function '{}'", proto.name),
                    span.clone(),
                ));
            }
            return Ok(());
        }
        self.ctx.prototypes.insert(proto.name.clone(), proto.clone());
        Ok(())
    }

    /// Declares every prototype that never got a body as an external
    /// function, then hands over the finished module.
    pub fn finish(mut self) -> Result<ir::Module> {
        let mut pending: Vec<_> = self
            .ctx
            .prototypes
            .values()
            .filter(|p| !self.generated.contains(&p.name))
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.name.cmp(&b.name));

        for proto in pending {
            let params = proto
                .params
                .iter()
                .map(|p| (p.name.clone(), LangType::from_name(p.ty).machine_type()))
                .collect();
            self.builder.declare_external(ir::Function {
                name: proto.name.clone(),
                params,
                return_type: LangType::from_name(proto.return_type).machine_type(),
                blocks: Vec::new(),
                is_external: true,
                is_variadic: proto.is_variadic,
            });
        }

        let module = self.builder.finish();
        ir::verify::verify_module(&module)
            .map_err(|errs| CompileError::semantic(errs.join("; "), 0..0))?;
        Ok(module)
    }
}
