use crate::ast::{BinOp, Fixity, TypeName, UnOp};
use crate::error::{CompileError, Result};
use crate::ir::{Constant, FCmpCond, ICmpCond, IRBuilder, IRType, Instruction, Value};

use std::fmt::{self, Display, Formatter};
use std::ops::Range;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Boolean,
    Byte,
    Char,
    Integer,
    Double,
    Str,
    Void,
}

/// A language-level value kind. `Copy + Eq` makes every occurrence of a
/// (kind, pointer) pair the canonical one, so plain equality is identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LangType {
    pub kind: TypeKind,
    pub is_pointer: bool,
}

/// Cast selected by the coercion table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOp {
    FpToSi,
    SiToFp,
    ZExt,
    SExt,
    Trunc,
}

impl LangType {
    pub const BOOLEAN: LangType = LangType::plain(TypeKind::Boolean);
    pub const BYTE: LangType = LangType::plain(TypeKind::Byte);
    pub const CHAR: LangType = LangType::plain(TypeKind::Char);
    pub const INTEGER: LangType = LangType::plain(TypeKind::Integer);
    pub const DOUBLE: LangType = LangType::plain(TypeKind::Double);
    pub const STR: LangType = LangType::plain(TypeKind::Str);
    pub const VOID: LangType = LangType::plain(TypeKind::Void);

    pub const fn plain(kind: TypeKind) -> Self {
        LangType {
            kind,
            is_pointer: false,
        }
    }

    pub const fn pointer(kind: TypeKind) -> Self {
        LangType {
            kind,
            is_pointer: true,
        }
    }

    pub fn from_name(name: TypeName) -> Self {
        match name {
            TypeName::Bool => LangType::BOOLEAN,
            TypeName::Byte => LangType::BYTE,
            TypeName::Char => LangType::CHAR,
            TypeName::Int => LangType::INTEGER,
            TypeName::Double => LangType::DOUBLE,
            TypeName::Str => LangType::STR,
            TypeName::Void => LangType::VOID,
        }
    }

    pub fn machine_type(&self) -> IRType {
        if self.is_pointer {
            return IRType::Ptr;
        }
        match self.kind {
            TypeKind::Boolean => IRType::I1,
            TypeKind::Byte | TypeKind::Char => IRType::I8,
            TypeKind::Integer => IRType::I32,
            TypeKind::Double => IRType::F64,
            TypeKind::Str => IRType::Ptr,
            TypeKind::Void => IRType::Void,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !self.is_pointer
            && matches!(
                self.kind,
                TypeKind::Byte | TypeKind::Char | TypeKind::Integer | TypeKind::Double
            )
    }

    pub fn is_float(&self) -> bool {
        self.kind == TypeKind::Double
    }

    /// Byte is the unsigned member of the numeric family.
    pub fn is_signed(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Char | TypeKind::Integer | TypeKind::Double
        )
    }

    pub fn bit_width(&self) -> u32 {
        self.machine_type().bit_width()
    }

    pub fn zero(&self) -> Constant {
        match self.kind {
            TypeKind::Boolean => Constant::Bool(false),
            TypeKind::Double => Constant::Float(0.0),
            TypeKind::Str => Constant::Null,
            _ => Constant::Int(0),
        }
    }

    fn unit(&self) -> Constant {
        if self.is_float() {
            Constant::Float(1.0)
        } else {
            Constant::Int(1)
        }
    }

    pub fn supports_binary(&self, op: BinOp, rhs: &LangType) -> bool {
        if self.is_pointer || rhs.is_pointer {
            return false;
        }
        match self.kind {
            TypeKind::Boolean => {
                rhs.kind == TypeKind::Boolean
                    && matches!(op, BinOp::Eq | BinOp::Ne | BinOp::And | BinOp::Or)
            }
            TypeKind::Byte => {
                if matches!(op, BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor) {
                    // bit patterns exist only on the integer side
                    rhs.is_numeric() && !rhs.is_float()
                } else {
                    rhs.is_numeric() && numeric_binary_supported(op)
                }
            }
            _ if self.is_numeric() => rhs.is_numeric() && numeric_binary_supported(op),
            _ => false,
        }
    }

    pub fn supports_unary(&self, op: UnOp) -> bool {
        self.is_numeric()
            && matches!(
                op,
                UnOp::Plus | UnOp::Minus | UnOp::Increment | UnOp::Decrement
            )
    }

    /// Emits the instruction for `lhs op rhs`; both operands must already
    /// be coerced to `self`. Comparisons produce an i1 register.
    pub fn emit_binary(
        &self,
        builder: &mut IRBuilder,
        op: BinOp,
        lhs: Value,
        rhs: Value,
        span: Range<usize>,
    ) -> Result<Value> {
        let ty = self.machine_type();
        let dest = builder.new_register();

        let instr = match op {
            BinOp::Add => Instruction::Add {
                dest: dest.clone(),
                lhs,
                rhs,
                ty,
                span,
            },
            BinOp::Sub => Instruction::Sub {
                dest: dest.clone(),
                lhs,
                rhs,
                ty,
                span,
            },
            BinOp::Mul => Instruction::Mul {
                dest: dest.clone(),
                lhs,
                rhs,
                ty,
                span,
            },
            BinOp::Div => Instruction::Div {
                dest: dest.clone(),
                lhs,
                rhs,
                ty,
                signed: self.is_signed(),
                span,
            },
            BinOp::And | BinOp::BitAnd => Instruction::And {
                dest: dest.clone(),
                lhs,
                rhs,
                ty,
                span,
            },
            BinOp::Or | BinOp::BitOr => Instruction::Or {
                dest: dest.clone(),
                lhs,
                rhs,
                ty,
                span,
            },
            BinOp::BitXor => Instruction::Xor {
                dest: dest.clone(),
                lhs,
                rhs,
                ty,
                span,
            },
            _ if op.is_comparison() => {
                if self.is_float() {
                    Instruction::FCmp {
                        dest: dest.clone(),
                        cond: fcmp_cond(op),
                        lhs,
                        rhs,
                        span,
                    }
                } else {
                    Instruction::ICmp {
                        dest: dest.clone(),
                        cond: icmp_cond(op, self.is_signed()),
                        lhs,
                        rhs,
                        ty,
                        span,
                    }
                }
            }
            _ => {
                return Err(CompileError::semantic(
                    format!("operator '{}' is not defined for {}", op, self),
                    span,
                ));
            }
        };

        builder.add_instruction(instr);
        Ok(Value::Register(dest))
    }

    /// Unary emission. Increment/decrement write back through `storage`
    /// when the operand is addressable; prefix yields the new value,
    /// postfix the old one.
    pub fn emit_unary(
        &self,
        builder: &mut IRBuilder,
        op: UnOp,
        operand: Value,
        storage: Option<Value>,
        fixity: Fixity,
        span: Range<usize>,
    ) -> Result<Value> {
        let ty = self.machine_type();
        match op {
            UnOp::Plus => Ok(operand),
            UnOp::Minus => {
                let dest = builder.new_register();
                builder.add_instruction(Instruction::Sub {
                    dest: dest.clone(),
                    lhs: Value::Constant(self.zero()),
                    rhs: operand,
                    ty,
                    span,
                });
                Ok(Value::Register(dest))
            }
            UnOp::Increment | UnOp::Decrement => {
                let dest = builder.new_register();
                let instr = if op == UnOp::Increment {
                    Instruction::Add {
                        dest: dest.clone(),
                        lhs: operand.clone(),
                        rhs: Value::Constant(self.unit()),
                        ty,
                        span: span.clone(),
                    }
                } else {
                    Instruction::Sub {
                        dest: dest.clone(),
                        lhs: operand.clone(),
                        rhs: Value::Constant(self.unit()),
                        ty,
                        span: span.clone(),
                    }
                };
                builder.add_instruction(instr);
                let result = Value::Register(dest);
                if let Some(ptr) = storage {
                    builder.add_instruction(Instruction::Store {
                        value: result.clone(),
                        ptr,
                        ty,
                        span,
                    });
                }
                Ok(match fixity {
                    Fixity::Prefix => result,
                    Fixity::Postfix => operand,
                })
            }
            UnOp::Not => Err(CompileError::semantic(
                format!("operator '!' is not defined for {}", self),
                span,
            )),
        }
    }

    /// Emits the coercion of `value` from `self` to `to`, if any is needed.
    pub fn emit_coercion(
        &self,
        builder: &mut IRBuilder,
        value: Value,
        to: LangType,
        span: Range<usize>,
    ) -> Result<Value> {
        let Some(cast) = coercion(*self, to, &span)? else {
            return Ok(value);
        };
        let dest = builder.new_register();
        let from_ty = self.machine_type();
        let to_ty = to.machine_type();
        let instr = match cast {
            CastOp::FpToSi => Instruction::FpToSi {
                dest: dest.clone(),
                value,
                from_ty,
                to_ty,
                span,
            },
            CastOp::SiToFp => Instruction::SiToFp {
                dest: dest.clone(),
                value,
                from_ty,
                to_ty,
                span,
            },
            CastOp::ZExt => Instruction::ZExt {
                dest: dest.clone(),
                value,
                from_ty,
                to_ty,
                span,
            },
            CastOp::SExt => Instruction::SExt {
                dest: dest.clone(),
                value,
                from_ty,
                to_ty,
                span,
            },
            CastOp::Trunc => Instruction::Trunc {
                dest: dest.clone(),
                value,
                from_ty,
                to_ty,
                span,
            },
        };
        builder.add_instruction(instr);
        Ok(Value::Register(dest))
    }
}

impl Display for LangType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self.kind {
            TypeKind::Boolean => "bool",
            TypeKind::Byte => "byte",
            TypeKind::Char => "char",
            TypeKind::Integer => "int",
            TypeKind::Double => "double",
            TypeKind::Str => "str",
            TypeKind::Void => "void",
        };
        if self.is_pointer {
            write!(f, "{}*", name)
        } else {
            write!(f, "{}", name)
        }
    }
}

fn numeric_binary_supported(op: BinOp) -> bool {
    matches!(
        op,
        BinOp::Add
            | BinOp::Sub
            | BinOp::Mul
            | BinOp::Div
            | BinOp::Lt
            | BinOp::Le
            | BinOp::Gt
            | BinOp::Ge
            | BinOp::Eq
            | BinOp::Ne
    )
}

/// Result type of a binary operation between two operands: identical types
/// stay put; any float makes the result Double; otherwise the wider integer
/// wins (ties keep the left type). Non-numeric mismatches are hard errors.
pub fn promote(lhs: LangType, rhs: LangType, span: &Range<usize>) -> Result<LangType> {
    if lhs == rhs {
        return Ok(lhs);
    }
    if !lhs.is_numeric() || !rhs.is_numeric() {
        return Err(CompileError::semantic(
            format!("no common type for {} and {}", lhs, rhs),
            span.clone(),
        ));
    }
    if lhs.is_float() || rhs.is_float() {
        return Ok(LangType::DOUBLE);
    }
    if rhs.bit_width() > lhs.bit_width() {
        Ok(rhs)
    } else {
        Ok(lhs)
    }
}

/// The coercion table: which cast, if any, converts `from` into `to`.
pub fn coercion(from: LangType, to: LangType, span: &Range<usize>) -> Result<Option<CastOp>> {
    if from == to {
        return Ok(None);
    }

    let unsupported = || {
        CompileError::semantic(
            format!("cannot convert {} to {}", from, to),
            span.clone(),
        )
    };

    if from.is_pointer || to.is_pointer {
        return Err(unsupported());
    }

    // booleans are produced only by comparisons, never by implicit casts
    if to.kind == TypeKind::Boolean {
        return Err(unsupported());
    }

    let from_int = from.kind == TypeKind::Boolean || (from.is_numeric() && !from.is_float());
    let to_int = to.is_numeric() && !to.is_float();

    if from.is_float() && to_int {
        return Ok(Some(CastOp::FpToSi));
    }
    if from_int && to.is_float() {
        return Ok(Some(CastOp::SiToFp));
    }
    if from_int && to_int {
        return Ok(if from.bit_width() == 1 {
            Some(CastOp::ZExt)
        } else if from.bit_width() < to.bit_width() {
            Some(CastOp::SExt)
        } else if from.bit_width() > to.bit_width() {
            Some(CastOp::Trunc)
        } else {
            // byte and char share a machine representation
            None
        });
    }

    Err(unsupported())
}

/// Predicate for an integer comparison; `==`/`!=` ignore signedness.
pub fn icmp_cond(op: BinOp, signed: bool) -> ICmpCond {
    match (op, signed) {
        (BinOp::Eq, _) => ICmpCond::Eq,
        (BinOp::Ne, _) => ICmpCond::Ne,
        (BinOp::Lt, true) => ICmpCond::Slt,
        (BinOp::Lt, false) => ICmpCond::Ult,
        (BinOp::Le, true) => ICmpCond::Sle,
        (BinOp::Le, false) => ICmpCond::Ule,
        (BinOp::Gt, true) => ICmpCond::Sgt,
        (BinOp::Gt, false) => ICmpCond::Ugt,
        (BinOp::Ge, true) => ICmpCond::Sge,
        (BinOp::Ge, false) => ICmpCond::Uge,
        _ => unreachable!("not a comparison operator: {}", op),
    }
}

/// Ordered predicates for float comparisons.
pub fn fcmp_cond(op: BinOp) -> FCmpCond {
    match op {
        BinOp::Eq => FCmpCond::Oeq,
        BinOp::Ne => FCmpCond::One,
        BinOp::Lt => FCmpCond::Olt,
        BinOp::Le => FCmpCond::Ole,
        BinOp::Gt => FCmpCond::Ogt,
        BinOp::Ge => FCmpCond::Oge,
        _ => unreachable!("not a comparison operator: {}", op),
    }
}
