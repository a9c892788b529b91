use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::ops::Range;

pub mod builder;
pub mod verify;

#[cfg(test)]
pub mod test;

pub use builder::IRBuilder;

/// Backend machine types. The language-level type lattice lives in
/// `crate::types`; by the time values reach the IR only these remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IRType {
    Void,
    I1,  // bool
    I8,  // byte, char
    I32, // int
    F64, // double
    Ptr, // str and pointer-flagged values
}

impl IRType {
    pub fn bit_width(&self) -> u32 {
        match self {
            IRType::Void => 0,
            IRType::I1 => 1,
            IRType::I8 => 8,
            IRType::I32 => 32,
            IRType::F64 => 64,
            IRType::Ptr => 64,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, IRType::F64)
    }
}

impl Display for IRType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            IRType::Void => "void",
            IRType::I1 => "i1",
            IRType::I8 => "i8",
            IRType::I32 => "i32",
            IRType::F64 => "double",
            IRType::Ptr => "ptr",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Constant(Constant),
    Register(String),
    Global(String),
    Argument(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Bool(bool),
    Int(i64),
    Float(f64),
    Null,
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Constant(c) => write!(f, "{}", c),
            Value::Register(name) => write!(f, "{}", name),
            Value::Global(name) => write!(f, "@{}", name),
            Value::Argument(name) => write!(f, "%{}", name),
        }
    }
}

impl Display for Constant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Bool(b) => write!(f, "{}", b),
            Constant::Int(v) => write!(f, "{}", v),
            Constant::Float(v) =>

                // keep a decimal point so float constants read as floats
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{:.1}", v)
                } else {
                    write!(f, "{}", v)
                },
            Constant::Null => write!(f, "null"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub label: String,
    pub instructions: Vec<Instruction>,
    pub terminator: Option<Terminator>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    // Memory
    Alloca {
        dest: String,
        ty: IRType,
        span: Range<usize>,
    },
    Load {
        dest: String,
        ptr: Value,
        ty: IRType,
        span: Range<usize>,
    },
    Store {
        value: Value,
        ptr: Value,
        ty: IRType,
        span: Range<usize>,
    },

    // Arithmetic
    Add {
        dest: String,
        lhs: Value,
        rhs: Value,
        ty: IRType,
        span: Range<usize>,
    },
    Sub {
        dest: String,
        lhs: Value,
        rhs: Value,
        ty: IRType,
        span: Range<usize>,
    },
    Mul {
        dest: String,
        lhs: Value,
        rhs: Value,
        ty: IRType,
        span: Range<usize>,
    },
    Div {
        dest: String,
        lhs: Value,
        rhs: Value,
        ty: IRType,
        signed: bool,
        span: Range<usize>,
    },

    // Bitwise (and i1 logic)
    And {
        dest: String,
        lhs: Value,
        rhs: Value,
        ty: IRType,
        span: Range<usize>,
    },
    Or {
        dest: String,
        lhs: Value,
        rhs: Value,
        ty: IRType,
        span: Range<usize>,
    },
    Xor {
        dest: String,
        lhs: Value,
        rhs: Value,
        ty: IRType,
        span: Range<usize>,
    },

    // Comparison
    ICmp {
        dest: String,
        cond: ICmpCond,
        lhs: Value,
        rhs: Value,
        ty: IRType,
        span: Range<usize>,
    },
    FCmp {
        dest: String,
        cond: FCmpCond,
        lhs: Value,
        rhs: Value,
        span: Range<usize>,
    },

    // Calls
    Call {
        dest: Option<String>,
        func: String,
        args: Vec<(Value, IRType)>,
        ty: IRType,
        span: Range<usize>,
    },

    // SSA merge
    Phi {
        dest: String,
        ty: IRType,
        incoming: Vec<(Value, String)>,
        span: Range<usize>,
    },

    // Conversions
    Trunc {
        dest: String,
        value: Value,
        from_ty: IRType,
        to_ty: IRType,
        span: Range<usize>,
    },
    ZExt {
        dest: String,
        value: Value,
        from_ty: IRType,
        to_ty: IRType,
        span: Range<usize>,
    },
    SExt {
        dest: String,
        value: Value,
        from_ty: IRType,
        to_ty: IRType,
        span: Range<usize>,
    },
    FpToSi {
        dest: String,
        value: Value,
        from_ty: IRType,
        to_ty: IRType,
        span: Range<usize>,
    },
    SiToFp {
        dest: String,
        value: Value,
        from_ty: IRType,
        to_ty: IRType,
        span: Range<usize>,
    },
}

impl Instruction {
    pub fn dest(&self) -> Option<&str> {
        use Instruction::*;
        match self {
            Alloca { dest, .. }
            | Load { dest, .. }
            | Add { dest, .. }
            | Sub { dest, .. }
            | Mul { dest, .. }
            | Div { dest, .. }
            | And { dest, .. }
            | Or { dest, .. }
            | Xor { dest, .. }
            | ICmp { dest, .. }
            | FCmp { dest, .. }
            | Phi { dest, .. }
            | Trunc { dest, .. }
            | ZExt { dest, .. }
            | SExt { dest, .. }
            | FpToSi { dest, .. }
            | SiToFp { dest, .. } => Some(dest),
            Call { dest, .. } => dest.as_deref(),
            Store { .. } => None,
        }
    }

    /// Operand values read by this instruction. Phi incoming values are
    /// excluded; they are checked against their incoming blocks.
    pub fn operands(&self) -> Vec<&Value> {
        use Instruction::*;
        match self {
            Alloca { .. } => vec![],
            Load { ptr, .. } => vec![ptr],
            Store { value, ptr, .. } => vec![value, ptr],
            Add { lhs, rhs, .. }
            | Sub { lhs, rhs, .. }
            | Mul { lhs, rhs, .. }
            | Div { lhs, rhs, .. }
            | And { lhs, rhs, .. }
            | Or { lhs, rhs, .. }
            | Xor { lhs, rhs, .. }
            | ICmp { lhs, rhs, .. }
            | FCmp { lhs, rhs, .. } => vec![lhs, rhs],
            Call { args, .. } => args.iter().map(|(v, _)| v).collect(),
            Phi { .. } => vec![],
            Trunc { value, .. }
            | ZExt { value, .. }
            | SExt { value, .. }
            | FpToSi { value, .. }
            | SiToFp { value, .. } => vec![value],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Ret {
        value: Option<Value>,
        span: Range<usize>,
    },
    Br {
        label: String,
        span: Range<usize>,
    },
    CondBr {
        cond: Value,
        then_label: String,
        else_label: String,
        span: Range<usize>,
    },
    Unreachable {
        span: Range<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ICmpCond {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Ult,
    Ule,
    Ugt,
    Uge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FCmpCond {
    Oeq,
    One,
    Olt,
    Ole,
    Ogt,
    Oge,
}

impl Display for ICmpCond {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            ICmpCond::Eq => "eq",
            ICmpCond::Ne => "ne",
            ICmpCond::Slt => "slt",
            ICmpCond::Sle => "sle",
            ICmpCond::Sgt => "sgt",
            ICmpCond::Sge => "sge",
            ICmpCond::Ult => "ult",
            ICmpCond::Ule => "ule",
            ICmpCond::Ugt => "ugt",
            ICmpCond::Uge => "uge",
        };
        write!(f, "{}", s)
    }
}

impl Display for FCmpCond {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            FCmpCond::Oeq => "oeq",
            FCmpCond::One => "one",
            FCmpCond::Olt => "olt",
            FCmpCond::Ole => "ole",
            FCmpCond::Ogt => "ogt",
            FCmpCond::Oge => "oge",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<(String, IRType)>,
    pub return_type: IRType,
    pub blocks: Vec<BasicBlock>,
    pub is_external: bool,
    pub is_variadic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalVar {
    pub name: String,
    pub ty: IRType,
    pub init: Constant,
    pub is_constant: bool,
}

#[derive(Debug, Default)]
pub struct Module {
    pub name: String,
    pub functions: Vec<Function>,
    pub globals: Vec<GlobalVar>,
    pub global_strings: HashMap<String, String>,
}

impl Module {
    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        match self {
            Alloca { dest, ty, .. } => write!(f, "{} = alloca {}", dest, ty),
            Load { dest, ptr, ty, .. } => write!(f, "{} = load {}, ptr {}", dest, ty, ptr),
            Store { value, ptr, ty, .. } => write!(f, "store {} {}, ptr {}", ty, value, ptr),
            Add { dest, lhs, rhs, ty, .. } => {
                let op = if ty.is_float() { "fadd" } else { "add" };
                write!(f, "{} = {} {} {}, {}", dest, op, ty, lhs, rhs)
            }
            Sub { dest, lhs, rhs, ty, .. } => {
                let op = if ty.is_float() { "fsub" } else { "sub" };
                write!(f, "{} = {} {} {}, {}", dest, op, ty, lhs, rhs)
            }
            Mul { dest, lhs, rhs, ty, .. } => {
                let op = if ty.is_float() { "fmul" } else { "mul" };
                write!(f, "{} = {} {} {}, {}", dest, op, ty, lhs, rhs)
            }
            Div {
                dest,
                lhs,
                rhs,
                ty,
                signed,
                ..
            } => {
                let op = if ty.is_float() {
                    "fdiv"
                } else if *signed {
                    "sdiv"
                } else {
                    "udiv"
                };
                write!(f, "{} = {} {} {}, {}", dest, op, ty, lhs, rhs)
            }
            And { dest, lhs, rhs, ty, .. } => {
                write!(f, "{} = and {} {}, {}", dest, ty, lhs, rhs)
            }
            Or { dest, lhs, rhs, ty, .. } => write!(f, "{} = or {} {}, {}", dest, ty, lhs, rhs),
            Xor { dest, lhs, rhs, ty, .. } => {
                write!(f, "{} = xor {} {}, {}", dest, ty, lhs, rhs)
            }
            ICmp {
                dest,
                cond,
                lhs,
                rhs,
                ty,
                ..
            } => write!(f, "{} = icmp {} {} {}, {}", dest, cond, ty, lhs, rhs),
            FCmp {
                dest,
                cond,
                lhs,
                rhs,
                ..
            } => write!(f, "{} = fcmp {} double {}, {}", dest, cond, lhs, rhs),
            Call {
                dest,
                func,
                args,
                ty,
                ..
            } => {
                if let Some(dest) = dest {
                    write!(f, "{} = ", dest)?;
                }
                write!(f, "call {} @{}(", ty, func)?;
                for (i, (value, arg_ty)) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} {}", arg_ty, value)?;
                }
                write!(f, ")")
            }
            Phi {
                dest, ty, incoming, ..
            } => {
                write!(f, "{} = phi {} ", dest, ty)?;
                for (i, (value, label)) in incoming.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "[ {}, %{} ]", value, label)?;
                }
                Ok(())
            }
            Trunc {
                dest,
                value,
                from_ty,
                to_ty,
                ..
            } => write!(f, "{} = trunc {} {} to {}", dest, from_ty, value, to_ty),
            ZExt {
                dest,
                value,
                from_ty,
                to_ty,
                ..
            } => write!(f, "{} = zext {} {} to {}", dest, from_ty, value, to_ty),
            SExt {
                dest,
                value,
                from_ty,
                to_ty,
                ..
            } => write!(f, "{} = sext {} {} to {}", dest, from_ty, value, to_ty),
            FpToSi {
                dest,
                value,
                from_ty,
                to_ty,
                ..
            } => write!(f, "{} = fptosi {} {} to {}", dest, from_ty, value, to_ty),
            SiToFp {
                dest,
                value,
                from_ty,
                to_ty,
                ..
            } => write!(f, "{} = sitofp {} {} to {}", dest, from_ty, value, to_ty),
        }
    }
}

impl Display for Terminator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Ret { value: Some(v), .. } => write!(f, "ret {}", v),
            Terminator::Ret { value: None, .. } => write!(f, "ret void"),
            Terminator::Br { label, .. } => write!(f, "br label %{}", label),
            Terminator::CondBr {
                cond,
                then_label,
                else_label,
                ..
            } => write!(
                f,
                "br i1 {}, label %{}, label %{}",
                cond, then_label, else_label
            ),
            Terminator::Unreachable { .. } => write!(f, "unreachable"),
        }
    }
}

impl Display for BasicBlock {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.label)?;
        for instr in &self.instructions {
            writeln!(f, "  {}", instr)?;
        }
        match &self.terminator {
            Some(term) => writeln!(f, "  {}", term),
            None => writeln!(f, "  <missing terminator>"),
        }
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|(name, ty)| format!("{} %{}", ty, name))
            .collect();
        let variadic = if self.is_variadic {
            if params.is_empty() { "..." } else { ", ..." }
        } else {
            ""
        };

        if self.is_external {
            return writeln!(
                f,
                "declare {} @{}({}{})",
                self.return_type,
                self.name,
                params.join(", "),
                variadic
            );
        }

        writeln!(
            f,
            "define {} @{}({}{}) {{",
            self.return_type,
            self.name,
            params.join(", "),
            variadic
        )?;
        for block in &self.blocks {
            write!(f, "{}", block)?;
        }
        writeln!(f, "}}")
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "; module {}", self.name)?;
        let mut strings: Vec<_> = self.global_strings.iter().collect();
        strings.sort();
        for (name, content) in strings {
            writeln!(f, "@{} = constant str {:?}", name, content)?;
        }
        for global in &self.globals {
            let qualifier = if global.is_constant {
                "constant"
            } else {
                "global"
            };
            writeln!(
                f,
                "@{} = {} {} {}",
                global.name, qualifier, global.ty, global.init
            )?;
        }
        for function in &self.functions {
            writeln!(f)?;
            write!(f, "{}", function)?;
        }
        Ok(())
    }
}
