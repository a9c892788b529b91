use std::fmt::{self, Display, Formatter};
use std::ops::Range;

pub type Spanned<T> = (T, Range<usize>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
}

impl BinOp {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::Eq | BinOp::Ne
        )
    }
}

impl Display for BinOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Plus,
    Minus,
    Not,
    Increment,
    Decrement,
}

impl Display for UnOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnOp::Plus => "+",
            UnOp::Minus => "-",
            UnOp::Not => "!",
            UnOp::Increment => "++",
            UnOp::Decrement => "--",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixity {
    Prefix,
    Postfix,
}

/// Surface type names as written in declarations and signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    Bool,
    Byte,
    Char,
    Int,
    Double,
    Str,
    Void,
}

impl Display for TypeName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            TypeName::Bool => "bool",
            TypeName::Byte => "byte",
            TypeName::Char => "char",
            TypeName::Int => "int",
            TypeName::Double => "double",
            TypeName::Str => "str",
            TypeName::Void => "void",
        };
        write!(f, "{}", s)
    }
}

/// Value-denoting nodes. Anything in this enum may appear in expression
/// position; statements live in `Stmt`. The split is fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number {
        value: f64,
        is_float: bool,
    },
    Str(String),
    Bool(bool),
    Ident(String),
    Binary {
        op: BinOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    Unary {
        op: UnOp,
        fixity: Fixity,
        operand: Box<Spanned<Expr>>,
    },
    Call {
        callee: String,
        args: Vec<Spanned<Expr>>,
    },
    Ternary {
        cond: Box<Spanned<Expr>>,
        then_expr: Box<Spanned<Expr>>,
        else_expr: Box<Spanned<Expr>>,
    },
    Method {
        receiver: Box<Spanned<Expr>>,
        name: String,
        args: Vec<Spanned<Expr>>,
    },
    Field {
        receiver: Box<Spanned<Expr>>,
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeName,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prototype {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: TypeName,
    pub is_variadic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CondBranch {
    pub cond: Spanned<Expr>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Expression used for its side effect, with a required terminator.
    Expr(Spanned<Expr>),
    Assign {
        name: String,
        name_span: Range<usize>,
        value: Spanned<Expr>,
    },
    Declaration {
        name: String,
        ty: TypeName,
        init: Option<Spanned<Expr>>,
        is_const: bool,
    },
    Prototype(Prototype),
    Function {
        proto: Prototype,
        body: Block,
    },
    If {
        primary: CondBranch,
        else_ifs: Vec<CondBranch>,
        else_block: Option<Block>,
    },
    While {
        cond: Spanned<Expr>,
        body: Block,
    },
    DoWhile {
        body: Block,
        cond: Spanned<Expr>,
    },
    For {
        init: Option<Box<Spanned<Stmt>>>,
        cond: Spanned<Expr>,
        step: Option<Spanned<Expr>>,
        body: Block,
    },
    Return(Option<Spanned<Expr>>),
}

impl Stmt {
    /// Whether this statement denotes a value (a wrapped expression) or
    /// only a side effect.
    pub fn is_expression(&self) -> bool {
        matches!(self, Stmt::Expr(_))
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number { value, is_float } => {
                if *is_float {
                    write!(f, "{}", value)
                } else {
                    write!(f, "{}", *value as i64)
                }
            }
            Expr::Str(s) => write!(f, "{:?}", s),
            Expr::Bool(b) => write!(f, "{}", b),
            Expr::Ident(name) => write!(f, "{}", name),
            Expr::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs.0, op, rhs.0),
            Expr::Unary {
                op,
                fixity,
                operand,
            } => match fixity {
                Fixity::Prefix => write!(f, "({}{})", op, operand.0),
                Fixity::Postfix => write!(f, "({}{})", operand.0, op),
            },
            Expr::Call { callee, args } => {
                write!(f, "{}(", callee)?;
                for (i, (arg, _)) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => write!(f, "({} ? {} : {})", cond.0, then_expr.0, else_expr.0),
            Expr::Method {
                receiver,
                name,
                args,
            } => {
                write!(f, "{}.{}(", receiver.0, name)?;
                for (i, (arg, _)) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Field { receiver, name } => write!(f, "{}.{}", receiver.0, name),
        }
    }
}

impl Display for Prototype {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "fn {}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", param.ty, param.name)?;
        }
        if self.is_variadic {
            if !self.params.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "...")?;
        }
        write!(f, ") -> {}", self.return_type)
    }
}
