//! A small imperative language compiler: hand-written lexer and
//! recursive-descent parser, SSA-form internal IR with its own verifier,
//! and an LLVM backend.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod ir;
pub mod lexer;
pub mod llvm;
pub mod parser;
pub mod types;
