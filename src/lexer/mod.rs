use crate::error::{CompileError, Result};

use logos::Logos;

use std::ops::Range;

#[cfg(test)]
pub mod test;

fn unescape(raw: &str) -> Option<String> {
    // strip the surrounding quotes
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            _ => return None,
        }
    }
    Some(out)
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"#[^\n]*")]
pub enum Token {
    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),
    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    Str(String),

    #[token("fn")]
    KeywordFn,
    #[token("if")]
    KeywordIf,
    #[token("else")]
    KeywordElse,
    #[token("for")]
    KeywordFor,
    #[token("while")]
    KeywordWhile,
    #[token("do")]
    KeywordDo,
    #[token("return")]
    KeywordReturn,
    #[token("const")]
    KeywordConst,
    #[token("true")]
    True,
    #[token("false")]
    False,

    #[token("bool")]
    TyBool,
    #[token("byte")]
    TyByte,
    #[token("char")]
    TyChar,
    #[token("int")]
    TyInt,
    #[token("double")]
    TyDouble,
    #[token("str")]
    TyStr,
    #[token("void")]
    TyVoid,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[token("++")]
    Increment,
    #[token("--")]
    Decrement,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("<=")]
    LessEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("==")]
    EqualEqual,
    #[token("!=")]
    NotEqual,
    #[token("->")]
    Arrow,
    #[token("...")]
    Ellipsis,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("=")]
    Assign,
    #[token("!")]
    Bang,
    #[token("&")]
    Ampersand,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
}

/// A cursor over the fully lexed token sequence. `rewind` steps the cursor
/// back one token, which is all the backtracking the parser ever needs
/// (assignment detection).
#[derive(Debug)]
pub struct TokenStream {
    tokens: Vec<(Token, Range<usize>)>,
    cursor: usize,
}

impl TokenStream {
    pub fn new(source: &str) -> Result<Self> {
        let mut tokens = Vec::new();
        for (result, span) in Token::lexer(source).spanned() {
            match result {
                Ok(token) => tokens.push((token, span)),
                Err(_) => {
                    return Err(CompileError::syntax(
                        format!("unrecognized token '{}'", &source[span.clone()]),
                        span,
                    ));
                }
            }
        }
        Ok(TokenStream { tokens, cursor: 0 })
    }

    pub fn peek(&self) -> Option<&(Token, Range<usize>)> {
        self.tokens.get(self.cursor)
    }

    pub fn peek_second(&self) -> Option<&(Token, Range<usize>)> {
        self.tokens.get(self.cursor + 1)
    }

    pub fn next(&mut self) -> Option<(Token, Range<usize>)> {
        let item = self.tokens.get(self.cursor).cloned();
        if item.is_some() {
            self.cursor += 1;
        }
        item
    }

    pub fn rewind(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn has_next(&self) -> bool {
        self.cursor < self.tokens.len()
    }

    /// Span to report against when input ends unexpectedly.
    pub fn end_span(&self) -> Range<usize> {
        match self.tokens.last() {
            Some((_, span)) => span.end..span.end,
            None => 0..0,
        }
    }
}
