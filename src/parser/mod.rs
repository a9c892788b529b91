pub mod expression;
pub mod statement;

#[cfg(test)]
pub mod test;

use crate::ast::{Spanned, Stmt};
use crate::error::{CompileError, Result};
use crate::lexer::{Token, TokenStream};

use std::ops::Range;

pub struct Parser {
    tokens: TokenStream,
}

impl Parser {
    pub fn new(tokens: TokenStream) -> Self {
        Parser { tokens }
    }

    /// Whether more input remains.
    pub fn has_next(&self) -> bool {
        self.tokens.has_next()
    }

    pub fn parse_program(&mut self) -> Result<Vec<Spanned<Stmt>>> {
        let mut nodes = Vec::new();
        while self.tokens.has_next() {
            nodes.push(self.next_node()?);
        }
        Ok(nodes)
    }

    /// Consumes exactly one top-level construct. Fails immediately on the
    /// first structural mismatch; there is no recovery.
    pub fn next_node(&mut self) -> Result<Spanned<Stmt>> {
        let Some((token, _)) = self.tokens.peek() else {
            return Err(self.unexpected_end("a statement"));
        };

        match token {
            Token::Ident(_) => self.parse_assignment_or_expression(),
            Token::KeywordFn => self.parse_function(),
            Token::KeywordIf => self.parse_if(),
            Token::KeywordFor => self.parse_for(),
            Token::KeywordWhile => self.parse_while(),
            Token::KeywordDo => self.parse_do_while(),
            Token::KeywordReturn => self.parse_return(),
            Token::KeywordConst => self.parse_declaration(),
            _ if self.peek_is_type_name() => self.parse_declaration(),
            _ => self.expression_statement(),
        }
    }

    fn peek_is_type_name(&self) -> bool {
        matches!(
            self.tokens.peek(),
            Some((
                Token::TyBool
                    | Token::TyByte
                    | Token::TyChar
                    | Token::TyInt
                    | Token::TyDouble
                    | Token::TyStr
                    | Token::TyVoid,
                _
            ))
        )
    }

    fn eat(&mut self, token: &Token) -> bool {
        if let Some((t, _)) = self.tokens.peek() {
            if t == token {
                self.tokens.next();
                return true;
            }
        }
        false
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<Range<usize>> {
        match self.tokens.next() {
            Some((token, span)) if token == expected => Ok(span),
            Some((token, span)) => Err(CompileError::syntax(
                format!("expected {}, found {:?}", what, token),
                span,
            )),
            None => Err(self.unexpected_end(what)),
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, Range<usize>)> {
        match self.tokens.next() {
            Some((Token::Ident(name), span)) => Ok((name, span)),
            Some((token, span)) => Err(CompileError::syntax(
                format!("expected {}, found {:?}", what, token),
                span,
            )),
            None => Err(self.unexpected_end(what)),
        }
    }

    fn unexpected_end(&self, what: &str) -> CompileError {
        CompileError::syntax(
            format!("expected {} but reached end of input", what),
            self.tokens.end_span(),
        )
    }
}
