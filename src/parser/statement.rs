use crate::ast::{Block, CondBranch, Param, Prototype, Spanned, Stmt, TypeName};
use crate::error::{CompileError, Result};
use crate::lexer::Token;
use crate::parser::Parser;

use std::ops::Range;

impl Parser {
    /// Identifier at statement position: commit to an assignment only when
    /// the very next token is `=`, otherwise rewind one token and re-parse
    /// as an ordinary expression. The only backtracking point.
    pub(super) fn parse_assignment_or_expression(&mut self) -> Result<Spanned<Stmt>> {
        let Some((Token::Ident(name), name_span)) = self.tokens.next() else {
            unreachable!("caller checked for an identifier");
        };

        if !matches!(self.tokens.peek(), Some((Token::Assign, _))) {
            self.tokens.rewind();
            return self.expression_statement();
        }

        self.tokens.next();
        let value = self.parse_expr()?;
        let end = self.expect(Token::Semicolon, "';' after assignment")?;
        let span = name_span.start..end.end;
        Ok((
            Stmt::Assign {
                name,
                name_span,
                value,
            },
            span,
        ))
    }

    pub(super) fn expression_statement(&mut self) -> Result<Spanned<Stmt>> {
        let expr = self.parse_expr()?;
        let end = self.expect(Token::Semicolon, "';' after expression")?;
        let span = expr.1.start..end.end;
        Ok((Stmt::Expr(expr), span))
    }

    pub(super) fn parse_declaration(&mut self) -> Result<Spanned<Stmt>> {
        let start = self.tokens.peek().map(|(_, s)| s.start).unwrap_or(0);
        let is_const = self.eat(&Token::KeywordConst);
        let ty = self.parse_type_name()?;
        let (name, _) = self.expect_ident("a name in declaration")?;
        let init = if self.eat(&Token::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let end = self.expect(Token::Semicolon, "';' after declaration")?;
        Ok((
            Stmt::Declaration {
                name,
                ty,
                init,
                is_const,
            },
            start..end.end,
        ))
    }

    fn parse_type_name(&mut self) -> Result<TypeName> {
        match self.tokens.next() {
            Some((Token::TyBool, _)) => Ok(TypeName::Bool),
            Some((Token::TyByte, _)) => Ok(TypeName::Byte),
            Some((Token::TyChar, _)) => Ok(TypeName::Char),
            Some((Token::TyInt, _)) => Ok(TypeName::Int),
            Some((Token::TyDouble, _)) => Ok(TypeName::Double),
            Some((Token::TyStr, _)) => Ok(TypeName::Str),
            Some((Token::TyVoid, _)) => Ok(TypeName::Void),
            Some((token, span)) => Err(CompileError::syntax(
                format!("expected a type name, found {:?}", token),
                span,
            )),
            None => Err(self.unexpected_end("a type name")),
        }
    }

    pub(super) fn parse_function(&mut self) -> Result<Spanned<Stmt>> {
        let (_, start) = self.tokens.next().expect("caller checked for 'fn'");
        let (name, _) = self.expect_ident("a function name")?;
        self.expect(Token::LParen, "'(' after function name")?;

        let mut params = Vec::new();
        let mut is_variadic = false;
        if !matches!(self.tokens.peek(), Some((Token::RParen, _))) {
            loop {
                if self.eat(&Token::Ellipsis) {
                    is_variadic = true;
                    break;
                }
                // unannotated parameters default to double
                let ty = if self.peek_is_type_name() {
                    self.parse_type_name()?
                } else {
                    TypeName::Double
                };
                let (pname, _) = self.expect_ident("a parameter name")?;
                params.push(Param { name: pname, ty });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::RParen, "')' after parameters")?;

        let return_type = if self.eat(&Token::Arrow) {
            self.parse_type_name()?
        } else {
            TypeName::Void
        };

        let proto = Prototype {
            name,
            params,
            return_type,
            is_variadic,
        };

        if let Some((Token::Semicolon, _)) = self.tokens.peek() {
            let (_, end) = self.tokens.next().expect("peeked");
            return Ok((Stmt::Prototype(proto), start.start..end.end));
        }

        let (body, body_span) = self.parse_block()?;
        Ok((Stmt::Function { proto, body }, start.start..body_span.end))
    }

    /// Either a brace-delimited statement sequence or a single expression
    /// statement.
    pub(super) fn parse_block(&mut self) -> Result<(Block, Range<usize>)> {
        if let Some((Token::LBrace, _)) = self.tokens.peek() {
            let (_, start) = self.tokens.next().expect("peeked");
            let mut statements = Vec::new();
            loop {
                match self.tokens.peek() {
                    None => return Err(self.unexpected_end("'}' to close block")),
                    Some((Token::RBrace, _)) => {
                        let (_, end) = self.tokens.next().expect("peeked");
                        return Ok((Block { statements }, start.start..end.end));
                    }
                    Some(_) => statements.push(self.next_node()?),
                }
            }
        }

        let stmt = self.expression_statement()?;
        let span = stmt.1.clone();
        Ok((Block { statements: vec![stmt] }, span))
    }

    fn parse_cond_branch(&mut self) -> Result<(CondBranch, Range<usize>)> {
        let cond = self.parse_expr()?;
        let (body, body_span) = self.parse_block()?;
        let span = cond.1.start..body_span.end;
        Ok((CondBranch { cond, body }, span))
    }

    pub(super) fn parse_if(&mut self) -> Result<Spanned<Stmt>> {
        let (_, start) = self.tokens.next().expect("caller checked for 'if'");
        let (primary, mut end) = self.parse_cond_branch()?;

        let mut else_ifs = Vec::new();
        let mut else_block = None;
        while self.eat(&Token::KeywordElse) {
            match self.tokens.peek() {
                Some((Token::KeywordIf, _)) => {
                    self.tokens.next();
                    let (branch, span) = self.parse_cond_branch()?;
                    else_ifs.push(branch);
                    end = span;
                }
                Some((Token::LBrace, _)) => {
                    let (block, span) = self.parse_block()?;
                    else_block = Some(block);
                    end = span;
                    break;
                }
                Some((token, span)) => {
                    return Err(CompileError::syntax(
                        format!("expected 'if' or '{{' after 'else', found {:?}", token),
                        span.clone(),
                    ));
                }
                None => return Err(self.unexpected_end("'if' or '{' after 'else'")),
            }
        }

        Ok((
            Stmt::If {
                primary,
                else_ifs,
                else_block,
            },
            start.start..end.end,
        ))
    }

    pub(super) fn parse_while(&mut self) -> Result<Spanned<Stmt>> {
        let (_, start) = self.tokens.next().expect("caller checked for 'while'");
        self.expect(Token::LParen, "'(' after 'while'")?;
        let cond = self.parse_expr()?;
        self.expect(Token::RParen, "')' after loop condition")?;
        let (body, body_span) = self.parse_block()?;
        Ok((Stmt::While { cond, body }, start.start..body_span.end))
    }

    pub(super) fn parse_do_while(&mut self) -> Result<Spanned<Stmt>> {
        let (_, start) = self.tokens.next().expect("caller checked for 'do'");
        let (body, _) = self.parse_block()?;
        self.expect(Token::KeywordWhile, "'while' after do-block")?;
        self.expect(Token::LParen, "'(' after 'while'")?;
        let cond = self.parse_expr()?;
        self.expect(Token::RParen, "')' after loop condition")?;
        let end = self.expect(Token::Semicolon, "';' after do-while")?;
        Ok((Stmt::DoWhile { body, cond }, start.start..end.end))
    }

    pub(super) fn parse_for(&mut self) -> Result<Spanned<Stmt>> {
        let (_, start) = self.tokens.next().expect("caller checked for 'for'");
        self.expect(Token::LParen, "'(' after 'for'")?;

        let init = match self.tokens.peek() {
            Some((Token::Semicolon, _)) => {
                self.tokens.next();
                None
            }
            Some((Token::KeywordConst, _)) => Some(Box::new(self.parse_declaration()?)),
            _ if self.peek_is_type_name() => Some(Box::new(self.parse_declaration()?)),
            Some((Token::Ident(_), _)) => Some(Box::new(self.parse_assignment_or_expression()?)),
            _ => Some(Box::new(self.expression_statement()?)),
        };

        let cond = self.parse_expr()?;
        self.expect(Token::Semicolon, "';' after loop condition")?;

        let step = if matches!(self.tokens.peek(), Some((Token::RParen, _))) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(Token::RParen, "')' after loop step")?;

        let (body, body_span) = self.parse_block()?;
        Ok((
            Stmt::For {
                init,
                cond,
                step,
                body,
            },
            start.start..body_span.end,
        ))
    }

    pub(super) fn parse_return(&mut self) -> Result<Spanned<Stmt>> {
        let (_, start) = self.tokens.next().expect("caller checked for 'return'");
        let value = if matches!(self.tokens.peek(), Some((Token::Semicolon, _))) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        let end = self.expect(Token::Semicolon, "';' after return")?;
        Ok((Stmt::Return(value), start.start..end.end))
    }
}
