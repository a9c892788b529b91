use crate::ast::{BinOp, Expr, Fixity, Spanned, UnOp};
use crate::error::{CompileError, Result};
use crate::lexer::Token;
use crate::parser::Parser;

use std::ops::Range;

impl Parser {
    /// Full expression: the §6 precedence chain with a conditional
    /// (`cond ? a : b`) sitting above it.
    pub fn parse_expr(&mut self) -> Result<Spanned<Expr>> {
        let cond = self.parse_bool_logic()?;

        if !self.eat(&Token::Question) {
            return Ok(cond);
        }

        let then_expr = self.parse_expr()?;
        self.expect(Token::Colon, "':' in conditional expression")?;
        let else_expr = self.parse_expr()?;

        let span = cond.1.start..else_expr.1.end;
        Ok((
            Expr::Ternary {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        ))
    }

    // Each level parses its right operand by re-entering the top of the
    // chain, so the rhs swallows everything of equal or higher precedence.
    fn parse_bool_logic(&mut self) -> Result<Spanned<Expr>> {
        let mut lhs = self.parse_comparison()?;
        while let Some((token, _)) = self.tokens.peek() {
            let op = match token {
                Token::AndAnd => BinOp::And,
                Token::OrOr => BinOp::Or,
                _ => break,
            };
            self.tokens.next();
            let rhs = self.parse_bool_logic()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Spanned<Expr>> {
        let mut lhs = self.parse_additive()?;
        while let Some((token, _)) = self.tokens.peek() {
            let op = match token {
                Token::Less => BinOp::Lt,
                Token::LessEqual => BinOp::Le,
                Token::Greater => BinOp::Gt,
                Token::GreaterEqual => BinOp::Ge,
                Token::EqualEqual => BinOp::Eq,
                Token::NotEqual => BinOp::Ne,
                _ => break,
            };
            self.tokens.next();
            let rhs = self.parse_bool_logic()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Spanned<Expr>> {
        let mut lhs = self.parse_term()?;
        while let Some((token, _)) = self.tokens.peek() {
            let op = match token {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.tokens.next();
            let rhs = self.parse_bool_logic()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Spanned<Expr>> {
        let mut lhs = self.parse_factor()?;
        while let Some((token, _)) = self.tokens.peek() {
            let op = match token {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Ampersand => BinOp::BitAnd,
                Token::Pipe => BinOp::BitOr,
                Token::Caret => BinOp::BitXor,
                _ => break,
            };
            self.tokens.next();
            let rhs = self.parse_bool_logic()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_factor(&mut self) -> Result<Spanned<Expr>> {
        let Some((token, span)) = self.tokens.peek().cloned() else {
            return Err(self.unexpected_end("an expression"));
        };

        match token {
            Token::LParen => {
                self.tokens.next();
                let (inner, _) = self.parse_expr()?;
                let end = self.expect(Token::RParen, "')' to close '('")?;
                Ok((inner, span.start..end.end))
            }
            Token::Int(value) => {
                self.tokens.next();
                Ok((
                    Expr::Number {
                        value: value as f64,
                        is_float: false,
                    },
                    span,
                ))
            }
            Token::Float(value) => {
                self.tokens.next();
                Ok((
                    Expr::Number {
                        value,
                        is_float: true,
                    },
                    span,
                ))
            }
            Token::Str(s) => {
                self.tokens.next();
                Ok((Expr::Str(s), span))
            }
            Token::True => {
                self.tokens.next();
                Ok((Expr::Bool(true), span))
            }
            Token::False => {
                self.tokens.next();
                Ok((Expr::Bool(false), span))
            }
            Token::Plus | Token::Minus => {
                if let Some(folded) = self.fold_signed_literal(&token, &span) {
                    return Ok(folded);
                }
                let op = if token == Token::Plus {
                    UnOp::Plus
                } else {
                    UnOp::Minus
                };
                self.prefix_unary(op, span)
            }
            Token::Bang => self.prefix_unary(UnOp::Not, span),
            Token::Increment => self.prefix_unary(UnOp::Increment, span),
            Token::Decrement => self.prefix_unary(UnOp::Decrement, span),
            Token::Ident(name) => {
                self.tokens.next();
                self.parse_postfix((Expr::Ident(name), span))
            }
            other => Err(CompileError::syntax(
                format!("unexpected token in expression: {:?}", other),
                span,
            )),
        }
    }

    /// A leading sign directly adjacent to a numeric literal folds into the
    /// literal's value instead of producing a unary node.
    fn fold_signed_literal(
        &mut self,
        sign: &Token,
        sign_span: &Range<usize>,
    ) -> Option<Spanned<Expr>> {
        let (next, next_span) = self.tokens.peek_second()?;
        if sign_span.end != next_span.start {
            return None;
        }
        let negative = *sign == Token::Minus;
        let (value, is_float) = match next {
            Token::Int(v) => (*v as f64, false),
            Token::Float(v) => (*v, true),
            _ => return None,
        };
        let span = sign_span.start..next_span.end;
        self.tokens.next();
        self.tokens.next();
        Some((
            Expr::Number {
                value: if negative { -value } else { value },
                is_float,
            },
            span,
        ))
    }

    fn prefix_unary(&mut self, op: UnOp, start: Range<usize>) -> Result<Spanned<Expr>> {
        self.tokens.next();
        let operand = self.parse_factor()?;
        let span = start.start..operand.1.end;
        Ok((
            Expr::Unary {
                op,
                fixity: Fixity::Prefix,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_postfix(&mut self, mut expr: Spanned<Expr>) -> Result<Spanned<Expr>> {
        loop {
            let Some((token, span)) = self.tokens.peek().cloned() else {
                break;
            };
            match token {
                Token::LParen if matches!(expr.0, Expr::Ident(_)) => {
                    self.tokens.next();
                    let (args, end) = self.parse_call_args()?;
                    let Expr::Ident(callee) = expr.0 else {
                        unreachable!()
                    };
                    expr = (Expr::Call { callee, args }, expr.1.start..end.end);
                }
                Token::Dot => {
                    self.tokens.next();
                    let (name, name_span) = self.expect_ident("a member name after '.'")?;
                    if self.eat(&Token::LParen) {
                        let (args, end) = self.parse_call_args()?;
                        let span = expr.1.start..end.end;
                        expr = (
                            Expr::Method {
                                receiver: Box::new(expr),
                                name,
                                args,
                            },
                            span,
                        );
                    } else {
                        let span = expr.1.start..name_span.end;
                        expr = (
                            Expr::Field {
                                receiver: Box::new(expr),
                                name,
                            },
                            span,
                        );
                    }
                }
                Token::Increment | Token::Decrement => {
                    self.tokens.next();
                    let op = if token == Token::Increment {
                        UnOp::Increment
                    } else {
                        UnOp::Decrement
                    };
                    let full = expr.1.start..span.end;
                    expr = (
                        Expr::Unary {
                            op,
                            fixity: Fixity::Postfix,
                            operand: Box::new(expr),
                        },
                        full,
                    );
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Arguments after a consumed '('. Empty lists are fine; a trailing
    /// comma is not.
    fn parse_call_args(&mut self) -> Result<(Vec<Spanned<Expr>>, Range<usize>)> {
        let mut args = Vec::new();

        if let Some((Token::RParen, _)) = self.tokens.peek() {
            let (_, end) = self.tokens.next().expect("peeked");
            return Ok((args, end));
        }

        loop {
            args.push(self.parse_expr()?);
            match self.tokens.next() {
                Some((Token::Comma, _)) => continue,
                Some((Token::RParen, span)) => return Ok((args, span)),
                Some((token, span)) => {
                    return Err(CompileError::syntax(
                        format!("expected ',' or ')' in argument list, found {:?}", token),
                        span,
                    ));
                }
                None => return Err(self.unexpected_end("')' to close argument list")),
            }
        }
    }
}

fn binary(op: BinOp, lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    let span = lhs.1.start..rhs.1.end;
    (
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        span,
    )
}
