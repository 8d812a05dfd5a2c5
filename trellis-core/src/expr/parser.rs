use crate::error::EvalError;
use crate::expr::ast::{AssignOp, BinaryOp, Expr, LogicalOp, Program, Stmt, UnaryOp};
use crate::expr::lexer::{Spanned, Token, tokenize};
use crate::value::Value;

/// Parses a single value expression; a leading `return` is tolerated.
pub fn parse_expression(src: &str) -> Result<Program, EvalError> {
    let mut p = Parser::new(src)?;
    p.eat_keyword("return");
    let expr = p.expression()?;
    p.eat(";");
    p.expect_eof()?;
    Ok(Program {
        body: vec![Stmt::Return(Some(expr))],
    })
}

/// Parses `;`-separated statements, as used by event handlers.
pub fn parse_block(src: &str) -> Result<Program, EvalError> {
    let mut p = Parser::new(src)?;
    let mut body = Vec::new();
    loop {
        while p.eat(";") {}
        if p.at_eof() {
            break;
        }
        if p.eat_keyword("return") {
            if p.check(";") || p.at_eof() {
                body.push(Stmt::Return(None));
            } else {
                body.push(Stmt::Return(Some(p.expression()?)));
            }
        } else {
            body.push(Stmt::Expr(p.expression()?));
        }
        if !p.eat(";") && !p.at_eof() {
            return Err(p.error("expected ';' between statements"));
        }
    }
    Ok(Program { body })
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn new(src: &str) -> Result<Self, EvalError> {
        Ok(Self {
            tokens: tokenize(src)?,
            pos: 0,
        })
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].token
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].pos
    }

    fn advance(&mut self) -> Token {
        let t = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    fn check(&self, punct: &str) -> bool {
        matches!(self.peek(), Token::Punct(p) if *p == punct)
    }

    fn eat(&mut self, punct: &str) -> bool {
        if self.check(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if matches!(self.peek(), Token::Ident(name) if name == kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &str) -> Result<(), EvalError> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{punct}'")))
        }
    }

    fn expect_eof(&self) -> Result<(), EvalError> {
        if self.at_eof() {
            Ok(())
        } else {
            Err(self.error("unexpected trailing input"))
        }
    }

    fn error(&self, message: impl Into<String>) -> EvalError {
        let found = match self.peek() {
            Token::Number(n) => Value::Number(*n).to_display_string(),
            Token::Str(s) => format!("'{s}'"),
            Token::Ident(s) => s.clone(),
            Token::Punct(p) => (*p).to_string(),
            Token::Eof => "end of input".to_string(),
        };
        EvalError::syntax(format!("{}, found {found}", message.into()), self.offset())
    }

    fn expression(&mut self) -> Result<Expr, EvalError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, EvalError> {
        let start = self.offset();
        let left = self.conditional()?;
        let op = match self.peek() {
            Token::Punct("=") => AssignOp(None),
            Token::Punct("+=") => AssignOp(Some(BinaryOp::Add)),
            Token::Punct("-=") => AssignOp(Some(BinaryOp::Sub)),
            Token::Punct("*=") => AssignOp(Some(BinaryOp::Mul)),
            Token::Punct("/=") => AssignOp(Some(BinaryOp::Div)),
            _ => return Ok(left),
        };
        if !left.is_assignable() {
            return Err(EvalError::syntax("invalid assignment target", start));
        }
        self.advance();
        let value = self.assignment()?;
        Ok(Expr::Assign {
            op,
            target: Box::new(left),
            value: Box::new(value),
        })
    }

    fn conditional(&mut self) -> Result<Expr, EvalError> {
        let test = self.binary(0)?;
        if !self.eat("?") {
            return Ok(test);
        }
        let consequent = self.assignment()?;
        self.expect(":")?;
        let alternate = self.assignment()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn binary(&mut self, min_prec: u8) -> Result<Expr, EvalError> {
        let mut left = self.unary()?;
        loop {
            let Token::Punct(p) = *self.peek() else { break };
            let Some((prec, kind)) = infix(p) else { break };
            if prec < min_prec {
                break;
            }
            self.advance();
            let right = self.binary(prec + 1)?;
            left = match kind {
                Infix::Binary(op) => Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                Infix::Logical(op) => Expr::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        let op = match self.peek() {
            Token::Punct("!") => Some(UnaryOp::Not),
            Token::Punct("-") => Some(UnaryOp::Neg),
            Token::Punct("+") => Some(UnaryOp::Plus),
            Token::Ident(kw) if kw == "typeof" => Some(UnaryOp::TypeOf),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.unary()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        if self.check("++") || self.check("--") {
            let increment = self.check("++");
            let start = self.offset();
            self.advance();
            let target = self.unary()?;
            if !target.is_assignable() {
                return Err(EvalError::syntax("invalid update target", start));
            }
            return Ok(Expr::Update {
                increment,
                prefix: true,
                target: Box::new(target),
            });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, EvalError> {
        let start = self.offset();
        let expr = self.call_member()?;
        if self.check("++") || self.check("--") {
            if !expr.is_assignable() {
                return Err(EvalError::syntax("invalid update target", start));
            }
            let increment = self.check("++");
            self.advance();
            return Ok(Expr::Update {
                increment,
                prefix: false,
                target: Box::new(expr),
            });
        }
        Ok(expr)
    }

    fn call_member(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(".") {
                let property = self.property_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                    optional: false,
                };
            } else if self.eat("?.") {
                if self.eat("[") {
                    let index = self.expression()?;
                    self.expect("]")?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                        optional: true,
                    };
                } else {
                    let property = self.property_name()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                        optional: true,
                    };
                }
            } else if self.eat("[") {
                let index = self.expression()?;
                self.expect("]")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    optional: false,
                };
            } else if self.eat("(") {
                let args = self.list(")")?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn property_name(&mut self) -> Result<String, EvalError> {
        match self.peek() {
            Token::Ident(_) => match self.advance() {
                Token::Ident(name) => Ok(name),
                _ => Err(self.error("expected property name")),
            },
            _ => Err(self.error("expected property name")),
        }
    }

    /// Comma-separated expressions up to `close`, trailing comma allowed.
    fn list(&mut self, close: &str) -> Result<Vec<Expr>, EvalError> {
        let mut items = Vec::new();
        while !self.check(close) {
            items.push(self.expression()?);
            if !self.eat(",") {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        match self.peek().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Literal(Value::Number(n)))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Value::from(s)))
            }
            Token::Ident(name) => {
                self.advance();
                Ok(match name.as_str() {
                    "true" => Expr::Literal(Value::Bool(true)),
                    "false" => Expr::Literal(Value::Bool(false)),
                    "null" => Expr::Literal(Value::Null),
                    "undefined" => Expr::Literal(Value::Undefined),
                    "this" => Expr::This,
                    _ => Expr::Ident(name),
                })
            }
            Token::Punct("(") => {
                self.advance();
                let inner = self.expression()?;
                self.expect(")")?;
                Ok(inner)
            }
            Token::Punct("[") => {
                self.advance();
                Ok(Expr::Array(self.list("]")?))
            }
            Token::Punct("{") => {
                self.advance();
                self.object_literal()
            }
            _ => Err(self.error("expected an expression")),
        }
    }

    fn object_literal(&mut self) -> Result<Expr, EvalError> {
        let mut entries = Vec::new();
        while !self.check("}") {
            let key = match self.peek() {
                Token::Ident(name) | Token::Str(name) => name.clone(),
                Token::Number(n) => Value::Number(*n).to_display_string(),
                _ => return Err(self.error("expected object key")),
            };
            self.advance();
            let value = if self.eat(":") {
                self.expression()?
            } else {
                // shorthand `{ name }`
                Expr::Ident(key.clone())
            };
            entries.push((key, value));
            if !self.eat(",") {
                break;
            }
        }
        self.expect("}")?;
        Ok(Expr::Object(entries))
    }
}

enum Infix {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

fn infix(p: &str) -> Option<(u8, Infix)> {
    let entry = match p {
        "??" => (1, Infix::Logical(LogicalOp::Nullish)),
        "||" => (2, Infix::Logical(LogicalOp::Or)),
        "&&" => (3, Infix::Logical(LogicalOp::And)),
        "==" => (4, Infix::Binary(BinaryOp::Eq)),
        "!=" => (4, Infix::Binary(BinaryOp::NotEq)),
        "===" => (4, Infix::Binary(BinaryOp::StrictEq)),
        "!==" => (4, Infix::Binary(BinaryOp::StrictNotEq)),
        "<" => (5, Infix::Binary(BinaryOp::Lt)),
        "<=" => (5, Infix::Binary(BinaryOp::Le)),
        ">" => (5, Infix::Binary(BinaryOp::Gt)),
        ">=" => (5, Infix::Binary(BinaryOp::Ge)),
        "+" => (6, Infix::Binary(BinaryOp::Add)),
        "-" => (6, Infix::Binary(BinaryOp::Sub)),
        "*" => (7, Infix::Binary(BinaryOp::Mul)),
        "/" => (7, Infix::Binary(BinaryOp::Div)),
        "%" => (7, Infix::Binary(BinaryOp::Rem)),
        _ => return None,
    };
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(src: &str) -> Expr {
        match parse_expression(src).unwrap().body.remove(0) {
            Stmt::Return(Some(e)) => e,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let e = single("1 + 2 * 3");
        match e {
            Expr::Binary {
                op: BinaryOp::Add,
                right,
                ..
            } => assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. })),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn leading_return_is_accepted() {
        assert_eq!(single("return this.text"), single("this.text"));
    }

    #[test]
    fn assignment_is_right_associative() {
        let e = single("a = b = 1");
        match e {
            Expr::Assign { value, .. } => assert!(matches!(*value, Expr::Assign { .. })),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_assignment_to_call() {
        assert!(parse_expression("f() = 1").is_err());
        assert!(parse_expression("this = 1").is_err());
    }

    #[test]
    fn block_splits_statements() {
        let p = parse_block("count = count + 1; this.log(); return count").unwrap();
        assert_eq!(p.body.len(), 3);
        assert!(matches!(p.body[2], Stmt::Return(Some(_))));
    }

    #[test]
    fn block_requires_separators() {
        assert!(parse_block("a = 1 b = 2").is_err());
    }

    #[test]
    fn object_literal_with_shorthand() {
        let e = single("{ a: 1, 'b c': 2, d }");
        match e {
            Expr::Object(entries) => {
                let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, vec!["a", "b c", "d"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
