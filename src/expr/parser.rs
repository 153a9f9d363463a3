//! Recursive-descent parser, one function per precedence level (lowest first):
//! ternary, `or`, `and`, `not`, comparisons, `+ -`, `* / // %`, unary sign, `**`, postfix.

use super::lexer::{Spanned, Token};
use super::{BinOp, CmpOp, Expr, ExprError, UnaryOp};
use crate::types::Value;

pub(crate) struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Spanned>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub(crate) fn parse(mut self) -> Result<Expr, ExprError> {
        let expr = self.ternary()?;
        match self.peek() {
            Token::Eof => Ok(expr),
            other => Err(self.error(format!("unexpected token {other:?}"))),
        }
    }

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map_or(&Token::Eof, |s| &s.token)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.pos + offset)
            .map_or(&Token::Eof, |s| &s.token)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> ExprError {
        let position = self.tokens.get(self.pos).map_or(0, |s| s.pos);
        ExprError::syntax(position, message)
    }

    fn is_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Token::Ident(w) if w == word)
    }

    fn is_op(&self, op: &str) -> bool {
        matches!(self.peek(), Token::Op(o) if *o == op)
    }

    fn expect_op(&mut self, op: &str) -> Result<(), ExprError> {
        if self.is_op(op) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected '{op}'")))
        }
    }

    fn ternary(&mut self) -> Result<Expr, ExprError> {
        let then = self.or()?;
        if !self.is_keyword("if") {
            return Ok(then);
        }
        self.advance();
        let condition = self.or()?;
        if !self.is_keyword("else") {
            return Err(self.error("expected 'else'"));
        }
        self.advance();
        let otherwise = self.ternary()?;
        Ok(Expr::Ternary {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.and()?;
        while self.is_keyword("or") {
            self.advance();
            let right = self.and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.not()?;
        while self.is_keyword("and") {
            self.advance();
            let right = self.not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not(&mut self) -> Result<Expr, ExprError> {
        if self.is_keyword("not") {
            self.advance();
            let inner = self.not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
        }
        self.comparison()
    }

    fn comparison_op(&mut self) -> Option<CmpOp> {
        let not_in = self.is_keyword("not") && matches!(self.peek_at(1), Token::Ident(n) if n == "in");
        if not_in {
            self.advance();
            self.advance();
            return Some(CmpOp::NotIn);
        }
        let op = match self.peek() {
            Token::Op("==") => CmpOp::Eq,
            Token::Op("!=") => CmpOp::Ne,
            Token::Op("<") => CmpOp::Lt,
            Token::Op("<=") => CmpOp::Le,
            Token::Op(">") => CmpOp::Gt,
            Token::Op(">=") => CmpOp::Ge,
            Token::Ident(w) if w == "in" => CmpOp::In,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        let left = self.additive()?;
        let mut chain = Vec::new();
        while let Some(op) = self.comparison_op() {
            chain.push((op, self.additive()?));
        }
        if chain.is_empty() {
            Ok(left)
        } else {
            Ok(Expr::Compare(Box::new(left), chain))
        }
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Op("+") => BinOp::Add,
                Token::Op("-") => BinOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Op("*") => BinOp::Mul,
                Token::Op("/") => BinOp::Div,
                Token::Op("//") => BinOp::FloorDiv,
                Token::Op("%") => BinOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        let op = match self.peek() {
            Token::Op("-") => UnaryOp::Neg,
            Token::Op("+") => UnaryOp::Pos,
            _ => return self.power(),
        };
        self.advance();
        let inner = self.unary()?;
        Ok(Expr::Unary(op, Box::new(inner)))
    }

    fn power(&mut self) -> Result<Expr, ExprError> {
        let base = self.postfix()?;
        if self.is_op("**") {
            self.advance();
            let exponent = self.unary()?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.primary()?;
        loop {
            if self.is_op("(") {
                self.advance();
                let args = self.sequence(")")?;
                expr = match expr {
                    Expr::Name(function) => Expr::Call { function, args },
                    Expr::Attr(target, name) => Expr::Method { target, name, args },
                    _ => return Err(self.error("only named functions can be called")),
                };
            } else if self.is_op(".") {
                self.advance();
                match self.advance() {
                    Token::Ident(name) => expr = Expr::Attr(Box::new(expr), name),
                    _ => return Err(self.error("expected attribute name after '.'")),
                }
            } else if self.is_op("[") {
                self.advance();
                let index = self.ternary()?;
                self.expect_op("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                return Ok(expr);
            }
        }
    }

    /// Comma-separated expressions up to `close` (consumed). Allows a trailing comma.
    fn sequence(&mut self, close: &str) -> Result<Vec<Expr>, ExprError> {
        let mut items = Vec::new();
        while !self.is_op(close) {
            items.push(self.ternary()?);
            if self.is_op(",") {
                self.advance();
            } else {
                break;
            }
        }
        self.expect_op(close)?;
        Ok(items)
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        match self.advance() {
            Token::Int(n) => Ok(Expr::Literal(Value::Int64(n))),
            Token::Float(f) => Ok(Expr::Literal(Value::Float64(f))),
            Token::Str(s) => Ok(Expr::Literal(Value::Utf8(s))),
            Token::Ident(word) => Ok(match word.as_str() {
                "True" | "true" => Expr::Literal(Value::Bool(true)),
                "False" | "false" => Expr::Literal(Value::Bool(false)),
                "None" | "null" => Expr::Literal(Value::Null),
                "and" | "or" | "not" | "in" | "if" | "else" | "lambda" | "import" => {
                    return Err(self.error(format!("unexpected keyword '{word}'")));
                }
                _ => Expr::Name(word),
            }),
            Token::Op("(") => {
                let inner = self.ternary()?;
                self.expect_op(")")?;
                Ok(inner)
            }
            Token::Op("[") => Ok(Expr::List(self.sequence("]")?)),
            Token::Eof => Err(self.error("unexpected end of expression")),
            other => Err(self.error(format!("unexpected token {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Parser;
    use crate::expr::lexer::tokenize;
    use crate::expr::{BinOp, CmpOp, Expr, UnaryOp};
    use crate::types::Value;

    fn parse(src: &str) -> Expr {
        Parser::new(tokenize(src).unwrap()).parse().unwrap()
    }

    #[test]
    fn power_binds_tighter_than_unary_minus() {
        assert_eq!(
            parse("-2 ** 2"),
            Expr::Unary(
                UnaryOp::Neg,
                Box::new(Expr::Binary(
                    BinOp::Pow,
                    Box::new(Expr::Literal(Value::Int64(2))),
                    Box::new(Expr::Literal(Value::Int64(2))),
                ))
            )
        );
    }

    #[test]
    fn not_in_is_a_single_comparison() {
        assert_eq!(
            parse("a not in b"),
            Expr::Compare(
                Box::new(Expr::Name("a".into())),
                vec![(CmpOp::NotIn, Expr::Name("b".into()))]
            )
        );
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        assert!(Parser::new(tokenize("a b").unwrap()).parse().is_err());
        assert!(Parser::new(tokenize("(a").unwrap()).parse().is_err());
        assert!(Parser::new(tokenize("1 if a").unwrap()).parse().is_err());
    }
}
