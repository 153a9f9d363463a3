//! A small, whitelisted expression language.
//!
//! Used wherever a transformation accepts user-written logic: conditional and calculated value
//! mappings, loop conditions and condition-based splitting. The grammar is Python-flavored:
//!
//! - literals: `1`, `2.5`, `'text'`, `"text"`, `True`/`False`/`None` (also `true`/`false`/`null`),
//!   `[1, 2]`
//! - names resolve against a [`Record`] context; `a.b` reads nested fields; `x[0]` indexes
//! - `+ - * / // % **`, `== != < <= > >=` (chainable), `in`, `not in`, `and`, `or`, `not`
//! - ternary `a if cond else b`
//! - functions `len str int float bool abs min max round lower upper`
//! - string methods `.lower() .upper() .strip() .startswith(s) .endswith(s) .replace(a, b)`,
//!   map method `.get(key[, default])`
//!
//! Nothing outside this list is reachable: there is no attribute introspection, no imports and
//! no assignment, so evaluating an untrusted expression can only read the supplied context.
//!
//! ```rust
//! use rust_record_transforms::expr::Expression;
//! use rust_record_transforms::types::{Record, Value};
//!
//! let expr = Expression::parse("price * qty if qty > 0 else 0").unwrap();
//! let ctx = Record::from([("price", 2.5), ("qty", 4.0)]);
//! assert_eq!(expr.evaluate(&ctx).unwrap(), Value::Float64(10.0));
//! ```

mod eval;
mod lexer;
mod parser;

use thiserror::Error;

use crate::types::{Record, Value};

/// Longest string, in bytes, an expression may build by repetition, concatenation or replacement.
pub const MAX_STRING_LEN: usize = 1 << 20;

/// Parse or evaluation failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("syntax error at {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("name '{0}' is not defined")]
    UnknownName(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("{function}() {message}")]
    BadArguments { function: String, message: String },

    #[error("type error: {0}")]
    Type(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("string of {length} bytes exceeds the {limit} byte limit")]
    TooLarge { length: usize, limit: usize },
}

impl ExprError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    Name(String),
    List(Vec<Expr>),
    Attr(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call {
        function: String,
        args: Vec<Expr>,
    },
    Method {
        target: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, Vec<(CmpOp, Expr)>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Ternary {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

/// A parsed expression, reusable across many evaluations.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let tokens = lexer::tokenize(source)?;
        let ast = parser::Parser::new(tokens).parse()?;
        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates against `context`; field names become variables.
    pub fn evaluate(&self, context: &Record) -> Result<Value, ExprError> {
        eval::eval(&self.ast, context)
    }

    /// Evaluates and applies truthiness to the result.
    pub fn evaluate_bool(&self, context: &Record) -> Result<bool, ExprError> {
        self.evaluate(context).map(|v| v.truthy())
    }
}

impl std::str::FromStr for Expression {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::{ExprError, Expression, MAX_STRING_LEN};
    use crate::types::{Record, Value};

    fn eval(src: &str, ctx: &Record) -> Result<Value, ExprError> {
        Expression::parse(src)?.evaluate(ctx)
    }

    fn ctx() -> Record {
        let mut r = Record::from([("value", Value::from(15)), ("name", Value::from("Ada"))]);
        r.insert(
            "user",
            Value::from(serde_json::json!({"age": 36, "tags": ["x", "y"]})),
        );
        r
    }

    #[test]
    fn arithmetic_follows_python_rules() {
        let c = Record::new();
        assert_eq!(eval("1 + 2 * 3", &c).unwrap(), Value::Int64(7));
        assert_eq!(eval("7 / 2", &c).unwrap(), Value::Float64(3.5));
        assert_eq!(eval("-7 // 2", &c).unwrap(), Value::Int64(-4));
        assert_eq!(eval("-7 % 3", &c).unwrap(), Value::Int64(2));
        assert_eq!(eval("-2 ** 2", &c).unwrap(), Value::Int64(-4));
        assert_eq!(eval("2 ** -1", &c).unwrap(), Value::Float64(0.5));
        assert_eq!(eval("'ab' + 'cd'", &c).unwrap(), Value::from("abcd"));
        assert_eq!(eval("1 / 0", &c), Err(ExprError::DivisionByZero));
    }

    #[test]
    fn string_growth_is_bounded() {
        let c = Record::from([("code", "ab")]);
        assert_eq!(eval("code * 3", &c).unwrap(), Value::from("ababab"));
        assert_eq!(eval("2 * code", &c).unwrap(), Value::from("abab"));
        assert_eq!(eval("code * -1", &c).unwrap(), Value::from(""));
        assert_eq!(
            eval("code * 100000000000000000", &c),
            Err(ExprError::TooLarge {
                length: 200_000_000_000_000_000,
                limit: MAX_STRING_LEN,
            })
        );
        assert!(matches!(
            eval("(code * 500000) + (code * 500000)", &c),
            Err(ExprError::TooLarge { length: 2_000_000, .. })
        ));
        assert!(matches!(
            eval("(code * 1000).replace('a', code * 1000)", &c),
            Err(ExprError::TooLarge { .. })
        ));
    }

    #[test]
    fn comparisons_membership_and_logic() {
        let c = ctx();
        assert_eq!(eval("value > 10 and value < 20", &c).unwrap(), Value::Bool(true));
        assert_eq!(eval("10 < value < 12", &c).unwrap(), Value::Bool(false));
        assert_eq!(eval("'x' in user.tags", &c).unwrap(), Value::Bool(true));
        assert_eq!(eval("'z' not in user.tags", &c).unwrap(), Value::Bool(true));
        assert_eq!(eval("name or 'fallback'", &c).unwrap(), Value::from("Ada"));
        assert_eq!(eval("not value", &c).unwrap(), Value::Bool(false));
    }

    #[test]
    fn ternary_functions_and_methods() {
        let c = ctx();
        assert_eq!(
            eval("'adult' if user.age >= 18 else 'minor'", &c).unwrap(),
            Value::from("adult")
        );
        assert_eq!(eval("len(name) + len(user.tags)", &c).unwrap(), Value::Int64(5));
        assert_eq!(eval("name.upper()", &c).unwrap(), Value::from("ADA"));
        assert_eq!(eval("round(2.5)", &c).unwrap(), Value::Int64(2));
        assert_eq!(eval("round(3.14159, 2)", &c).unwrap(), Value::Float64(3.14));
        assert_eq!(eval("max([3, 9, 4])", &c).unwrap(), Value::Int64(9));
        assert_eq!(eval("user.get('missing', 0)", &c).unwrap(), Value::Int64(0));
        assert_eq!(eval("int('42') + float(1)", &c).unwrap(), Value::Float64(43.0));
    }

    #[test]
    fn unknown_names_and_functions_are_errors() {
        let c = ctx();
        assert_eq!(eval("nope + 1", &c), Err(ExprError::UnknownName("nope".into())));
        assert!(matches!(eval("__import__('os')", &c), Err(ExprError::UnknownFunction(_))));
        assert!(matches!(eval("name.__class__", &c), Err(ExprError::Type(_))));
        assert!(Expression::parse("value = 3").is_err());
        assert!(Expression::parse("value >").is_err());
    }
}
