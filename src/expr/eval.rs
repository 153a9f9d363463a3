use std::cmp::Ordering;

use super::{BinOp, CmpOp, Expr, ExprError, MAX_STRING_LEN, UnaryOp};
use crate::types::{DataType, Record, Value};

pub(crate) fn eval(expr: &Expr, ctx: &Record) -> Result<Value, ExprError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Name(name) => ctx
            .get(name)
            .cloned()
            .ok_or_else(|| ExprError::UnknownName(name.clone())),
        Expr::List(items) => Ok(Value::List(
            items
                .iter()
                .map(|e| eval(e, ctx))
                .collect::<Result<_, _>>()?,
        )),
        Expr::Attr(target, name) => match eval(target, ctx)? {
            Value::Map(record) => Ok(record.get(name).cloned().unwrap_or(Value::Null)),
            other => Err(ExprError::type_error(format!(
                "'{}' has no attribute '{name}'",
                type_label(&other)
            ))),
        },
        Expr::Index(target, index) => index_value(eval(target, ctx)?, eval(index, ctx)?),
        Expr::Call { function, args } => {
            let args = args
                .iter()
                .map(|e| eval(e, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            call_function(function, args)
        }
        Expr::Method { target, name, args } => {
            let target = eval(target, ctx)?;
            let args = args
                .iter()
                .map(|e| eval(e, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            call_method(target, name, args)
        }
        Expr::Unary(op, inner) => {
            let v = eval(inner, ctx)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!v.truthy())),
                UnaryOp::Pos => match v {
                    Value::Int64(_) | Value::Float64(_) => Ok(v),
                    Value::Bool(b) => Ok(Value::Int64(i64::from(b))),
                    other => Err(bad_operand("unary +", &other)),
                },
                UnaryOp::Neg => match v {
                    Value::Int64(n) => n
                        .checked_neg()
                        .map(Value::Int64)
                        .ok_or_else(|| ExprError::type_error("integer overflow")),
                    Value::Float64(f) => Ok(Value::Float64(-f)),
                    Value::Bool(b) => Ok(Value::Int64(-i64::from(b))),
                    other => Err(bad_operand("unary -", &other)),
                },
            }
        }
        Expr::Binary(op, left, right) => binary(*op, eval(left, ctx)?, eval(right, ctx)?),
        Expr::Compare(first, chain) => {
            let mut left = eval(first, ctx)?;
            for (op, right) in chain {
                let right = eval(right, ctx)?;
                if !compare(*op, &left, &right)? {
                    return Ok(Value::Bool(false));
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }
        Expr::And(left, right) => {
            let l = eval(left, ctx)?;
            if l.truthy() { eval(right, ctx) } else { Ok(l) }
        }
        Expr::Or(left, right) => {
            let l = eval(left, ctx)?;
            if l.truthy() { Ok(l) } else { eval(right, ctx) }
        }
        Expr::Ternary {
            condition,
            then,
            otherwise,
        } => {
            if eval(condition, ctx)?.truthy() {
                eval(then, ctx)
            } else {
                eval(otherwise, ctx)
            }
        }
    }
}

fn type_label(v: &Value) -> &'static str {
    v.data_type().map_or("null", |t| t.as_str())
}

fn bad_operand(op: &str, v: &Value) -> ExprError {
    ExprError::type_error(format!("bad operand type for {op}: '{}'", type_label(v)))
}

fn unsupported(op: &str, l: &Value, r: &Value) -> ExprError {
    ExprError::type_error(format!(
        "unsupported operand types for {op}: '{}' and '{}'",
        type_label(l),
        type_label(r)
    ))
}

enum Num {
    Int(i64),
    Float(f64),
}

fn as_num(v: &Value) -> Option<Num> {
    match v {
        Value::Int64(n) => Some(Num::Int(*n)),
        Value::Bool(b) => Some(Num::Int(i64::from(*b))),
        Value::Float64(f) => Some(Num::Float(*f)),
        _ => None,
    }
}

fn num_to_f64(n: &Num) -> f64 {
    match n {
        Num::Int(i) => *i as f64,
        Num::Float(f) => *f,
    }
}

fn overflow() -> ExprError {
    ExprError::type_error("integer overflow")
}

/// Fails when a string of `length` bytes (`None` when the size overflows) would exceed the limit.
fn check_len(length: Option<usize>) -> Result<(), ExprError> {
    match length {
        Some(length) if length <= MAX_STRING_LEN => Ok(()),
        length => Err(ExprError::TooLarge {
            length: length.unwrap_or(usize::MAX),
            limit: MAX_STRING_LEN,
        }),
    }
}

fn binary(op: BinOp, l: Value, r: Value) -> Result<Value, ExprError> {
    let symbol = match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::FloorDiv => "//",
        BinOp::Mod => "%",
        BinOp::Pow => "**",
    };

    match (op, &l, &r) {
        (BinOp::Add, Value::Utf8(a), Value::Utf8(b)) => {
            check_len(a.len().checked_add(b.len()))?;
            return Ok(Value::Utf8(format!("{a}{b}")));
        }
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            return Ok(Value::List(a.iter().chain(b.iter()).cloned().collect()));
        }
        (BinOp::Mul, Value::Utf8(s), Value::Int64(n)) | (BinOp::Mul, Value::Int64(n), Value::Utf8(s)) => {
            let times = usize::try_from(*n).unwrap_or(0);
            check_len(s.len().checked_mul(times))?;
            return Ok(Value::Utf8(s.repeat(times)));
        }
        _ => {}
    }

    let (Some(a), Some(b)) = (as_num(&l), as_num(&r)) else {
        return Err(unsupported(symbol, &l, &r));
    };

    if let (Num::Int(x), Num::Int(y)) = (&a, &b) {
        let (x, y) = (*x, *y);
        return match op {
            BinOp::Add => x.checked_add(y).map(Value::Int64).ok_or_else(overflow),
            BinOp::Sub => x.checked_sub(y).map(Value::Int64).ok_or_else(overflow),
            BinOp::Mul => x.checked_mul(y).map(Value::Int64).ok_or_else(overflow),
            BinOp::Div => {
                if y == 0 {
                    Err(ExprError::DivisionByZero)
                } else {
                    Ok(Value::Float64(x as f64 / y as f64))
                }
            }
            BinOp::FloorDiv => {
                if y == 0 {
                    return Err(ExprError::DivisionByZero);
                }
                let q = x.checked_div(y).ok_or_else(overflow)?;
                Ok(Value::Int64(if x % y != 0 && ((x < 0) != (y < 0)) { q - 1 } else { q }))
            }
            BinOp::Mod => {
                if y == 0 {
                    return Err(ExprError::DivisionByZero);
                }
                let m = x.checked_rem(y).ok_or_else(overflow)?;
                Ok(Value::Int64(if m != 0 && ((m < 0) != (y < 0)) { m + y } else { m }))
            }
            BinOp::Pow => {
                if y >= 0 {
                    u32::try_from(y)
                        .ok()
                        .and_then(|e| x.checked_pow(e))
                        .map(Value::Int64)
                        .ok_or_else(overflow)
                } else if x == 0 {
                    Err(ExprError::DivisionByZero)
                } else {
                    Ok(Value::Float64((x as f64).powf(y as f64)))
                }
            }
        };
    }

    let (x, y) = (num_to_f64(&a), num_to_f64(&b));
    let out = match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div | BinOp::FloorDiv | BinOp::Mod if y == 0.0 => {
            return Err(ExprError::DivisionByZero);
        }
        BinOp::Div => x / y,
        BinOp::FloorDiv => (x / y).floor(),
        BinOp::Mod => x - y * (x / y).floor(),
        BinOp::Pow => x.powf(y),
    };
    Ok(Value::Float64(out))
}

fn compare(op: CmpOp, l: &Value, r: &Value) -> Result<bool, ExprError> {
    let ordered = |want: fn(Ordering) -> bool, symbol: &str| {
        l.partial_compare(r).map(want).ok_or_else(|| {
            ExprError::type_error(format!(
                "'{symbol}' not supported between '{}' and '{}'",
                type_label(l),
                type_label(r)
            ))
        })
    };
    match op {
        CmpOp::Eq => Ok(l == r),
        CmpOp::Ne => Ok(l != r),
        CmpOp::Lt => ordered(|o| o == Ordering::Less, "<"),
        CmpOp::Le => ordered(|o| o != Ordering::Greater, "<="),
        CmpOp::Gt => ordered(|o| o == Ordering::Greater, ">"),
        CmpOp::Ge => ordered(|o| o != Ordering::Less, ">="),
        CmpOp::In => contains(r, l),
        CmpOp::NotIn => contains(r, l).map(|b| !b),
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool, ExprError> {
    match (container, item) {
        (Value::List(items), _) => Ok(items.iter().any(|v| v == item)),
        (Value::Utf8(s), Value::Utf8(needle)) => Ok(s.contains(needle.as_str())),
        (Value::Map(record), Value::Utf8(key)) => Ok(record.contains_key(key)),
        _ => Err(ExprError::type_error(format!(
            "argument of type '{}' is not a container for '{}'",
            type_label(container),
            type_label(item)
        ))),
    }
}

fn index_value(target: Value, index: Value) -> Result<Value, ExprError> {
    match (&target, &index) {
        (Value::List(items), Value::Int64(i)) => {
            let len = items.len() as i64;
            let pos = if *i < 0 { len + i } else { *i };
            usize::try_from(pos)
                .ok()
                .and_then(|p| items.get(p))
                .cloned()
                .ok_or_else(|| ExprError::type_error("list index out of range"))
        }
        (Value::Utf8(s), Value::Int64(i)) => {
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len() as i64;
            let pos = if *i < 0 { len + i } else { *i };
            usize::try_from(pos)
                .ok()
                .and_then(|p| chars.get(p))
                .map(|c| Value::Utf8(c.to_string()))
                .ok_or_else(|| ExprError::type_error("string index out of range"))
        }
        (Value::Map(record), Value::Utf8(key)) => record
            .get(key)
            .cloned()
            .ok_or_else(|| ExprError::type_error(format!("key '{key}' not found"))),
        _ => Err(unsupported("[]", &target, &index)),
    }
}

fn arity(function: &str, args: &[Value], min: usize, max: usize) -> Result<(), ExprError> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("takes {min} argument(s)")
        } else {
            format!("takes {min} to {max} arguments")
        };
        return Err(ExprError::BadArguments {
            function: function.to_string(),
            message: format!("{expected}, got {}", args.len()),
        });
    }
    Ok(())
}

fn bad_argument(function: &str, v: &Value) -> ExprError {
    ExprError::BadArguments {
        function: function.to_string(),
        message: format!("cannot handle a '{}' argument", type_label(v)),
    }
}

fn round_half_even(x: f64) -> f64 {
    let r = x.round();
    if (x - x.trunc()).abs() == 0.5 {
        2.0 * (x / 2.0).round()
    } else {
        r
    }
}

fn call_function(function: &str, mut args: Vec<Value>) -> Result<Value, ExprError> {
    match function {
        "len" => {
            arity(function, &args, 1, 1)?;
            match &args[0] {
                Value::Utf8(s) => Ok(Value::from(s.chars().count())),
                Value::List(items) => Ok(Value::from(items.len())),
                Value::Map(r) => Ok(Value::from(r.len())),
                other => Err(bad_argument(function, other)),
            }
        }
        "str" => {
            arity(function, &args, 1, 1)?;
            Ok(Value::Utf8(args[0].to_string()))
        }
        "int" | "float" => {
            arity(function, &args, 1, 1)?;
            let target = if function == "int" {
                DataType::Int64
            } else {
                DataType::Float64
            };
            match &args[0] {
                Value::Null | Value::List(_) | Value::Map(_) => Err(bad_argument(function, &args[0])),
                v => v.coerce_to(target).ok_or_else(|| ExprError::BadArguments {
                    function: function.to_string(),
                    message: format!("invalid literal '{v}'"),
                }),
            }
        }
        "bool" => {
            arity(function, &args, 1, 1)?;
            Ok(Value::Bool(args[0].truthy()))
        }
        "abs" => {
            arity(function, &args, 1, 1)?;
            match &args[0] {
                Value::Int64(n) => n.checked_abs().map(Value::Int64).ok_or_else(overflow),
                Value::Float64(f) => Ok(Value::Float64(f.abs())),
                other => Err(bad_argument(function, other)),
            }
        }
        "min" | "max" => {
            if args.is_empty() {
                return Err(ExprError::BadArguments {
                    function: function.to_string(),
                    message: "expected at least 1 argument".to_string(),
                });
            }
            let items = if args.len() == 1 && matches!(args[0], Value::List(_)) {
                match args.pop() {
                    Some(Value::List(items)) => items,
                    _ => Vec::new(),
                }
            } else {
                args
            };
            let want = if function == "min" {
                Ordering::Less
            } else {
                Ordering::Greater
            };
            let mut best: Option<Value> = None;
            for item in items {
                best = match best {
                    None => Some(item),
                    Some(current) => match item.partial_compare(&current) {
                        Some(o) if o == want => Some(item),
                        Some(_) => Some(current),
                        None => return Err(unsupported(function, &item, &current)),
                    },
                };
            }
            best.ok_or_else(|| ExprError::BadArguments {
                function: function.to_string(),
                message: "arg is an empty sequence".to_string(),
            })
        }
        "round" => {
            arity(function, &args, 1, 2)?;
            let x = args[0].as_f64().ok_or_else(|| bad_argument(function, &args[0]))?;
            match args.get(1) {
                None | Some(Value::Null) => {
                    if let Value::Int64(n) = args[0] {
                        return Ok(Value::Int64(n));
                    }
                    Ok(Value::Int64(round_half_even(x) as i64))
                }
                Some(Value::Int64(digits)) => {
                    let scale = 10f64.powi(i32::try_from(*digits).unwrap_or(0));
                    Ok(Value::Float64(round_half_even(x * scale) / scale))
                }
                Some(other) => Err(bad_argument(function, other)),
            }
        }
        "lower" | "upper" => {
            arity(function, &args, 1, 1)?;
            let s = args[0].to_string();
            Ok(Value::Utf8(if function == "lower" {
                s.to_lowercase()
            } else {
                s.to_uppercase()
            }))
        }
        other => Err(ExprError::UnknownFunction(other.to_string())),
    }
}

fn call_method(target: Value, name: &str, args: Vec<Value>) -> Result<Value, ExprError> {
    match (&target, name) {
        (Value::Utf8(s), "lower") => {
            arity(name, &args, 0, 0)?;
            Ok(Value::Utf8(s.to_lowercase()))
        }
        (Value::Utf8(s), "upper") => {
            arity(name, &args, 0, 0)?;
            Ok(Value::Utf8(s.to_uppercase()))
        }
        (Value::Utf8(s), "strip") => {
            arity(name, &args, 0, 0)?;
            Ok(Value::Utf8(s.trim().to_string()))
        }
        (Value::Utf8(s), "startswith" | "endswith") => {
            arity(name, &args, 1, 1)?;
            let needle = args[0]
                .as_str()
                .ok_or_else(|| bad_argument(name, &args[0]))?;
            Ok(Value::Bool(if name == "startswith" {
                s.starts_with(needle)
            } else {
                s.ends_with(needle)
            }))
        }
        (Value::Utf8(s), "replace") => {
            arity(name, &args, 2, 2)?;
            let (from, to) = (args[0].to_string(), args[1].to_string());
            let hits = if from.is_empty() {
                s.chars().count() + 1
            } else {
                s.matches(from.as_str()).count()
            };
            check_len(
                hits.checked_mul(to.len())
                    .and_then(|added| added.checked_add(s.len())),
            )?;
            Ok(Value::Utf8(s.replace(&from, &to)))
        }
        (Value::Map(record), "get") => {
            arity(name, &args, 1, 2)?;
            let key = args[0].to_string();
            Ok(record
                .get(&key)
                .cloned()
                .or_else(|| args.get(1).cloned())
                .unwrap_or(Value::Null))
        }
        _ => Err(ExprError::type_error(format!(
            "'{}' has no method '{name}'",
            type_label(&target)
        ))),
    }
}
