use super::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
    Eof,
}

#[derive(Debug, Clone)]
pub(crate) struct Spanned {
    pub token: Token,
    pub pos: usize,
}

// Longest operators first so `**` wins over `*`.
const OPERATORS: &[&str] = &[
    "**", "//", "==", "!=", "<=", ">=", "+", "-", "*", "/", "%", "<", ">", "(", ")", "[", "]",
    ",", ".",
];

pub(crate) fn tokenize(src: &str) -> Result<Vec<Spanned>, ExprError> {
    let chars: Vec<char> = src.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let start = i;
        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) {
            let mut is_float = false;
            while i < chars.len() {
                let d = chars[i];
                if d.is_ascii_digit() || d == '_' {
                    i += 1;
                } else if d == '.' && !is_float {
                    is_float = true;
                    i += 1;
                } else if (d == 'e' || d == 'E')
                    && chars
                        .get(i + 1)
                        .is_some_and(|n| n.is_ascii_digit() || *n == '-' || *n == '+')
                {
                    is_float = true;
                    i += 2;
                } else {
                    break;
                }
            }
            let text: String = chars[start..i].iter().filter(|c| **c != '_').collect();
            let token = if is_float {
                Token::Float(text.parse().map_err(|_| ExprError::syntax(start, "bad number"))?)
            } else {
                match text.parse::<i64>() {
                    Ok(n) => Token::Int(n),
                    Err(_) => Token::Float(
                        text.parse()
                            .map_err(|_| ExprError::syntax(start, "bad number"))?,
                    ),
                }
            };
            out.push(Spanned { token, pos: start });
            continue;
        }

        if c == '"' || c == '\'' {
            let quote = c;
            i += 1;
            let mut s = String::new();
            loop {
                let Some(&d) = chars.get(i) else {
                    return Err(ExprError::syntax(start, "unterminated string"));
                };
                i += 1;
                if d == quote {
                    break;
                }
                if d == '\\' {
                    let Some(&e) = chars.get(i) else {
                        return Err(ExprError::syntax(start, "unterminated string"));
                    };
                    i += 1;
                    s.push(match e {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                } else {
                    s.push(d);
                }
            }
            out.push(Spanned {
                token: Token::Str(s),
                pos: start,
            });
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            out.push(Spanned {
                token: Token::Ident(chars[start..i].iter().collect()),
                pos: start,
            });
            continue;
        }

        let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
        match OPERATORS.iter().copied().find(|op| rest.starts_with(op)) {
            Some(op) => {
                i += op.len();
                out.push(Spanned {
                    token: Token::Op(op),
                    pos: start,
                });
            }
            None => return Err(ExprError::syntax(start, format!("unexpected character '{c}'"))),
        }
    }

    out.push(Spanned {
        token: Token::Eof,
        pos: chars.len(),
    });
    Ok(out)
}
