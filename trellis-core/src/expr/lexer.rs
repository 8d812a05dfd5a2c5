use crate::error::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

// Longest first so `===` wins over `==` and `=`.
const PUNCTS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=",
    "/=", "+", "-", "*", "/", "%", "<", ">", "!", "=", "?", ":", ".", ",", ";", "(", ")", "[",
    "]", "{", "}",
];

pub fn tokenize(src: &str) -> Result<Vec<Spanned>, EvalError> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let start = i;

        if c.is_ascii_digit() || (c == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
            let n = read_number(src, &mut i)?;
            out.push(Spanned {
                token: Token::Number(n),
                pos: start,
            });
            continue;
        }

        if c == b'"' || c == b'\'' {
            let s = read_string(src, &mut i)?;
            out.push(Spanned {
                token: Token::Str(s),
                pos: start,
            });
            continue;
        }

        if is_ident_start(c) {
            while i < bytes.len() && is_ident_continue(bytes[i]) {
                i += 1;
            }
            out.push(Spanned {
                token: Token::Ident(src[start..i].to_string()),
                pos: start,
            });
            continue;
        }

        let rest = &src[i..];
        let punct = PUNCTS.iter().copied().find(|p| {
            // `a?.5:1` is a conditional, not optional chaining
            rest.starts_with(p)
                && !(*p == "?." && rest.as_bytes().get(2).is_some_and(u8::is_ascii_digit))
        });
        match punct {
            Some(p) => {
                i += p.len();
                out.push(Spanned {
                    token: Token::Punct(p),
                    pos: start,
                });
            }
            None => {
                let ch = rest.chars().next().unwrap_or('?');
                return Err(EvalError::syntax(format!("unexpected character '{ch}'"), start));
            }
        }
    }

    out.push(Spanned {
        token: Token::Eof,
        pos: src.len(),
    });
    Ok(out)
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'$'
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$'
}

fn read_number(src: &str, i: &mut usize) -> Result<f64, EvalError> {
    let bytes = src.as_bytes();
    let start = *i;
    while *i < bytes.len() && bytes[*i].is_ascii_digit() {
        *i += 1;
    }
    if *i < bytes.len() && bytes[*i] == b'.' {
        *i += 1;
        while *i < bytes.len() && bytes[*i].is_ascii_digit() {
            *i += 1;
        }
    }
    if *i < bytes.len() && (bytes[*i] == b'e' || bytes[*i] == b'E') {
        let mark = *i;
        *i += 1;
        if *i < bytes.len() && (bytes[*i] == b'+' || bytes[*i] == b'-') {
            *i += 1;
        }
        if *i < bytes.len() && bytes[*i].is_ascii_digit() {
            while *i < bytes.len() && bytes[*i].is_ascii_digit() {
                *i += 1;
            }
        } else {
            *i = mark;
        }
    }
    src[start..*i]
        .parse::<f64>()
        .map_err(|_| EvalError::syntax(format!("invalid number '{}'", &src[start..*i]), start))
}

fn read_string(src: &str, i: &mut usize) -> Result<String, EvalError> {
    let start = *i;
    let mut chars = src[start..].char_indices();
    let quote = match chars.next() {
        Some((_, q)) => q,
        None => return Err(EvalError::syntax("unterminated string", start)),
    };
    let mut out = String::new();
    while let Some((off, ch)) = chars.next() {
        if ch == quote {
            *i = start + off + ch.len_utf8();
            return Ok(out);
        }
        if ch == '\\' {
            match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, '0')) => out.push('\0'),
                Some((_, other)) => out.push(other),
                None => break,
            }
        } else {
            out.push(ch);
        }
    }
    Err(EvalError::syntax("unterminated string", start))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        tokenize(src).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn splits_operators_longest_first() {
        assert_eq!(
            kinds("a===b"),
            vec![
                Token::Ident("a".into()),
                Token::Punct("==="),
                Token::Ident("b".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn reads_strings_with_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "x\ny""#),
            vec![
                Token::Str("it's".into()),
                Token::Str("x\ny".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn optional_chain_is_not_a_ternary_with_decimal() {
        assert_eq!(
            kinds("a?.5:1"),
            vec![
                Token::Ident("a".into()),
                Token::Punct("?"),
                Token::Number(0.5),
                Token::Punct(":"),
                Token::Number(1.0),
                Token::Eof
            ]
        );
    }

    #[test]
    fn rejects_unknown_characters() {
        assert!(matches!(tokenize("a # b"), Err(EvalError::Syntax { position: 2, .. })));
    }
}
