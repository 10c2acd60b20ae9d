// crates/filters/src/token.rs
//! Shell-like tokenizer for filter strings.
//!
//! Single quotes make everything literal, including glob metacharacters.
//! Double quotes protect whitespace and single quotes but leave wildcards
//! active. Outside quotes a backslash escapes whitespace, quotes, another
//! backslash or a glob metacharacter, and is kept literally before anything
//! else. Literal metacharacters are emitted as one-character classes so the
//! glob translator never has to deal with escapes.

use crate::ParseError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// Unquoted lone `+` (true) or `-` (false).
    Action(bool),
    Pattern(String),
}

fn is_glob_char(c: char) -> bool {
    matches!(c, '*' | '?' | '[')
}

fn literal_glob(token: &mut String, c: char) {
    token.push('[');
    token.push(c);
    token.push(']');
}

pub fn tokenize(s: &str) -> Result<Vec<Token>, ParseError> {
    if s.contains('\0') {
        return Err(ParseError::NulCharacter);
    }

    let mut tokens = Vec::new();
    let mut escape = false;
    let mut s_quotes = false;
    let mut d_quotes = false;
    let mut token = String::new();
    // Raw characters consumed by the current token, quotes included.
    let mut raw_len = 0usize;

    let mut finish = |token: &mut String, raw_len: &mut usize| {
        if !token.is_empty() {
            let lone = *raw_len == 1;
            match token.as_str() {
                "+" if lone => tokens.push(Token::Action(true)),
                "-" if lone => tokens.push(Token::Action(false)),
                _ => tokens.push(Token::Pattern(std::mem::take(token))),
            }
            token.clear();
        }
        *raw_len = 0;
    };

    for c in s.chars() {
        if c.is_whitespace() {
            if escape {
                if d_quotes {
                    token.push('\\');
                }
                token.push(c);
                escape = false;
            } else if s_quotes || d_quotes {
                token.push(c);
            } else {
                finish(&mut token, &mut raw_len);
                continue;
            }
            raw_len += 1;
            continue;
        }
        raw_len += 1;
        match c {
            '\\' => {
                if escape {
                    token.push('\\');
                    escape = false;
                } else if s_quotes {
                    token.push('\\');
                } else {
                    escape = true;
                }
            }
            c if is_glob_char(c) => {
                if escape {
                    if d_quotes {
                        token.push('\\');
                        token.push(c);
                    } else {
                        literal_glob(&mut token, c);
                    }
                    escape = false;
                } else if s_quotes {
                    literal_glob(&mut token, c);
                } else {
                    token.push(c);
                }
            }
            '\'' => {
                if escape {
                    if d_quotes {
                        token.push('\\');
                    }
                    token.push('\'');
                    escape = false;
                } else if s_quotes {
                    s_quotes = false;
                } else if d_quotes {
                    token.push('\'');
                } else {
                    s_quotes = true;
                }
            }
            '"' => {
                if escape {
                    token.push('"');
                    escape = false;
                } else if d_quotes {
                    d_quotes = false;
                } else if s_quotes {
                    token.push('"');
                } else {
                    d_quotes = true;
                }
            }
            c => {
                if escape {
                    token.push('\\');
                    escape = false;
                }
                token.push(c);
            }
        }
    }

    if escape {
        return Err(ParseError::UnterminatedEscape);
    }
    if s_quotes || d_quotes {
        return Err(ParseError::UnclosedQuote);
    }
    finish(&mut token, &mut raw_len);
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pats(s: &str) -> Vec<Token> {
        tokenize(s).unwrap()
    }

    fn p(s: &str) -> Token {
        Token::Pattern(s.to_string())
    }

    #[test]
    fn actions_only_when_unquoted() {
        assert_eq!(
            pats("+ a - b '-' \"+\""),
            vec![
                Token::Action(true),
                p("a"),
                Token::Action(false),
                p("b"),
                p("-"),
                p("+"),
            ]
        );
    }

    #[test]
    fn single_quotes_make_globs_literal() {
        assert_eq!(pats("'**/a b'"), vec![p("[*][*]/a b")]);
        assert_eq!(pats("\"**/a b\""), vec![p("**/a b")]);
    }

    #[test]
    fn escapes_outside_quotes() {
        assert_eq!(pats(r"Joe\'s\ File"), vec![p("Joe's File")]);
        assert_eq!(pats(r"a\b"), vec![p(r"a\b")]);
        assert_eq!(pats(r"a\\"), vec![p(r"a\")]);
        assert_eq!(pats(r"\*"), vec![p("[*]")]);
        assert_eq!(pats(r"\-"), vec![p(r"\-")]);
    }

    #[test]
    fn errors() {
        assert_eq!(tokenize("+ 'a"), Err(ParseError::UnclosedQuote));
        assert_eq!(tokenize("+ a\\"), Err(ParseError::UnterminatedEscape));
        assert_eq!(tokenize("a\0"), Err(ParseError::NulCharacter));
    }
}
