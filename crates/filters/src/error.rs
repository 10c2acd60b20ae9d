// crates/filters/src/error.rs
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    NulCharacter,
    UnterminatedEscape,
    UnclosedQuote,
    EscapedAction(String),
    DotSegment(String),
    Absolute(String),
    RelativeExclude(String),
    Regex(regex::Error),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NulCharacter => f.write_str("invalid null character in filter string"),
            Self::UnterminatedEscape => {
                f.write_str("unterminated escape sequence in filter string")
            }
            Self::UnclosedQuote => f.write_str("unclosed quotes in filter string"),
            Self::EscapedAction(p) => {
                let action = p.trim_start_matches('\\');
                write!(f, "pattern {p} is invalid, did you mean ./{action}")
            }
            Self::DotSegment(p) => write!(
                f,
                ". and .. path references are not supported (except for a leading ./): {p}"
            ),
            Self::Absolute(p) => write!(f, "absolute paths are not supported in filter: {p}"),
            Self::RelativeExclude(p) => {
                write!(f, "relative pattern {p} can only be used with a + action")
            }
            Self::Regex(e) => write!(f, "invalid pattern: {e}"),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Regex(e) => Some(e),
            _ => None,
        }
    }
}

impl From<regex::Error> for ParseError {
    fn from(e: regex::Error) -> Self {
        Self::Regex(e)
    }
}
