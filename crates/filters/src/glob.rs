// crates/filters/src/glob.rs
//! Glob to regex translation over `/`-separated relative paths.
//!
//! A whole-segment `*` matches one or more characters of a single segment,
//! `**` matches any number of leading directories (or anything at all when it
//! is the last segment). Partial `*` and `?` never cross a separator. With
//! `ignore_hidden`, wildcards never match the leading dot of a segment.

const NOT_SEP: &str = "[^/]";

#[derive(Clone, Debug, PartialEq, Eq)]
enum Tok {
    Lit(char),
    Star,
    Any,
    /// A complete regex class, brackets included.
    Class(String),
}

fn escape_char(c: char) -> String {
    regex::escape(c.encode_utf8(&mut [0; 4]))
}

fn class_regex(body: &[char]) -> String {
    let mut out = String::from("[");
    let mut chars = body;
    if let Some(('!', rest)) = chars.split_first() {
        out.push('^');
        chars = rest;
    }
    for &c in chars {
        if c == '-' {
            out.push(c);
        } else {
            out.push_str(&escape_char(c));
        }
    }
    if out.starts_with("[^") {
        out.push('/');
    }
    out.push(']');
    out
}

fn lex(part: &str) -> Vec<Tok> {
    let chars: Vec<char> = part.chars().collect();
    let mut toks = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => {
                if toks.last() != Some(&Tok::Star) {
                    toks.push(Tok::Star);
                }
                i += 1;
            }
            '?' => {
                toks.push(Tok::Any);
                i += 1;
            }
            '[' => {
                let mut j = i + 1;
                if chars.get(j) == Some(&'!') {
                    j += 1;
                }
                if chars.get(j) == Some(&']') {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }
                if j >= chars.len() {
                    toks.push(Tok::Lit('['));
                    i += 1;
                } else {
                    toks.push(Tok::Class(class_regex(&chars[i + 1..j])));
                    i = j + 1;
                }
            }
            c => {
                toks.push(Tok::Lit(c));
                i += 1;
            }
        }
    }
    toks
}

fn plain(toks: &[Tok]) -> String {
    toks.iter()
        .map(|t| match t {
            Tok::Lit(c) => escape_char(*c),
            Tok::Star => format!("{NOT_SEP}*"),
            Tok::Any => NOT_SEP.to_string(),
            Tok::Class(c) => c.clone(),
        })
        .collect()
}

/// Regex for `toks` that cannot match a leading dot, or `None` when the
/// sequence necessarily starts with one.
fn no_leading_dot(toks: &[Tok]) -> Option<String> {
    let Some((first, rest)) = toks.split_first() else {
        return Some(String::new());
    };
    match first {
        Tok::Lit('.') => None,
        Tok::Lit(c) => Some(format!("{}{}", escape_char(*c), plain(rest))),
        Tok::Any => Some(format!("[^/.]{}", plain(rest))),
        Tok::Class(c) => Some(format!("[{c}&&[^.]]{}", plain(rest))),
        Tok::Star => {
            let longer = format!("[^/.]{NOT_SEP}*{}", plain(rest));
            Some(match no_leading_dot(rest) {
                Some(empty) => format!("(?:{longer}|{empty})"),
                None => longer,
            })
        }
    }
}

fn segment(part: &str, ignore_hidden: bool) -> String {
    let toks = lex(part);
    if ignore_hidden && matches!(toks.first(), Some(Tok::Star | Tok::Any)) {
        // An empty alternative set means nothing can match.
        return no_leading_dot(&toks).unwrap_or_else(|| "[^\\s\\S]".to_string());
    }
    plain(&toks)
}

/// Translates `pattern` into an anchored regex source string.
pub fn translate(pattern: &str, ignore_hidden: bool) -> String {
    let (one_last, one, any, any_last) = if ignore_hidden {
        (
            "[^/.][^/]*",
            "[^/.][^/]*/",
            "(?:[^/.][^/]*/)*",
            "(?:[^/.][^/]*/)*(?:[^/.][^/]*)?",
        )
    } else {
        ("[^/]+", "[^/]+/", "(?:.+/)?", ".*")
    };

    let parts: Vec<&str> = pattern.split('/').collect();
    let last_idx = parts.len() - 1;
    let mut out = String::new();
    for (idx, part) in parts.iter().enumerate() {
        let last = idx == last_idx;
        match *part {
            "*" => out.push_str(if last { one_last } else { one }),
            "**" => {
                if last {
                    out.push_str(any_last);
                } else if parts[idx + 1] != "**" {
                    out.push_str(any);
                }
            }
            _ => {
                if !part.is_empty() {
                    out.push_str(&segment(part, ignore_hidden));
                }
                if !last {
                    out.push('/');
                }
            }
        }
    }
    format!(r"\A(?s:{out})\z")
}
