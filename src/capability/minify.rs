// src/capability/minify.rs

use futures::future::BoxFuture;

use crate::capability::{CapResult, Lang, Minifier};
use crate::errors::CapabilityError;

/// Built-in minifier for CSS and (conservatively) JavaScript.
///
/// Both keep `/*! ... */` license comments. The JavaScript pass only drops
/// comments, indentation and blank lines; line breaks are preserved so
/// automatic semicolon insertion behaves the same.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinMinifier;

impl Minifier for BuiltinMinifier {
    fn minify<'a>(&'a self, input: &'a str, lang: Lang) -> BoxFuture<'a, CapResult<String>> {
        Box::pin(async move {
            match lang {
                Lang::Css => minify_css(input),
                Lang::Js => minify_js(input),
            }
        })
    }
}

pub fn minify_css(input: &str) -> CapResult<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    let mut pending_space = false;

    while i < chars.len() {
        let c = chars[i];

        if c == '/' && chars.get(i + 1) == Some(&'*') {
            let end = find_comment_end(&chars, i + 2).ok_or_else(|| {
                CapabilityError::Invalid("unterminated comment in stylesheet".to_string())
            })?;
            if chars.get(i + 2) == Some(&'!') {
                flush_space(&mut out, &mut pending_space, None);
                out.extend(&chars[i..end]);
                out.push('\n');
            }
            i = end;
            continue;
        }

        if c == '"' || c == '\'' {
            flush_space(&mut out, &mut pending_space, Some(c));
            let end = find_string_end(&chars, i, c).ok_or_else(|| {
                CapabilityError::Invalid("unterminated string in stylesheet".to_string())
            })?;
            out.extend(&chars[i..end]);
            i = end;
            continue;
        }

        if c.is_whitespace() {
            pending_space = true;
            i += 1;
            continue;
        }

        if matches!(c, '{' | '}' | ':' | ';' | ',' | '>' | '~') {
            pending_space = false;
            if c == '}' && out.ends_with(';') {
                out.pop();
            }
            // `a :hover` and `a:hover` differ; keep the space before a colon
            // that starts a pseudo-class inside a selector.
            if c == ':' && out_is_in_selector(&out) && out_ends_with_word(&out) {
                let had_space = i > 0 && chars[i - 1].is_whitespace();
                if had_space {
                    out.push(' ');
                }
            }
            out.push(c);
            i += 1;
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            continue;
        }

        flush_space(&mut out, &mut pending_space, Some(c));
        out.push(c);
        i += 1;
    }

    Ok(out.trim().to_string())
}

fn flush_space(out: &mut String, pending: &mut bool, next: Option<char>) {
    if *pending {
        let after_punct = out
            .chars()
            .last()
            .is_none_or(|p| matches!(p, '{' | '}' | ':' | ';' | ',' | '>' | '~' | '(' | '\n'));
        if !after_punct && next.is_some() {
            out.push(' ');
        }
    }
    *pending = false;
}

fn out_is_in_selector(out: &str) -> bool {
    let open = out.rfind('{');
    let close = out.rfind('}');
    match (open, close) {
        (Some(o), Some(c)) => c > o,
        (Some(_), None) => false,
        _ => true,
    }
}

fn out_ends_with_word(out: &str) -> bool {
    out.chars()
        .last()
        .is_some_and(|c| c.is_alphanumeric() || c == ']' || c == '*' || c == ')')
}

/// Index just past the closing `*/` of a comment whose body starts at `from`.
fn find_comment_end(chars: &[char], from: usize) -> Option<usize> {
    let mut i = from;
    while i + 1 < chars.len() {
        if chars[i] == '*' && chars[i + 1] == '/' {
            return Some(i + 2);
        }
        i += 1;
    }
    None
}

/// Index just past the closing quote of a string starting at `start`.
fn find_string_end(chars: &[char], start: usize, quote: char) -> Option<usize> {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return Some(i + 1),
            '\n' if quote != '`' => return None,
            _ => i += 1,
        }
    }
    None
}

pub fn minify_js(input: &str) -> CapResult<String> {
    let stripped = strip_js_comments(input)?;
    let lines: Vec<&str> = stripped
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    Ok(lines.join("\n"))
}

/// Remove `//` and `/* */` comments, keeping `/*!` comments, strings,
/// template literals and regular expression literals intact.
fn strip_js_comments(input: &str) -> CapResult<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let end = find_comment_end(&chars, i + 2).ok_or_else(|| {
                    CapabilityError::Invalid("unterminated comment in script".to_string())
                })?;
                if chars.get(i + 2) == Some(&'!') {
                    out.extend(&chars[i..end]);
                    out.push('\n');
                } else if chars[i..end].contains(&'\n') {
                    out.push('\n');
                } else {
                    out.push(' ');
                }
                i = end;
            }
            '"' | '\'' | '`' => {
                let end = find_string_end(&chars, i, c).ok_or_else(|| {
                    CapabilityError::Invalid("unterminated string in script".to_string())
                })?;
                out.extend(&chars[i..end]);
                i = end;
            }
            '/' if regex_allowed(&out) => {
                let end = find_regex_end(&chars, i).ok_or_else(|| {
                    CapabilityError::Invalid("unterminated regular expression in script".to_string())
                })?;
                out.extend(&chars[i..end]);
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    Ok(out)
}

/// A `/` starts a regex literal when the previous significant token cannot
/// end an expression.
fn regex_allowed(out: &str) -> bool {
    let trimmed = out.trim_end();
    match trimmed.chars().last() {
        None => true,
        Some(c) if "(,=:[!&|?{};+-*%<>~^".contains(c) => true,
        Some(_) => ["return", "typeof", "case", "do", "else", "in", "of", "void", "yield"]
            .iter()
            .any(|kw| {
                trimmed.ends_with(kw)
                    && !trimmed[..trimmed.len() - kw.len()]
                        .chars()
                        .last()
                        .is_some_and(|p| p.is_alphanumeric() || p == '_' || p == '$')
            }),
    }
}

fn find_regex_end(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start + 1;
    let mut in_class = false;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '[' => {
                in_class = true;
                i += 1;
            }
            ']' => {
                in_class = false;
                i += 1;
            }
            '/' if !in_class => {
                i += 1;
                while i < chars.len() && chars[i].is_ascii_alphabetic() {
                    i += 1;
                }
                return Some(i);
            }
            '\n' => return None,
            _ => i += 1,
        }
    }
    None
}
