// src/capability/compile.rs

use futures::future::BoxFuture;
use regex::Regex;

use crate::capability::minify::minify_css;
use crate::capability::{CapResult, Compiler, OutputStyle};
use crate::errors::CapabilityError;

/// Built-in stylesheet compiler.
///
/// Accepts plain CSS plus top-level `$name: value;` variable definitions and
/// `//` line comments. Anything beyond that needs the command engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct StylesheetCompiler;

impl Compiler for StylesheetCompiler {
    fn compile<'a>(
        &'a self,
        input: &'a str,
        style: OutputStyle,
    ) -> BoxFuture<'a, CapResult<String>> {
        Box::pin(async move { compile_stylesheet(input, style) })
    }
}

pub fn compile_stylesheet(input: &str, style: OutputStyle) -> CapResult<String> {
    let var_ref = Regex::new(r"\$([A-Za-z_][A-Za-z0-9_-]*)")
        .map_err(|e| CapabilityError::Invalid(e.to_string()))?;

    let mut vars: Vec<(String, String)> = Vec::new();
    let mut body = String::with_capacity(input.len());
    let mut depth: usize = 0;

    for line in input.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("//") {
            continue;
        }

        if depth == 0 {
            if let Some(def) = trimmed.strip_prefix('$') {
                let (name, value) = parse_var(def).ok_or_else(|| {
                    CapabilityError::Invalid(format!("malformed variable definition: {trimmed}"))
                })?;
                let value = substitute(&var_ref, value, &vars)?;
                vars.retain(|(n, _)| n != name);
                vars.push((name.to_string(), value));
                continue;
            }
        }

        depth = depth
            .saturating_add(line.matches('{').count())
            .saturating_sub(line.matches('}').count());

        body.push_str(&substitute(&var_ref, line, &vars)?);
        body.push('\n');
    }

    match style {
        OutputStyle::Expanded => {
            let mut out = body.trim().to_string();
            out.push('\n');
            Ok(out)
        }
        OutputStyle::Compressed => minify_css(&body),
    }
}

/// `name: value;` -> (`name`, `value`), with an optional `!default`.
fn parse_var(def: &str) -> Option<(&str, &str)> {
    let (name, value) = def.split_once(':')?;
    let value = value.trim().strip_suffix(';')?.trim();
    let value = value.strip_suffix("!default").map(str::trim).unwrap_or(value);
    let name = name.trim();
    if name.is_empty() || value.is_empty() {
        return None;
    }
    Some((name, value))
}

fn substitute(var_ref: &Regex, text: &str, vars: &[(String, String)]) -> CapResult<String> {
    let mut missing = None;
    let out = var_ref.replace_all(text, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match vars.iter().find(|(n, _)| n == name) {
            Some((_, value)) => value.clone(),
            None => {
                missing.get_or_insert_with(|| name.to_string());
                caps[0].to_string()
            }
        }
    });
    match missing {
        Some(name) => Err(CapabilityError::Invalid(format!("undefined variable ${name}"))),
        None => Ok(out.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "// palette\n$brand: #c33;\n$pad: 4px !default;\n$border: 1px solid $brand;\n\n.btn {\n  color: $brand;\n  padding: $pad $pad;\n  border: $border;\n}\n";

    #[test]
    fn substitutes_top_level_variables() {
        let out = compile_stylesheet(SOURCE, OutputStyle::Expanded).unwrap();
        assert_eq!(
            out,
            ".btn {\n  color: #c33;\n  padding: 4px 4px;\n  border: 1px solid #c33;\n}\n"
        );
    }

    #[test]
    fn compressed_style_minifies() {
        let out = compile_stylesheet(SOURCE, OutputStyle::Compressed).unwrap();
        assert_eq!(out, ".btn{color:#c33;padding:4px 4px;border:1px solid #c33}");
    }

    #[test]
    fn undefined_variable_is_an_error() {
        let err = compile_stylesheet("a { color: $nope; }", OutputStyle::Expanded).unwrap_err();
        assert!(err.to_string().contains("$nope"));
    }
}
