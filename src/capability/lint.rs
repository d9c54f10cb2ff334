// src/capability/lint.rs

use std::fmt;
use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use regex::Regex;
use serde::Deserialize;

use crate::capability::{CapResult, Linter};
use crate::errors::CapabilityError;

/// Rules understood by the built-in linter.
///
/// Deserialized from the target options merged over an optional
/// `.jshintrc`; unknown keys are ignored so a full jshint config can be
/// shared.
#[derive(Debug, Clone, Deserialize)]
pub struct LintRules {
    /// Maximum line length in characters.
    #[serde(default)]
    pub maxlen: Option<usize>,

    /// Flag trailing whitespace.
    #[serde(default)]
    pub trailing: bool,

    /// Allow `debugger` statements.
    #[serde(default)]
    pub debug: bool,

    /// Require `===` / `!==`.
    #[serde(default)]
    pub eqeqeq: bool,
}

impl Default for LintRules {
    fn default() -> Self {
        Self {
            maxlen: None,
            trailing: true,
            debug: false,
            eqeqeq: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintFinding {
    pub path: PathBuf,
    /// 1-based; 0 when the finding is not tied to a line.
    pub line: usize,
    pub message: String,
}

impl fmt::Display for LintFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}: {}", self.path.display(), self.message)
        } else {
            write!(f, "{}:{}: {}", self.path.display(), self.line, self.message)
        }
    }
}

/// Line-based JavaScript linter covering a small subset of jshint.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptLinter;

impl Linter for ScriptLinter {
    fn lint<'a>(
        &'a self,
        path: &'a Path,
        source: &'a str,
        rules: &'a LintRules,
    ) -> BoxFuture<'a, CapResult<Vec<LintFinding>>> {
        Box::pin(async move { lint_source(path, source, rules) })
    }
}

pub fn lint_source(path: &Path, source: &str, rules: &LintRules) -> CapResult<Vec<LintFinding>> {
    let debugger = Regex::new(r"(^|[^\w$.])debugger\s*;?")
        .map_err(|e| CapabilityError::Invalid(e.to_string()))?;
    let loose_eq = Regex::new(r"(^|[^=!<>])(==|!=)([^=]|$)")
        .map_err(|e| CapabilityError::Invalid(e.to_string()))?;

    let mut findings = Vec::new();
    let mut push = |line: usize, message: String| {
        findings.push(LintFinding {
            path: path.to_path_buf(),
            line,
            message,
        })
    };

    for (idx, line) in source.lines().enumerate() {
        let lineno = idx + 1;

        if let Some(max) = rules.maxlen {
            let len = line.chars().count();
            if len > max {
                push(lineno, format!("line is too long ({len} > {max})"));
            }
        }

        if rules.trailing && line.ends_with([' ', '\t']) {
            push(lineno, "trailing whitespace".to_string());
        }

        let code = code_portion(line);
        if !rules.debug && debugger.is_match(&code) {
            push(lineno, "forgotten 'debugger' statement".to_string());
        }
        if rules.eqeqeq && loose_eq.is_match(&code) {
            push(lineno, "expected '===' or '!==' instead of '==' or '!='".to_string());
        }
    }

    Ok(findings)
}

/// The line with string literals blanked and a trailing `//` comment
/// removed, so rules only see code.
fn code_portion(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut quote: Option<char> = None;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                if c == '\\' {
                    chars.next();
                } else if c == q {
                    quote = None;
                    out.push(c);
                }
            }
            None => match c {
                '"' | '\'' | '`' => {
                    quote = Some(c);
                    out.push(c);
                }
                '/' if chars.peek() == Some(&'/') => break,
                _ => out.push(c),
            },
        }
    }
    out
}
