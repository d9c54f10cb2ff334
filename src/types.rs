use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// What to do when a file mapping's patterns match nothing.
///
/// - `Warn`: log a warning and yield zero pairs (default).
/// - `Error`: fail the task with `ExpandError::NoMatches`.
/// - `Ignore`: yield zero pairs silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmptyMatchPolicy {
    #[default]
    Warn,
    Error,
    Ignore,
}

impl FromStr for EmptyMatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "warn" => Ok(EmptyMatchPolicy::Warn),
            "error" => Ok(EmptyMatchPolicy::Error),
            "ignore" => Ok(EmptyMatchPolicy::Ignore),
            other => Err(format!(
                "invalid empty_match: {other} (expected \"warn\", \"error\" or \"ignore\")"
            )),
        }
    }
}

/// Which dot in a file name starts the extension replaced by `ext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtDot {
    /// `style.min.css` -> `style` + ext.
    #[default]
    First,
    /// `style.min.css` -> `style.min` + ext.
    Last,
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
