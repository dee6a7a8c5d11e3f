//! Tracking-number and report-number generation.
//!
//! There is no persisted counter. The next tracking number is derived from a
//! full scan of the identifiers currently in the store, so the sequence heals
//! itself after manual edits and deletions. Record volumes are in the
//! hundreds, which keeps the O(n) scan negligible.

use serde::{Deserialize, Serialize};

/// The fixed layout of generated tracking numbers: a prefix followed by a
/// zero-padded decimal counter (`TD001`, `TD002`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifierFormat {
  pub prefix: String,
  pub width:  usize,
}

impl Default for IdentifierFormat {
  fn default() -> Self { Self { prefix: "TD".to_owned(), width: 3 } }
}

impl IdentifierFormat {
  /// See [`next_identifier`].
  pub fn next<'a>(&self, existing: impl IntoIterator<Item = &'a str>) -> String {
    next_identifier(existing, &self.prefix, self.width)
  }

  pub fn format(&self, n: u64) -> String {
    format!("{}{:0width$}", self.prefix, n, width = self.width)
  }
}

/// The numeric suffix of `id` if it is exactly `prefix` followed by one or
/// more ASCII digits, and the suffix has a `u64` successor.
fn numeric_suffix(id: &str, prefix: &str) -> Option<u64> {
  let digits = id.strip_prefix(prefix)?;
  if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  let n: u64 = digits.parse().ok()?;
  (n < u64::MAX).then_some(n)
}

/// Compute the next unused identifier: `prefix` + zero-padded `max + 1`,
/// where `max` is the largest numeric suffix among `existing` ids that match
/// the prefix+digits pattern (0 when none do).
///
/// Ids that do not match, or whose suffix overflows, are ignored rather than
/// treated as errors.
pub fn next_identifier<'a>(
  existing: impl IntoIterator<Item = &'a str>,
  prefix: &str,
  width: usize,
) -> String {
  let max = existing
    .into_iter()
    .filter_map(|id| numeric_suffix(id, prefix))
    .max()
    .unwrap_or(0);
  let next = max + 1;
  format!("{prefix}{next:0width$}")
}

/// Increment a report number of the form `<prefix><digits>`, keeping the
/// zero-padding width (`PSUR007` -> `PSUR008`, `R-099` -> `R-100`).
///
/// The prefix must be non-empty and contain no digits. Anything else yields
/// `None`.
pub fn increment_report_number(report_number: &str) -> Option<String> {
  let report_number = report_number.trim();
  let split = report_number
    .char_indices()
    .rev()
    .take_while(|(_, c)| c.is_ascii_digit())
    .last()
    .map(|(i, _)| i)?;
  let (prefix, digits) = report_number.split_at(split);
  if prefix.is_empty() || prefix.chars().any(|c| c.is_ascii_digit()) {
    return None;
  }
  let n: u64 = digits.parse().ok()?;
  let width = digits.len();
  Some(format!("{prefix}{:0width$}", n.checked_add(1)?))
}

/// Report numbers recovered by [`normalize_report_number`] use this layout.
pub const REPORT_NUMBER_PREFIX: &str = "PSUR";

/// Recover a canonical tracking number from loose input such as `"td 7"`,
/// `"TD-007"` or `"tracking td7"`.
///
/// The prefix is matched case-insensitively and may be separated from the
/// digits by spaces, `-`, `_`, `#` or `:`. The first match wins.
pub fn normalize_tracking_number(
  text: &str,
  format: &IdentifierFormat,
) -> Option<String> {
  find_prefixed_number(text, &format.prefix).map(|n| format.format(n))
}

/// Same as [`normalize_tracking_number`] for report numbers: `"psur 7"`
/// becomes `PSUR007`.
pub fn normalize_report_number(text: &str) -> Option<String> {
  find_prefixed_number(text, REPORT_NUMBER_PREFIX)
    .map(|n| format!("{REPORT_NUMBER_PREFIX}{n:03}"))
}

fn find_prefixed_number(text: &str, prefix: &str) -> Option<u64> {
  let lower = text.to_ascii_lowercase();
  let prefix = prefix.to_ascii_lowercase();
  if prefix.is_empty() {
    return None;
  }

  lower.match_indices(&prefix).find_map(|(at, _)| {
    // Require a word boundary in front of the prefix.
    let before = lower[..at].chars().next_back();
    if before.is_some_and(|c| c.is_ascii_alphanumeric()) {
      return None;
    }
    let rest = lower[at + prefix.len()..]
      .trim_start_matches(|c: char| matches!(c, ' ' | '-' | '_' | '#' | ':'));
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
      return None;
    }
    digits.parse().ok()
  })
}
