//! Tokenization for the command language.
//!
//! Words are separated by runs of whitespace. There is no quoting or escaping:
//! `echo "a b"` yields the tokens `echo`, `"a` and `b"`.

/// Separator between pipeline stages.
pub const PIPE: char = '|';

/// Split a line into whitespace-separated tokens.
pub fn split_into_tokens(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Join tokens back into command text with single spaces.
pub fn join_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a line into the raw text of its pipeline stages, trimmed.
///
/// Returns `None` if any stage is blank, e.g. `a || b` or `| a`.
pub fn split_pipeline(line: &str) -> Option<Vec<String>> {
    let stages: Vec<String> = line.split(PIPE).map(|s| s.trim().to_owned()).collect();
    if stages.iter().any(String::is_empty) {
        None
    } else {
        Some(stages)
    }
}
