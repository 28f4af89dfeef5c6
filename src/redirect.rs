use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;

/// Kind of redirection
///
/// Defines which stream is redirected and whether the target is truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// `>`: standard output, **overwriting** the file if it exists.
    OverwriteStdout,
    /// `>>`: standard output, **appending** to the file if it exists.
    AppendStdout,
    /// `2>`: standard error, **overwriting** the file if it exists.
    OverwriteStderr,
}

impl RedirectKind {
    fn from_operator(token: &str) -> Option<Self> {
        match token {
            ">" => Some(Self::OverwriteStdout),
            ">>" => Some(Self::AppendStdout),
            "2>" => Some(Self::OverwriteStderr),
            _ => None,
        }
    }

    pub fn is_stderr(self) -> bool {
        self == Self::OverwriteStderr
    }
}

/// A redirection parsed from the end of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub kind: RedirectKind,
    pub path: PathBuf,
}

impl Redirection {
    /// Open (creating if needed) the target file with mode `0644`.
    pub fn open(&self) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).mode(0o644);
        match self.kind {
            RedirectKind::AppendStdout => options.append(true),
            RedirectKind::OverwriteStdout | RedirectKind::OverwriteStderr => options.truncate(true),
        };
        options.open(&self.path)
    }
}

/// Detect a redirection at the end of a command.
///
/// If the second-to-last word is `>`, `>>` or `2>`, the last word is the
/// target and that span is cut off; the command text before it is returned
/// unchanged apart from trailing whitespace. Operators anywhere else are left
/// alone and end up as ordinary arguments.
pub fn split_redirection(text: &str) -> (&str, Option<Redirection>) {
    let Some((rest, target)) = split_last_word(text) else {
        return (text, None);
    };
    let Some((command, operator)) = split_last_word(rest) else {
        return (text, None);
    };
    match RedirectKind::from_operator(operator) {
        Some(kind) => (
            command.trim_end(),
            Some(Redirection {
                kind,
                path: PathBuf::from(target),
            }),
        ),
        None => (text, None),
    }
}

/// Split off the last whitespace-separated word of `text`.
fn split_last_word(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_end();
    if text.is_empty() {
        return None;
    }
    let start = text
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map_or(0, |(i, c)| i + c.len_utf8());
    Some((&text[..start], &text[start..]))
}
