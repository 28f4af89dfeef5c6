/// Lines submitted during the session, oldest first, with a browse cursor.
///
/// Entries are only ever appended. The cursor ranges over `0..=len()`, where
/// `len()` means "not browsing": the user is on the live edit line.
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    entries: Vec<String>,
    cursor: usize,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a submitted line and return the cursor to the live line.
    ///
    /// Lines that are blank after trimming are not recorded.
    pub fn push(&mut self, line: &str) {
        if !line.trim().is_empty() {
            self.entries.push(line.to_owned());
        }
        self.reset_cursor();
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = self.entries.len();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Step one entry back. `None` when already at the oldest entry.
    pub fn back(&mut self) -> Option<&str> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.get(self.cursor)
    }

    /// Step one entry forward.
    ///
    /// Leaving the newest entry lands on the live line, reported as `""`.
    /// `None` when already on the live line.
    pub fn forward(&mut self) -> Option<&str> {
        if self.cursor >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.get(self.cursor).unwrap_or(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_of(lines: &[&str]) -> HistoryLog {
        let mut log = HistoryLog::new();
        for line in lines {
            log.push(line);
        }
        log
    }

    #[test]
    fn test_entries_kept_in_submission_order() {
        let log = log_of(&["ls", "pwd", "ls"]);
        assert_eq!(log.entries().collect::<Vec<_>>(), vec!["ls", "pwd", "ls"]);
        assert_eq!(log.cursor(), 3);
    }

    #[test]
    fn test_blank_lines_are_not_recorded() {
        let log = log_of(&["", "   ", "date"]);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_lines_are_stored_verbatim() {
        let log = log_of(&["  echo   hi  "]);
        assert_eq!(log.get(0), Some("  echo   hi  "));
    }

    #[test]
    fn test_back_then_forward_returns_to_live_line() {
        let mut log = log_of(&["a", "b", "c"]);
        assert_eq!(log.back(), Some("c"));
        assert_eq!(log.back(), Some("b"));
        assert_eq!(log.back(), Some("a"));
        assert_eq!(log.back(), None);
        assert_eq!(log.cursor(), 0);

        assert_eq!(log.forward(), Some("b"));
        assert_eq!(log.forward(), Some("c"));
        assert_eq!(log.forward(), Some(""));
        assert_eq!(log.forward(), None);
        assert_eq!(log.cursor(), 3);
    }

    #[test]
    fn test_empty_log_navigation_is_noop() {
        let mut log = HistoryLog::new();
        assert_eq!(log.back(), None);
        assert_eq!(log.forward(), None);
        assert_eq!(log.cursor(), 0);
    }

    #[test]
    fn test_push_resets_cursor() {
        let mut log = log_of(&["a", "b"]);
        log.back();
        log.back();
        log.push("c");
        assert_eq!(log.cursor(), 3);
        assert_eq!(log.back(), Some("c"));
    }
}
