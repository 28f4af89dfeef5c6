use crate::history::HistoryLog;
use crate::signal::ForegroundJob;
use crate::terminal::RawMode;
use std::io::{self, BufRead, ErrorKind, Read, Write};
use std::sync::Arc;

/// What a call to [`LineEditor::read_line`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A submitted line, exactly as typed.
    Line(String),
    /// The input stream ended (or Ctrl-D on an empty line).
    Eof,
}

/// Line editor with cursor movement and history browsing.
///
/// On a terminal it switches to raw input for the duration of each call and
/// renders every edit before the next key is read. Otherwise it reads plain
/// lines without rendering anything.
pub struct LineEditor {
    interactive: bool,
    foreground: Arc<ForegroundJob>,
}

impl LineEditor {
    pub fn new(interactive: bool, foreground: Arc<ForegroundJob>) -> Self {
        Self {
            interactive,
            foreground,
        }
    }

    /// Show `prompt` and read one line.
    pub fn read_line(
        &self,
        input: &mut dyn BufRead,
        output: &mut dyn Write,
        prompt: &str,
        history: &mut HistoryLog,
    ) -> io::Result<ReadOutcome> {
        if !self.interactive {
            return read_plain(input);
        }
        let _raw = RawMode::enable()?;
        self.edit(input, output, prompt, history)
    }

    /// Keystroke loop, independent of the terminal mode.
    pub(crate) fn edit(
        &self,
        input: &mut dyn BufRead,
        output: &mut dyn Write,
        prompt: &str,
        history: &mut HistoryLog,
    ) -> io::Result<ReadOutcome> {
        // An interrupt delivered while no editor was reading is stale.
        self.foreground.take_idle_interrupt();
        let mut line = EditBuffer::default();
        refresh_line(output, prompt, &line)?;

        loop {
            let byte = match read_byte(input) {
                Ok(Some(b)) => b,
                Ok(None) if line.is_empty() => return Ok(ReadOutcome::Eof),
                Ok(None) => {
                    writeln!(output)?;
                    output.flush()?;
                    return Ok(ReadOutcome::Line(line.to_string()));
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => {
                    if self.foreground.take_idle_interrupt() {
                        writeln!(output, "\nYou typed Control-C!")?;
                        refresh_line(output, prompt, &line)?;
                    }
                    continue;
                }
                Err(err) => return Err(err),
            };

            match decode_key(byte, input)? {
                Key::Enter => {
                    writeln!(output)?;
                    output.flush()?;
                    return Ok(ReadOutcome::Line(line.to_string()));
                }
                Key::EndOfInput if line.is_empty() => {
                    writeln!(output)?;
                    output.flush()?;
                    return Ok(ReadOutcome::Eof);
                }
                Key::Backspace => {
                    if line.delete_left() {
                        refresh_line(output, prompt, &line)?;
                    }
                }
                Key::Left => {
                    if line.move_left() {
                        write!(output, "\x1b[D")?;
                        output.flush()?;
                    }
                }
                Key::Right => {
                    if line.move_right() {
                        write!(output, "\x1b[C")?;
                        output.flush()?;
                    }
                }
                Key::Up => {
                    if let Some(entry) = history.back() {
                        line.replace(entry);
                        refresh_line(output, prompt, &line)?;
                    }
                }
                Key::Down => {
                    if let Some(entry) = history.forward() {
                        line.replace(entry);
                        refresh_line(output, prompt, &line)?;
                    }
                }
                Key::Char(ch) => {
                    line.insert(ch);
                    refresh_line(output, prompt, &line)?;
                }
                Key::EndOfInput | Key::Ignored => {}
            }
        }
    }
}

fn read_plain(input: &mut dyn BufRead) -> io::Result<ReadOutcome> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(ReadOutcome::Eof);
    }
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(ReadOutcome::Line(line))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    Enter,
    EndOfInput,
    Backspace,
    Left,
    Right,
    Up,
    Down,
    Char(char),
    Ignored,
}

/// Read one byte; `None` at end of input. Interrupts are reported to the caller.
fn read_byte(input: &mut dyn BufRead) -> io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    match input.read(&mut byte)? {
        0 => Ok(None),
        _ => Ok(Some(byte[0])),
    }
}

/// Like [`read_byte`] but retries interrupted reads, for the tail of a key.
fn read_continuation(input: &mut dyn BufRead) -> io::Result<Option<u8>> {
    loop {
        match read_byte(input) {
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

fn decode_key(first: u8, input: &mut dyn BufRead) -> io::Result<Key> {
    Ok(match first {
        b'\n' | b'\r' => Key::Enter,
        0x04 => Key::EndOfInput,
        0x7f | 0x08 => Key::Backspace,
        0x1b => {
            if read_continuation(input)? != Some(b'[') {
                return Ok(Key::Ignored);
            }
            match read_continuation(input)? {
                Some(b'A') => Key::Up,
                Some(b'B') => Key::Down,
                Some(b'C') => Key::Right,
                Some(b'D') => Key::Left,
                _ => Key::Ignored,
            }
        }
        _ => match decode_utf8(first, input)? {
            Some(ch) if !ch.is_control() => Key::Char(ch),
            _ => Key::Ignored,
        },
    })
}

fn decode_utf8(first: u8, input: &mut dyn BufRead) -> io::Result<Option<char>> {
    let width = match first {
        0x00..=0x7f => 1,
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf4 => 4,
        _ => return Ok(None),
    };
    let mut buf = [first, 0, 0, 0];
    for slot in buf.iter_mut().take(width).skip(1) {
        match read_continuation(input)? {
            Some(b) => *slot = b,
            None => return Ok(None),
        }
    }
    Ok(std::str::from_utf8(&buf[..width])
        .ok()
        .and_then(|s| s.chars().next()))
}

/// The line being edited and the cursor position within it (in chars).
#[derive(Debug, Default)]
struct EditBuffer {
    chars: Vec<char>,
    cursor: usize,
}

impl EditBuffer {
    fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    fn insert(&mut self, ch: char) {
        self.chars.insert(self.cursor, ch);
        self.cursor += 1;
    }

    fn delete_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.chars.remove(self.cursor);
        true
    }

    fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    fn move_right(&mut self) -> bool {
        if self.cursor >= self.chars.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Load `text` as the whole line with the cursor at its end.
    fn replace(&mut self, text: &str) {
        self.chars = text.chars().collect();
        self.cursor = self.chars.len();
    }
}

impl std::fmt::Display for EditBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.chars.iter().try_for_each(|c| write!(f, "{c}"))
    }
}

/// Redraw prompt and line, clear leftovers, and park the cursor.
fn refresh_line(output: &mut dyn Write, prompt: &str, line: &EditBuffer) -> io::Result<()> {
    write!(output, "\r{prompt} {line}\x1b[K")?;
    let behind = line.chars.len() - line.cursor;
    if behind > 0 {
        write!(output, "\x1b[{behind}D")?;
    }
    output.flush()
}
