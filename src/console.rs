//! USB-serial console line editor (spec.md §4.3.2): an 8-slot, 64-char
//! history ring plus the control-character repertoire (erase, redraw,
//! history recall, line abandon). Pure byte-in/byte-out state machine —
//! the firmware binary owns the actual UART read/write loop and feeds
//! bytes through [`ConsoleEditor::feed`].

use crate::board::{CONSOLE_HISTORY_LINES, CONSOLE_LINE_MAX_CHARS};
use std::collections::VecDeque;

const BS: u8 = 0x08;
const DEL: u8 = 0x7F;
const CTRL_C: u8 = 0x03;
const CTRL_R: u8 = 0x12;
const CTRL_U: u8 = 0x15;
const CTRL_W: u8 = 0x17;
const CTRL_AT: u8 = 0x00;
const ESC: u8 = 0x1B;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EscState {
    None,
    Esc,
    Bracket,
}

/// What happened in response to one fed byte: bytes to echo back to the
/// terminal, and (if a line was just committed for execution) the line
/// text itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsoleOutcome {
    pub echo: Vec<u8>,
    pub submit: Option<String>,
}

impl ConsoleOutcome {
    fn echo_only(echo: impl Into<Vec<u8>>) -> Self {
        Self { echo: echo.into(), submit: None }
    }
}

pub struct ConsoleEditor {
    buffer: String,
    history: VecDeque<String>,
    browse_index: Option<usize>,
    esc_state: EscState,
    hostname: String,
}

impl ConsoleEditor {
    pub fn new(hostname: &str) -> Self {
        Self {
            buffer: String::new(),
            history: VecDeque::with_capacity(CONSOLE_HISTORY_LINES),
            browse_index: None,
            esc_state: EscState::None,
            hostname: hostname.to_string(),
        }
    }

    pub fn prompt(&self) -> String {
        let slot = self.history.len().saturating_sub(1);
        format!("{} [{}]> ", self.hostname, slot)
    }

    fn redraw(&self) -> Vec<u8> {
        let mut out = format!("\r\n{}", self.prompt()).into_bytes();
        out.extend_from_slice(self.buffer.as_bytes());
        out
    }

    /// Feeds one received byte, returning what to echo and (if a line was
    /// just completed) the text to submit as a new inbound message.
    pub fn feed(&mut self, byte: u8) -> ConsoleOutcome {
        match self.esc_state {
            EscState::None if byte == ESC => {
                self.esc_state = EscState::Esc;
                return ConsoleOutcome::default();
            }
            EscState::Esc => {
                self.esc_state = if byte == b'[' { EscState::Bracket } else { EscState::None };
                return ConsoleOutcome::default();
            }
            EscState::Bracket => {
                self.esc_state = EscState::None;
                return match byte {
                    b'A' => self.recall_history(-1),
                    b'B' => self.recall_history(1),
                    _ => ConsoleOutcome::default(),
                };
            }
            EscState::None => {}
        }

        match byte {
            b'\r' | b'\n' => self.commit(),
            BS | DEL => self.erase_one(),
            CTRL_W => self.erase_word(),
            CTRL_U => self.erase_line(),
            CTRL_R => ConsoleOutcome::echo_only(self.redraw()),
            CTRL_C => {
                self.buffer.clear();
                self.browse_index = None;
                let mut echo = b"^C".to_vec();
                echo.extend_from_slice(&self.redraw());
                ConsoleOutcome::echo_only(echo)
            }
            CTRL_AT => ConsoleOutcome::echo_only(self.dump_history()),
            0x20..=0x7E => {
                if self.buffer.len() < CONSOLE_LINE_MAX_CHARS {
                    self.buffer.push(byte as char);
                    ConsoleOutcome::echo_only(vec![byte])
                } else {
                    ConsoleOutcome::default()
                }
            }
            _ => ConsoleOutcome::default(),
        }
    }

    fn erase_one(&mut self) -> ConsoleOutcome {
        if self.buffer.pop().is_some() {
            ConsoleOutcome::echo_only(b"\x08 \x08".to_vec())
        } else {
            ConsoleOutcome::default()
        }
    }

    fn erase_word(&mut self) -> ConsoleOutcome {
        let before = self.buffer.len();
        let trimmed_end = self.buffer.trim_end().len();
        self.buffer.truncate(trimmed_end);
        while self.buffer.chars().last().is_some_and(|c| !c.is_whitespace()) {
            self.buffer.pop();
        }
        let removed = before - self.buffer.len();
        ConsoleOutcome::echo_only(b"\x08 \x08".repeat(removed))
    }

    fn erase_line(&mut self) -> ConsoleOutcome {
        let removed = self.buffer.len();
        self.buffer.clear();
        ConsoleOutcome::echo_only(b"\x08 \x08".repeat(removed))
    }

    fn dump_history(&self) -> Vec<u8> {
        let mut out = String::from("\r\n");
        for (i, line) in self.history.iter().enumerate() {
            out.push_str(&format!("{i}: {line}\r\n"));
        }
        out.push_str(&self.prompt());
        out.into_bytes()
    }

    fn recall_history(&mut self, direction: i32) -> ConsoleOutcome {
        if self.history.is_empty() {
            return ConsoleOutcome::default();
        }
        let next = match self.browse_index {
            None => self.history.len() - 1,
            Some(i) => {
                let signed = i as i32 + direction;
                signed.clamp(0, self.history.len() as i32 - 1) as usize
            }
        };
        self.browse_index = Some(next);
        self.buffer = self.history[next].clone();
        ConsoleOutcome::echo_only(self.redraw())
    }

    fn push_history(&mut self, line: &str) {
        if self.history.len() == CONSOLE_HISTORY_LINES {
            self.history.pop_front();
        }
        self.history.push_back(line.to_string());
    }

    /// `!N` selects history slot `N` into the buffer without submitting it;
    /// `!!` is shorthand for the most recent slot.
    fn select_history_recall(&self, line: &str) -> Option<Option<&str>> {
        let rest = line.strip_prefix('!')?;
        if rest == "!" {
            return Some(self.history.back().map(|s| s.as_str()));
        }
        let n: usize = rest.parse().ok()?;
        if n >= CONSOLE_HISTORY_LINES {
            return None;
        }
        Some(self.history.get(n).map(|s| s.as_str()))
    }

    fn commit(&mut self) -> ConsoleOutcome {
        let line = std::mem::take(&mut self.buffer);
        self.browse_index = None;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            return ConsoleOutcome::echo_only(self.redraw());
        }

        if let Some(selected) = self.select_history_recall(trimmed) {
            let mut echo = self.redraw();
            if let Some(text) = selected {
                self.buffer = text.to_string();
                echo = self.redraw();
            }
            return ConsoleOutcome::echo_only(echo);
        }

        self.push_history(trimmed);
        let mut outcome = ConsoleOutcome { echo: self.redraw(), submit: Some(trimmed.to_string()) };
        outcome.echo.truncate(outcome.echo.len()); // no-op; keeps intent explicit that echo precedes dispatch
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_str(editor: &mut ConsoleEditor, s: &str) -> Vec<ConsoleOutcome> {
        s.bytes().map(|b| editor.feed(b)).collect()
    }

    #[test]
    fn printable_bytes_are_echoed_and_buffered() {
        let mut editor = ConsoleEditor::new("host");
        let outcomes = feed_str(&mut editor, "hi");
        assert_eq!(outcomes[0].echo, b"h");
        assert_eq!(outcomes[1].echo, b"i");
        assert!(outcomes.iter().all(|o| o.submit.is_none()));
    }

    #[test]
    fn newline_commits_nonempty_line() {
        let mut editor = ConsoleEditor::new("host");
        feed_str(&mut editor, "help");
        let outcome = editor.feed(b'\n');
        assert_eq!(outcome.submit.as_deref(), Some("help"));
    }

    #[test]
    fn empty_line_does_not_submit() {
        let mut editor = ConsoleEditor::new("host");
        let outcome = editor.feed(b'\n');
        assert_eq!(outcome.submit, None);
    }

    #[test]
    fn backspace_erases_last_char_and_echoes_bs_space_bs() {
        let mut editor = ConsoleEditor::new("host");
        feed_str(&mut editor, "ab");
        let outcome = editor.feed(BS);
        assert_eq!(outcome.echo, b"\x08 \x08");
        editor.feed(b'\n');
        // Only "a" should have survived.
        assert_eq!(editor.history.back().unwrap(), "a");
    }

    #[test]
    fn ctrl_u_erases_entire_line() {
        let mut editor = ConsoleEditor::new("host");
        feed_str(&mut editor, "hello");
        let outcome = editor.feed(CTRL_U);
        assert_eq!(outcome.echo.len(), 3 * "hello".len());
        assert!(editor.buffer.is_empty());
    }

    #[test]
    fn ctrl_w_erases_one_word_back() {
        let mut editor = ConsoleEditor::new("host");
        feed_str(&mut editor, "sensor-dump all");
        editor.feed(CTRL_W);
        assert_eq!(editor.buffer, "sensor-dump ");
    }

    #[test]
    fn ctrl_c_abandons_line() {
        let mut editor = ConsoleEditor::new("host");
        feed_str(&mut editor, "partial");
        let outcome = editor.feed(CTRL_C);
        assert!(editor.buffer.is_empty());
        assert!(outcome.echo.starts_with(b"^C"));
    }

    #[test]
    fn bang_bang_recalls_most_recent_without_executing() {
        let mut editor = ConsoleEditor::new("host");
        feed_str(&mut editor, "sensor-json");
        editor.feed(b'\n');
        let outcome = feed_str(&mut editor, "!!").pop().unwrap();
        let outcome = {
            let mut o = outcome;
            let last = editor.feed(b'\n');
            o.submit = last.submit.clone();
            o
        };
        assert_eq!(outcome.submit, None);
        assert_eq!(editor.buffer, "sensor-json");
    }

    #[test]
    fn bang_n_selects_numbered_slot_without_executing() {
        let mut editor = ConsoleEditor::new("host");
        feed_str(&mut editor, "help");
        editor.feed(b'\n');
        feed_str(&mut editor, "info");
        editor.feed(b'\n');
        feed_str(&mut editor, "!0");
        let outcome = editor.feed(b'\n');
        assert_eq!(outcome.submit, None);
        assert_eq!(editor.buffer, "help");
    }

    #[test]
    fn history_ring_caps_at_eight_entries() {
        let mut editor = ConsoleEditor::new("host");
        for i in 0..12 {
            feed_str(&mut editor, &format!("cmd{i}"));
            editor.feed(b'\n');
        }
        assert_eq!(editor.history.len(), CONSOLE_HISTORY_LINES);
        assert_eq!(editor.history.front().unwrap(), "cmd4");
    }

    #[test]
    fn prompt_format_matches_hostname_and_slot() {
        let mut editor = ConsoleEditor::new("myhost");
        feed_str(&mut editor, "x");
        editor.feed(b'\n');
        assert_eq!(editor.prompt(), "myhost [0]> ");
    }

    #[test]
    fn line_max_length_is_enforced() {
        let mut editor = ConsoleEditor::new("host");
        for _ in 0..(CONSOLE_LINE_MAX_CHARS + 10) {
            editor.feed(b'x');
        }
        assert_eq!(editor.buffer.len(), CONSOLE_LINE_MAX_CHARS);
    }
}
