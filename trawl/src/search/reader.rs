use std::collections::VecDeque;
use std::io::{self, BufRead};

/// Line reader over raw bytes with lookahead.
///
/// Lines are split on `\n`, a trailing `\r` is dropped and invalid UTF-8 is
/// replaced. [`LineReader::peek`] reads ahead without moving the position:
/// peeked lines are handed out again by [`LineReader::next_line`] and the line
/// counter only advances when they are.
pub struct LineReader<R> {
    inner: R,
    lookahead: VecDeque<String>,
    line_number: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            lookahead: VecDeque::new(),
            line_number: 0,
            buf: Vec::with_capacity(256),
        }
    }

    /// Number of the last line returned by `next_line` (1-based, 0 before any)
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        let line = match self.lookahead.pop_front() {
            Some(line) => Some(line),
            None => self.read_raw()?,
        };
        if line.is_some() {
            self.line_number += 1;
        }
        Ok(line)
    }

    /// Returns up to `n` upcoming lines without consuming them
    pub fn peek(&mut self, n: usize) -> io::Result<Vec<String>> {
        while self.lookahead.len() < n {
            match self.read_raw()? {
                Some(line) => self.lookahead.push_back(line),
                None => break,
            }
        }
        Ok(self.lookahead.iter().take(n).cloned().collect())
    }

    fn read_raw(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        if self.inner.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reads_lines() {
        let mut reader = LineReader::new(Cursor::new("a\r\nb\nc"));
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("a"));
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("b"));
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("c"));
        assert_eq!(reader.next_line().unwrap(), None);
        assert_eq!(reader.line_number(), 3);
    }

    #[test]
    fn test_peek_restores_position() {
        let mut reader = LineReader::new(Cursor::new("x\nMATCH\ny\nz\n"));
        reader.next_line().unwrap();
        reader.next_line().unwrap();
        assert_eq!(reader.line_number(), 2);

        assert_eq!(reader.peek(1).unwrap(), vec!["y"]);
        assert_eq!(reader.line_number(), 2);

        assert_eq!(reader.next_line().unwrap().as_deref(), Some("y"));
        assert_eq!(reader.line_number(), 3);
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("z"));
    }

    #[test]
    fn test_peek_past_end() {
        let mut reader = LineReader::new(Cursor::new("only\n"));
        reader.next_line().unwrap();
        assert!(reader.peek(3).unwrap().is_empty());
        assert_eq!(reader.next_line().unwrap(), None);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut reader = LineReader::new(Cursor::new(vec![b'a', 0xff, b'\n']));
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("a\u{fffd}"));
    }
}
