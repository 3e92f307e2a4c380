//! Byte scanner over markup input
//!
//! The cursor never indexes directly: every read goes through `get`, so a
//! malformed document ends in `None` rather than a panic.

use crate::error::Pos;

#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    input: &'a [u8],
    at: Pos,
}

impl<'a> Cursor<'a> {
    pub const fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            at: Pos::new(0, 1, 1),
        }
    }

    pub fn current(&self) -> Option<u8> {
        self.input.get(self.at.offset).copied()
    }

    pub fn peek(&self, ahead: usize) -> Option<u8> {
        self.input.get(self.at.offset.saturating_add(ahead)).copied()
    }

    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.remaining().starts_with(prefix)
    }

    /// Step over one byte, keeping line and column in sync
    pub fn advance(&mut self) {
        let Some(b) = self.current() else {
            return;
        };
        self.at.offset += 1;
        if b == b'\n' {
            self.at.line += 1;
            self.at.col = 1;
        } else {
            self.at.col += 1;
        }
    }

    /// Consume `prefix` if the input continues with it
    pub fn eat(&mut self, prefix: &[u8]) -> bool {
        if !self.starts_with(prefix) {
            return false;
        }
        for _ in prefix {
            self.advance();
        }
        true
    }

    /// Consume bytes while `accept` holds and return them
    pub fn take_while(&mut self, accept: impl Fn(u8) -> bool) -> &'a [u8] {
        let start = self.at.offset;
        while self.current().is_some_and(&accept) {
            self.advance();
        }
        self.input.get(start..self.at.offset).unwrap_or_default()
    }

    /// Consume through `terminator`, returning what came before it
    ///
    /// Without a terminator the cursor is left at end of input.
    pub fn take_until(&mut self, terminator: &[u8]) -> Option<&'a [u8]> {
        let start = self.at.offset;
        while !self.is_eof() {
            if self.starts_with(terminator) {
                let body = self.input.get(start..self.at.offset);
                self.eat(terminator);
                return body;
            }
            self.advance();
        }
        None
    }

    pub fn skip_whitespace(&mut self) {
        self.take_while(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'));
    }

    pub const fn position(&self) -> Pos {
        self.at
    }

    pub const fn is_eof(&self) -> bool {
        self.at.offset >= self.input.len()
    }

    pub fn remaining(&self) -> &'a [u8] {
        self.input.get(self.at.offset..).unwrap_or_default()
    }
}
