// Outgoing reply buffer, one per session slot

use core::fmt;

pub const REPLY_CAP: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyError {
    Full,
}

impl fmt::Display for ReplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyError::Full => write!(f, "reply buffer full ({} bytes)", REPLY_CAP),
        }
    }
}

impl core::error::Error for ReplyError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyBuffer {
    buf: [u8; REPLY_CAP],
    len: usize,
}

impl ReplyBuffer {
    pub const fn new() -> Self {
        Self {
            buf: [0u8; REPLY_CAP],
            len: 0,
        }
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<(), ReplyError> {
        if self.len >= REPLY_CAP {
            return Err(ReplyError::Full);
        }
        self.buf[self.len] = byte;
        self.len += 1;
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl Default for ReplyBuffer {
    fn default() -> Self {
        Self::new()
    }
}
