// Command decoding for plugin requests
//
// Wire shape: [count: u8][delay_ms: u16 LE]. Anything after the first
// three bytes belongs to the transport and is ignored here.

use core::fmt;

use embassy_time::Duration;

/// Bytes consumed by one encoded [`Request`].
pub const REQUEST_LEN: usize = 3;

/// Largest raw command a session slot will hold.
pub const COMMAND_CAP: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Request {
    pub total_blinks: u8,
    pub delay_ms: u16,
}

impl Request {
    pub const fn new(total_blinks: u8, delay_ms: u16) -> Self {
        Self {
            total_blinks,
            delay_ms,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.delay_ms))
    }

    pub fn encode(&self) -> [u8; REQUEST_LEN] {
        let [lo, hi] = self.delay_ms.to_le_bytes();
        [self.total_blinks, lo, hi]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    Truncated { needed: usize, got: usize },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Truncated { needed, got } => {
                write!(f, "command truncated: need {} bytes, got {}", needed, got)
            }
        }
    }
}

impl core::error::Error for CommandError {}

pub struct CommandReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> CommandReader<'a> {
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], CommandError> {
        let end = self.pos + N;
        let Some(bytes) = self.buf.get(self.pos..end) else {
            return Err(CommandError::Truncated {
                needed: end,
                got: self.buf.len(),
            });
        };
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.pos = end;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, CommandError> {
        self.take::<1>().map(|[b]| b)
    }

    pub fn read_u16_le(&mut self) -> Result<u16, CommandError> {
        self.take::<2>().map(u16::from_le_bytes)
    }

    pub fn read_request(&mut self) -> Result<Request, CommandError> {
        // check the whole shape first so a short command consumes nothing
        if self.remaining() < REQUEST_LEN {
            return Err(CommandError::Truncated {
                needed: self.pos + REQUEST_LEN,
                got: self.buf.len(),
            });
        }
        let total_blinks = self.read_u8()?;
        let delay_ms = self.read_u16_le()?;
        Ok(Request {
            total_blinks,
            delay_ms,
        })
    }
}

/// Owned copy of a raw command, kept in the session slot while the
/// session is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandBuf {
    bytes: [u8; COMMAND_CAP],
    len: usize,
}

impl CommandBuf {
    pub const fn empty() -> Self {
        Self {
            bytes: [0u8; COMMAND_CAP],
            len: 0,
        }
    }

    pub fn from_slice(data: &[u8]) -> Option<Self> {
        if data.len() > COMMAND_CAP {
            return None;
        }
        let mut buf = Self::empty();
        buf.bytes[..data.len()].copy_from_slice(data);
        buf.len = data.len();
        Some(buf)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl Default for CommandBuf {
    fn default() -> Self {
        Self::empty()
    }
}
