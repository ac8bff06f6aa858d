// I/O at the edge of the plugin runtime: pins, command decoding, replies.
//
// Board independent; pin numbers and reserved lines live in board/.

pub mod command;
pub mod pin;
pub mod reply;

pub use command::{CommandError, CommandReader, Request};
pub use pin::{Level, OutputBank, PinDriver, PinId, PinMode};
pub use reply::{ReplyBuffer, ReplyError};
