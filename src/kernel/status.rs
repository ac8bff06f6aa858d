// Handler outcomes and the error taxonomy
//
// Waiting is a normal outcome, not an error: it lives in Status next to
// Ok. Everything in PluginError is terminal for the session that raised
// it and for that session only.

use core::fmt;

use crate::drivers::command::CommandError;
use crate::drivers::reply::ReplyError;

pub const CODE_OK: u8 = 0;
pub const CODE_WAITING: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Terminal success, reply written.
    Ok,
    /// Suspended on a registered wait, poll again.
    Waiting,
}

impl Status {
    pub const fn code(self) -> u8 {
        match self {
            Status::Ok => CODE_OK,
            Status::Waiting => CODE_WAITING,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => f.write_str("OK"),
            Status::Waiting => f.write_str("WAITING"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginError {
    /// Persisted resume point matches no label of the plugin.
    ProtocolViolation { resume_point: u8 },
    Configuration(&'static str),
    Command(CommandError),
    Reply(ReplyError),
}

impl PluginError {
    pub const fn code(&self) -> u8 {
        match self {
            PluginError::ProtocolViolation { .. } => 2,
            PluginError::Configuration(_) => 3,
            PluginError::Command(_) => 4,
            PluginError::Reply(_) => 5,
        }
    }
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginError::ProtocolViolation { resume_point } => {
                write!(f, "no resume label {}", resume_point)
            }
            PluginError::Configuration(msg) => write!(f, "bad configuration: {}", msg),
            PluginError::Command(e) => write!(f, "{}", e),
            PluginError::Reply(e) => write!(f, "{}", e),
        }
    }
}

impl core::error::Error for PluginError {}

impl From<CommandError> for PluginError {
    fn from(e: CommandError) -> Self {
        PluginError::Command(e)
    }
}

impl From<ReplyError> for PluginError {
    fn from(e: ReplyError) -> Self {
        PluginError::Reply(e)
    }
}

pub type HandlerResult = Result<Status, PluginError>;
