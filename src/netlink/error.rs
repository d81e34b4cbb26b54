//! Structured error types for the generic-netlink plumbing.
//!
//! The taxonomy mirrors where in a conversation a failure can occur:
//!
//! - [`SocketError`] — socket creation, binding, option setting, or a
//!   failed receive; fatal to opening or reading the session.
//! - [`SendError`] — a command could not be handed to the kernel in full.
//! - [`ProtocolError`] — the kernel answered with an explicit error
//!   envelope (`NLMSG_ERROR`) carrying an error code.
//! - [`DecodeError`] — a malformed or truncated reply; carries the byte
//!   offset of the failure so consumers can log without inspecting
//!   internals.
//! - [`FamilyError`] — family-name resolution failed, typically because
//!   the accounting subsystem is not available in the running kernel.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("socket() failed: {0}")]
    Create(#[source] io::Error),
    #[error("bind() failed: {0}")]
    Bind(#[source] io::Error),
    #[error("setsockopt({option}) failed: {source}")]
    SetOption {
        option: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("recv() failed: {0}")]
    Recv(#[source] io::Error),
}

impl SocketError {
    /// Whether this is a transient receive condition (interrupted call or
    /// bounded-wait timeout) that callers retry instead of surfacing.
    pub fn is_transient(&self) -> bool {
        match self {
            SocketError::Recv(err) => matches!(
                err.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("sendto() failed: {0}")]
    Io(#[source] io::Error),
    #[error("message of {len} bytes exceeds the {max}-byte transfer buffer")]
    MessageTooLarge { len: usize, max: usize },
}

/// The kernel replied with an `NLMSG_ERROR` envelope.
#[derive(Debug, Error)]
#[error("kernel replied with error {code}: {message}")]
pub struct ProtocolError {
    /// Positive errno value carried by the error envelope.
    pub code: i32,
    /// Human-readable description of `code`.
    pub message: String,
}

impl ProtocolError {
    pub(crate) fn from_code(code: i32) -> Self {
        Self {
            message: io::Error::from_raw_os_error(code).to_string(),
            code,
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("reply of {len} bytes is shorter than a netlink header")]
    TruncatedEnvelope { len: usize },
    #[error("reply envelope declares {declared} bytes but only {received} were received")]
    BadEnvelopeLength { declared: usize, received: usize },
    #[error("attribute header truncated at offset {offset}: {remaining} bytes remaining")]
    TruncatedHeader { offset: usize, remaining: usize },
    #[error("attribute at offset {offset} declares {declared} bytes but only {remaining} remain")]
    TruncatedAttribute {
        offset: usize,
        declared: usize,
        remaining: usize,
    },
    #[error("attribute at offset {offset} declares impossible length {declared}")]
    InvalidLength { offset: usize, declared: usize },
    #[error("attribute payload of {len} bytes is too short for a {expected}-byte value")]
    ShortValue { len: usize, expected: usize },
    #[error("stats payload of {len} bytes is shorter than the {min}-byte accounting block")]
    ShortStats { len: usize, min: usize },
}

/// Failure while validating and unwrapping one reply message.
#[derive(Debug, Error)]
pub enum ReplyError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Error)]
pub enum FamilyError {
    #[error("failed to send family lookup for `{family}`: {source}")]
    Send {
        family: String,
        #[source]
        source: SendError,
    },
    #[error("failed to read family lookup reply for `{family}`: {source}")]
    Recv {
        family: String,
        #[source]
        source: SocketError,
    },
    #[error("family lookup for `{family}` failed: {source}")]
    Reply {
        family: String,
        #[source]
        source: ReplyError,
    },
    #[error("no family id attribute in reply for `{family}`; is the subsystem compiled in?")]
    IdAttributeMissing { family: String },
}
