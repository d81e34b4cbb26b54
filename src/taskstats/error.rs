//! Workflow-level error composition.
//!
//! The protocol-layer errors from [`crate::netlink::error`] compose into
//! one [`Error`] so a workflow call site can use `?` throughout. Which
//! variant a caller sees tells it what died: a `Socket` or `Family`
//! error is fatal to session setup, `Protocol` and `Decode` are fatal to
//! the current workflow, and `Send` only to the current command. No
//! variant triggers automatic retry or reconnect; recreating a session
//! is the caller's decision.

use crate::netlink::error::{
    DecodeError, FamilyError, ProtocolError, ReplyError, SendError, SocketError,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Socket(#[from] SocketError),
    #[error(transparent)]
    Send(#[from] SendError),
    #[error(transparent)]
    Family(#[from] FamilyError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("reply for task {pid} carried no stats")]
    EmptyReply { pid: u32 },
}

impl From<ReplyError> for Error {
    fn from(err: ReplyError) -> Self {
        match err {
            ReplyError::Protocol(e) => Error::Protocol(e),
            ReplyError::Decode(e) => Error::Decode(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
