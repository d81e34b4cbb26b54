//! Generic-netlink wire codec.
//!
//! Outbound: [`encode_request`] builds the fixed envelope (`nlmsghdr`),
//! the generic-netlink sub-header (`genlmsghdr`), and exactly one
//! top-level attribute — commands in the protocols handled here carry a
//! single argument (a task id or a cpumask string).
//!
//! Inbound: [`genl_payload`] validates the reply envelope and exposes
//! the attribute chain, and [`AttrCursor`] walks tag-length-value
//! records without ever reading past the supplied length. A truncated
//! attribute is a [`DecodeError`], not undefined behavior.
//!
//! All multi-byte fields use host byte order, as netlink does.

use super::error::{DecodeError, ProtocolError, ReplyError, SendError};

/// Fixed transfer buffer size shared by requests and replies.
pub const MAX_MSG_SIZE: usize = 1024;

/// `sizeof(struct nlmsghdr)`.
pub const NLMSG_HDRLEN: usize = 16;
/// `sizeof(struct genlmsghdr)`, padding included.
pub const GENL_HDRLEN: usize = 4;
/// `sizeof(struct nlattr)`.
pub const NLA_HDRLEN: usize = 4;
const NLA_ALIGNTO: usize = 4;

/// Message type of an error envelope.
pub const NLMSG_ERROR: u16 = 0x2;
/// The only flag the request path needs.
pub const NLM_F_REQUEST: u16 = 0x1;

/// Reserved family id of the generic-netlink controller.
pub const GENL_ID_CTRL: u16 = 0x10;
pub const CTRL_CMD_GETFAMILY: u8 = 3;
pub const CTRL_ATTR_FAMILY_ID: u16 = 1;
pub const CTRL_ATTR_FAMILY_NAME: u16 = 2;

/// Protocol version stamped into every request sub-header.
const GENL_VERSION: u8 = 0x1;

/// Rounds an attribute length up to the 4-byte alignment boundary.
pub const fn nla_align(len: usize) -> usize {
    (len + NLA_ALIGNTO - 1) & !(NLA_ALIGNTO - 1)
}

/// The single argument a command attribute carries.
#[derive(Debug, Clone, Copy)]
pub enum AttrValue<'a> {
    U32(u32),
    /// Encoded with a trailing NUL, as the kernel expects for string
    /// attributes such as family names and cpumasks.
    Str(&'a str),
}

/// Builds one complete request message.
///
/// # Arguments
///
/// * `msg_type` - Resolved family id, or [`GENL_ID_CTRL`] for the controller.
/// * `portid` - The sender's routing identity (its process id).
/// * `command` - Generic-netlink command code.
/// * `attr_type` / `value` - The single command attribute.
///
/// # Errors
///
/// Returns [`SendError::MessageTooLarge`] if the encoded message would
/// exceed the fixed transfer buffer.
pub fn encode_request(
    msg_type: u16,
    portid: u32,
    command: u8,
    attr_type: u16,
    value: AttrValue<'_>,
) -> Result<Vec<u8>, SendError> {
    let mut buf = Vec::with_capacity(64);

    // nlmsghdr; the total length is patched in once the attribute is placed.
    buf.extend_from_slice(&0u32.to_ne_bytes());
    buf.extend_from_slice(&msg_type.to_ne_bytes());
    buf.extend_from_slice(&NLM_F_REQUEST.to_ne_bytes());
    // Sequence number stays zero: replies are paired positionally.
    buf.extend_from_slice(&0u32.to_ne_bytes());
    buf.extend_from_slice(&portid.to_ne_bytes());

    // genlmsghdr: command, version, reserved.
    buf.push(command);
    buf.push(GENL_VERSION);
    buf.extend_from_slice(&0u16.to_ne_bytes());

    match value {
        AttrValue::U32(v) => push_attr(&mut buf, attr_type, &v.to_ne_bytes()),
        AttrValue::Str(s) => {
            let mut payload = Vec::with_capacity(s.len() + 1);
            payload.extend_from_slice(s.as_bytes());
            payload.push(0);
            push_attr(&mut buf, attr_type, &payload);
        }
    }

    let len = buf.len();
    if len > MAX_MSG_SIZE {
        return Err(SendError::MessageTooLarge {
            len,
            max: MAX_MSG_SIZE,
        });
    }
    buf[0..4].copy_from_slice(&(len as u32).to_ne_bytes());
    Ok(buf)
}

/// Appends one attribute: length, type, payload, alignment padding.
///
/// The declared length is header plus payload, unpadded. String payloads
/// must already include their NUL terminator.
pub fn push_attr(buf: &mut Vec<u8>, attr_type: u16, payload: &[u8]) {
    let len = NLA_HDRLEN + payload.len();
    buf.extend_from_slice(&(len as u16).to_ne_bytes());
    buf.extend_from_slice(&attr_type.to_ne_bytes());
    buf.extend_from_slice(payload);
    buf.resize(buf.len() + (nla_align(len) - len), 0);
}

/// One decoded attribute.
#[derive(Debug, Clone, Copy)]
pub struct Attr<'a> {
    pub ty: u16,
    pub payload: &'a [u8],
}

impl<'a> Attr<'a> {
    /// The payload as a native-endian `u32`.
    pub fn as_u32(&self) -> Result<u32, DecodeError> {
        match self.payload.first_chunk::<4>() {
            Some(bytes) => Ok(u32::from_ne_bytes(*bytes)),
            None => Err(DecodeError::ShortValue {
                len: self.payload.len(),
                expected: 4,
            }),
        }
    }

    /// The payload as a native-endian `u16`.
    pub fn as_u16(&self) -> Result<u16, DecodeError> {
        match self.payload.first_chunk::<2>() {
            Some(bytes) => Ok(u16::from_ne_bytes(*bytes)),
            None => Err(DecodeError::ShortValue {
                len: self.payload.len(),
                expected: 2,
            }),
        }
    }
}

/// Bounds-checked walk over a tag-length-value attribute chain.
///
/// The cursor consumes attributes by their aligned length. A chain that
/// ends with a partial header, or an attribute whose declared length
/// exceeds the remaining bytes, yields a [`DecodeError`] carrying the
/// byte offset of the failure.
pub struct AttrCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> AttrCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// The next attribute, or `None` once the chain is exhausted.
    pub fn next_attr(&mut self) -> Result<Option<Attr<'a>>, DecodeError> {
        let remaining = self.buf.len() - self.pos;
        if remaining == 0 {
            return Ok(None);
        }
        if remaining < NLA_HDRLEN {
            return Err(DecodeError::TruncatedHeader {
                offset: self.pos,
                remaining,
            });
        }

        let declared =
            u16::from_ne_bytes([self.buf[self.pos], self.buf[self.pos + 1]]) as usize;
        let ty = u16::from_ne_bytes([self.buf[self.pos + 2], self.buf[self.pos + 3]]);
        if declared < NLA_HDRLEN {
            return Err(DecodeError::InvalidLength {
                offset: self.pos,
                declared,
            });
        }
        if declared > remaining {
            return Err(DecodeError::TruncatedAttribute {
                offset: self.pos,
                declared,
                remaining,
            });
        }

        let payload = &self.buf[self.pos + NLA_HDRLEN..self.pos + declared];
        // The final attribute may legally omit its trailing padding.
        self.pos = (self.pos + nla_align(declared)).min(self.buf.len());
        Ok(Some(Attr { ty, payload }))
    }
}

/// Validates a reply envelope and returns the attribute chain that
/// follows the generic-netlink sub-header.
///
/// # Errors
///
/// An `NLMSG_ERROR` reply surfaces as [`ProtocolError`] with the
/// kernel's error code; a malformed envelope as [`DecodeError`].
pub fn genl_payload(buf: &[u8]) -> Result<&[u8], ReplyError> {
    let Some(header) = buf.first_chunk::<NLMSG_HDRLEN>() else {
        return Err(DecodeError::TruncatedEnvelope { len: buf.len() }.into());
    };
    let nlmsg_len = u32::from_ne_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let msg_type = u16::from_ne_bytes([header[4], header[5]]);

    if msg_type == NLMSG_ERROR {
        // struct nlmsgerr starts with the negated errno.
        let Some(code) = buf[NLMSG_HDRLEN..].first_chunk::<4>() else {
            return Err(DecodeError::TruncatedEnvelope { len: buf.len() }.into());
        };
        let code = i32::from_ne_bytes(*code).saturating_abs();
        return Err(ProtocolError::from_code(code).into());
    }

    if nlmsg_len < NLMSG_HDRLEN + GENL_HDRLEN || nlmsg_len > buf.len() {
        return Err(DecodeError::BadEnvelopeLength {
            declared: nlmsg_len,
            received: buf.len(),
        }
        .into());
    }
    Ok(&buf[NLMSG_HDRLEN + GENL_HDRLEN..nlmsg_len])
}
