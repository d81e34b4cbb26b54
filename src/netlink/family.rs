//! Family-name to family-id resolution via the generic-netlink controller.

use super::error::{DecodeError, FamilyError};
use super::message::{
    self, AttrCursor, AttrValue, CTRL_ATTR_FAMILY_ID, CTRL_ATTR_FAMILY_NAME, CTRL_CMD_GETFAMILY,
    GENL_ID_CTRL, MAX_MSG_SIZE,
};
use super::socket::NetlinkSocket;

/// Resolves `family_name` to its numeric family id.
///
/// Sends `CTRL_CMD_GETFAMILY` with the name as a string attribute to the
/// reserved controller family id and reads exactly one reply. The
/// controller's reply layout is deterministic: the first attribute is
/// the family name echoed back, and the numeric id follows it. The
/// resolver skips exactly that first attribute rather than searching the
/// chain — a deliberate shortcut relying on known kernel ordering.
///
/// # Errors
///
/// Returns [`FamilyError::IdAttributeMissing`] if the attribute after
/// the echoed name is not the family id, which typically means the named
/// subsystem is not compiled into the running kernel. Send, receive, and
/// reply-validation failures are wrapped with the family name attached.
pub fn resolve_family_id(
    socket: &NetlinkSocket,
    family_name: &str,
    portid: u32,
) -> Result<u16, FamilyError> {
    let request = message::encode_request(
        GENL_ID_CTRL,
        portid,
        CTRL_CMD_GETFAMILY,
        CTRL_ATTR_FAMILY_NAME,
        AttrValue::Str(family_name),
    )
    .map_err(|source| FamilyError::Send {
        family: family_name.to_owned(),
        source,
    })?;
    socket.send(&request).map_err(|source| FamilyError::Send {
        family: family_name.to_owned(),
        source,
    })?;

    let mut buf = [0u8; MAX_MSG_SIZE];
    let received = socket.recv(&mut buf).map_err(|source| FamilyError::Recv {
        family: family_name.to_owned(),
        source,
    })?;
    let payload =
        message::genl_payload(&buf[..received]).map_err(|source| FamilyError::Reply {
            family: family_name.to_owned(),
            source,
        })?;

    match parse_family_reply(payload) {
        Ok(Some(id)) => {
            log::debug!("resolved family `{family_name}` to id {id}");
            Ok(id)
        }
        Ok(None) => Err(FamilyError::IdAttributeMissing {
            family: family_name.to_owned(),
        }),
        Err(err) => Err(FamilyError::Reply {
            family: family_name.to_owned(),
            source: err.into(),
        }),
    }
}

/// Skip the echoed name, read the id from the attribute that follows.
fn parse_family_reply(payload: &[u8]) -> Result<Option<u16>, DecodeError> {
    let mut cursor = AttrCursor::new(payload);
    if cursor.next_attr()?.is_none() {
        return Ok(None);
    }
    match cursor.next_attr()? {
        Some(attr) if attr.ty == CTRL_ATTR_FAMILY_ID => attr.as_u16().map(Some),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::message::push_attr;

    fn controller_reply(attrs: &[(u16, &[u8])]) -> Vec<u8> {
        let mut payload = Vec::new();
        for (ty, data) in attrs {
            push_attr(&mut payload, *ty, data);
        }
        payload
    }

    #[test]
    fn test_parse_family_reply_reads_id_after_echoed_name() {
        let payload = controller_reply(&[
            (CTRL_ATTR_FAMILY_NAME, b"TASKSTATS\0"),
            (CTRL_ATTR_FAMILY_ID, &0x17u16.to_ne_bytes()),
        ]);
        assert_eq!(parse_family_reply(&payload).unwrap(), Some(0x17));
    }

    #[test]
    fn test_parse_family_reply_missing_id() {
        let payload = controller_reply(&[(CTRL_ATTR_FAMILY_NAME, b"TASKSTATS\0")]);
        assert_eq!(parse_family_reply(&payload).unwrap(), None);

        // An unexpected attribute in the id slot is also a miss.
        let payload = controller_reply(&[
            (CTRL_ATTR_FAMILY_NAME, b"TASKSTATS\0"),
            (99, &[1, 2, 3, 4][..]),
        ]);
        assert_eq!(parse_family_reply(&payload).unwrap(), None);
    }

    #[test]
    fn test_parse_family_reply_empty() {
        assert_eq!(parse_family_reply(&[]).unwrap(), None);
    }

    #[test]
    fn test_parse_family_reply_is_stable() {
        let payload = controller_reply(&[
            (CTRL_ATTR_FAMILY_NAME, b"TASKSTATS\0"),
            (CTRL_ATTR_FAMILY_ID, &0x17u16.to_ne_bytes()),
        ]);
        let first = parse_family_reply(&payload).unwrap();
        let second = parse_family_reply(&payload).unwrap();
        assert_eq!(first, second);
    }
}
