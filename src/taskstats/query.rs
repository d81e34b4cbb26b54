//! One-shot stats queries for a specific task.

use crate::netlink::message::{self, AttrValue, MAX_MSG_SIZE};
use crate::netlink::{NetlinkSocket, SocketConfig, resolve_family_id};

use super::decode::decode_records;
use super::error::{Error, Result};
use super::record::StatsRecord;
use super::sink::StatsSink;
use super::{
    TASKSTATS_CMD_ATTR_PID, TASKSTATS_CMD_ATTR_TGID, TASKSTATS_CMD_GET, TASKSTATS_GENL_NAME,
};

/// On-demand query workflow over a dedicated session.
///
/// Each client owns its socket and its resolved family id; nothing is
/// shared with an exit stream, so the two workflows can never
/// cross-deliver replies.
///
/// Replies are paired with requests positionally — the protocol's
/// sequence number is not used for correlation — so a client must never
/// have two queries outstanding at once. `&mut self` on the query
/// methods enforces one caller at a time; wrap the client in a mutex to
/// share it across threads.
pub struct QueryClient {
    socket: NetlinkSocket,
    family_id: u16,
    portid: u32,
}

impl QueryClient {
    /// Opens a session and resolves the taskstats family id on it.
    ///
    /// Resolution happens here so no taskstats command can ever be sent
    /// before the family id is known.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Socket`] if the session cannot be opened and
    /// [`Error::Family`] if the kernel does not expose the taskstats
    /// family.
    pub fn connect(config: &SocketConfig) -> Result<Self> {
        let socket = NetlinkSocket::open(libc::NETLINK_GENERIC, config)?;
        let portid = std::process::id();
        let family_id = resolve_family_id(&socket, TASKSTATS_GENL_NAME, portid)?;
        Ok(Self {
            socket,
            family_id,
            portid,
        })
    }

    /// Stats for a single task id: one send, one receive-and-decode
    /// cycle, one record.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if the kernel answered with an error envelope
    /// (no further reads are performed), [`Error::Decode`] on a
    /// malformed reply, [`Error::EmptyReply`] if the reply carried no
    /// stats.
    pub fn query_pid(&mut self, pid: u32) -> Result<StatsRecord> {
        self.query(TASKSTATS_CMD_ATTR_PID, pid)
    }

    /// Stats aggregated over a whole thread group.
    pub fn query_tgid(&mut self, tgid: u32) -> Result<StatsRecord> {
        self.query(TASKSTATS_CMD_ATTR_TGID, tgid)
    }

    /// Like [`QueryClient::query_pid`], but delivers every record the
    /// reply carried to `sink`'s query-result stream. Returns the number
    /// of records delivered.
    pub fn query_pid_to(&mut self, pid: u32, sink: &mut dyn StatsSink) -> Result<usize> {
        let records = self.round_trip(TASKSTATS_CMD_ATTR_PID, pid)?;
        let count = records.len();
        for record in records {
            sink.on_query_result(record);
        }
        Ok(count)
    }

    fn query(&mut self, attr_type: u16, id: u32) -> Result<StatsRecord> {
        let mut records = self.round_trip(attr_type, id)?;
        if records.is_empty() {
            return Err(Error::EmptyReply { pid: id });
        }
        if records.len() > 1 {
            log::debug!("reply carried {} records; returning the first", records.len());
        }
        Ok(records.swap_remove(0))
    }

    fn round_trip(&mut self, attr_type: u16, id: u32) -> Result<Vec<StatsRecord>> {
        let request = message::encode_request(
            self.family_id,
            self.portid,
            TASKSTATS_CMD_GET,
            attr_type,
            AttrValue::U32(id),
        )?;
        self.socket.send(&request)?;

        let mut buf = [0u8; MAX_MSG_SIZE];
        let received = self.socket.recv(&mut buf)?;
        let payload = message::genl_payload(&buf[..received])?;
        Ok(decode_records(payload)?)
    }
}
