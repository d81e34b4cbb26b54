//! Continuous streaming of exit-time stats.
//!
//! Registering a cpumask makes the kernel push an exit-stats message
//! for every task that exits on those CPUs — not only tasks that were
//! explicitly queried — which is the only way to observe short-lived
//! tasks reliably.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::ResultOkLogExt;
use crate::netlink::message::{self, AttrValue, MAX_MSG_SIZE};
use crate::netlink::{NetlinkSocket, SocketConfig, resolve_family_id};

use super::cpumask::CpuMask;
use super::decode::decode_records;
use super::error::Result;
use super::sink::StatsSink;
use super::{
    TASKSTATS_CMD_ATTR_DEREGISTER_CPUMASK, TASKSTATS_CMD_ATTR_REGISTER_CPUMASK,
    TASKSTATS_CMD_GET, TASKSTATS_GENL_NAME,
};

/// Signals a running [`ExitStream`] to shut down.
///
/// Cloneable and cheap; safe to trigger from any thread or signal
/// handler context. The stream notices the signal before its next
/// blocking receive, so pair it with a receive timeout in
/// [`SocketConfig`] for a bounded shutdown.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Exit-event workflow: register a cpumask, stream records until
/// stopped or a fatal error, then deregister.
///
/// The stream owns a dedicated session and resolves the family id on it
/// independently — ids are never shared across sessions even though the
/// family is the same. At most one registration exists per stream.
pub struct ExitStream {
    socket: NetlinkSocket,
    family_id: u16,
    portid: u32,
    cpumask: CpuMask,
    registered: bool,
    stop: Arc<AtomicBool>,
}

impl ExitStream {
    /// Opens a dedicated session, resolves the family id, and registers
    /// interest in exit events for `cpumask`.
    ///
    /// Registration requires root or `CAP_NET_ADMIN`.
    ///
    /// # Errors
    ///
    /// Returns [`super::Error`] if the session cannot be opened, the
    /// family cannot be resolved, or the registration command cannot be
    /// sent.
    pub fn register(config: &SocketConfig, cpumask: CpuMask) -> Result<Self> {
        let socket = NetlinkSocket::open(libc::NETLINK_GENERIC, config)?;
        let portid = std::process::id();
        let family_id = resolve_family_id(&socket, TASKSTATS_GENL_NAME, portid)?;

        let request = message::encode_request(
            family_id,
            portid,
            TASKSTATS_CMD_GET,
            TASKSTATS_CMD_ATTR_REGISTER_CPUMASK,
            AttrValue::Str(cpumask.as_str()),
        )?;
        socket.send(&request)?;
        log::debug!("registered exit notifications for cpumask {cpumask}");

        Ok(Self {
            socket,
            family_id,
            portid,
            cpumask,
            registered: true,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Handle for shutting the stream down from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.stop))
    }

    /// Receives and delivers exit events until stopped or a fatal error.
    ///
    /// Meant to occupy a dedicated thread. Each iteration checks the
    /// stop signal, then blocks on the session's receive (bounded by the
    /// configured timeout). Transient conditions — interrupted calls and
    /// timeouts — are retried transparently. A kernel error envelope or
    /// a malformed message is fatal: the loop ends, the cpumask is
    /// deregistered best-effort, and the session closes when the stream
    /// is dropped.
    ///
    /// # Errors
    ///
    /// `Ok(())` after a stop signal; the fatal [`super::Error`]
    /// otherwise.
    pub fn run(mut self, sink: &mut dyn StatsSink) -> Result<()> {
        let result = self.recv_loop(sink);
        self.deregister();
        result
    }

    fn recv_loop(&mut self, sink: &mut dyn StatsSink) -> Result<()> {
        let mut buf = [0u8; MAX_MSG_SIZE];
        loop {
            if self.stop.load(Ordering::SeqCst) {
                log::debug!("exit stream stopped");
                return Ok(());
            }
            let received = match self.socket.recv(&mut buf) {
                Ok(received) => received,
                Err(err) if err.is_transient() => {
                    log::trace!("transient receive condition: {err}");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let payload = message::genl_payload(&buf[..received])?;
            for record in decode_records(payload)? {
                sink.on_exit_event(record);
            }
        }
    }

    /// Best-effort deregistration; failure is logged, never escalated.
    fn deregister(&mut self) {
        if !self.registered {
            return;
        }
        self.registered = false;
        let request = message::encode_request(
            self.family_id,
            self.portid,
            TASKSTATS_CMD_GET,
            TASKSTATS_CMD_ATTR_DEREGISTER_CPUMASK,
            AttrValue::Str(self.cpumask.as_str()),
        );
        if let Some(request) = request.ok_log()
            && self.socket.send(&request).ok_log().is_some()
        {
            log::debug!("deregistered exit notifications for cpumask {}", self.cpumask);
        }
    }
}

impl Drop for ExitStream {
    fn drop(&mut self) {
        self.deregister();
    }
}
