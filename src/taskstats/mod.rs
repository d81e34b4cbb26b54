//! Per-task resource accounting over the kernel's taskstats family.
//!
//! The taskstats generic-netlink family exposes per-task accounting
//! (CPU time, identifiers, command name) in two ways, both built on the
//! protocol engine in [`crate::netlink`]:
//!
//! - [`QueryClient`] — on-demand stats for a specific live (or recently
//!   exited) task id; one request, one reply.
//! - [`ExitStream`] — registration for a CPU set after which the kernel
//!   pushes exit-time stats for every task that exits on those CPUs,
//!   catching short-lived tasks a sampling approach would miss.
//!
//! Decoded [`StatsRecord`]s are handed to a [`StatsSink`] and never
//! stored here.
//!
//! # Platform Requirements
//!
//! - Linux with `CONFIG_TASKSTATS`.
//! - Root (or `CAP_NET_ADMIN`) for exit-event registration.

mod cpumask;
mod decode;
pub mod error;
mod exit_stream;
mod query;
mod record;
mod sink;

pub use cpumask::{CpuMask, CpuMaskError};
pub use decode::decode_records;
pub use error::Error;
pub use exit_stream::{ExitStream, StopHandle};
pub use query::QueryClient;
pub use record::{StatsRecord, average_ms};
pub use sink::{ChannelSink, StatsEvent, StatsSink};

/// Generic-netlink name of the task accounting family.
pub const TASKSTATS_GENL_NAME: &str = "TASKSTATS";

/// The single command the family exposes; its attribute selects the
/// operation (query by id, or cpumask registration).
pub const TASKSTATS_CMD_GET: u8 = 1;

pub const TASKSTATS_CMD_ATTR_PID: u16 = 1;
pub const TASKSTATS_CMD_ATTR_TGID: u16 = 2;
pub const TASKSTATS_CMD_ATTR_REGISTER_CPUMASK: u16 = 3;
pub const TASKSTATS_CMD_ATTR_DEREGISTER_CPUMASK: u16 = 4;

pub const TASKSTATS_TYPE_PID: u16 = 1;
pub const TASKSTATS_TYPE_TGID: u16 = 2;
pub const TASKSTATS_TYPE_STATS: u16 = 3;
pub const TASKSTATS_TYPE_AGGR_PID: u16 = 4;
pub const TASKSTATS_TYPE_AGGR_TGID: u16 = 5;
pub const TASKSTATS_TYPE_NULL: u16 = 6;
