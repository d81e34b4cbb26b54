//! Decoding of the kernel's `struct taskstats` accounting block.
//!
//! A `TASKSTATS_TYPE_STATS` attribute carries the raw struct from
//! `linux/taskstats.h`. The layout of the basic accounting fields has
//! been fixed since version 1 of the struct; everything a
//! [`StatsRecord`] needs lives in the first 168 bytes, so newer kernels
//! with longer structs decode the same way.

use serde::Serialize;

use crate::netlink::error::DecodeError;

// Byte offsets within `struct taskstats`, after the 8-byte alignment of
// `ac_sched` and `ac_uid` mandated by the header.
const AC_COMM: usize = 80;
const AC_COMM_LEN: usize = 32; // TS_COMM_LEN
const AC_UID: usize = 120;
const AC_PID: usize = 128;
const AC_PPID: usize = 132;
const AC_UTIME: usize = 152;
const AC_STIME: usize = 160;

/// Shortest payload holding every field the record reads.
const MIN_STATS_LEN: usize = AC_STIME + 8;

/// One decoded accounting record.
///
/// Ephemeral by design: created per decoded stats attribute, handed to
/// the sink, then discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsRecord {
    /// Process id of the task the stats describe.
    pub pid: u32,
    /// Parent process id.
    pub ppid: u32,
    /// User id the task ran as.
    pub uid: u32,
    /// Cumulative CPU time, user plus system, in microseconds.
    pub cpu_time_us: u64,
    /// Command name (`ac_comm`), NUL-truncated.
    pub command: String,
}

impl StatsRecord {
    /// Decodes one record from a `TASKSTATS_TYPE_STATS` payload.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ShortStats`] if the payload does not cover
    /// the basic accounting fields.
    pub fn from_bytes(payload: &[u8]) -> Result<Self, DecodeError> {
        if payload.len() < MIN_STATS_LEN {
            return Err(DecodeError::ShortStats {
                len: payload.len(),
                min: MIN_STATS_LEN,
            });
        }

        let utime = read_u64(payload, AC_UTIME);
        let stime = read_u64(payload, AC_STIME);
        let comm = &payload[AC_COMM..AC_COMM + AC_COMM_LEN];
        let comm = &comm[..comm.iter().position(|&b| b == 0).unwrap_or(AC_COMM_LEN)];

        Ok(Self {
            pid: read_u32(payload, AC_PID),
            ppid: read_u32(payload, AC_PPID),
            uid: read_u32(payload, AC_UID),
            cpu_time_us: utime.saturating_add(stime),
            command: String::from_utf8_lossy(comm).into_owned(),
        })
    }
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_ne_bytes(bytes)
}

fn read_u64(buf: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_ne_bytes(bytes)
}

/// Average of accumulated microseconds over `samples`, in milliseconds.
///
/// A sample count of zero is treated as one, so the division is always
/// defined.
pub fn average_ms(total_us: u64, samples: u64) -> u64 {
    total_us / 1000 / samples.max(1)
}

/// Builds a minimal stats payload with the given accounting fields.
#[cfg(test)]
pub(crate) fn build_stats_payload(
    pid: u32,
    ppid: u32,
    uid: u32,
    utime_us: u64,
    stime_us: u64,
    command: &str,
) -> Vec<u8> {
    let mut payload = vec![0u8; MIN_STATS_LEN];
    payload[0..2].copy_from_slice(&1u16.to_ne_bytes()); // version
    let comm = command.as_bytes();
    payload[AC_COMM..AC_COMM + comm.len().min(AC_COMM_LEN)]
        .copy_from_slice(&comm[..comm.len().min(AC_COMM_LEN)]);
    payload[AC_UID..AC_UID + 4].copy_from_slice(&uid.to_ne_bytes());
    payload[AC_PID..AC_PID + 4].copy_from_slice(&pid.to_ne_bytes());
    payload[AC_PPID..AC_PPID + 4].copy_from_slice(&ppid.to_ne_bytes());
    payload[AC_UTIME..AC_UTIME + 8].copy_from_slice(&utime_us.to_ne_bytes());
    payload[AC_STIME..AC_STIME + 8].copy_from_slice(&stime_us.to_ne_bytes());
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_basic_fields() {
        let payload = build_stats_payload(1234, 1, 1000, 600_000, 400_000, "sshd");
        let record = StatsRecord::from_bytes(&payload).unwrap();

        assert_eq!(record.pid, 1234);
        assert_eq!(record.ppid, 1);
        assert_eq!(record.uid, 1000);
        assert_eq!(record.cpu_time_us, 1_000_000);
        assert_eq!(record.command, "sshd");
    }

    #[test]
    fn test_cpu_time_is_sum_of_user_and_system() {
        // ~1000 years of wall clock in microseconds still fits a u64.
        let thousand_years_us = 1000u64 * 365 * 24 * 3600 * 1_000_000;
        let payload = build_stats_payload(1, 0, 0, thousand_years_us, thousand_years_us, "init");
        let record = StatsRecord::from_bytes(&payload).unwrap();
        assert_eq!(record.cpu_time_us, 2 * thousand_years_us);
    }

    #[test]
    fn test_cpu_time_saturates_instead_of_wrapping() {
        let payload = build_stats_payload(1, 0, 0, u64::MAX, 1, "x");
        let record = StatsRecord::from_bytes(&payload).unwrap();
        assert_eq!(record.cpu_time_us, u64::MAX);
    }

    #[test]
    fn test_command_without_nul_uses_full_width() {
        let name = "a".repeat(AC_COMM_LEN);
        let payload = build_stats_payload(7, 1, 0, 0, 0, &name);
        let record = StatsRecord::from_bytes(&payload).unwrap();
        assert_eq!(record.command, name);
    }

    #[test]
    fn test_short_payload_is_an_error() {
        let err = StatsRecord::from_bytes(&[0u8; 100]).unwrap_err();
        match err {
            DecodeError::ShortStats { len, min } => {
                assert_eq!(len, 100);
                assert_eq!(min, MIN_STATS_LEN);
            }
            other => panic!("expected ShortStats, got: {other}"),
        }
    }

    #[test]
    fn test_longer_struct_versions_decode_the_same() {
        let mut payload = build_stats_payload(42, 1, 0, 10, 20, "cron");
        payload.resize(payload.len() + 160, 0); // later taskstats versions append fields
        let record = StatsRecord::from_bytes(&payload).unwrap();
        assert_eq!(record.pid, 42);
        assert_eq!(record.cpu_time_us, 30);
    }

    #[test]
    fn test_average_ms_never_divides_by_zero() {
        assert_eq!(average_ms(5_000, 0), 5);
        assert_eq!(average_ms(5_000, 1), 5);
        assert_eq!(average_ms(10_000, 2), 5);
        assert_eq!(average_ms(0, 0), 0);
    }
}
