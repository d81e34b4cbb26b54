//! Decoding of taskstats reply payloads into [`StatsRecord`]s.

use crate::netlink::error::DecodeError;
use crate::netlink::message::{Attr, AttrCursor};

use super::record::StatsRecord;
use super::{
    TASKSTATS_TYPE_AGGR_PID, TASKSTATS_TYPE_AGGR_TGID, TASKSTATS_TYPE_NULL, TASKSTATS_TYPE_PID,
    TASKSTATS_TYPE_STATS, TASKSTATS_TYPE_TGID,
};

/// Decodes every stats record carried by one reply payload, in wire
/// order.
///
/// A reply may batch several aggregates, each wrapping a task id and a
/// stats block as nested attributes. Unknown attribute types are skipped
/// with a debug log so replies from newer kernels stay readable; an
/// explicit `TASKSTATS_TYPE_NULL` is skipped silently.
///
/// # Errors
///
/// Any truncated or malformed attribute aborts decoding of this message
/// with a [`DecodeError`]; records decoded before the failure are
/// dropped with it.
pub fn decode_records(payload: &[u8]) -> Result<Vec<StatsRecord>, DecodeError> {
    let mut records = Vec::new();
    let mut attrs = AttrCursor::new(payload);
    while let Some(attr) = attrs.next_attr()? {
        match attr.ty {
            TASKSTATS_TYPE_AGGR_PID | TASKSTATS_TYPE_AGGR_TGID => {
                decode_aggregate(&attr, &mut records)?;
            }
            TASKSTATS_TYPE_NULL => {}
            other => log::debug!("skipping unknown attribute type {other}"),
        }
    }
    Ok(records)
}

fn decode_aggregate(attr: &Attr<'_>, records: &mut Vec<StatsRecord>) -> Result<(), DecodeError> {
    let mut task_id = None;
    let mut nested = AttrCursor::new(attr.payload);
    while let Some(na) = nested.next_attr()? {
        match na.ty {
            TASKSTATS_TYPE_PID | TASKSTATS_TYPE_TGID => task_id = Some(na.as_u32()?),
            TASKSTATS_TYPE_STATS => {
                let record = StatsRecord::from_bytes(na.payload)?;
                log::trace!(
                    "decoded stats for task {}: pid={} cmd={}",
                    task_id.unwrap_or(record.pid),
                    record.pid,
                    record.command
                );
                records.push(record);
            }
            TASKSTATS_TYPE_NULL => {}
            other => log::debug!("skipping unknown nested attribute type {other}"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::message::push_attr;
    use crate::taskstats::record::build_stats_payload;

    fn aggregate(id_type: u16, id: u32, stats: &[u8]) -> Vec<u8> {
        let mut nested = Vec::new();
        push_attr(&mut nested, id_type, &id.to_ne_bytes());
        push_attr(&mut nested, TASKSTATS_TYPE_STATS, stats);
        nested
    }

    #[test]
    fn test_decode_single_aggregate_by_pid() {
        let stats = build_stats_payload(1, 0, 0, 40, 2, "systemd");
        let mut payload = Vec::new();
        push_attr(
            &mut payload,
            TASKSTATS_TYPE_AGGR_PID,
            &aggregate(TASKSTATS_TYPE_PID, 1, &stats),
        );

        let records = decode_records(&payload).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pid, 1);
        assert_eq!(records[0].cpu_time_us, 42);
        assert_eq!(records[0].command, "systemd");
    }

    #[test]
    fn test_decode_batched_aggregates_in_order() {
        let mut payload = Vec::new();
        push_attr(
            &mut payload,
            TASKSTATS_TYPE_AGGR_PID,
            &aggregate(TASKSTATS_TYPE_PID, 10, &build_stats_payload(10, 1, 0, 1, 0, "a")),
        );
        push_attr(
            &mut payload,
            TASKSTATS_TYPE_AGGR_TGID,
            &aggregate(TASKSTATS_TYPE_TGID, 20, &build_stats_payload(20, 1, 0, 2, 0, "b")),
        );

        let records = decode_records(&payload).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].command, "a");
        assert_eq!(records[1].command, "b");
    }

    #[test]
    fn test_decode_is_deterministic() {
        let stats = build_stats_payload(5, 1, 0, 3, 4, "sh");
        let mut payload = Vec::new();
        push_attr(
            &mut payload,
            TASKSTATS_TYPE_AGGR_PID,
            &aggregate(TASKSTATS_TYPE_PID, 5, &stats),
        );

        assert_eq!(
            decode_records(&payload).unwrap(),
            decode_records(&payload).unwrap()
        );
    }

    #[test]
    fn test_unknown_and_null_attributes_are_skipped() {
        let stats = build_stats_payload(3, 1, 0, 1, 1, "sleep");
        let mut payload = Vec::new();
        push_attr(&mut payload, TASKSTATS_TYPE_NULL, &[]);
        push_attr(&mut payload, 77, &[0xde, 0xad]); // future kernel addition
        push_attr(
            &mut payload,
            TASKSTATS_TYPE_AGGR_PID,
            &aggregate(TASKSTATS_TYPE_PID, 3, &stats),
        );

        let records = decode_records(&payload).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pid, 3);
    }

    #[test]
    fn test_unknown_nested_attribute_does_not_abort() {
        let mut nested = Vec::new();
        push_attr(&mut nested, TASKSTATS_TYPE_PID, &9u32.to_ne_bytes());
        push_attr(&mut nested, 42, &[1, 2, 3, 4]);
        push_attr(
            &mut nested,
            TASKSTATS_TYPE_STATS,
            &build_stats_payload(9, 1, 0, 0, 7, "true"),
        );
        let mut payload = Vec::new();
        push_attr(&mut payload, TASKSTATS_TYPE_AGGR_PID, &nested);

        let records = decode_records(&payload).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].cpu_time_us, 7);
    }

    #[test]
    fn test_truncated_nested_attribute_is_fatal() {
        // Nested stats attribute declares more bytes than the aggregate holds.
        let mut nested = Vec::new();
        nested.extend_from_slice(&200u16.to_ne_bytes());
        nested.extend_from_slice(&TASKSTATS_TYPE_STATS.to_ne_bytes());
        nested.extend_from_slice(&[0u8; 8]);
        let mut payload = Vec::new();
        push_attr(&mut payload, TASKSTATS_TYPE_AGGR_PID, &nested);

        let err = decode_records(&payload).unwrap_err();
        assert!(matches!(err, DecodeError::TruncatedAttribute { declared: 200, .. }));
    }

    #[test]
    fn test_short_stats_block_is_fatal() {
        let mut payload = Vec::new();
        push_attr(
            &mut payload,
            TASKSTATS_TYPE_AGGR_PID,
            &aggregate(TASKSTATS_TYPE_PID, 1, &[0u8; 32]),
        );
        let err = decode_records(&payload).unwrap_err();
        assert!(matches!(err, DecodeError::ShortStats { len: 32, .. }));
    }
}
