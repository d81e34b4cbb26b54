//! Consumer-facing event delivery.
//!
//! The workflows publish decoded records through the [`StatsSink`]
//! trait and know nothing about how or where they are consumed.
//! Delivery order equals decode order within a message and message
//! arrival order across a session; nothing is buffered beyond the one
//! message being decoded.

use serde::Serialize;

use super::record::StatsRecord;

/// Receives decoded records from the two logical event streams.
pub trait StatsSink: Send {
    /// A record answering an on-demand query.
    fn on_query_result(&mut self, record: StatsRecord);
    /// A record pushed by the kernel because a task on a registered CPU
    /// exited.
    fn on_exit_event(&mut self, record: StatsRecord);
}

/// One delivered record, tagged with the stream it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StatsEvent {
    QueryResult(StatsRecord),
    ExitEvent(StatsRecord),
}

impl StatsEvent {
    pub fn record(&self) -> &StatsRecord {
        match self {
            StatsEvent::QueryResult(record) | StatsEvent::ExitEvent(record) => record,
        }
    }
}

/// Sink publishing events into a bounded channel.
///
/// `blocking_send` lets a full channel apply back-pressure to the
/// blocking workflow thread instead of dropping records. A closed
/// channel (consumer gone) drops the record with a warning rather than
/// killing the workflow.
pub struct ChannelSink {
    tx: tokio::sync::mpsc::Sender<StatsEvent>,
}

impl ChannelSink {
    pub fn new(tx: tokio::sync::mpsc::Sender<StatsEvent>) -> Self {
        Self { tx }
    }

    fn publish(&self, event: StatsEvent) {
        if self.tx.blocking_send(event).is_err() {
            log::warn!("stats consumer is gone; dropping record");
        }
    }
}

impl StatsSink for ChannelSink {
    fn on_query_result(&mut self, record: StatsRecord) {
        self.publish(StatsEvent::QueryResult(record));
    }

    fn on_exit_event(&mut self, record: StatsRecord) {
        self.publish(StatsEvent::ExitEvent(record));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pid: u32) -> StatsRecord {
        StatsRecord {
            pid,
            ppid: 1,
            uid: 0,
            cpu_time_us: 10,
            command: "test".to_owned(),
        }
    }

    #[test]
    fn test_channel_sink_tags_streams_and_keeps_order() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let mut sink = ChannelSink::new(tx);

        sink.on_query_result(record(1));
        sink.on_exit_event(record(2));
        sink.on_exit_event(record(3));

        assert_eq!(rx.try_recv().unwrap(), StatsEvent::QueryResult(record(1)));
        assert_eq!(rx.try_recv().unwrap(), StatsEvent::ExitEvent(record(2)));
        assert_eq!(rx.try_recv().unwrap(), StatsEvent::ExitEvent(record(3)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_channel_does_not_panic() {
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        drop(rx);
        let mut sink = ChannelSink::new(tx);
        sink.on_exit_event(record(4));
    }

    #[test]
    fn test_event_record_accessor() {
        let event = StatsEvent::ExitEvent(record(9));
        assert_eq!(event.record().pid, 9);
    }
}
