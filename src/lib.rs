use std::str::FromStr;
use std::time::Duration;

use netlink::SocketConfig;
use taskstats::{ChannelSink, CpuMask, ExitStream, QueryClient, StatsEvent};

/// taskmon: per-task resource accounting over the Linux taskstats
/// generic-netlink family.
///
/// This library provides the protocol engine for talking to the
/// kernel's task accounting subsystem: family-id resolution, request
/// encoding, nested-attribute decoding, one-shot stats queries for a
/// given task, and a continuous stream of exit-time stats for tasks
/// that die on a registered CPU set.
pub mod error;
pub mod netlink;
pub mod taskstats;

/// Runs the taskmon demo application.
///
/// Queries the configured pid once, then registers for exit events and
/// logs every record the kernel pushes until Ctrl-C.
///
/// Configuration comes from the environment:
/// - `TASKMON_PID` — pid for the one-shot query (default `1`).
/// - `TASKMON_CPUMASK` — CPU set for exit events (default `"0"`).
/// - `TASKMON_RCVBUF` — receive-buffer size hint in bytes.
///
/// # Errors
///
/// Possible errors include:
/// - Invalid environment values (pid, cpumask, buffer size).
/// - The kernel not exposing the taskstats family.
/// - Missing privileges for exit-event registration (root or
///   `CAP_NET_ADMIN`).
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pid = std::env::var("TASKMON_PID")
        .ok()
        .map(|value| value.parse::<u32>())
        .transpose()?
        .unwrap_or(1);
    let cpumask = CpuMask::from_str(
        std::env::var("TASKMON_CPUMASK")
            .as_deref()
            .unwrap_or("0"),
    )?;
    let mut config = SocketConfig {
        // Bounded wait so the exit stream notices its stop signal.
        recv_timeout: Some(Duration::from_millis(500)),
        ..SocketConfig::default()
    };
    if let Ok(size) = std::env::var("TASKMON_RCVBUF") {
        config.recv_buffer_size = Some(size.parse()?);
    }

    let query_config = config.clone();
    let record = tokio::task::spawn_blocking(move || {
        let mut client = QueryClient::connect(&query_config)?;
        client.query_pid(pid)
    })
    .await
    .expect("spawn_blocking panicked")?;
    log::info!(
        "stats for pid {}: ppid={} uid={} cpu_us={} cmd={}",
        record.pid,
        record.ppid,
        record.uid,
        record.cpu_time_us,
        record.command
    );

    let stream_config = config.clone();
    let stream = tokio::task::spawn_blocking(move || ExitStream::register(&stream_config, cpumask))
        .await
        .expect("spawn_blocking panicked")?;
    let stop = stream.stop_handle();

    let (tx, mut rx) = tokio::sync::mpsc::channel::<StatsEvent>(64);
    let worker = tokio::task::spawn_blocking(move || {
        let mut sink = ChannelSink::new(tx);
        stream.run(&mut sink)
    });
    log::debug!("started exit-event stream");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("shutting down");
                stop.stop();
                break;
            }
            event = rx.recv() => match event {
                Some(StatsEvent::ExitEvent(record)) => log::info!(
                    "exit: pid={} ppid={} cpu_us={} cmd={}",
                    record.pid,
                    record.ppid,
                    record.cpu_time_us,
                    record.command
                ),
                Some(StatsEvent::QueryResult(record)) => log::info!(
                    "query result: pid={} cpu_us={}",
                    record.pid,
                    record.cpu_time_us
                ),
                None => break,
            }
        }
    }

    // Drain whatever the stream delivered before it noticed the stop.
    while let Some(event) = rx.recv().await {
        log::debug!("late event: pid={}", event.record().pid);
    }
    worker.await.expect("spawn_blocking panicked")?;
    Ok(())
}
