/// Entry point for the taskmon task-accounting monitor.
///
/// This binary queries the taskstats family once for a configured pid,
/// then streams exit-time stats for the configured CPU set until
/// interrupted. Exit-event registration requires root or
/// `CAP_NET_ADMIN`.
///
/// # Errors
///
/// Returns an error if initialization fails (e.g., taskstats missing
/// from the kernel, or insufficient privileges for registration).
///
/// # Examples
///
/// ```bash
/// RUST_LOG=info TASKMON_PID=1 TASKMON_CPUMASK=0 cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    taskmon::run().await
}
