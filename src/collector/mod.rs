//! Log collector: NDJSON store, HTTP receiver and daemon management.
//!
//! The collector can run in the foreground (`probelog serve`) or as a
//! detached daemon (`probelog start` / `stop` / `status`). Daemon state is a
//! JSON lock file next to the log file holding the pid and port, with a TCP
//! connect probe as the liveness check.

pub mod client;
pub mod entry;
pub mod server;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use sysinfo::{Pid, Signal, System};
use tracing::{debug, info, warn};

pub use entry::LogEntry;
pub use store::LogStore;

/// Default collector port.
pub const DEFAULT_PORT: u16 = 3947;

/// Default log file location, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = ".claude-logs/debug.ndjson";

/// Lock filename, stored next to the log file.
const LOCK_FILENAME: &str = "collector.lock";

/// Filename for the daemon's own stdout/stderr.
const DAEMON_LOG_FILENAME: &str = "collector.log";

/// Host used for client connections.
pub const CLIENT_HOST: &str = "127.0.0.1";

/// Collector startup parameters: listening port and log file path.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub port: u16,
    pub log_file: PathBuf,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl CollectorConfig {
    /// Directory holding the log file, lock file and daemon log.
    pub fn log_dir(&self) -> PathBuf {
        match self.log_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

/// Lock file contents for a running collector daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorLock {
    pub pid: u32,
    pub port: u16,
    pub log_file: String,
    pub started_at: i64,
}

impl CollectorLock {
    pub fn new(pid: u32, config: &CollectorConfig) -> Self {
        let started_at = chrono::Utc::now().timestamp();
        Self {
            pid,
            port: config.port,
            log_file: config.log_file.display().to_string(),
            started_at,
        }
    }
}

/// Get the lock file path for a collector configuration.
pub fn lock_path(config: &CollectorConfig) -> PathBuf {
    config.log_dir().join(LOCK_FILENAME)
}

/// Get the daemon output log path for a collector configuration.
pub fn daemon_log_path(config: &CollectorConfig) -> PathBuf {
    config.log_dir().join(DAEMON_LOG_FILENAME)
}

/// Read the lock file if it exists.
pub fn read_lock(path: &Path) -> Result<Option<CollectorLock>, String> {
    if !path.exists() {
        return Ok(None);
    }

    let contents =
        fs::read_to_string(path).map_err(|e| format!("Failed to read collector lock file: {e}"))?;

    let lock: CollectorLock = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse collector lock file: {e}"))?;

    Ok(Some(lock))
}

/// Write the lock file.
pub fn write_lock(path: &Path, lock: &CollectorLock) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("Failed to create lock directory: {e}"))?;
    }

    let contents = serde_json::to_string_pretty(lock)
        .map_err(|e| format!("Failed to serialize lock: {e}"))?;

    fs::write(path, contents).map_err(|e| format!("Failed to write collector lock file: {e}"))
}

/// Remove the lock file.
pub fn remove_lock(path: &Path) -> Result<(), String> {
    if path.exists() {
        fs::remove_file(path).map_err(|e| format!("Failed to remove collector lock file: {e}"))?;
    }
    Ok(())
}

/// Check if something is accepting connections at the given port.
pub fn is_listening(port: u16) -> bool {
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(500)).is_ok()
}

/// Spawn the collector as a detached daemon process by re-invoking the
/// current executable with `serve`, output redirected to the daemon log.
fn spawn_daemon(config: &CollectorConfig) -> Result<u32, String> {
    let daemon_log = daemon_log_path(config);

    if let Some(parent) = daemon_log.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("Failed to create log directory: {e}"))?;
    }

    let log = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&daemon_log)
        .map_err(|e| format!("Failed to open daemon log file: {e}"))?;

    let log_stderr = log
        .try_clone()
        .map_err(|e| format!("Failed to clone daemon log file handle: {e}"))?;

    let exe = std::env::current_exe()
        .map_err(|e| format!("Failed to resolve current executable: {e}"))?;

    debug!(exe = %exe.display(), "Spawning collector daemon");

    let child = std::process::Command::new(&exe)
        .arg("serve")
        .arg("--port")
        .arg(config.port.to_string())
        .arg("--log-file")
        .arg(&config.log_file)
        .stdin(Stdio::null())
        .stdout(log)
        .stderr(log_stderr)
        .spawn()
        .map_err(|e| format!("Failed to spawn collector daemon: {e}"))?;

    let pid = child.id();
    info!(pid, "Spawned collector daemon");

    Ok(pid)
}

/// Wait for the collector to start accepting connections.
fn wait_for_ready(port: u16, timeout_ms: u64) -> Result<(), String> {
    let start = Instant::now();
    let timeout = Duration::from_millis(timeout_ms);

    while start.elapsed() < timeout {
        if is_listening(port) {
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    Err(format!("Collector did not start within {timeout_ms}ms"))
}

/// Start the collector daemon if one is not already running.
pub fn start(config: &CollectorConfig) -> Result<(), String> {
    fs::create_dir_all(config.log_dir())
        .map_err(|e| format!("Failed to create log directory: {e}"))?;

    let lock_file = lock_path(config);

    if let Some(lock) = read_lock(&lock_file)? {
        if is_listening(lock.port) {
            debug!(pid = lock.pid, port = lock.port, "Collector already running");
            return Ok(());
        }

        debug!("Stale collector lock found, cleaning up");
        remove_lock(&lock_file)?;
    }

    if is_listening(config.port) {
        warn!(
            "Port {} is in use but no valid lock file found. Assuming a collector is running.",
            config.port
        );
        return Ok(());
    }

    info!(port = config.port, "Starting collector daemon");
    let pid = spawn_daemon(config)?;

    wait_for_ready(config.port, 5000)?;

    let lock = CollectorLock::new(pid, config);
    write_lock(&lock_file, &lock)?;

    info!(pid, "Collector daemon started");
    Ok(())
}

/// Stop the collector daemon and remove the lock file.
///
/// Sends SIGTERM so the server can drain in-flight requests and report its
/// final entry count to the daemon log before exiting.
pub fn stop(config: &CollectorConfig) -> Result<(), String> {
    let lock_file = lock_path(config);

    let lock = match read_lock(&lock_file)? {
        Some(lock) => lock,
        None => {
            debug!("Collector is not running (no lock file)");
            return Ok(());
        }
    };

    if !is_listening(lock.port) {
        debug!("Collector is not listening, cleaning up stale lock");
        remove_lock(&lock_file)?;
        return Ok(());
    }

    info!(pid = lock.pid, "Stopping collector daemon");

    let sys = System::new_all();
    match sys.process(Pid::from_u32(lock.pid)) {
        Some(process) => {
            if process.kill_with(Signal::Term).is_none() {
                // Platform without SIGTERM support; fall back to a hard kill.
                process.kill();
            }
        }
        None => {
            debug!(pid = lock.pid, "Collector process not found, may have already exited");
        }
    }

    // Give the server a moment to drain and release the port.
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(5) {
        if !is_listening(lock.port) {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    remove_lock(&lock_file)?;
    info!("Collector daemon stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lock_round_trip() {
        let dir = tempdir().unwrap();
        let config = CollectorConfig {
            port: 4242,
            log_file: dir.path().join("debug.ndjson"),
        };
        let path = lock_path(&config);

        assert!(read_lock(&path).unwrap().is_none());

        let lock = CollectorLock::new(123, &config);
        write_lock(&path, &lock).unwrap();

        let read = read_lock(&path).unwrap().unwrap();
        assert_eq!(read.pid, 123);
        assert_eq!(read.port, 4242);

        remove_lock(&path).unwrap();
        assert!(read_lock(&path).unwrap().is_none());
    }

    #[test]
    fn log_dir_falls_back_to_current_dir() {
        let config = CollectorConfig {
            port: DEFAULT_PORT,
            log_file: PathBuf::from("debug.ndjson"),
        };
        assert_eq!(config.log_dir(), PathBuf::from("."));
    }
}
