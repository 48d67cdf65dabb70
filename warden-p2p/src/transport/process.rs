//! Node process supervision and the TCP transport built on it.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, watch};
use tokio::time::{sleep, timeout};

use super::{Transport, TransportLink};
use crate::config::{TransportConfig, DEFAULT_STOP_GRACE};
use crate::error::{P2pError, P2pResult};

/// Handle to a running node process.
///
/// The child is owned by a watcher task. Dropping the handle kills the
/// child; [`stop`](NodeProcess::stop) asks it to exit first.
pub struct NodeProcess {
    binary: PathBuf,
    pid: Option<u32>,
    grace: Duration,
    /// Fires a forced kill in the watcher. Dropping it does the same.
    kill_tx: parking_lot::Mutex<Option<oneshot::Sender<()>>>,
    /// `Some(description)` once the child has exited.
    exit_rx: watch::Receiver<Option<String>>,
    lifecycle: tokio::sync::Mutex<()>,
    stopped: AtomicBool,
}

impl NodeProcess {
    /// Launch `binary_path` with `args`.
    ///
    /// Fails with [`P2pError::Launch`] if the binary is missing, is not a
    /// regular file, is not executable, or cannot be spawned.
    pub fn start(binary_path: impl AsRef<Path>, args: &[String]) -> P2pResult<Self> {
        let binary = binary_path.as_ref().to_path_buf();
        check_executable(&binary)?;

        let mut child = Command::new(&binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| launch_error(&binary, e.to_string()))?;

        let pid = child.id();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(stdout, "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(stderr, "stderr"));
        }

        let (kill_tx, kill_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = watch::channel(None);
        tokio::spawn(watch_child(child, kill_rx, exit_tx));

        tracing::info!(binary = %binary.display(), pid = ?pid, "Node process started");

        Ok(Self {
            binary,
            pid,
            grace: DEFAULT_STOP_GRACE,
            kill_tx: parking_lot::Mutex::new(Some(kill_tx)),
            exit_rx,
            lifecycle: tokio::sync::Mutex::new(()),
            stopped: AtomicBool::new(false),
        })
    }

    /// Set how long [`stop`](NodeProcess::stop) waits before force-killing.
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// OS process id, if the child was still running when spawned.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Whether the child has exited.
    pub fn has_exited(&self) -> bool {
        self.exit_rx.borrow().is_some()
    }

    /// Future resolving with a description of how the child exited.
    pub fn exit_signal(&self) -> BoxFuture<'static, String> {
        let mut exit_rx = self.exit_rx.clone();
        async move {
            match exit_rx.wait_for(|status| status.is_some()).await {
                Ok(status) => status.clone().unwrap_or_default(),
                Err(_) => "node watcher ended".to_string(),
            }
        }
        .boxed()
    }

    /// Terminate the child: SIGTERM, wait up to the grace period, then kill.
    ///
    /// Calling `stop` again after it has completed is a no-op. A call made
    /// while another `stop` is running fails with
    /// [`P2pError::LifecycleBusy`].
    pub async fn stop(&self) -> P2pResult<()> {
        let _guard = self
            .lifecycle
            .try_lock()
            .map_err(|_| P2pError::LifecycleBusy)?;

        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if self.has_exited() {
            tracing::debug!(binary = %self.binary.display(), "Node process already exited");
            return Ok(());
        }

        self.terminate().await;

        let mut exit_rx = self.exit_rx.clone();
        if timeout(self.grace, exit_rx.wait_for(|s| s.is_some())).await.is_ok() {
            tracing::info!(pid = ?self.pid, "Node process stopped");
            return Ok(());
        }

        tracing::warn!(
            pid = ?self.pid,
            grace_ms = self.grace.as_millis() as u64,
            "Node process ignored SIGTERM, killing"
        );
        self.force_kill();
        let _ = exit_rx.wait_for(|s| s.is_some()).await;
        Ok(())
    }

    fn force_kill(&self) {
        if let Some(tx) = self.kill_tx.lock().take() {
            let _ = tx.send(());
        }
    }

    #[cfg(unix)]
    async fn terminate(&self) {
        let Some(pid) = self.pid else {
            return;
        };
        match Command::new("kill")
            .arg("-TERM")
            .arg(pid.to_string())
            .status()
            .await
        {
            Ok(status) if status.success() => {}
            Ok(status) => tracing::debug!(pid, %status, "kill -TERM reported failure"),
            Err(e) => {
                tracing::warn!(pid, error = %e, "Failed to send SIGTERM, killing");
                self.force_kill();
            }
        }
    }

    #[cfg(not(unix))]
    async fn terminate(&self) {
        self.force_kill();
    }
}

impl std::fmt::Debug for NodeProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeProcess")
            .field("binary", &self.binary)
            .field("pid", &self.pid)
            .field("exited", &self.has_exited())
            .finish()
    }
}

fn launch_error(binary: &Path, reason: impl Into<String>) -> P2pError {
    P2pError::Launch {
        path: binary.display().to_string(),
        reason: reason.into(),
    }
}

fn check_executable(binary: &Path) -> P2pResult<()> {
    let metadata = std::fs::metadata(binary).map_err(|e| launch_error(binary, e.to_string()))?;
    if !metadata.is_file() {
        return Err(launch_error(binary, "not a regular file"));
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(launch_error(binary, "not executable"));
        }
    }
    Ok(())
}

async fn watch_child(
    mut child: Child,
    kill_rx: oneshot::Receiver<()>,
    exit_tx: watch::Sender<Option<String>>,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        // Explicit kill or the handle was dropped.
        _ = kill_rx => {
            if let Err(e) = child.start_kill() {
                tracing::debug!(error = %e, "start_kill failed");
            }
            child.wait().await
        }
    };

    let description = match status {
        Ok(status) => format!("node process exited ({})", status),
        Err(e) => format!("failed to wait for node process: {}", e),
    };
    tracing::debug!(status = %description, "Node process watcher finished");
    exit_tx.send_replace(Some(description));
}

async fn forward_output<R>(stream: R, channel: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(target: "warden::node", channel, "{}", line);
    }
}

/// Transport that launches the node binary and dials its RPC port.
pub struct ProcessTransport {
    config: TransportConfig,
    process: tokio::sync::Mutex<Option<NodeProcess>>,
}

impl ProcessTransport {
    /// Create a transport; nothing is launched until [`Transport::open`].
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            process: tokio::sync::Mutex::new(None),
        }
    }

    /// Transport configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    async fn dial(&self, process: &NodeProcess) -> P2pResult<TcpStream> {
        let addr = self.config.rpc_addr();
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match TcpStream::connect(addr.as_str()).await {
                Ok(stream) => {
                    tracing::debug!(addr = %addr, attempts, "Dialed node RPC endpoint");
                    return Ok(stream);
                }
                Err(e) => {
                    if process.has_exited() {
                        return Err(P2pError::TransportLost {
                            reason: process.exit_signal().await,
                        });
                    }
                    tracing::trace!(addr = %addr, error = %e, "Node RPC not ready yet");
                }
            }
            sleep(self.config.dial_interval).await;
        }
    }
}

#[async_trait]
impl Transport for ProcessTransport {
    async fn open(&self) -> P2pResult<TransportLink> {
        let mut slot = self
            .process
            .try_lock()
            .map_err(|_| P2pError::LifecycleBusy)?;

        if let Some(previous) = slot.take() {
            previous.stop().await?;
        }

        let process = NodeProcess::start(&self.config.binary_path, &self.config.args)?
            .with_stop_grace(self.config.stop_grace);
        let lost = process.exit_signal();
        // Stored before dialing so a timed-out open still gets cleaned up by close.
        let process = slot.insert(process);

        let stream = self.dial(process).await?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(error = %e, "Failed to set TCP_NODELAY");
        }
        let (reader, writer) = stream.into_split();

        Ok(TransportLink {
            reader: Box::new(reader),
            writer: Box::new(writer),
            lost,
        })
    }

    async fn close(&self) -> P2pResult<()> {
        let mut slot = self
            .process
            .try_lock()
            .map_err(|_| P2pError::LifecycleBusy)?;
        match slot.take() {
            Some(process) => process.stop().await,
            None => Ok(()),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io::Write;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let result = NodeProcess::start(dir.path().join("no-such-node"), &[]);
        assert!(matches!(result, Err(P2pError::Launch { .. })));
    }

    #[tokio::test]
    async fn test_directory_is_not_launchable() {
        let dir = tempfile::tempdir().unwrap();
        let result = NodeProcess::start(dir.path(), &[]);
        assert!(matches!(result, Err(P2pError::Launch { .. })));
    }

    #[tokio::test]
    async fn test_non_executable_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "#!/bin/sh").unwrap();
        let result = NodeProcess::start(file.path(), &[]);
        match result {
            Err(P2pError::Launch { reason, .. }) => assert_eq!(reason, "not executable"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let process = NodeProcess::start("/bin/sh", &sh("exec sleep 30")).unwrap();
        assert!(!process.has_exited());

        process.stop().await.unwrap();
        assert!(process.has_exited());
        process.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_escalates_to_kill() {
        let process = NodeProcess::start("/bin/sh", &sh("trap '' TERM; while :; do sleep 1; done"))
            .unwrap()
            .with_stop_grace(Duration::from_millis(200));

        // Give the shell time to install the trap.
        sleep(Duration::from_millis(100)).await;
        timeout(Duration::from_secs(5), process.stop())
            .await
            .expect("stop should finish after the grace period")
            .unwrap();
        assert!(process.has_exited());
    }

    #[tokio::test]
    async fn test_concurrent_stop_is_busy() {
        let process = NodeProcess::start("/bin/sh", &sh("trap '' TERM; while :; do sleep 1; done"))
            .unwrap()
            .with_stop_grace(Duration::from_millis(500));
        sleep(Duration::from_millis(100)).await;

        let (first, second) = tokio::join!(process.stop(), async {
            // Lands while the first stop is waiting out the grace period.
            sleep(Duration::from_millis(100)).await;
            process.stop().await
        });
        first.unwrap();
        assert!(matches!(second, Err(P2pError::LifecycleBusy)));
        assert!(process.has_exited());

        // Once the first stop is done the lock is free again.
        process.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_unexpected_exit_is_signalled() {
        let process = NodeProcess::start("/bin/sh", &sh("exit 3")).unwrap();
        let reason = timeout(Duration::from_secs(5), process.exit_signal())
            .await
            .unwrap();
        assert!(reason.contains("exited"), "reason: {}", reason);
    }

    #[tokio::test]
    async fn test_open_fails_when_node_exits_before_listening() {
        let config = TransportConfig::new("/bin/sh")
            .with_args(sh("exit 1"))
            .with_rpc_endpoint("127.0.0.1", 1)
            .with_dial_interval(Duration::from_millis(20));
        let transport = ProcessTransport::new(config);

        let result = timeout(Duration::from_secs(5), transport.open()).await.unwrap();
        assert!(matches!(result, Err(P2pError::TransportLost { .. })));
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_during_open_is_busy() {
        // Nothing listens on the RPC port, so open keeps dialing.
        let unused = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = unused.local_addr().unwrap().port();
        drop(unused);

        let config = TransportConfig::new("/bin/sh")
            .with_args(sh("exec sleep 30"))
            .with_rpc_endpoint("127.0.0.1", port)
            .with_stop_grace(Duration::from_secs(1))
            .with_dial_interval(Duration::from_millis(20));
        let transport = std::sync::Arc::new(ProcessTransport::new(config));

        let opening = {
            let transport = transport.clone();
            tokio::spawn(async move { transport.open().await.map(|_| ()) })
        };
        sleep(Duration::from_millis(200)).await;

        assert!(matches!(transport.close().await, Err(P2pError::LifecycleBusy)));
        assert!(matches!(transport.open().await, Err(P2pError::LifecycleBusy)));

        // Cancelling the open leaves the launched node for close to stop.
        opening.abort();
        let _ = opening.await;
        timeout(Duration::from_secs(5), transport.close())
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_open_dials_listening_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = TransportConfig::new("/bin/sh")
            .with_args(sh("exec sleep 30"))
            .with_rpc_endpoint("127.0.0.1", port);
        let transport = ProcessTransport::new(config);

        let accept = tokio::spawn(async move { listener.accept().await.map(|_| ()) });
        let link = transport.open().await.unwrap();
        accept.await.unwrap().unwrap();

        drop(link);
        transport.close().await.unwrap();
        // Nothing left to close.
        transport.close().await.unwrap();
    }
}
