//! Shutdown plumbing.
//!
//! One broadcast channel reaches the TCP server, the announcement watcher
//! and [`Node::serve`](crate::Node::serve). OS signals feed it through
//! [`trigger_on_signal`].

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Shutdown signal sender.
pub type ShutdownTx = broadcast::Sender<()>;

/// Create the node's shutdown channel.
pub fn shutdown_channel() -> ShutdownTx {
    broadcast::channel(1).0
}

/// Resolve on the first termination request, returning its name.
pub async fn termination_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => Ok("SIGINT"),
            _ = sigterm.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("Ctrl+C")
    }
}

/// Fire `tx` once the process is asked to terminate. If the handlers cannot
/// be installed the node keeps running and only an explicit send stops it.
pub fn trigger_on_signal(tx: ShutdownTx) -> JoinHandle<()> {
    tokio::spawn(async move {
        match termination_signal().await {
            Ok(name) => {
                info!(signal = name, "Shutdown requested");
                let _ = tx.send(());
            }
            Err(e) => error!(error = %e, "Failed to install signal handlers"),
        }
    })
}

/// Per-task view of the shutdown channel.
pub struct ShutdownGuard {
    rx: broadcast::Receiver<()>,
    fired: bool,
}

impl ShutdownGuard {
    pub fn new(tx: &ShutdownTx) -> Self {
        Self {
            rx: tx.subscribe(),
            fired: false,
        }
    }

    /// Wait until shutdown is signalled or every sender is gone.
    pub async fn wait(&mut self) {
        if !self.fired {
            let _ = self.rx.recv().await;
            self.fired = true;
        }
    }

    /// Non-blocking check. Stays true once observed.
    pub fn is_shutdown(&mut self) -> bool {
        if !self.fired {
            self.fired = matches!(
                self.rx.try_recv(),
                Ok(_) | Err(broadcast::error::TryRecvError::Closed)
            );
        }
        self.fired
    }
}
