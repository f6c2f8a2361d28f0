//! Cooperative shutdown signal shared by every background task.

use tokio::sync::watch;

/// Owner side: call [`Shutdown::trigger`] once to stop all tasks.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

/// Task side: cheap to clone, awaited at `select!` checkpoints.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    #[must_use]
    pub fn new() -> (Self, ShutdownSignal) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, ShutdownSignal { rx })
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl ShutdownSignal {
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is triggered (or the owner is dropped).
    pub async fn triggered(&mut self) {
        // An Err means the sender is gone, which also means stop.
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}
