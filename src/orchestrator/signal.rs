use std::sync::Arc;

use tokio::sync::watch;

/// Level-triggered "the controlling foreground actor is active" flag.
///
/// Waiting while already resumed returns at once, and flipping the level with
/// nobody waiting is harmless, so a missed reactivation never strands a session.
#[derive(Clone)]
pub struct ForegroundSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ForegroundSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ForegroundSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn resumed(&self) {
        self.tx.send_replace(true);
    }

    pub fn paused(&self) {
        self.tx.send_replace(false);
    }

    pub fn is_resumed(&self) -> bool {
        *self.tx.borrow()
    }

    pub async fn wait_resumed(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|active| *active).await;
    }
}
